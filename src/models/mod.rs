// 基本的なデータ型と定数
pub mod common;

// 差し替え可能な境界（trait）定義
pub mod traits;

// 各モデルの実装
pub mod target;
pub mod threat;
pub mod detection;
pub mod interceptor;
pub mod inventory;
pub mod autonomy;
pub mod controller;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use target::ProtectedTarget;
pub use threat::InboundThreat;
pub use detection::{DetectionStats, DetectionSystem, ThreatRecord};
pub use interceptor::{FlightProfile, FlightReport, Interceptor, InterceptorState};
pub use inventory::Inventory;
pub use autonomy::{AutonomyPolicy, AutonomyStatus};
pub use controller::{InterceptorController, LaunchMode, LaunchRecord};
