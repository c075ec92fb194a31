//! # pdsim
//!
//! 拠点防空（ポイントディフェンス）の迎撃シミュレーション。
//!
//! 飛来する脅威を探知し、防護対象ごとに相関付けた脅威記録を生成して、
//! 迎撃ミサイルを手動または自動で割り当てます。自動迎撃は距離閾値と
//! 使用上限を持つポリシーで制御されます。
//!
//! - [`models`]: 脅威・探知・迎撃ミサイル・在庫・自動迎撃ポリシー
//! - [`simulation`]: 固定周期の交戦ループ
//! - [`scenario`]: YAMLシナリオの読み込み
//! - [`logging`]: tracing の初期化
//! - [`error`]: エラー型

pub mod error;
pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;
