use std::fmt;
use std::ops::{Add, Mul, Sub};

/// 迎撃ミサイルの識別子
pub type InterceptorId = u32;
/// 敵ミサイル（脅威）の識別子
pub type ThreatId = u32;
/// 防護対象の識別子
pub type TargetId = u32;
/// 探知記録の識別子（プロセス内で単調増加）
pub type DetectionId = u64;

/// 3次元位置を表す構造体
///
/// 値型として扱い、目標到達判定では完全一致で比較されます。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64, // 高度
}

impl Position3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 3次元距離を計算
    pub fn distance_3d(&self, other: &Position3D) -> f64 {
        (*other - *self).magnitude()
    }

    /// ベクトルの長さ（原点からの距離）
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    /// 単位ベクトルを返す。長さ0の場合はNone
    pub fn normalize(&self) -> Option<Self> {
        let mag = self.magnitude();
        if mag > 0.0 {
            Some(Self::new(self.x / mag, self.y / mag, self.z / mag))
        } else {
            None
        }
    }

    /// XY座標のみ線形補間する（高度はそのまま）
    pub fn lerp_xy(&self, other: &Position3D, t: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z,
        )
    }
}

impl fmt::Display for Position3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl Add for Position3D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Position3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Position3D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

/// 移動ステップの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalStatus {
    /// 飛翔中
    InFlight,
    /// 目標位置に到達した
    Arrived,
}

/// シミュレーション定数
pub mod constants {
    /// 探知範囲（この距離未満の脅威のみ報告）
    pub const DETECTION_RANGE: f64 = 10_000.0;
    /// 自動迎撃の距離閾値（デフォルト）
    pub const DEFAULT_AUTO_THRESHOLD: f64 = 2_000.0;
    /// 自動迎撃で使用できる迎撃ミサイル数（デフォルト）
    pub const DEFAULT_MAX_AUTO_COMMITTED: u32 = 3;
    /// 飛翔シミュレーションのステップ数
    pub const FLIGHT_STEPS: u32 = 20;
    /// 弾道の最高高度（初期高度からの上昇量）
    pub const MAX_ALTITUDE: f64 = 500.0;
    /// 飛翔ステップ間の待機時間（ミリ秒）
    pub const FLIGHT_STEP_DELAY_MS: u64 = 100;
    /// ライブビューの更新周期（ミリ秒）
    pub const LIVE_TICK_MS: u64 = 1_500;
    /// 目標位置が解決できなかった場合の名称
    pub const UNKNOWN_TARGET: &str = "Unknown";
}
