use crate::models::{
    common::{ArrivalStatus, Position3D, ThreatId},
    detection::ThreatRecord,
    target::ProtectedTarget,
    threat::InboundThreat,
};

/// 移動可能なエンティティのインターフェース
pub trait IMovable {
    /// 1ティック分の移動を行い、到達状態を返す
    fn advance(&mut self) -> ArrivalStatus;

    /// 現在位置の取得
    fn get_position(&self) -> Position3D;
}

/// センサー（探知エンジン）のインターフェース
pub trait ISensor {
    /// 脅威のスキャン
    fn scan(&mut self, threats: &[InboundThreat], targets: &[ProtectedTarget]) -> Vec<ThreatRecord>;

    /// 探知範囲の取得
    fn get_detection_range(&self) -> f64;
}

/// アロケーター（迎撃管制）のインターフェース
pub trait IAllocator {
    /// 自動迎撃（1回の呼び出しで最大1発）
    fn auto_intercept(&mut self, records: &[ThreatRecord]) -> Vec<ThreatId>;

    /// オペレーター指定の脅威に対する手動迎撃
    fn manual_intercept(&mut self, record: &ThreatRecord) -> Option<ThreatId>;
}
