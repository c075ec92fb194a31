use crate::models::{
    common::{ArrivalStatus, Position3D, TargetId, ThreatId},
    target::ProtectedTarget,
    traits::IMovable,
};
use tracing::debug;

/// 敵ミサイル（飛来する脅威）
///
/// 発射位置から目標位置に向かって等速直線運動します。
/// 速度は1ティックあたりの移動量として扱います。
#[derive(Debug, Clone)]
pub struct InboundThreat {
    /// 脅威の一意識別子
    pub id: ThreatId,
    /// 現在位置
    pub position: Position3D,
    /// 目標位置
    pub target_position: Position3D,
    /// 目標の識別子（防護対象から生成した場合のみ）
    pub target_id: Option<TargetId>,
    /// 1ティックあたりの移動量
    pub speed: f64,
    /// 発射位置
    pub launch_position: Position3D,
}

impl InboundThreat {
    /// 任意の目標位置に向かう脅威を作成
    ///
    /// 目標識別子を持たないため、探知時は位置の完全一致で対象を解決します。
    pub fn new(id: ThreatId, start: Position3D, target_position: Position3D, speed: f64) -> Self {
        Self {
            id,
            position: start,
            target_position,
            target_id: None,
            speed,
            launch_position: start,
        }
    }

    /// 防護対象に向かう脅威を作成
    pub fn toward(id: ThreatId, start: Position3D, target: &ProtectedTarget, speed: f64) -> Self {
        Self {
            target_id: Some(target.id),
            ..Self::new(id, start, target.position, speed)
        }
    }

    /// 目標までの残り距離
    pub fn distance_to_target(&self) -> f64 {
        self.position.distance_3d(&self.target_position)
    }

    /// 発射位置からの飛行距離
    pub fn distance_travelled(&self) -> f64 {
        self.launch_position.distance_3d(&self.position)
    }
}

impl IMovable for InboundThreat {
    /// 目標に向かって1ステップ移動
    ///
    /// 残り距離が0なら移動せず到達を返す。残り距離が1ステップ以下なら
    /// 目標位置にそのまま置いて到達を返す。
    fn advance(&mut self) -> ArrivalStatus {
        let to_target = self.target_position - self.position;
        let remaining = to_target.magnitude();

        let Some(direction) = to_target.normalize() else {
            return ArrivalStatus::Arrived;
        };

        if remaining <= self.speed {
            self.position = self.target_position;
            debug!(
                threat_id = self.id,
                target_x = self.target_position.x,
                target_y = self.target_position.y,
                target_z = self.target_position.z,
                distance_travelled = self.distance_travelled(),
                "THREAT_ARRIVED: 脅威が目標に到達しました"
            );
            return ArrivalStatus::Arrived;
        }

        self.position = self.position + direction * self.speed;
        ArrivalStatus::InFlight
    }

    fn get_position(&self) -> Position3D {
        self.position
    }
}

/// 全脅威を1ステップ進め、到達した脅威のIDを返す
pub fn advance_all(threats: &mut [InboundThreat]) -> Vec<ThreatId> {
    threats
        .iter_mut()
        .filter_map(|threat| match threat.advance() {
            ArrivalStatus::Arrived => Some(threat.id),
            ArrivalStatus::InFlight => None,
        })
        .collect()
}

/// IDで脅威を削除し、削除できたかを返す
pub fn remove_by_id(threats: &mut Vec<InboundThreat>, id: ThreatId) -> bool {
    match threats.iter().position(|t| t.id == id) {
        Some(index) => {
            threats.remove(index);
            true
        }
        None => false,
    }
}
