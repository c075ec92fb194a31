use std::fmt;

use crate::models::{
    common::{DetectionId, Position3D, ThreatId, constants},
    target::{self, ProtectedTarget},
    threat::InboundThreat,
    traits::ISensor,
};
use tracing::{debug, trace};

/// 脅威記録
///
/// スキャンごとに再生成される一時的な記録で、生成後は変更されません。
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatRecord {
    /// 探知ID（プロセス内で単調増加、再利用なし）
    pub detection_id: DetectionId,
    /// 発生源の脅威ID
    pub source_id: ThreatId,
    /// 解決された目標名（解決できなければ "Unknown"）
    pub target_name: String,
    /// 目標までの3次元距離
    pub distance_to_target: f64,
    /// 脅威の速度
    pub speed: f64,
    /// 探知時点の脅威位置
    pub position: Position3D,
}

impl ThreatRecord {
    /// 目標名が解決できたかどうか
    pub fn is_resolved(&self) -> bool {
        self.target_name != constants::UNKNOWN_TARGET
    }
}

impl fmt::Display for ThreatRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Threat #{} (Enemy {}) -> {} Distance: {} Speed: {}",
            self.detection_id,
            self.source_id,
            self.target_name,
            self.distance_to_target as i64,
            self.speed as i64,
        )
    }
}

/// 探知統計情報
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionStats {
    /// 実行したスキャン数
    pub total_scans: u64,
    /// 生成した脅威記録の総数
    pub total_records: u64,
    /// 目標名を解決できなかった記録数
    pub unresolved_records: u64,
}

/// 探知システム
///
/// 脅威を毎サイクル走査し、目標との対応付けと距離計算を行います。
/// 探知IDカウンタはインスタンスが所有し、リセットされません。
#[derive(Debug, Clone)]
pub struct DetectionSystem {
    /// 探知範囲（この距離未満を報告）
    pub detection_range: f64,
    /// 最後に払い出した探知ID
    last_detection_id: DetectionId,
    stats: DetectionStats,
}

impl Default for DetectionSystem {
    fn default() -> Self {
        Self::new(constants::DETECTION_RANGE)
    }
}

impl DetectionSystem {
    pub fn new(detection_range: f64) -> Self {
        Self {
            detection_range,
            last_detection_id: 0,
            stats: DetectionStats::default(),
        }
    }

    /// 最後に払い出した探知ID（未払い出しなら0）
    pub fn last_detection_id(&self) -> DetectionId {
        self.last_detection_id
    }

    pub fn stats(&self) -> &DetectionStats {
        &self.stats
    }

    /// 脅威の目標名を解決
    ///
    /// 目標識別子で検索し、見つからなければ位置の完全一致で検索します。
    pub fn resolve_target_name(threat: &InboundThreat, targets: &[ProtectedTarget]) -> String {
        threat
            .target_id
            .and_then(|id| target::find_by_id(targets, id))
            .or_else(|| target::find_by_position(targets, &threat.target_position))
            .map(|t| t.name.clone())
            .unwrap_or_else(|| constants::UNKNOWN_TARGET.to_string())
    }

    fn next_detection_id(&mut self) -> DetectionId {
        self.last_detection_id += 1;
        self.last_detection_id
    }
}

impl ISensor for DetectionSystem {
    /// 脅威のスキャン（入力順に記録を生成）
    fn scan(&mut self, threats: &[InboundThreat], targets: &[ProtectedTarget]) -> Vec<ThreatRecord> {
        let mut records = Vec::new();
        self.stats.total_scans += 1;

        for threat in threats {
            let target_name = Self::resolve_target_name(threat, targets);
            let distance = threat.distance_to_target();

            if distance >= self.detection_range {
                trace!(
                    threat_id = threat.id,
                    distance,
                    detection_range = self.detection_range,
                    "THREAT_OUT_OF_RANGE: 探知範囲外の脅威"
                );
                continue;
            }

            let record = ThreatRecord {
                detection_id: self.next_detection_id(),
                source_id: threat.id,
                target_name,
                distance_to_target: distance,
                speed: threat.speed,
                position: threat.position,
            };

            if !record.is_resolved() {
                self.stats.unresolved_records += 1;
            }

            debug!(
                detection_id = record.detection_id,
                threat_id = record.source_id,
                target_name = %record.target_name,
                distance_to_target = record.distance_to_target,
                position_x = record.position.x,
                position_y = record.position.y,
                position_z = record.position.z,
                "THREAT_DETECTED: 脅威を探知しました"
            );

            records.push(record);
        }

        self.stats.total_records += records.len() as u64;
        records
    }

    fn get_detection_range(&self) -> f64 {
        self.detection_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn us_targets() -> Vec<ProtectedTarget> {
        vec![
            ProtectedTarget::new(1, "New York", Position3D::new(-74.0, 40.7, 0.0)),
            ProtectedTarget::new(2, "Washington DC", Position3D::new(-77.0, 38.9, 0.0)),
            ProtectedTarget::new(3, "Pyongyang", Position3D::new(127.5, 39.0, 0.0)),
        ]
    }

    #[test]
    fn test_threat_within_range_is_reported() {
        let targets = us_targets();
        let threats = vec![InboundThreat::new(
            101,
            Position3D::new(5000.0, 3000.0, 0.0),
            Position3D::new(127.5, 39.0, 0.0),
            50.0,
        )];
        let mut radar = DetectionSystem::default();

        let records = radar.scan(&threats, &targets);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.source_id, 101);
        assert_eq!(record.target_name, "Pyongyang");
        assert!((record.distance_to_target - 5701.65).abs() < 0.01);
        assert_eq!(record.speed, 50.0);
        assert_eq!(record.position, Position3D::new(5000.0, 3000.0, 0.0));
    }

    #[test]
    fn test_threat_beyond_range_is_not_reported() {
        let targets = us_targets();
        let threats = vec![
            InboundThreat::new(1, Position3D::new(15000.0, 0.0, 0.0), Position3D::new(0.0, 0.0, 0.0), 50.0),
            InboundThreat::new(2, Position3D::new(10000.0, 0.0, 0.0), Position3D::new(0.0, 0.0, 0.0), 50.0),
        ];
        let mut radar = DetectionSystem::default();

        assert!(radar.scan(&threats, &targets).is_empty());
        assert_eq!(radar.last_detection_id(), 0);
    }

    #[test]
    fn test_unmatched_target_resolves_to_unknown() {
        let targets = us_targets();
        let threats = vec![InboundThreat::new(
            5,
            Position3D::new(100.0, 0.0, 0.0),
            Position3D::new(1.0, 2.0, 3.0),
            10.0,
        )];
        let mut radar = DetectionSystem::default();

        let records = radar.scan(&threats, &targets);
        assert_eq!(records[0].target_name, "Unknown");
        assert!(!records[0].is_resolved());
        assert_eq!(radar.stats().unresolved_records, 1);
    }

    #[test]
    fn test_target_id_resolves_despite_position_drift() {
        let targets = us_targets();
        let mut threat = InboundThreat::toward(9, Position3D::new(100.0, 0.0, 0.0), &targets[1], 10.0);
        threat.target_position.x += 1e-9;

        let mut radar = DetectionSystem::default();
        let records = radar.scan(&[threat], &targets);
        assert_eq!(records[0].target_name, "Washington DC");
    }

    #[test]
    fn test_detection_ids_strictly_increase_across_scans() {
        let targets = us_targets();
        let threats = vec![
            InboundThreat::toward(101, Position3D::new(5000.0, 3000.0, 0.0), &targets[0], 50.0),
            InboundThreat::toward(102, Position3D::new(6000.0, 4000.0, 0.0), &targets[1], 75.0),
        ];
        let mut radar = DetectionSystem::default();

        let mut last_seen = 0;
        for _ in 0..5 {
            let records = radar.scan(&threats, &targets);
            assert_eq!(records.len(), 2);
            for record in records {
                assert!(record.detection_id > last_seen);
                last_seen = record.detection_id;
            }
        }
        assert_eq!(radar.stats().total_scans, 5);
        assert_eq!(radar.stats().total_records, 10);
    }

    #[test]
    fn test_records_follow_input_order() {
        let targets = us_targets();
        let threats = vec![
            InboundThreat::toward(3, Position3D::new(900.0, 0.0, 0.0), &targets[0], 1.0),
            InboundThreat::toward(1, Position3D::new(100.0, 0.0, 0.0), &targets[0], 1.0),
        ];
        let mut radar = DetectionSystem::default();
        let ids: Vec<_> = radar.scan(&threats, &targets).iter().map(|r| r.source_id).collect();
        assert_eq!(ids, vec![3, 1]);
    }
}
