use std::cmp::Ordering;
use std::fmt;

use crate::error::ConfigError;
use crate::models::{common::constants, detection::ThreatRecord};

/// 自動迎撃ポリシー
///
/// 使用数は常に上限以下に保たれます。使用数はプロセス全体で累積し、
/// `reset_usage` でのみ0に戻ります。
#[derive(Debug, Clone, PartialEq)]
pub struct AutonomyPolicy {
    enabled: bool,
    threshold: f64,
    max_committed: u32,
    used: u32,
}

impl Default for AutonomyPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: constants::DEFAULT_AUTO_THRESHOLD,
            max_committed: constants::DEFAULT_MAX_AUTO_COMMITTED,
            used: 0,
        }
    }
}

impl AutonomyPolicy {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn max_committed(&self) -> u32 {
        self.max_committed
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    /// 残りの自動迎撃可能数
    pub fn remaining(&self) -> u32 {
        self.max_committed.saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max_committed
    }

    /// 設定の更新
    ///
    /// 不正な値が含まれる場合は何も変更せずにエラーを返します。
    /// 上限を使用数より小さくした場合、使用数は上限に切り詰められます。
    pub fn configure(
        &mut self,
        enabled: bool,
        threshold: Option<f64>,
        max_committed: Option<u32>,
    ) -> Result<(), ConfigError> {
        if let Some(threshold) = threshold {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(ConfigError::InvalidThreshold(threshold));
            }
        }
        if let Some(max) = max_committed {
            if max == 0 {
                return Err(ConfigError::InvalidMaxCommitted(max));
            }
        }

        self.enabled = enabled;
        if let Some(threshold) = threshold {
            self.threshold = threshold;
        }
        if let Some(max) = max_committed {
            self.max_committed = max;
            self.used = self.used.min(max);
        }
        Ok(())
    }

    /// 距離閾値以内かどうか
    pub fn is_eligible(&self, record: &ThreatRecord) -> bool {
        record.distance_to_target <= self.threshold
    }

    /// 使用数を1つ進める（上限到達時は何もしない）
    pub(crate) fn record_commit(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn reset_usage(&mut self) {
        self.used = 0;
    }
}

/// 脅威記録を目標までの距離の昇順に並べる（同距離は入力順）
pub fn prioritize(records: &[ThreatRecord]) -> Vec<&ThreatRecord> {
    let mut ordered: Vec<&ThreatRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        a.distance_to_target
            .partial_cmp(&b.distance_to_target)
            .unwrap_or(Ordering::Equal)
    });
    ordered
}

/// 自動迎撃の状態（表示用スナップショット）
#[derive(Debug, Clone, PartialEq)]
pub struct AutonomyStatus {
    pub enabled: bool,
    pub threshold: f64,
    pub max_committed: u32,
    pub used: u32,
    pub remaining: u32,
    pub available_interceptors: usize,
}

impl fmt::Display for AutonomyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Auto-Intercept: {}", if self.enabled { "ENABLED" } else { "DISABLED" })?;
        writeln!(f, "  Threshold: {}", self.threshold)?;
        writeln!(f, "  Used: {}/{} (remaining {})", self.used, self.max_committed, self.remaining)?;
        write!(f, "  Available interceptors: {}", self.available_interceptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::Position3D;

    fn record(source_id: u32, distance: f64) -> ThreatRecord {
        ThreatRecord {
            detection_id: u64::from(source_id),
            source_id,
            target_name: "New York".to_string(),
            distance_to_target: distance,
            speed: 50.0,
            position: Position3D::default(),
        }
    }

    #[test]
    fn test_defaults() {
        let policy = AutonomyPolicy::default();
        assert!(!policy.enabled());
        assert_eq!(policy.threshold(), 2000.0);
        assert_eq!(policy.max_committed(), 3);
        assert_eq!(policy.used(), 0);
    }

    #[test]
    fn test_invalid_configuration_keeps_previous_values() {
        let mut policy = AutonomyPolicy::default();
        policy.configure(true, Some(1500.0), Some(4)).unwrap();

        assert_eq!(
            policy.configure(false, Some(0.0), None),
            Err(ConfigError::InvalidThreshold(0.0))
        );
        assert_eq!(
            policy.configure(false, Some(-5.0), Some(2)),
            Err(ConfigError::InvalidThreshold(-5.0))
        );
        assert_eq!(
            policy.configure(false, None, Some(0)),
            Err(ConfigError::InvalidMaxCommitted(0))
        );
        assert!(policy.configure(false, Some(f64::NAN), None).is_err());

        assert!(policy.enabled());
        assert_eq!(policy.threshold(), 1500.0);
        assert_eq!(policy.max_committed(), 4);
    }

    #[test]
    fn test_usage_never_exceeds_max() {
        let mut policy = AutonomyPolicy::default();
        policy.configure(true, None, Some(2)).unwrap();

        assert!(policy.record_commit());
        assert!(policy.record_commit());
        assert!(!policy.record_commit());
        assert_eq!(policy.used(), 2);
        assert!(policy.is_exhausted());

        policy.configure(true, None, Some(1)).unwrap();
        assert_eq!(policy.used(), 1);

        policy.reset_usage();
        assert_eq!(policy.remaining(), 1);
    }

    #[test]
    fn test_prioritize_is_stable_by_distance() {
        let records = vec![record(1, 300.0), record(2, 1800.0), record(3, 50.0), record(4, 300.0)];
        let ids: Vec<_> = prioritize(&records).iter().map(|r| r.source_id).collect();
        assert_eq!(ids, vec![3, 1, 4, 2]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let policy = AutonomyPolicy::default();
        assert!(policy.is_eligible(&record(1, 2000.0)));
        assert!(!policy.is_eligible(&record(2, 2000.5)));
    }
}
