//! # Simulation モジュール
//!
//! 迎撃シミュレーションの交戦ループを提供します。
//!
//! 単一スレッドの協調モデルで、各サイクルは以下の順序で厳密に逐次実行されます：
//!
//! 1. **脅威移動**: 全脅威を1ステップ進め、目標に到達した脅威を退役させる
//! 2. **探知**: 探知システムで脅威記録を生成
//! 3. **自動迎撃**: 自動迎撃が有効なら1発だけ迎撃し、迎撃した脅威を除去
//! 4. **再探知**: 迎撃後の状況で脅威記録を再生成（描画用）
//!
//! 迎撃ミサイルの飛翔はブロッキングで実行され、その間は他の脅威は移動しません。
//! ライブ実行は固定周期で繰り返され、各サイクルの先頭でキャンセルフラグを確認します。
//!
//! ## 使用例
//!
//! ```no_run
//! use pdsim::scenario::ScenarioConfig;
//! use pdsim::simulation::{CancellationFlag, SimulationEngine};
//!
//! let scenario = ScenarioConfig::default_roster();
//! let mut engine = SimulationEngine::from_scenario(&scenario).expect("初期化に失敗");
//! let cancel = CancellationFlag::new();
//! engine.run_live(&cancel, scenario.engagement.tick(), Some(10));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ConfigError, EngageError};
use crate::models::{
    threat, target, DetectionSystem, FlightReport, IAllocator, ISensor, InboundThreat,
    Interceptor, InterceptorController, InterceptorId, ProtectedTarget, TargetId, ThreatId,
    ThreatRecord,
};
use crate::scenario::ScenarioConfig;
use tracing::{debug, info, warn};

/// スリープ中にキャンセルを確認する間隔
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// ライブループの明示的なキャンセルフラグ
///
/// 別スレッド（シグナルハンドラ等）から `cancel` され、ループは各サイクルの
/// 先頭とスリープ中に確認します。
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 交戦統計
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngagementStats {
    /// 実行したサイクル数
    pub cycles: u64,
    /// 迎撃した脅威数
    pub threats_intercepted: u32,
    /// 目標に到達した脅威数
    pub threats_arrived: u32,
    /// 消費した迎撃ミサイル数
    pub interceptors_expended: u32,
}

/// 1サイクルの結果
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    /// このサイクルで目標に到達した脅威
    pub arrived: Vec<ThreatId>,
    /// このサイクルで自動迎撃した脅威
    pub intercepted: Vec<ThreatId>,
    /// 迎撃後の脅威記録（描画用）
    pub threats: Vec<ThreatRecord>,
}

/// ライブ実行の終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// キャンセルされた
    Cancelled,
    /// 指定サイクル数に到達した
    CycleLimit,
    /// 脅威がすべて除去された
    AllThreatsCleared,
}

/// 交戦ループを駆動するシミュレーションエンジン
pub struct SimulationEngine {
    pub threats: Vec<InboundThreat>,
    pub targets: Vec<ProtectedTarget>,
    pub strike_targets: Vec<ProtectedTarget>,
    pub radar: DetectionSystem,
    pub controller: InterceptorController,
    pub stats: EngagementStats,
}

impl SimulationEngine {
    pub fn new(
        threats: Vec<InboundThreat>,
        targets: Vec<ProtectedTarget>,
        radar: DetectionSystem,
        controller: InterceptorController,
    ) -> Self {
        Self {
            threats,
            targets,
            strike_targets: Vec::new(),
            radar,
            controller,
            stats: EngagementStats::default(),
        }
    }

    /// シナリオから初期状態を構築
    pub fn from_scenario(scenario: &ScenarioConfig) -> Result<Self, ConfigError> {
        let to_target = |t: &crate::scenario::TargetConfig| {
            ProtectedTarget::new(t.id, t.name.clone(), t.position.into())
        };
        let targets: Vec<ProtectedTarget> = scenario.protected_targets.iter().map(to_target).collect();
        let strike_targets = scenario.strike_targets.iter().map(to_target).collect();

        let mut controller = InterceptorController::new(scenario.engagement.flight_profile());
        for config in &scenario.interceptors {
            let interceptor = Interceptor::new(
                config.id,
                config.payload,
                config.name.clone(),
                config.speed,
                config.position.into(),
            );
            if let Err(e) = controller.add_interceptor(interceptor) {
                warn!(
                    interceptor_id = config.id,
                    error = %e,
                    "SCENARIO_INTERCEPTOR_SKIPPED: 迎撃ミサイルを配備できませんでした"
                );
            }
        }
        controller.configure_autonomy(
            scenario.autonomy.enabled,
            Some(scenario.autonomy.threshold),
            Some(scenario.autonomy.max_committed),
        )?;

        let threats = scenario
            .threats
            .iter()
            .map(|config| match targets.iter().find(|t| t.id == config.target_id) {
                Some(target) => InboundThreat::toward(config.id, config.start.into(), target, config.speed),
                None => {
                    warn!(
                        threat_id = config.id,
                        target_id = config.target_id,
                        "THREAT_TARGET_UNKNOWN: 目標が見つからないため原点を目標とします"
                    );
                    InboundThreat::new(config.id, config.start.into(), Default::default(), config.speed)
                }
            })
            .collect();

        info!(
            scenario = %scenario.meta.name,
            protected_targets = targets.len(),
            interceptors = controller.available_count(),
            autonomy_enabled = scenario.autonomy.enabled,
            "SIMULATION_INITIALIZED: シミュレーションを初期化しました"
        );

        let mut engine = Self::new(
            threats,
            targets,
            DetectionSystem::new(scenario.engagement.detection_range),
            controller,
        );
        engine.strike_targets = strike_targets;
        Ok(engine)
    }

    /// 全脅威を1ステップ進め、到達した脅威を除去
    pub fn advance_all(&mut self) -> Vec<ThreatId> {
        let arrived = threat::advance_all(&mut self.threats);
        for id in &arrived {
            threat::remove_by_id(&mut self.threats, *id);
            warn!(threat_id = id, "THREAT_LEAKED: 脅威が目標に到達しました");
        }
        self.stats.threats_arrived += arrived.len() as u32;
        arrived
    }

    /// 現在の脅威をスキャン
    pub fn scan(&mut self) -> Vec<ThreatRecord> {
        self.radar.scan(&self.threats, &self.targets)
    }

    /// 脅威記録に対する手動迎撃
    pub fn manual_intercept(&mut self, record: &ThreatRecord) -> Option<ThreatId> {
        let source_id = self.controller.manual_intercept(record)?;
        self.retire_intercepted(&[source_id]);
        Some(source_id)
    }

    /// 攻撃目標に向けて迎撃ミサイルを直接発射
    pub fn strike(
        &mut self,
        interceptor_id: InterceptorId,
        target_id: TargetId,
    ) -> Result<FlightReport, EngageError> {
        let strike_target = target::find_by_id(&self.strike_targets, target_id)
            .ok_or(EngageError::TargetNotFound(target_id))?;
        let (name, position) = (strike_target.name.clone(), strike_target.position);

        let report = self.controller.launch_interceptor(interceptor_id, position)?;
        self.stats.interceptors_expended += 1;
        info!(
            interceptor_id,
            target_id,
            target_name = %name,
            "STRIKE_COMPLETED: 攻撃目標への発射が完了しました"
        );
        Ok(report)
    }

    fn retire_intercepted(&mut self, ids: &[ThreatId]) {
        for id in ids {
            self.stats.interceptors_expended += 1;
            if threat::remove_by_id(&mut self.threats, *id) {
                self.stats.threats_intercepted += 1;
            } else {
                warn!(threat_id = id, "THREAT_REMOVE_FAILED: 迎撃した脅威が見つかりません");
            }
        }
    }

    /// 1サイクル実行（移動 → 探知 → 自動迎撃 → 再探知）
    pub fn step(&mut self) -> CycleReport {
        self.stats.cycles += 1;
        let cycle = self.stats.cycles;

        let arrived = self.advance_all();
        let mut threats = self.scan();

        let mut intercepted = Vec::new();
        if !threats.is_empty() && self.controller.autonomy().enabled() {
            intercepted = self.controller.auto_intercept(&threats);
            if !intercepted.is_empty() {
                self.retire_intercepted(&intercepted);
                threats = self.scan();
            }
        }

        debug!(
            cycle,
            remaining_threats = self.threats.len(),
            detected = threats.len(),
            intercepted = intercepted.len(),
            arrived = arrived.len(),
            "CYCLE_COMPLETE: サイクル完了"
        );

        CycleReport {
            cycle,
            arrived,
            intercepted,
            threats,
        }
    }

    /// 固定周期でサイクルを繰り返す
    ///
    /// 各サイクルの先頭でキャンセルを確認します。`max_cycles` を指定すると
    /// その回数で終了し、脅威がなくなった場合も終了します。
    pub fn run_live(
        &mut self,
        cancel: &CancellationFlag,
        tick: Duration,
        max_cycles: Option<u64>,
    ) -> StopReason {
        self.run_live_with(cancel, tick, max_cycles, |_, _| {})
    }

    /// `run_live` と同じだが、各サイクル後に描画コールバックを呼ぶ
    pub fn run_live_with<F>(
        &mut self,
        cancel: &CancellationFlag,
        tick: Duration,
        max_cycles: Option<u64>,
        mut render: F,
    ) -> StopReason
    where
        F: FnMut(&SimulationEngine, &CycleReport),
    {
        info!(
            autonomy_enabled = self.controller.autonomy().enabled(),
            tick_ms = tick.as_millis() as u64,
            "LIVE_VIEW_STARTED: ライブ実行を開始します"
        );

        let mut executed = 0u64;
        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if max_cycles.is_some_and(|max| executed >= max) {
                break StopReason::CycleLimit;
            }
            if self.threats.is_empty() {
                break StopReason::AllThreatsCleared;
            }

            let started = Instant::now();
            let report = self.step();
            render(&*self, &report);
            executed += 1;

            sleep_unless_cancelled(cancel, tick.saturating_sub(started.elapsed()));
        };

        info!(
            reason = ?reason,
            cycles = self.stats.cycles,
            threats_intercepted = self.stats.threats_intercepted,
            threats_arrived = self.stats.threats_arrived,
            interceptors_expended = self.stats.interceptors_expended,
            "LIVE_VIEW_STOPPED: ライブ実行を終了しました"
        );
        reason
    }
}

/// キャンセルを確認しながら待機
fn sleep_unless_cancelled(cancel: &CancellationFlag, duration: Duration) {
    let deadline = Instant::now() + duration;
    while !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(CANCEL_POLL_INTERVAL.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlightProfile, Position3D};

    fn engine(autonomy: bool) -> SimulationEngine {
        let mut scenario = ScenarioConfig::default_roster();
        scenario.engagement.flight_step_delay_ms = 0;
        scenario.autonomy.enabled = autonomy;
        SimulationEngine::from_scenario(&scenario).unwrap()
    }

    #[test]
    fn test_from_scenario_builds_roster() {
        let engine = engine(false);
        assert_eq!(engine.threats.len(), 3);
        assert_eq!(engine.targets.len(), 3);
        assert_eq!(engine.strike_targets.len(), 3);
        assert_eq!(engine.controller.available_count(), 5);
        assert_eq!(engine.threats[0].target_id, Some(1));
    }

    #[test]
    fn test_step_without_autonomy_only_detects() {
        let mut engine = engine(false);
        let report = engine.step();

        assert_eq!(report.threats.len(), 3);
        assert!(report.intercepted.is_empty());
        assert_eq!(engine.controller.available_count(), 5);
        assert_eq!(report.threats[0].target_name, "New York");
    }

    #[test]
    fn test_autonomy_engages_once_threats_close_in() {
        let mut scenario = ScenarioConfig::default_roster();
        scenario.engagement.flight_step_delay_ms = 0;
        scenario.autonomy.enabled = true;
        scenario.threats.truncate(1);
        scenario.threats[0].start.x = 1000.0;
        scenario.threats[0].start.y = 40.7;
        let mut engine = SimulationEngine::from_scenario(&scenario).unwrap();

        let report = engine.step();
        assert_eq!(report.intercepted, vec![101]);
        assert!(engine.threats.is_empty());
        assert!(report.threats.is_empty());
        assert_eq!(engine.stats.threats_intercepted, 1);
        assert_eq!(engine.stats.interceptors_expended, 1);
        // 最速のStinger（ID 4）が使用される
        assert!(engine.controller.find_interceptor(4).is_none());
    }

    #[test]
    fn test_arrived_threats_are_retired() {
        let target = ProtectedTarget::new(1, "Base", Position3D::new(0.0, 0.0, 0.0));
        let threats = vec![InboundThreat::toward(1, Position3D::new(30.0, 0.0, 0.0), &target, 50.0)];
        let mut engine = SimulationEngine::new(
            threats,
            vec![target],
            DetectionSystem::default(),
            InterceptorController::new(FlightProfile::instant()),
        );

        let report = engine.step();
        assert_eq!(report.arrived, vec![1]);
        assert!(engine.threats.is_empty());
        assert_eq!(engine.stats.threats_arrived, 1);
    }

    #[test]
    fn test_manual_intercept_removes_threat() {
        let mut engine = engine(false);
        let records = engine.scan();
        let chosen = records[1].clone();

        assert_eq!(engine.manual_intercept(&chosen), Some(102));
        assert_eq!(engine.threats.len(), 2);
        assert!(engine.controller.find_interceptor(1).is_none());
    }

    #[test]
    fn test_strike_consumes_interceptor_at_target() {
        let mut engine = engine(false);

        let report = engine.strike(3, 12).unwrap();
        assert_eq!(report.interceptor.position, Position3D::new(37.6, 55.7, 0.0));
        assert!(engine.controller.find_interceptor(3).is_none());
        assert_eq!(engine.stats.interceptors_expended, 1);
        assert_eq!(engine.threats.len(), 3);

        assert_eq!(engine.strike(3, 12).unwrap_err(), EngageError::InterceptorNotFound(3));
        assert_eq!(engine.strike(1, 99).unwrap_err(), EngageError::TargetNotFound(99));
        assert_eq!(engine.controller.available_count(), 4);
    }

    #[test]
    fn test_run_live_stops_when_cancelled() {
        let mut engine = engine(false);
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let reason = engine.run_live(&cancel, Duration::ZERO, None);
        assert_eq!(reason, StopReason::Cancelled);
        assert_eq!(engine.stats.cycles, 0);
    }

    #[test]
    fn test_run_live_cancel_from_render_callback() {
        let mut engine = engine(false);
        let cancel = CancellationFlag::new();
        let handle = cancel.clone();

        let reason = engine.run_live_with(&cancel, Duration::ZERO, None, |_, report| {
            if report.cycle == 3 {
                handle.cancel();
            }
        });
        assert_eq!(reason, StopReason::Cancelled);
        assert_eq!(engine.stats.cycles, 3);
    }

    #[test]
    fn test_run_live_respects_cycle_limit() {
        let mut engine = engine(false);
        let reason = engine.run_live(&CancellationFlag::new(), Duration::ZERO, Some(4));
        assert_eq!(reason, StopReason::CycleLimit);
        assert_eq!(engine.stats.cycles, 4);
    }

    #[test]
    fn test_run_live_with_autonomy_clears_or_exhausts() {
        let mut engine = engine(true);
        let reason = engine.run_live(&CancellationFlag::new(), Duration::ZERO, Some(500));

        // 上限3発のため、最大3つの脅威のみ迎撃される
        assert!(engine.stats.threats_intercepted <= 3);
        assert_eq!(engine.controller.autonomy().used(), engine.stats.threats_intercepted);
        assert_eq!(
            engine.stats.threats_intercepted + engine.stats.threats_arrived + engine.threats.len() as u32,
            3
        );
        assert_ne!(reason, StopReason::Cancelled);
    }
}
