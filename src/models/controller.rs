use crate::error::{ConfigError, EngageError};
use crate::models::{
    autonomy::{self, AutonomyPolicy, AutonomyStatus},
    common::{InterceptorId, Position3D, ThreatId},
    detection::ThreatRecord,
    interceptor::{FlightProfile, FlightReport, Interceptor},
    inventory::Inventory,
    traits::IAllocator,
};
use tracing::{debug, error, info, warn};

/// 発射の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// 迎撃ミサイルと目標点を直接指定した発射
    Direct,
    /// オペレーターが脅威を選択した迎撃
    Manual,
    /// 自動迎撃
    Auto,
}

/// 発射記録
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRecord {
    pub interceptor_id: InterceptorId,
    pub interceptor_name: String,
    pub target_position: Position3D,
    /// 飛翔完了時の迎撃ミサイル位置
    pub final_position: Position3D,
    /// 迎撃対象の脅威（直接発射の場合はNone）
    pub threat_id: Option<ThreatId>,
    pub mode: LaunchMode,
}

/// 迎撃管制
///
/// 迎撃ミサイルのインベントリと自動迎撃ポリシーを所有し、
/// 手動・自動の迎撃を実行します。飛翔は同期的に実行されるため、
/// 複数の発射は常に直列化されます。
#[derive(Debug, Clone, Default)]
pub struct InterceptorController {
    inventory: Inventory,
    autonomy: AutonomyPolicy,
    flight_profile: FlightProfile,
    launch_history: Vec<LaunchRecord>,
}

impl InterceptorController {
    pub fn new(flight_profile: FlightProfile) -> Self {
        Self {
            flight_profile,
            ..Self::default()
        }
    }

    pub fn flight_profile(&self) -> &FlightProfile {
        &self.flight_profile
    }

    // --- インベントリ操作 ---

    /// 迎撃ミサイルを追加（発射済みのものは拒否）
    pub fn add_interceptor(&mut self, interceptor: Interceptor) -> Result<(), EngageError> {
        let (id, state) = (interceptor.id, interceptor.state);
        self.inventory.add(interceptor).inspect_err(|e| {
            warn!(
                interceptor_id = id,
                state = ?state,
                error = %e,
                "INTERCEPTOR_ADD_REJECTED: 発射済みの迎撃ミサイルはインベントリに追加できません"
            );
        })
    }

    pub fn remove_interceptor(&mut self, id: InterceptorId) -> bool {
        self.inventory.remove(id)
    }

    pub fn find_interceptor(&self, id: InterceptorId) -> Option<&Interceptor> {
        self.inventory.find(id)
    }

    pub fn list_interceptors(&self) -> Vec<&Interceptor> {
        self.inventory.iter().collect()
    }

    pub fn available_count(&self) -> usize {
        self.inventory.len()
    }

    pub fn has_available(&self) -> bool {
        !self.inventory.is_empty()
    }

    pub fn launch_history(&self) -> &[LaunchRecord] {
        &self.launch_history
    }

    // --- 自動迎撃設定 ---

    pub fn autonomy(&self) -> &AutonomyPolicy {
        &self.autonomy
    }

    /// 自動迎撃の設定
    ///
    /// 不正な値は拒否され、以前の設定が維持されます。
    pub fn configure_autonomy(
        &mut self,
        enabled: bool,
        threshold: Option<f64>,
        max_committed: Option<u32>,
    ) -> Result<(), ConfigError> {
        if let Err(e) = self.autonomy.configure(enabled, threshold, max_committed) {
            warn!(error = %e, "AUTO_INTERCEPT_CONFIG_REJECTED: 自動迎撃設定を拒否しました");
            return Err(e);
        }

        info!(
            enabled = self.autonomy.enabled(),
            threshold = self.autonomy.threshold(),
            max_committed = self.autonomy.max_committed(),
            used = self.autonomy.used(),
            "AUTO_INTERCEPT_CONFIGURED: 自動迎撃設定を更新しました"
        );
        Ok(())
    }

    /// 自動迎撃の使用数をリセット
    pub fn reset_usage(&mut self) {
        self.autonomy.reset_usage();
        info!("AUTO_INTERCEPT_USAGE_RESET: 自動迎撃の使用数をリセットしました");
    }

    pub fn autonomy_status(&self) -> AutonomyStatus {
        AutonomyStatus {
            enabled: self.autonomy.enabled(),
            threshold: self.autonomy.threshold(),
            max_committed: self.autonomy.max_committed(),
            used: self.autonomy.used(),
            remaining: self.autonomy.remaining(),
            available_interceptors: self.available_count(),
        }
    }

    // --- 発射 ---

    /// 指定した迎撃ミサイルを目標点へ発射し、飛翔完了後にインベントリから除去
    pub fn launch_interceptor(
        &mut self,
        id: InterceptorId,
        target: Position3D,
    ) -> Result<FlightReport, EngageError> {
        self.launch(id, target, None, LaunchMode::Direct)
    }

    fn launch(
        &mut self,
        id: InterceptorId,
        target: Position3D,
        threat_id: Option<ThreatId>,
        mode: LaunchMode,
    ) -> Result<FlightReport, EngageError> {
        let profile = self.flight_profile;
        let interceptor = self
            .inventory
            .find_mut(id)
            .ok_or(EngageError::InterceptorNotFound(id))?;

        let mut report = interceptor.fly_to(target, &profile)?;

        match self.inventory.take(id) {
            Some(mut consumed) => {
                consumed.mark_consumed();
                report.interceptor = consumed;
            }
            None => {
                error!(
                    interceptor_id = id,
                    "INTERCEPTOR_REMOVE_FAILED: 迎撃ミサイルをインベントリから除去できませんでした"
                );
                report.interceptor.mark_consumed();
            }
        }

        info!(
            interceptor_id = id,
            interceptor_name = %report.interceptor.name,
            threat_id = ?threat_id,
            mode = ?mode,
            final_position_x = report.interceptor.position.x,
            final_position_y = report.interceptor.position.y,
            final_position_z = report.interceptor.position.z,
            remaining_interceptors = self.inventory.len(),
            "INTERCEPTOR_CONSUMED: 迎撃ミサイルが目標点に到達し消費されました"
        );

        self.launch_history.push(LaunchRecord {
            interceptor_id: id,
            interceptor_name: report.interceptor.name.clone(),
            target_position: target,
            final_position: report.interceptor.position,
            threat_id,
            mode,
        });

        Ok(report)
    }

    /// 自動迎撃の本体
    ///
    /// 距離の昇順で閾値以内の脅威を探し、最速の迎撃ミサイルで1発だけ迎撃します。
    /// 対象がなければOk(None)を返します。
    pub fn try_auto_intercept(
        &mut self,
        records: &[ThreatRecord],
    ) -> Result<Option<ThreatId>, EngageError> {
        if !self.autonomy.enabled() {
            return Err(EngageError::AutonomyDisabled);
        }
        if records.is_empty() {
            return Ok(None);
        }
        if self.inventory.is_empty() {
            return Err(EngageError::InventoryEmpty);
        }
        if self.autonomy.is_exhausted() {
            return Err(EngageError::BudgetExhausted {
                used: self.autonomy.used(),
                max: self.autonomy.max_committed(),
            });
        }

        let candidate = autonomy::prioritize(records)
            .into_iter()
            .find(|record| self.autonomy.is_eligible(record));

        let Some(record) = candidate else {
            debug!(
                threats = records.len(),
                threshold = self.autonomy.threshold(),
                "AUTO_INTERCEPT_NO_ELIGIBLE: 閾値以内の脅威はありません"
            );
            return Ok(None);
        };

        let interceptor_id = self
            .inventory
            .fastest()
            .map(|i| i.id)
            .ok_or(EngageError::InventoryEmpty)?;

        self.launch(interceptor_id, record.position, Some(record.source_id), LaunchMode::Auto)?;
        self.autonomy.record_commit();

        info!(
            threat_id = record.source_id,
            detection_id = record.detection_id,
            interceptor_id,
            distance_to_target = record.distance_to_target,
            used = self.autonomy.used(),
            max_committed = self.autonomy.max_committed(),
            "AUTO_INTERCEPT_COMMITTED: 自動迎撃を実行しました"
        );

        Ok(Some(record.source_id))
    }
}

impl IAllocator for InterceptorController {
    /// 自動迎撃（1回の呼び出しで最大1発）
    ///
    /// 無効・在庫切れ・上限到達の場合は何もせず空を返します。
    fn auto_intercept(&mut self, records: &[ThreatRecord]) -> Vec<ThreatId> {
        match self.try_auto_intercept(records) {
            Ok(committed) => committed.into_iter().collect(),
            Err(EngageError::AutonomyDisabled) => Vec::new(),
            Err(e @ EngageError::BudgetExhausted { .. }) => {
                warn!(error = %e, "AUTO_INTERCEPT_BUDGET_EXHAUSTED: 自動迎撃の使用上限に到達しています");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "AUTO_INTERCEPT_SKIPPED: 自動迎撃を実行できませんでした");
                Vec::new()
            }
        }
    }

    /// 先頭の迎撃ミサイルで指定の脅威を迎撃（最速ではない）
    fn manual_intercept(&mut self, record: &ThreatRecord) -> Option<ThreatId> {
        let Some(interceptor_id) = self.inventory.front().map(|i| i.id) else {
            warn!(
                threat_id = record.source_id,
                "MANUAL_INTERCEPT_NO_INTERCEPTOR: 利用可能な迎撃ミサイルがありません"
            );
            return None;
        };

        match self.launch(interceptor_id, record.position, Some(record.source_id), LaunchMode::Manual) {
            Ok(_) => Some(record.source_id),
            Err(e) => {
                warn!(error = %e, threat_id = record.source_id, "MANUAL_INTERCEPT_FAILED: 手動迎撃に失敗しました");
                None
            }
        }
    }
}
