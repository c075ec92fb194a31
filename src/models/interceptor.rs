use std::fmt;
use std::thread;
use std::time::Duration;

use crate::error::EngageError;
use crate::models::common::{InterceptorId, Position3D, constants};
use tracing::{debug, info, warn};

/// 迎撃ミサイルのライフサイクル状態
///
/// Available → Committed → Consumed の一方向にのみ遷移します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptorState {
    /// インベントリ内で待機中
    Available,
    /// 発射済み（飛翔中）
    Committed,
    /// 飛翔完了、インベントリから除去済み
    Consumed,
}

/// 飛翔シミュレーションの設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightProfile {
    /// 離散ステップ数
    pub steps: u32,
    /// 弾道頂点の上昇量
    pub max_altitude: f64,
    /// ステップ間の待機時間
    pub step_delay: Duration,
}

impl Default for FlightProfile {
    fn default() -> Self {
        Self {
            steps: constants::FLIGHT_STEPS,
            max_altitude: constants::MAX_ALTITUDE,
            step_delay: Duration::from_millis(constants::FLIGHT_STEP_DELAY_MS),
        }
    }
}

impl FlightProfile {
    /// 待機なしの設定（テスト・バッチ実行用）
    pub fn instant() -> Self {
        Self {
            step_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// ステップiにおける弾道上の位置
    ///
    /// XYは線形補間、高度は t(1-t) の放物線で中間点が頂点になります。
    pub fn position_at(&self, initial: &Position3D, target: &Position3D, step: u32) -> Position3D {
        let t = f64::from(step) / f64::from(self.steps);
        let mut position = initial.lerp_xy(target, t);
        position.z = initial.z + 4.0 * self.max_altitude * t * (1.0 - t);
        position
    }
}

/// 飛翔結果
#[derive(Debug, Clone)]
pub struct FlightReport {
    /// 消費された迎撃ミサイル（最終状態）
    pub interceptor: Interceptor,
    /// 発射位置
    pub start: Position3D,
    /// 目標位置
    pub target: Position3D,
    /// 発射位置から目標位置までの直線距離
    pub total_distance: f64,
    /// 各ステップでの位置
    pub trajectory: Vec<Position3D>,
}

impl FlightReport {
    /// 弾道の最高到達高度
    pub fn apex_altitude(&self) -> f64 {
        self.trajectory
            .iter()
            .map(|p| p.z)
            .fold(self.start.z, f64::max)
    }
}

/// 迎撃ミサイル
///
/// 一度だけ発射可能な防御資産です。発射後は目標点まで固定弾道で飛翔し、
/// インベントリから永久に除去されます。
#[derive(Debug, Clone, PartialEq)]
pub struct Interceptor {
    pub id: InterceptorId,
    /// 弾頭威力
    pub payload: u32,
    pub name: String,
    pub speed: f64,
    pub position: Position3D,
    pub state: InterceptorState,
}

impl Interceptor {
    pub fn new(
        id: InterceptorId,
        payload: u32,
        name: impl Into<String>,
        speed: f64,
        position: Position3D,
    ) -> Self {
        Self {
            id,
            payload,
            name: name.into(),
            speed,
            position,
            state: InterceptorState::Available,
        }
    }

    /// 発射済みかどうか
    pub fn is_launched(&self) -> bool {
        self.state != InterceptorState::Available
    }

    /// 目標位置への飛翔を実行（同期・ブロッキング）
    ///
    /// 発射済みの迎撃ミサイルに対しては状態を変更せずにエラーを返します。
    /// 飛翔完了後の位置は目標位置と完全に一致します。インベントリからの
    /// 除去と消費状態への遷移は呼び出し側が行います。
    pub fn fly_to(&mut self, target: Position3D, profile: &FlightProfile) -> Result<FlightReport, EngageError> {
        if self.is_launched() {
            warn!(
                interceptor_id = self.id,
                interceptor_name = %self.name,
                state = ?self.state,
                "INTERCEPTOR_DOUBLE_LAUNCH: 発射済みの迎撃ミサイルは再発射できません"
            );
            return Err(EngageError::AlreadyLaunched(self.id));
        }

        self.state = InterceptorState::Committed;

        let start = self.position;
        let total_distance = start.distance_3d(&target);

        info!(
            interceptor_id = self.id,
            interceptor_name = %self.name,
            speed = self.speed,
            launch_position_x = start.x,
            launch_position_y = start.y,
            launch_position_z = start.z,
            target_position_x = target.x,
            target_position_y = target.y,
            target_position_z = target.z,
            total_distance,
            "INTERCEPTOR_LAUNCHED: 迎撃ミサイルが発射されました"
        );

        let mut trajectory = Vec::with_capacity(profile.steps as usize);
        for step in 1..=profile.steps {
            self.position = profile.position_at(&start, &target, step);
            trajectory.push(self.position);

            debug!(
                interceptor_id = self.id,
                step,
                steps = profile.steps,
                progress = f64::from(step) / f64::from(profile.steps) * 100.0,
                position_x = self.position.x,
                position_y = self.position.y,
                altitude = self.position.z,
                remaining_distance = self.position.distance_3d(&target),
                "INTERCEPTOR_IN_FLIGHT: 迎撃ミサイル飛翔中"
            );

            if !profile.step_delay.is_zero() {
                thread::sleep(profile.step_delay);
            }
        }

        // 補間誤差を除去
        self.position = target;

        Ok(FlightReport {
            interceptor: self.clone(),
            start,
            target,
            total_distance,
            trajectory,
        })
    }

    /// 消費状態へ遷移
    pub(crate) fn mark_consumed(&mut self) {
        self.state = InterceptorState::Consumed;
    }
}

impl fmt::Display for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Missile #{} ({}) at {} speed {} m/s",
            self.id, self.name, self.position, self.speed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patriot() -> Interceptor {
        Interceptor::new(1, 100, "Patriot", 80.0, Position3D::new(100.0, 50.0, 0.0))
    }

    #[test]
    fn test_flight_ends_exactly_on_target() {
        let mut interceptor = patriot();
        let target = Position3D::new(127.5, 39.0, 0.0);

        let report = interceptor.fly_to(target, &FlightProfile::instant()).unwrap();
        assert_eq!(interceptor.position, target);
        assert_eq!(report.interceptor.position, target);
        assert_eq!(report.trajectory.len(), 20);
        assert_eq!(interceptor.state, InterceptorState::Committed);
    }

    #[test]
    fn test_flight_arc_peaks_at_midpoint() {
        let mut interceptor = patriot();
        let target = Position3D::new(2100.0, 50.0, 0.0);

        let report = interceptor.fly_to(target, &FlightProfile::instant()).unwrap();
        let midpoint = report.trajectory[9];
        assert!((midpoint.z - 500.0).abs() < 1e-9);
        assert!((midpoint.x - 1100.0).abs() < 1e-9);
        assert!((report.apex_altitude() - 500.0).abs() < 1e-9);

        let last = report.trajectory[19];
        assert!(last.z.abs() < 1e-9);
        assert!((report.total_distance - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_arc_starts_from_initial_altitude() {
        let profile = FlightProfile::instant();
        let start = Position3D::new(0.0, 0.0, 30.0);
        let target = Position3D::new(100.0, 0.0, 0.0);
        assert_eq!(profile.position_at(&start, &target, 0).z, 30.0);
        let quarter = profile.position_at(&start, &target, 5);
        assert!((quarter.z - (30.0 + 4.0 * 500.0 * 0.25 * 0.75)).abs() < 1e-9);
    }

    #[test]
    fn test_double_launch_is_rejected_without_state_change() {
        let mut interceptor = patriot();
        let first_target = Position3D::new(500.0, 500.0, 0.0);
        interceptor.fly_to(first_target, &FlightProfile::instant()).unwrap();

        let result = interceptor.fly_to(Position3D::new(0.0, 0.0, 0.0), &FlightProfile::instant());
        assert_eq!(result.unwrap_err(), EngageError::AlreadyLaunched(1));
        assert_eq!(interceptor.position, first_target);
        assert_eq!(interceptor.state, InterceptorState::Committed);
    }

    #[test]
    fn test_display_status_line() {
        let line = patriot().to_string();
        assert!(line.contains("Missile #1 (Patriot)"));
    }
}
