use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::models::{self, FlightProfile, constants};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// 交戦ループ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngagementConfig {
    /// ライブビューの更新周期（ミリ秒）
    pub tick_ms: u64,
    /// 飛翔ステップ間の待機時間（ミリ秒）
    pub flight_step_delay_ms: u64,
    /// 飛翔ステップ数
    pub flight_steps: u32,
    /// 弾道頂点の上昇量
    pub max_altitude: f64,
    /// 探知範囲
    pub detection_range: f64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            tick_ms: constants::LIVE_TICK_MS,
            flight_step_delay_ms: constants::FLIGHT_STEP_DELAY_MS,
            flight_steps: constants::FLIGHT_STEPS,
            max_altitude: constants::MAX_ALTITUDE,
            detection_range: constants::DETECTION_RANGE,
        }
    }
}

impl EngagementConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn flight_profile(&self) -> FlightProfile {
        FlightProfile {
            steps: self.flight_steps,
            max_altitude: self.max_altitude,
            step_delay: Duration::from_millis(self.flight_step_delay_ms),
        }
    }
}

/// 自動迎撃設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AutonomyConfig {
    pub enabled: bool,
    pub threshold: f64,
    pub max_committed: u32,
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: constants::DEFAULT_AUTO_THRESHOLD,
            max_committed: constants::DEFAULT_MAX_AUTO_COMMITTED,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl From<Position3D> for models::Position3D {
    fn from(p: Position3D) -> Self {
        models::Position3D::new(p.x, p.y, p.z)
    }
}

/// 防護対象・攻撃目標設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    pub id: u32,
    pub name: String,
    pub position: Position3D,
}

/// 迎撃ミサイル設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InterceptorConfig {
    pub id: u32,
    pub name: String,
    pub payload: u32,
    pub speed: f64,
    pub position: Position3D,
}

/// 敵ミサイル設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThreatConfig {
    pub id: u32,
    pub start: Position3D,
    /// 防護対象のID
    pub target_id: u32,
    pub speed: f64,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    #[serde(default)]
    pub engagement: EngagementConfig,
    #[serde(default)]
    pub autonomy: AutonomyConfig,
    pub protected_targets: Vec<TargetConfig>,
    #[serde(default)]
    pub strike_targets: Vec<TargetConfig>,
    pub interceptors: Vec<InterceptorConfig>,
    pub threats: Vec<ThreatConfig>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::ParseError(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 組み込みのデフォルトシナリオ
    pub fn default_roster() -> Self {
        let pad_a = Position3D { x: 100.0, y: 50.0, z: 0.0 };
        let pad_b = Position3D { x: 200.0, y: 75.0, z: 0.0 };
        let interceptor = |id, name: &str, payload, speed, position| InterceptorConfig {
            id,
            name: name.to_string(),
            payload,
            speed,
            position,
        };
        let target = |id, name: &str, x, y| TargetConfig {
            id,
            name: name.to_string(),
            position: Position3D { x, y, z: 0.0 },
        };

        Self {
            meta: ScenarioMeta {
                version: "1.0".to_string(),
                name: "default".to_string(),
                description: "組み込みの標準迎撃シナリオ".to_string(),
            },
            engagement: EngagementConfig::default(),
            autonomy: AutonomyConfig::default(),
            protected_targets: vec![
                target(1, "New York", -74.0, 40.7),
                target(2, "Washington DC", -77.0, 38.9),
                target(3, "Los Angeles", -118.2, 34.0),
            ],
            strike_targets: vec![
                target(11, "Pyongyang", 127.5, 39.0),
                target(12, "Moscow", 37.6, 55.7),
                target(13, "Beijing", 116.4, 39.9),
            ],
            interceptors: vec![
                interceptor(1, "Patriot", 100, 80.0, pad_a),
                interceptor(2, "Patriot", 100, 80.0, pad_a),
                interceptor(3, "Tomahawk", 200, 100.0, pad_b),
                interceptor(4, "Stinger", 50, 120.0, pad_b),
                interceptor(5, "Javelin", 150, 90.0, pad_a),
            ],
            threats: vec![
                ThreatConfig { id: 101, start: Position3D { x: 5000.0, y: 3000.0, z: 0.0 }, target_id: 1, speed: 50.0 },
                ThreatConfig { id: 102, start: Position3D { x: 6000.0, y: 4000.0, z: 0.0 }, target_id: 2, speed: 75.0 },
                ThreatConfig { id: 103, start: Position3D { x: 4500.0, y: 2500.0, z: 0.0 }, target_id: 3, speed: 60.0 },
            ],
        }
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let engagement = &self.engagement;
        if engagement.tick_ms == 0 {
            return Err(ScenarioError::ValidationError("tick_ms must be positive".to_string()));
        }
        if engagement.flight_steps == 0 {
            return Err(ScenarioError::ValidationError("flight_steps must be positive".to_string()));
        }
        if engagement.detection_range <= 0.0 {
            return Err(ScenarioError::ValidationError("detection_range must be positive".to_string()));
        }
        if engagement.max_altitude < 0.0 {
            return Err(ScenarioError::ValidationError("max_altitude must not be negative".to_string()));
        }

        if self.autonomy.threshold <= 0.0 {
            return Err(ScenarioError::ValidationError("autonomy.threshold must be positive".to_string()));
        }
        if self.autonomy.max_committed == 0 {
            return Err(ScenarioError::ValidationError("autonomy.max_committed must be positive".to_string()));
        }

        let mut interceptor_ids = HashSet::new();
        for interceptor in &self.interceptors {
            if !interceptor_ids.insert(interceptor.id) {
                return Err(ScenarioError::ValidationError(
                    format!("Duplicate interceptor id {}", interceptor.id)
                ));
            }
            if !is_valid_speed(interceptor.speed) {
                return Err(ScenarioError::ValidationError(
                    format!("Interceptor {} speed must be positive and finite", interceptor.id)
                ));
            }
        }

        let target_ids: HashSet<u32> = self.protected_targets.iter().map(|t| t.id).collect();
        let mut threat_ids = HashSet::new();
        for threat in &self.threats {
            if !threat_ids.insert(threat.id) {
                return Err(ScenarioError::ValidationError(
                    format!("Duplicate threat id {}", threat.id)
                ));
            }
            if !target_ids.contains(&threat.target_id) {
                return Err(ScenarioError::ValidationError(
                    format!("Threat {} aims at unknown target {}", threat.id, threat.target_id)
                ));
            }
            if !is_valid_speed(threat.speed) {
                return Err(ScenarioError::ValidationError(
                    format!("Threat {} speed must be positive and finite", threat.id)
                ));
            }
        }

        Ok(())
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== 交戦設定 ===");
        println!("更新周期: {}ミリ秒", self.engagement.tick_ms);
        println!("飛翔ステップ: {} (間隔 {}ミリ秒)", self.engagement.flight_steps, self.engagement.flight_step_delay_ms);
        println!("探知範囲: {:.0}", self.engagement.detection_range);
        println!(
            "自動迎撃: {} (閾値 {:.0}, 上限 {}発)",
            if self.autonomy.enabled { "有効" } else { "無効" },
            self.autonomy.threshold,
            self.autonomy.max_committed
        );
        println!();

        println!("=== 防護対象 ===");
        for target in &self.protected_targets {
            println!("  {}: {} ({}, {})", target.id, target.name, target.position.x, target.position.y);
        }
        println!();

        println!("=== 迎撃ミサイル ===");
        println!("総数: {}発", self.interceptors.len());
        for interceptor in &self.interceptors {
            println!("  #{} {} (速度 {})", interceptor.id, interceptor.name, interceptor.speed);
        }
        println!();

        println!("=== 敵ミサイル ===");
        println!("総数: {}発", self.threats.len());
        for threat in &self.threats {
            println!("  {}: 目標 {} (速度 {})", threat.id, threat.target_id, threat.speed);
        }
    }
}

/// 速度は正の有限値のみ有効（NaNも拒否）
fn is_valid_speed(speed: f64) -> bool {
    speed.is_finite() && speed > 0.0
}

/// シナリオ読み込みエラー
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    ParseError(PathBuf, #[source] serde_yaml::Error),

    #[error("設定検証エラー: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
meta:
  version: "1.0"
  name: minimal
protected_targets:
  - { id: 1, name: Base, position: { x: 0.0, y: 0.0 } }
interceptors:
  - { id: 1, name: Patriot, payload: 100, speed: 80.0, position: { x: 10.0, y: 0.0 } }
threats:
  - { id: 7, start: { x: 500.0, y: 0.0 }, target_id: 1, speed: 40.0 }
"#;

    #[test]
    fn test_default_roster_is_valid() {
        let scenario = ScenarioConfig::default_roster();
        assert!(scenario.validate().is_ok());
        assert_eq!(scenario.interceptors.len(), 5);
        assert_eq!(scenario.threats.len(), 3);
        assert_eq!(scenario.strike_targets.len(), 3);
    }

    #[test]
    fn test_yaml_defaults_are_applied() {
        let scenario = ScenarioConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(scenario.engagement.tick_ms, 1500);
        assert_eq!(scenario.engagement.flight_steps, 20);
        assert_eq!(scenario.autonomy.threshold, 2000.0);
        assert_eq!(scenario.autonomy.max_committed, 3);
        assert!(!scenario.autonomy.enabled);
        assert!(scenario.strike_targets.is_empty());
        assert_eq!(scenario.protected_targets[0].position.z, 0.0);
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let yaml = MINIMAL.replace("target_id: 1", "target_id: 9");
        let err = ScenarioConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ScenarioError::ValidationError(_)));
    }

    #[test]
    fn test_duplicate_interceptor_is_rejected() {
        let mut scenario = ScenarioConfig::default_roster();
        scenario.interceptors[1].id = 1;
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_non_finite_speeds_are_rejected() {
        for bad in [f64::NAN, f64::INFINITY, 0.0, -10.0] {
            let mut scenario = ScenarioConfig::default_roster();
            scenario.threats[0].speed = bad;
            assert!(matches!(scenario.validate(), Err(ScenarioError::ValidationError(_))));

            let mut scenario = ScenarioConfig::default_roster();
            scenario.interceptors[2].speed = bad;
            assert!(matches!(scenario.validate(), Err(ScenarioError::ValidationError(_))));
        }
    }

    #[test]
    fn test_missing_file() {
        let err = ScenarioConfig::from_file("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }
}
