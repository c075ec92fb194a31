//! # Error モジュール
//!
//! 迎撃コアで発生する回復可能なエラーを定義します。
//! いずれもプロセスを停止させるものではなく、呼び出し側が次サイクルで
//! 別の行動を選択することで回復します。

use thiserror::Error;

use crate::models::common::{InterceptorId, TargetId};

/// 迎撃・発射操作のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngageError {
    /// 指定IDの迎撃ミサイルがインベントリに存在しない
    #[error("迎撃ミサイルが見つかりません: #{0}")]
    InterceptorNotFound(InterceptorId),

    /// 指定IDの攻撃目標が存在しない
    #[error("攻撃目標が見つかりません: #{0}")]
    TargetNotFound(TargetId),

    /// 既に発射済みの迎撃ミサイルを再度発射しようとした
    #[error("迎撃ミサイル #{0} は既に発射済みです")]
    AlreadyLaunched(InterceptorId),

    /// 利用可能な迎撃ミサイルがない
    #[error("利用可能な迎撃ミサイルがありません")]
    InventoryEmpty,

    /// 自動迎撃が無効
    #[error("自動迎撃は無効です")]
    AutonomyDisabled,

    /// 自動迎撃の使用上限に到達
    #[error("自動迎撃の使用上限に到達しました ({used}/{max})")]
    BudgetExhausted { used: u32, max: u32 },
}

/// 自動迎撃設定のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("無効な距離閾値: {0} (正の値が必要です)")]
    InvalidThreshold(f64),

    #[error("無効な最大自動迎撃数: {0} (1以上が必要です)")]
    InvalidMaxCommitted(u32),
}
