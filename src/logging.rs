//! # Logging モジュール
//!
//! 迎撃シミュレーションのログ出力を初期化します。
//!
//! 探知・発射・消費などのイベントは `EVENT_NAME: メッセージ` 形式の構造化ログとして
//! 出力されます。ファイル出力は tracing-appender の日次ローテーションと
//! 非同期書き込みを使用し、飛翔シミュレーションの進行を妨げません。
//!
//! ## 設定可能な出力先
//!
//! - `Console`: コンソールのみ
//! - `File`: ファイルのみ（logs/pdsim.YYYY-MM-DD）
//! - `Both`: コンソールとファイルの両方

use std::str::FromStr;
use tracing::Level;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Registry,
};

/// ログ出力先の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    /// コンソールのみ
    Console,
    /// ファイルのみ
    File,
    /// コンソールとファイルの両方
    Both,
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            _ => Err(format!("無効な出力先: {}. 利用可能: console, file, both", s)),
        }
    }
}

/// ログ設定構造体
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// ログレベル
    pub level: Level,
    /// 出力先
    pub output: LogOutput,
    /// ログファイルのディレクトリ（Fileまたは Bothの場合）
    pub log_dir: String,
    /// ログファイル名のプレフィックス
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            output: LogOutput::Console,
            log_dir: "logs".to_string(),
            file_prefix: "pdsim".to_string(),
        }
    }
}

/// ログシステムを初期化
///
/// ファイル出力を含む場合は非同期書き込みのガードを返します。
/// ガードを破棄すると未書き込みのログがフラッシュされるため、
/// 呼び出し側はプロセス終了まで保持してください。
///
/// # 例
///
/// ```no_run
/// use pdsim::logging::{LogConfig, LogOutput, init_logging};
/// use tracing::Level;
///
/// let config = LogConfig {
///     level: Level::DEBUG,
///     output: LogOutput::Both,
///     ..LogConfig::default()
/// };
///
/// let _guard = init_logging(config).expect("ログ初期化に失敗");
/// ```
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    // 環境変数またはconfigからログレベルを設定
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_string()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match config.output {
        LogOutput::Console => {
            Registry::default()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact()
                )
                .try_init()?;
            Ok(None)
        }
        LogOutput::File | LogOutput::Both => {
            ensure_log_directory(&config.log_dir)?;
            let file_appender = rolling::daily(&config.log_dir, &config.file_prefix);
            let (non_blocking_appender, guard) = non_blocking(file_appender);

            let file_layer = fmt::layer()
                .with_writer(non_blocking_appender)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json();

            let registry = Registry::default().with(env_filter).with(file_layer);
            if config.output == LogOutput::Both {
                registry
                    .with(
                        fmt::layer()
                            .with_target(true)
                            .with_thread_ids(false)
                            .with_file(false)
                            .with_line_number(false)
                            .compact()
                    )
                    .try_init()?;
            } else {
                registry.try_init()?;
            }
            Ok(Some(guard))
        }
    }
}

/// ログレベルを文字列から解析
///
/// 無効な文字列の場合はINFOを返します。
pub fn parse_log_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("警告: 無効なログレベル '{}'. INFOを使用します", level_str);
            Level::INFO
        }
    }
}

/// 詳細レベル（-v の回数）からログレベルを決定
pub fn level_from_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// ログディレクトリを作成
pub fn ensure_log_directory(log_dir: &str) -> Result<(), std::io::Error> {
    std::fs::create_dir_all(log_dir)?;
    Ok(())
}
