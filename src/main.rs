use std::str::FromStr;

use clap::{Arg, ArgAction, Command};
use pdsim::logging::{init_logging, level_from_verbosity, parse_log_level, LogConfig, LogOutput};
use pdsim::scenario::ScenarioConfig;
use pdsim::simulation::{CancellationFlag, CycleReport, SimulationEngine, StopReason};
use tracing::{error, info};

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("pdsim")
        .version("0.1.0")
        .about("拠点防空シミュレーション (Point Defense Simulation)")
        .long_about("飛来する脅威を探知し、迎撃ミサイルを割り当てる拠点防空シミュレーション\n\
                     固定周期の交戦ループで探知状況と迎撃の推移を表示します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("実行するシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、組み込みの標準シナリオで実行されます。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("cycles")
                .short('c')
                .long("cycles")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .help("実行するサイクル数 (省略時は Ctrl+C まで継続)")
        )
        .arg(
            Arg::new("auto")
                .short('a')
                .long("auto")
                .action(ArgAction::SetTrue)
                .help("シナリオ設定に関わらず自動迎撃を有効化")
        )
        .arg(
            Arg::new("strike")
                .long("strike")
                .num_args(2)
                .value_names(["INTERCEPTOR", "TARGET"])
                .value_parser(clap::value_parser!(u32))
                .help("交戦開始前に迎撃ミサイルを攻撃目標へ発射")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: デバッグ, -vv: トレース)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("OUTPUT")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");
    let level = match matches.get_one::<String>("log-level") {
        Some(level) => parse_log_level(level),
        None => level_from_verbosity(verbose_level),
    };
    let output = match matches.get_one::<String>("log-output").map(|s| LogOutput::from_str(s)) {
        Some(Ok(output)) => output,
        Some(Err(e)) => {
            eprintln!("エラー: {}", e);
            std::process::exit(2);
        }
        None => LogOutput::Console,
    };

    // ガードはプロセス終了まで保持する
    let _guard = match init_logging(LogConfig { level, output, ..LogConfig::default() }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            std::process::exit(1);
        }
    };

    println!("拠点防空シミュレーション (Point Defense Simulation) - pdsim v0.1.0");
    println!();

    let scenario = match matches.get_one::<String>("scenario") {
        Some(path) => match ScenarioConfig::from_file(path) {
            Ok(scenario) => {
                info!(path = %path, "SCENARIO_LOADED: シナリオファイルを読み込みました");
                scenario
            }
            Err(e) => {
                error!(path = %path, error = %e, "SCENARIO_LOAD_FAILED: シナリオの読み込みに失敗しました");
                eprintln!("エラー: {}", e);
                std::process::exit(1);
            }
        },
        None => ScenarioConfig::default_roster(),
    };

    if matches.get_flag("info") {
        scenario.print_summary();
        return;
    }

    let max_cycles = matches.get_one::<u64>("cycles").copied();
    let strike = matches
        .get_many::<u32>("strike")
        .map(|values| values.copied().collect::<Vec<_>>())
        .and_then(|values| match values.as_slice() {
            [interceptor, target] => Some((*interceptor, *target)),
            _ => None,
        });
    if let Err(e) = run_scenario(scenario, matches.get_flag("auto"), max_cycles, strike) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// シナリオを実行してライブ表示する
fn run_scenario(
    mut scenario: ScenarioConfig,
    force_auto: bool,
    max_cycles: Option<u64>,
    strike: Option<(u32, u32)>,
) -> Result<(), Box<dyn std::error::Error>> {
    if force_auto {
        scenario.autonomy.enabled = true;
    }
    scenario.print_summary();
    println!();

    let mut engine = SimulationEngine::from_scenario(&scenario)?;

    if let Some((interceptor_id, target_id)) = strike {
        match engine.strike(interceptor_id, target_id) {
            Ok(report) => println!(
                "{} reached {} (distance {:.1}, apex {:.1})",
                report.interceptor,
                report.target,
                report.total_distance,
                report.apex_altitude()
            ),
            Err(e) => eprintln!("発射失敗: {}", e),
        }
        println!();
    }

    // Ctrl+C でキャンセルフラグを立てる
    let cancel = CancellationFlag::new();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let signal_flag = cancel.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("SHUTDOWN_REQUESTED: 終了要求を受信しました");
            signal_flag.cancel();
        }
    });

    let reason = engine.run_live_with(&cancel, scenario.engagement.tick(), max_cycles, render_cycle);
    runtime.shutdown_background();

    print_final_report(&engine, reason);
    Ok(())
}

/// 1サイクル分の状況を表示
fn render_cycle(engine: &SimulationEngine, report: &CycleReport) {
    println!("=== Cycle {} ===", report.cycle);
    for id in &report.arrived {
        println!("!! Enemy {} reached its target", id);
    }
    for id in &report.intercepted {
        println!(">> Enemy {} intercepted", id);
    }

    println!("Detected threats: {}", report.threats.len());
    for record in &report.threats {
        println!("  {}", record);
    }

    println!("Available interceptors: {}", engine.controller.available_count());
    for interceptor in engine.controller.list_interceptors() {
        println!("  {}", interceptor);
    }
    println!("{}", engine.controller.autonomy_status());
    println!();
}

fn print_final_report(engine: &SimulationEngine, reason: StopReason) {
    let reason = match reason {
        StopReason::Cancelled => "キャンセル",
        StopReason::CycleLimit => "サイクル上限",
        StopReason::AllThreatsCleared => "脅威なし",
    };

    println!("=== 交戦結果 ({}) ===", reason);
    println!("サイクル数: {}", engine.stats.cycles);
    println!("迎撃: {}", engine.stats.threats_intercepted);
    println!("到達: {}", engine.stats.threats_arrived);
    println!("消費ミサイル: {}", engine.stats.interceptors_expended);
    println!("残存脅威: {}", engine.threats.len());
    println!("残弾: {}", engine.controller.available_count());
}
