/// fpnav 命令行
///
/// - `collect <x> <y> <direction>`：在网格点采集原始 RSSI，追加到原始数据集
/// - `build`：原始数据集 → 参考地图
/// - `locate`：实时扫描并用 KNN / WKNN 定位，与输入的真实位置比较误差
/// - `sweep`：在一组 k 值上计算 KNN / WKNN 误差，输出 JSON 供绘图

use clap::{Parser, Subcommand};
use fpnav::algorithms::{
    DatabaseBuilder, ErrorEvaluator, Estimate, EstimateMethod, Fingerprint, GridCoord, GroundTruth,
    Matcher, PositionEstimator, ReferenceMap,
};
use fpnav::config::{Config, DEFAULT_CONFIG_PATH};
use fpnav::dataset;
use fpnav::scanner::{BleScanner, RssiScanner};
use fpnav::{FingerprintError, Result};
use std::io::{BufRead, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "fpnav", about = "BLE RSSI 指纹室内定位")]
struct Cli {
    /// 配置文件路径
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 在网格点 (x, y) 采集原始 RSSI
    #[command(allow_negative_numbers = true)]
    Collect {
        x: i32,
        y: i32,
        /// 朝向标签
        direction: String,
    },
    /// 由原始数据集生成参考地图
    Build,
    /// 实时定位
    Locate {
        /// 近邻数，默认取配置
        #[arg(short)]
        k: Option<usize>,
    },
    /// k 值扫描
    Sweep {
        #[arg(long)]
        k_min: Option<usize>,
        #[arg(long)]
        k_max: Option<usize>,
        /// 结果 JSON 输出路径
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fpnav=info")),
        )
        .init();

    // 参数个数或类型错误时 clap 打印用法并以非零状态退出
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(&cli.config)?;
    config.validate()?;

    match cli.command {
        Command::Collect { x, y, direction } => collect(&config, GridCoord::new(x, y), &direction),
        Command::Build => build(&config),
        Command::Locate { k } => locate(&config, k.unwrap_or(config.estimation.k)),
        Command::Sweep {
            k_min,
            k_max,
            output,
        } => sweep(
            &config,
            k_min.unwrap_or(config.estimation.k_min),
            k_max.unwrap_or(config.estimation.k_max),
            output.as_deref(),
        ),
    }
}

fn collect(config: &Config, coord: GridCoord, direction: &str) -> Result<()> {
    let mut scanner = BleScanner::from_config(config)?;
    println!("扫描中，共 {} 秒...", scanner.total_duration().as_secs());

    let batch = scanner.scan_batch()?;
    let records = batch.to_raw_records(coord, direction);
    let path = Path::new(&config.files.raw_dataset);
    dataset::append_raw_records(path, &batch.transmitters, &records)?;

    println!("✓ RSSI 数据已保存到 '{}'", path.display());
    Ok(())
}

fn build(config: &Config) -> Result<()> {
    let (transmitters, records) = dataset::read_raw_dataset(Path::new(&config.files.raw_dataset))?;
    info!("读取 {} 条原始记录，{} 个信标", records.len(), transmitters.len());

    let map = DatabaseBuilder::build(&transmitters, &records)?;
    let path = Path::new(&config.files.reference_map);
    dataset::write_reference_map_file(path, &map)?;

    println!("✓ 平均 RSSI 数据已保存到 '{}'（{} 个参考点）", path.display(), map.len());
    Ok(())
}

/// 读取参考地图并扫描实时指纹，返回 (地图, 真实位置, 实时指纹)
fn prepare(config: &Config) -> Result<(ReferenceMap, GroundTruth, Fingerprint)> {
    let map = dataset::read_reference_map_file(Path::new(&config.files.reference_map))?;
    if map.is_empty() {
        return Err(FingerprintError::EmptyReferenceMap);
    }

    let truth = read_ground_truth()?;

    let mut scanner = BleScanner::new(
        map.transmitters().clone(),
        config.scan.passes,
        config.pass_duration(),
    );
    println!("定位中，共 {} 秒...", scanner.total_duration().as_secs());
    let live = scanner.scan_batch()?.live_fingerprint();
    info!("实时指纹: {} 个信标有数据", live.count());

    Ok((map, truth, live))
}

fn locate(config: &Config, k: usize) -> Result<()> {
    let (map, truth, live) = prepare(config)?;

    let matches = Matcher::nearest(&live, &map, k)?;
    println!("最近的 {} 个参考点:", matches.len());
    for m in &matches {
        println!("  {}  差值 {}  共同信标 {}", m.coord, m.distance, m.shared);
    }

    for (method, position) in [
        (EstimateMethod::Knn, PositionEstimator::knn(&matches)?),
        (EstimateMethod::Wknn, PositionEstimator::wknn(&matches)?),
    ] {
        let error = ErrorEvaluator::mean_error(&[position], &[truth])?;
        let estimate = Estimate::new(position, method, matches.len()).with_error(error);
        println!("{}", estimate.detailed_description());
    }

    Ok(())
}

fn sweep(config: &Config, k_min: usize, k_max: usize, output: Option<&Path>) -> Result<()> {
    let (map, truth, live) = prepare(config)?;

    let ks = clamp_k_range(k_min, k_max, map.len())?;
    let sweep = ErrorEvaluator::sweep(&live, &map, truth, ks)?;

    println!("{:<5} {:>12} {:>12}", "k", "KNN 误差", "WKNN 误差");
    for ((k, knn), wknn) in sweep.knn_series().into_iter().zip(&sweep.wknn_errors) {
        println!("{:<5} {:>12.3} {:>12.3}", k, knn, wknn);
    }
    if let (Some((kk, ek)), Some((kw, ew))) = (sweep.best_knn(), sweep.best_wknn()) {
        println!("最佳 k: KNN k={} ({:.3})，WKNN k={} ({:.3})", kk, ek, kw, ew);
    }

    let json = serde_json::to_string_pretty(&sweep)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("✓ 误差序列已保存到 '{}'", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// 把 k_max 截断到参考点数量；截断后 k_min 超过 k_max 时返回 `InvalidK`
fn clamp_k_range(k_min: usize, k_max: usize, available: usize) -> Result<RangeInclusive<usize>> {
    let k_max = if k_max > available {
        warn!("k_max={} 超过参考点数量 {}，已截断", k_max, available);
        available
    } else {
        k_max
    };

    if k_min > k_max {
        return Err(FingerprintError::InvalidK { k: k_min, available });
    }
    Ok(k_min..=k_max)
}

fn read_ground_truth() -> Result<GroundTruth> {
    let x = prompt_f64("请输入真实 x 坐标: ", "x")?;
    let y = prompt_f64("请输入真实 y 坐标: ", "y")?;
    Ok(GroundTruth::new(x, y))
}

fn prompt_f64(prompt: &str, field: &'static str) -> Result<f64> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    line.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FingerprintError::InvalidCoordinate {
            field,
            value: line.trim().to_string(),
        })
}
