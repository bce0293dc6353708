/// 配置加载
///
/// TOML 文件，所有字段都有默认值；默认值对应实际部署的 12 个信标

use crate::algorithms::TransmitterSet;
use crate::error::{FingerprintError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 默认配置文件名
pub const DEFAULT_CONFIG_PATH: &str = "fpnav.toml";

/// 主配置
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// 目标信标地址，顺序即数据文件的列顺序
    #[serde(default = "default_transmitters")]
    pub transmitters: Vec<String>,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub files: FileConfig,
    #[serde(default)]
    pub estimation: EstimationConfig,
}

/// 扫描参数
#[derive(Clone, Debug, Deserialize)]
pub struct ScanConfig {
    /// 单次扫描时长（毫秒，默认 1000）
    #[serde(default = "default_pass_duration_ms")]
    pub pass_duration_ms: u64,

    /// 扫描次数（默认 60）
    #[serde(default = "default_passes")]
    pub passes: usize,
}

/// 数据文件路径
#[derive(Clone, Debug, Deserialize)]
pub struct FileConfig {
    #[serde(default = "default_raw_dataset")]
    pub raw_dataset: String,

    #[serde(default = "default_reference_map")]
    pub reference_map: String,
}

/// 定位参数
#[derive(Clone, Debug, Deserialize)]
pub struct EstimationConfig {
    /// 单次定位使用的近邻数（默认 3）
    #[serde(default = "default_k")]
    pub k: usize,

    /// k 值扫描下限（默认 1）
    #[serde(default = "default_k_min")]
    pub k_min: usize,

    /// k 值扫描上限（默认 33）
    #[serde(default = "default_k_max")]
    pub k_max: usize,

    /// 特征向量中缺失信标的填充值（默认 -100 dBm）
    #[serde(default = "default_missing_sentinel")]
    pub missing_sentinel: f64,
}

// 默认值
fn default_transmitters() -> Vec<String> {
    [
        "E5:53:39:5F:31:1A",
        "F8:9D:4B:5D:44:F4",
        "FD:AF:34:29:05:FE",
        "C6:62:EC:2D:90:AB",
        "D6:77:D9:C0:A6:54",
        "FA:C4:4A:07:18:9F",
        "C4:35:CE:FD:FB:DF",
        "CC:7F:D5:E0:41:92",
        "D7:B8:72:01:49:AC",
        "C5:EB:92:59:4D:1A",
        "C2:80:A9:28:D0:79",
        "FC:92:D5:14:99:90",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_pass_duration_ms() -> u64 {
    1000
}
fn default_passes() -> usize {
    60
}
fn default_raw_dataset() -> String {
    "ble_rssi_data_raw.csv".to_string()
}
fn default_reference_map() -> String {
    "ble_rssi_data_avg.csv".to_string()
}
fn default_k() -> usize {
    3
}
fn default_k_min() -> usize {
    1
}
fn default_k_max() -> usize {
    33
}
fn default_missing_sentinel() -> f64 {
    -100.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transmitters: default_transmitters(),
            scan: ScanConfig::default(),
            files: FileConfig::default(),
            estimation: EstimationConfig::default(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            pass_duration_ms: default_pass_duration_ms(),
            passes: default_passes(),
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            raw_dataset: default_raw_dataset(),
            reference_map: default_reference_map(),
        }
    }
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            k_min: default_k_min(),
            k_max: default_k_max(),
            missing_sentinel: default_missing_sentinel(),
        }
    }
}

impl Config {
    /// 从文件加载并校验
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// 文件存在则加载，否则使用默认配置
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.transmitter_set()?;
        if self.scan.passes == 0 {
            return Err(FingerprintError::Config("scan.passes 必须大于 0".to_string()));
        }
        let est = &self.estimation;
        if est.k == 0 || est.k_min == 0 {
            return Err(FingerprintError::Config("k 必须大于 0".to_string()));
        }
        if est.k_min > est.k_max {
            return Err(FingerprintError::Config(format!(
                "k_min={} 大于 k_max={}",
                est.k_min, est.k_max
            )));
        }
        if !est.missing_sentinel.is_finite() {
            return Err(FingerprintError::Config("missing_sentinel 必须是有限值".to_string()));
        }
        Ok(())
    }

    /// 配置中的信标集合
    pub fn transmitter_set(&self) -> Result<TransmitterSet> {
        TransmitterSet::parse(&self.transmitters)
            .map_err(|e| FingerprintError::Config(e.to_string()))
    }

    pub fn pass_duration(&self) -> Duration {
        Duration::from_millis(self.scan.pass_duration_ms)
    }
}
