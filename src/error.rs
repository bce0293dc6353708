/// 错误类型定义
///
/// 按来源分为三类：输入校验错误、数据稀疏错误、外部协作方（文件、扫描器、模型）错误

use thiserror::Error;

/// fpnav 统一错误类型
#[derive(Error, Debug)]
pub enum FingerprintError {
    // ------------------------------------------------------------------
    // 校验错误
    // ------------------------------------------------------------------
    #[error("坐标 {field}={value:?} 格式无效")]
    InvalidCoordinate { field: &'static str, value: String },

    #[error("无效的信标地址: {0:?}")]
    InvalidTransmitterId(String),

    #[error("信标 {transmitter} 的 RSSI 值无效: {value:?}")]
    InvalidReading { transmitter: String, value: String },

    #[error("未知信标: {0}")]
    UnknownTransmitter(String),

    #[error("参考点坐标重复: ({x}, {y})")]
    DuplicateCoordinate { x: i32, y: i32 },

    #[error("k={k} 超出范围 1..={available}")]
    InvalidK { k: usize, available: usize },

    #[error("估计值数量 {estimates} 与真实位置数量 {truths} 不一致")]
    LengthMismatch { estimates: usize, truths: usize },

    #[error("文件格式错误: {0}")]
    Schema(String),

    #[error("配置错误: {0}")]
    Config(String),

    // ------------------------------------------------------------------
    // 数据稀疏
    // ------------------------------------------------------------------
    #[error("没有参考数据")]
    EmptyReferenceMap,

    #[error("没有可用于定位的匹配结果")]
    NoMatches,

    #[error("近邻权重之和为零")]
    ZeroWeight,

    #[error("没有可评估的数据")]
    NoEvaluationData,

    // ------------------------------------------------------------------
    // 外部协作方
    // ------------------------------------------------------------------
    #[error("扫描失败: {0}")]
    Scan(String),

    #[error("替代估计器失败: {0}")]
    Model(String),

    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 错误: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<toml::de::Error> for FingerprintError {
    fn from(e: toml::de::Error) -> Self {
        FingerprintError::Config(e.to_string())
    }
}

impl From<btleplug::Error> for FingerprintError {
    fn from(e: btleplug::Error) -> Self {
        FingerprintError::Scan(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FingerprintError>;
