/// BLE RSSI 指纹室内定位
///
/// - `algorithms`：离群过滤、指纹数据库、匹配、KNN/WKNN 估计、误差评估
/// - `scanner`：扫描协作方接口及 btleplug 实现
/// - `dataset`：原始数据集与参考地图的 CSV 文件
/// - `config` / `error`：配置与错误类型

pub mod algorithms;
pub mod config;
pub mod dataset;
pub mod error;
pub mod scanner;

pub use error::{FingerprintError, Result};
