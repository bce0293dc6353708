/// 指纹定位算法模块
///
/// 离线：原始读数 → 离群过滤 → 指纹数据库
/// 在线：实时读数 → 离群过滤 → 实时指纹 → 匹配 → 位置估计 → 误差评估

pub mod transmitter;
pub mod outlier;
pub mod fingerprint;
pub mod database;
pub mod matcher;
pub mod estimator;
pub mod evaluation;
pub mod results;

pub use transmitter::*;
pub use outlier::*;
pub use fingerprint::*;
pub use database::*;
pub use matcher::*;
pub use estimator::*;
pub use evaluation::*;
pub use results::*;
