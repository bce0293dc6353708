/// 指纹数据结构
///
/// - `GridCoord`：网格坐标，按 (y, x) 全序，作为分组键
/// - `Fingerprint`：信标 → RSSI，缺失即不存在，不用 0 或空串占位
/// - `RawRecord`：原始数据集中的一行扫描记录

use crate::algorithms::outlier::{Rssi, robust_mean};
use crate::algorithms::transmitter::{TransmitterId, TransmitterSet};
use crate::error::{FingerprintError, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// 网格坐标
// ============================================================================

/// 网格坐标
///
/// 排序规则：先 y 后 x，与参考地图的行顺序一致
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32) -> Self {
        GridCoord { x, y }
    }

    /// 从文本解析，非整数立即报错，不做截断或四舍五入
    pub fn parse(x: &str, y: &str) -> Result<Self> {
        Ok(GridCoord {
            x: parse_axis("x", x)?,
            y: parse_axis("y", y)?,
        })
    }
}

fn parse_axis(field: &'static str, value: &str) -> Result<i32> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| FingerprintError::InvalidCoordinate {
            field,
            value: value.to_string(),
        })
}

impl Ord for GridCoord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

impl PartialOrd for GridCoord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ============================================================================
// 指纹
// ============================================================================

/// 信标 → RSSI 的映射
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fingerprint {
    readings: BTreeMap<TransmitterId, Rssi>,
}

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint {
            readings: BTreeMap::new(),
        }
    }

    /// 从 (信标, RSSI) 对创建
    pub fn from_pairs(pairs: Vec<(TransmitterId, Rssi)>) -> Self {
        Fingerprint {
            readings: pairs.into_iter().collect(),
        }
    }

    /// 从按集合顺序排列的可选值创建
    pub fn from_aligned(set: &TransmitterSet, values: &[Option<Rssi>]) -> Self {
        let readings = set
            .iter()
            .zip(values)
            .filter_map(|(id, v)| v.map(|rssi| (*id, rssi)))
            .collect();
        Fingerprint { readings }
    }

    /// 对每个信标的原始读数做离群过滤后取平均
    ///
    /// 没有读数的信标在结果中缺失
    pub fn from_raw_samples(samples: &BTreeMap<TransmitterId, Vec<Rssi>>) -> Self {
        let readings = samples
            .iter()
            .filter_map(|(id, values)| robust_mean(values).map(|avg| (*id, avg)))
            .collect();
        Fingerprint { readings }
    }

    pub fn insert(&mut self, id: TransmitterId, rssi: Rssi) {
        self.readings.insert(id, rssi);
    }

    pub fn get(&self, id: &TransmitterId) -> Option<Rssi> {
        self.readings.get(id).copied()
    }

    pub fn contains(&self, id: &TransmitterId) -> bool {
        self.readings.contains_key(id)
    }

    /// 按信标集合顺序展开
    pub fn aligned(&self, set: &TransmitterSet) -> Vec<Option<Rssi>> {
        set.iter().map(|id| self.get(id)).collect()
    }

    /// 所有信标都属于给定集合
    pub fn check_within(&self, set: &TransmitterSet) -> Result<()> {
        match self.readings.keys().find(|id| !set.contains(id)) {
            Some(id) => Err(FingerprintError::UnknownTransmitter(id.to_string())),
            None => Ok(()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TransmitterId, &Rssi)> {
        self.readings.iter()
    }

    /// 有值的信标数量
    pub fn count(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

// ============================================================================
// 原始记录
// ============================================================================

/// 原始数据集中的一行
///
/// `readings` 与数据集信标集合顺序对齐；`time`、`direction` 只是会话信息，建库时忽略
#[derive(Clone, Debug, PartialEq)]
pub struct RawRecord {
    pub time: String,
    pub coord: GridCoord,
    pub direction: String,
    pub readings: Vec<Option<Rssi>>,
}

impl RawRecord {
    pub fn new(
        time: impl Into<String>,
        coord: GridCoord,
        direction: impl Into<String>,
        readings: Vec<Option<Rssi>>,
    ) -> Self {
        RawRecord {
            time: time.into(),
            coord,
            direction: direction.into(),
            readings,
        }
    }
}
