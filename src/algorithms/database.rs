/// 指纹数据库（参考地图）及其构建
///
/// 原始记录按网格坐标分组，每个信标的读数汇总后经 IQR 过滤取平均，
/// 每个坐标得到一个参考点；参考地图按 (y, x) 升序排列，构建后只读

use crate::algorithms::fingerprint::{Fingerprint, GridCoord, RawRecord};
use crate::algorithms::outlier::{Rssi, robust_mean};
use crate::algorithms::transmitter::{TransmitterId, TransmitterSet};
use crate::error::{FingerprintError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// 参考点：已知坐标 + 平均指纹
#[derive(Clone, Debug, PartialEq)]
pub struct ReferencePoint {
    pub coord: GridCoord,
    pub fingerprint: Fingerprint,
}

impl ReferencePoint {
    pub fn new(coord: GridCoord, fingerprint: Fingerprint) -> Self {
        ReferencePoint { coord, fingerprint }
    }

    pub fn get(&self, id: &TransmitterId) -> Option<Rssi> {
        self.fingerprint.get(id)
    }
}

/// 参考地图
///
/// 所有参考点共享同一信标集合；坐标唯一；按 (y, x) 升序
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceMap {
    transmitters: TransmitterSet,
    points: Vec<ReferencePoint>,
}

impl ReferenceMap {
    /// 创建参考地图，校验坐标唯一、信标属于集合，并按 (y, x) 稳定排序
    pub fn new(transmitters: TransmitterSet, mut points: Vec<ReferencePoint>) -> Result<Self> {
        for point in &points {
            point.fingerprint.check_within(&transmitters)?;
        }

        points.sort_by(|a, b| a.coord.cmp(&b.coord));
        if let Some(pair) = points.windows(2).find(|w| w[0].coord == w[1].coord) {
            return Err(FingerprintError::DuplicateCoordinate {
                x: pair[0].coord.x,
                y: pair[0].coord.y,
            });
        }

        Ok(ReferenceMap {
            transmitters,
            points,
        })
    }

    pub fn transmitters(&self) -> &TransmitterSet {
        &self.transmitters
    }

    pub fn points(&self) -> &[ReferencePoint] {
        &self.points
    }

    pub fn get(&self, coord: GridCoord) -> Option<&ReferencePoint> {
        self.points
            .binary_search_by(|p| p.coord.cmp(&coord))
            .ok()
            .map(|i| &self.points[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferencePoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// 指纹数据库构建器
pub struct DatabaseBuilder;

impl DatabaseBuilder {
    /// 从原始记录构建参考地图
    ///
    /// # 参数
    /// - `transmitters`: 数据集的信标集合（决定 `RawRecord::readings` 的列顺序）
    /// - `records`: 原始扫描记录
    ///
    /// # 返回
    /// - 每个不同坐标一个参考点；某信标在该坐标从未被扫描到则缺失
    pub fn build(transmitters: &TransmitterSet, records: &[RawRecord]) -> Result<ReferenceMap> {
        let width = transmitters.len();
        let mut groups: BTreeMap<GridCoord, Vec<Vec<Rssi>>> = BTreeMap::new();

        for record in records {
            if record.readings.len() != width {
                return Err(FingerprintError::Schema(format!(
                    "坐标 {} 的记录有 {} 个读数，应为 {}",
                    record.coord,
                    record.readings.len(),
                    width
                )));
            }

            let samples = groups
                .entry(record.coord)
                .or_insert_with(|| vec![Vec::new(); width]);
            for (column, reading) in samples.iter_mut().zip(&record.readings) {
                if let Some(rssi) = reading {
                    column.push(*rssi);
                }
            }
        }

        // BTreeMap 按 GridCoord 的 (y, x) 顺序迭代
        let points = groups
            .into_iter()
            .map(|(coord, samples)| {
                let averages: Vec<Option<Rssi>> =
                    samples.iter().map(|values| robust_mean(values)).collect();
                debug!(
                    "参考点 {}: {}/{} 个信标有数据",
                    coord,
                    averages.iter().filter(|v| v.is_some()).count(),
                    width
                );
                ReferencePoint::new(coord, Fingerprint::from_aligned(transmitters, &averages))
            })
            .collect();

        ReferenceMap::new(transmitters.clone(), points)
    }
}
