/// 位置估计
///
/// 支持：
/// - KNN：k 个近邻坐标的算术平均
/// - WKNN：按 1/距离 加权平均，距离为 0 时直接取该参考点
/// - 可插拔的替代估计器（如回归模型），核心只负责特征编码

use crate::algorithms::database::ReferenceMap;
use crate::algorithms::fingerprint::{Fingerprint, GridCoord};
use crate::algorithms::matcher::Match;
use crate::algorithms::transmitter::TransmitterSet;
use crate::error::{FingerprintError, Result};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// 位置估计结果（整数网格坐标）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// 浮点坐标分别取整（四舍六入五成双）
    pub fn rounded(x: f64, y: f64) -> Self {
        Position {
            x: x.round_ties_even() as i32,
            y: y.round_ties_even() as i32,
        }
    }

    pub fn xy(&self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }
}

impl From<GridCoord> for Position {
    fn from(c: GridCoord) -> Self {
        Position { x: c.x, y: c.y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={}, y={}", self.x, self.y)
    }
}

// ============================================================================
// KNN / WKNN
// ============================================================================

/// 基于近邻的位置估计
pub struct PositionEstimator;

impl PositionEstimator {
    /// KNN：坐标算术平均后各自取整
    pub fn knn(matches: &[Match]) -> Result<Position> {
        if matches.is_empty() {
            return Err(FingerprintError::NoMatches);
        }

        let n = matches.len() as f64;
        let sum_x: i64 = matches.iter().map(|m| m.coord.x as i64).sum();
        let sum_y: i64 = matches.iter().map(|m| m.coord.y as i64).sum();

        Ok(Position::rounded(sum_x as f64 / n, sum_y as f64 / n))
    }

    /// WKNN：权重 = 1 / 距离
    ///
    /// 任一匹配距离为 0 时视为精确命中，直接返回该匹配的坐标（按排名取第一个）
    pub fn wknn(matches: &[Match]) -> Result<Position> {
        if matches.is_empty() {
            return Err(FingerprintError::NoMatches);
        }

        if let Some(exact) = matches.iter().find(|m| m.is_exact()) {
            debug!("WKNN 精确命中 {}，忽略其余 {} 个近邻", exact.coord, matches.len() - 1);
            return Ok(exact.coord.into());
        }

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut total_weight = 0.0;
        for m in matches {
            let weight = 1.0 / m.distance as f64;
            sum_x += m.coord.x as f64 * weight;
            sum_y += m.coord.y as f64 * weight;
            total_weight += weight;
        }

        if !(total_weight > 0.0 && total_weight.is_finite()) {
            return Err(FingerprintError::ZeroWeight);
        }

        Ok(Position::rounded(sum_x / total_weight, sum_y / total_weight))
    }
}

// ============================================================================
// 替代估计器接口
// ============================================================================

/// 可训练的替代估计器（例如 x、y 各一个回归模型）
pub trait AlternateEstimator {
    type Model: TrainedModel;

    fn train(&self, features: &[Vec<f64>], x_labels: &[f64], y_labels: &[f64]) -> Result<Self::Model>;
}

/// 训练好的模型
pub trait TrainedModel {
    fn predict(&self, features: &[f64]) -> Result<(f64, f64)>;
}

/// 训练数据：特征矩阵 + 两组标签
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSet {
    pub features: Vec<Vec<f64>>,
    pub x_labels: Vec<f64>,
    pub y_labels: Vec<f64>,
}

/// 指纹 → 特征向量
///
/// 按信标集合的固定顺序展开，缺失值用哨兵值（如 -100 dBm）填充
#[derive(Clone, Debug)]
pub struct FeatureEncoder {
    transmitters: TransmitterSet,
    sentinel: f64,
}

impl FeatureEncoder {
    pub fn new(transmitters: TransmitterSet, sentinel: f64) -> Self {
        FeatureEncoder {
            transmitters,
            sentinel,
        }
    }

    pub fn sentinel(&self) -> f64 {
        self.sentinel
    }

    pub fn encode(&self, fingerprint: &Fingerprint) -> Vec<f64> {
        fingerprint
            .aligned(&self.transmitters)
            .into_iter()
            .map(|v| v.map_or(self.sentinel, f64::from))
            .collect()
    }

    /// 参考地图 → 训练数据
    pub fn training_set(&self, map: &ReferenceMap) -> TrainingSet {
        let mut set = TrainingSet {
            features: Vec::with_capacity(map.len()),
            x_labels: Vec::with_capacity(map.len()),
            y_labels: Vec::with_capacity(map.len()),
        };
        for point in map.iter() {
            set.features.push(self.encode(&point.fingerprint));
            set.x_labels.push(point.coord.x as f64);
            set.y_labels.push(point.coord.y as f64);
        }
        set
    }

    /// 用替代估计器训练并预测实时指纹的位置
    pub fn estimate<E: AlternateEstimator>(
        &self,
        estimator: &E,
        map: &ReferenceMap,
        live: &Fingerprint,
    ) -> Result<Position> {
        if map.is_empty() {
            return Err(FingerprintError::EmptyReferenceMap);
        }

        let data = self.training_set(map);
        let model = estimator.train(&data.features, &data.x_labels, &data.y_labels)?;
        let (x, y) = model.predict(&self.encode(live))?;
        if !(x.is_finite() && y.is_finite()) {
            return Err(FingerprintError::Model(format!("预测结果无效: ({}, {})", x, y)));
        }
        Ok(Position::rounded(x, y))
    }
}
