/// 定位结果数据结构
///
/// 包含单次估计结果和 k 值扫描的误差序列

use crate::algorithms::estimator::Position;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

/// 估计方法
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateMethod {
    Knn,
    Wknn,
    Alternate,
}

impl fmt::Display for EstimateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EstimateMethod::Knn => "KNN",
            EstimateMethod::Wknn => "WKNN",
            EstimateMethod::Alternate => "替代估计器",
        };
        write!(f, "{}", name)
    }
}

/// 真实位置，仅用于误差评估
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GroundTruth {
    pub x: f64,
    pub y: f64,
}

impl GroundTruth {
    pub fn new(x: f64, y: f64) -> Self {
        GroundTruth { x, y }
    }
}

/// 单次定位结果
#[derive(Clone, Debug, Serialize)]
pub struct Estimate {
    pub position: Position,
    pub method: EstimateMethod,
    /// 参与估计的近邻数量（替代估计器为 0）
    pub neighbours: usize,
    /// 与真实位置的欧氏距离（提供了真实位置时）
    pub error: Option<f64>,
    pub timestamp: DateTime<Local>,
}

impl Estimate {
    pub fn new(position: Position, method: EstimateMethod, neighbours: usize) -> Self {
        Estimate {
            position,
            method,
            neighbours,
            error: None,
            timestamp: Local::now(),
        }
    }

    pub fn with_error(mut self, error: f64) -> Self {
        self.error = Some(error);
        self
    }

    /// 获取详细描述
    pub fn detailed_description(&self) -> String {
        let error = match self.error {
            Some(e) => format!("{:.3}", e),
            None => "-".to_string(),
        };
        format!(
            "{} 位置: ({}, {}), 近邻数: {}, 误差: {}",
            self.method, self.position.x, self.position.y, self.neighbours, error
        )
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.method, self.position.x, self.position.y)
    }
}

/// k 值扫描结果：两条按 k 对齐的误差序列，供外部绘图
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct KSweep {
    pub ks: Vec<usize>,
    pub knn_errors: Vec<f64>,
    pub wknn_errors: Vec<f64>,
}

impl KSweep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, k: usize, knn_error: f64, wknn_error: f64) {
        self.ks.push(k);
        self.knn_errors.push(knn_error);
        self.wknn_errors.push(wknn_error);
    }

    pub fn len(&self) -> usize {
        self.ks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ks.is_empty()
    }

    /// (k, KNN 误差) 序列
    pub fn knn_series(&self) -> Vec<(usize, f64)> {
        self.ks.iter().copied().zip(self.knn_errors.iter().copied()).collect()
    }

    /// (k, WKNN 误差) 序列
    pub fn wknn_series(&self) -> Vec<(usize, f64)> {
        self.ks.iter().copied().zip(self.wknn_errors.iter().copied()).collect()
    }

    /// KNN 误差最小的 k，并列时取较小的 k
    pub fn best_knn(&self) -> Option<(usize, f64)> {
        best_of(&self.ks, &self.knn_errors)
    }

    /// WKNN 误差最小的 k，并列时取较小的 k
    pub fn best_wknn(&self) -> Option<(usize, f64)> {
        best_of(&self.ks, &self.wknn_errors)
    }
}

fn best_of(ks: &[usize], errors: &[f64]) -> Option<(usize, f64)> {
    ks.iter()
        .copied()
        .zip(errors.iter().copied())
        .fold(None, |best, (k, e)| match best {
            Some((_, b)) if b <= e => best,
            _ => Some((k, e)),
        })
}
