/// 定位误差评估
///
/// 误差 = 估计位置与真实位置的欧氏距离；支持在一组 k 值上扫描 KNN / WKNN 误差

use crate::algorithms::database::ReferenceMap;
use crate::algorithms::estimator::{Position, PositionEstimator};
use crate::algorithms::fingerprint::Fingerprint;
use crate::algorithms::matcher::Matcher;
use crate::algorithms::results::{GroundTruth, KSweep};
use crate::error::{FingerprintError, Result};
use std::ops::RangeInclusive;

/// 误差评估器
pub struct ErrorEvaluator;

impl ErrorEvaluator {
    /// 单个估计的欧氏误差
    pub fn euclidean(estimate: Position, truth: GroundTruth) -> f64 {
        let (x, y) = estimate.xy();
        (x - truth.x).hypot(y - truth.y)
    }

    /// 成对估计与真实位置的平均误差
    pub fn mean_error(estimates: &[Position], truths: &[GroundTruth]) -> Result<f64> {
        if estimates.len() != truths.len() {
            return Err(FingerprintError::LengthMismatch {
                estimates: estimates.len(),
                truths: truths.len(),
            });
        }
        if estimates.is_empty() {
            return Err(FingerprintError::NoEvaluationData);
        }

        let total: f64 = estimates
            .iter()
            .zip(truths)
            .map(|(e, t)| Self::euclidean(*e, *t))
            .sum();
        Ok(total / estimates.len() as f64)
    }

    /// 在 `ks` 上依次执行 匹配 → KNN/WKNN → 误差评估
    ///
    /// 任一 k 失败则整体失败，不返回部分结果
    pub fn sweep(
        live: &Fingerprint,
        map: &ReferenceMap,
        truth: GroundTruth,
        ks: RangeInclusive<usize>,
    ) -> Result<KSweep> {
        if ks.is_empty() {
            return Err(FingerprintError::NoEvaluationData);
        }

        if map.is_empty() {
            return Err(FingerprintError::EmptyReferenceMap);
        }
        if *ks.start() == 0 {
            return Err(FingerprintError::InvalidK {
                k: 0,
                available: map.len(),
            });
        }

        // 排名只算一次，各个 k 取前缀
        let ranked = Matcher::nearest(live, map, *ks.end())?;

        let mut sweep = KSweep::new();
        for k in ks {
            let top = &ranked[..k];
            let knn = PositionEstimator::knn(top)?;
            let wknn = PositionEstimator::wknn(top)?;
            sweep.push(
                k,
                Self::mean_error(&[knn], &[truth])?,
                Self::mean_error(&[wknn], &[truth])?,
            );
        }
        Ok(sweep)
    }
}
