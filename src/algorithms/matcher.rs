/// 指纹匹配
///
/// 对参考地图中的每个参考点计算与实时指纹的距离，返回距离最小的 k 个

use crate::algorithms::database::{ReferenceMap, ReferencePoint};
use crate::algorithms::fingerprint::{Fingerprint, GridCoord};
use crate::error::{FingerprintError, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// 参考点数量达到该值时并行计算距离
pub const PARALLEL_THRESHOLD: usize = 1024;

/// 单个匹配结果
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Match {
    pub coord: GridCoord,
    /// 共同信标上 |ΔRSSI| 之和
    pub distance: u32,
    /// 双方都有值的信标数量
    pub shared: usize,
}

impl Match {
    /// 距离为 0：指纹完全一致（或没有共同信标）
    pub fn is_exact(&self) -> bool {
        self.distance == 0
    }
}

/// 按距离升序比较，只看距离
///
/// 与稳定排序配合使用：距离相同时保持参考地图中的先后顺序（先出现者优先）
pub fn compare_by_distance(a: &Match, b: &Match) -> Ordering {
    a.distance.cmp(&b.distance)
}

/// 实时指纹与参考点的 L1 距离
///
/// 只统计双方都有值的信标，任一方缺失的信标不计入
pub fn fingerprint_distance(live: &Fingerprint, point: &ReferencePoint) -> Match {
    let mut distance = 0u32;
    let mut shared = 0usize;

    for (id, &rssi) in live.iter() {
        if let Some(reference) = point.get(id) {
            distance += (rssi as i32 - reference as i32).unsigned_abs();
            shared += 1;
        }
    }

    Match {
        coord: point.coord,
        distance,
        shared,
    }
}

/// 指纹匹配器
pub struct Matcher;

impl Matcher {
    /// 对全部参考点打分并按距离排序
    ///
    /// # 返回
    /// - 参考地图为空时返回 `EmptyReferenceMap`
    pub fn rank(live: &Fingerprint, map: &ReferenceMap) -> Result<Vec<Match>> {
        if map.is_empty() {
            return Err(FingerprintError::EmptyReferenceMap);
        }

        let mut matches: Vec<Match> = if map.len() >= PARALLEL_THRESHOLD {
            map.points()
                .par_iter()
                .map(|point| fingerprint_distance(live, point))
                .collect()
        } else {
            map.iter()
                .map(|point| fingerprint_distance(live, point))
                .collect()
        };

        let blind = matches.iter().filter(|m| m.shared == 0).count();
        if blind > 0 {
            debug!("{} 个参考点与实时指纹没有共同信标，距离记为 0", blind);
        }

        // sort_by 是稳定排序
        matches.sort_by(compare_by_distance);
        Ok(matches)
    }

    /// 距离最小的 k 个参考点
    ///
    /// # 参数
    /// - `k`: 需满足 1 <= k <= 参考点数量
    pub fn nearest(live: &Fingerprint, map: &ReferenceMap, k: usize) -> Result<Vec<Match>> {
        if map.is_empty() {
            return Err(FingerprintError::EmptyReferenceMap);
        }
        if k == 0 || k > map.len() {
            return Err(FingerprintError::InvalidK {
                k,
                available: map.len(),
            });
        }

        let mut ranked = Self::rank(live, map)?;
        ranked.truncate(k);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::transmitter::TransmitterSet;

    fn setup() -> (TransmitterSet, ReferenceMap) {
        let set = TransmitterSet::parse(&["E5:53:39:5F:31:1A", "F8:9D:4B:5D:44:F4"]).unwrap();
        let (a, b) = (set.ids()[0], set.ids()[1]);
        let points = vec![
            ReferencePoint::new(GridCoord::new(0, 0), Fingerprint::from_pairs(vec![(a, -60), (b, -70)])),
            ReferencePoint::new(GridCoord::new(10, 0), Fingerprint::from_pairs(vec![(a, -65), (b, -75)])),
            ReferencePoint::new(GridCoord::new(0, 10), Fingerprint::from_pairs(vec![(a, -80)])),
        ];
        let map = ReferenceMap::new(set.clone(), points).unwrap();
        (set, map)
    }

    #[test]
    fn test_distance_skips_missing() {
        let (set, map) = setup();
        let live = Fingerprint::from_pairs(vec![(set.ids()[0], -70), (set.ids()[1], -70)]);
        let m = fingerprint_distance(&live, &map.points()[2]);
        assert_eq!(m.distance, 10);
        assert_eq!(m.shared, 1);
    }

    #[test]
    fn test_nearest_ties_keep_map_order() {
        let (set, map) = setup();
        // A: 2+3=5, B: 3+2=5
        let live = Fingerprint::from_pairs(vec![(set.ids()[0], -62), (set.ids()[1], -73)]);
        let top = Matcher::nearest(&live, &map, 2).unwrap();
        assert_eq!(top[0].coord, GridCoord::new(0, 0));
        assert_eq!(top[1].coord, GridCoord::new(10, 0));
        assert_eq!(top[0].distance, 5);
        assert_eq!(top[1].distance, 5);
    }

    #[test]
    fn test_nearest_validates_k() {
        let (set, map) = setup();
        let live = Fingerprint::from_pairs(vec![(set.ids()[0], -62)]);
        assert!(matches!(
            Matcher::nearest(&live, &map, 0),
            Err(FingerprintError::InvalidK { k: 0, available: 3 })
        ));
        assert!(matches!(
            Matcher::nearest(&live, &map, 4),
            Err(FingerprintError::InvalidK { k: 4, available: 3 })
        ));
    }

    #[test]
    fn test_no_shared_transmitters_scores_zero() {
        let (_, map) = setup();
        let other: crate::algorithms::TransmitterId = "C2:80:A9:28:D0:79".parse().unwrap();
        let live = Fingerprint::from_pairs(vec![(other, -50)]);
        let ranked = Matcher::rank(&live, &map).unwrap();
        assert!(ranked.iter().all(|m| m.distance == 0 && m.shared == 0));
        // 全部并列，保持地图顺序
        let coords: Vec<_> = ranked.iter().map(|m| m.coord).collect();
        let expected: Vec<_> = map.iter().map(|p| p.coord).collect();
        assert_eq!(coords, expected);
    }

    #[test]
    fn test_parallel_path_matches_sequential_order() {
        let set = TransmitterSet::parse(&["E5:53:39:5F:31:1A"]).unwrap();
        let id = set.ids()[0];
        let points: Vec<_> = (0..PARALLEL_THRESHOLD as i32 + 10)
            .map(|i| {
                ReferencePoint::new(
                    GridCoord::new(i, 0),
                    Fingerprint::from_pairs(vec![(id, -60 - (i % 7) as i16)]),
                )
            })
            .collect();
        let map = ReferenceMap::new(set, points).unwrap();
        let live = Fingerprint::from_pairs(vec![(id, -63)]);

        let ranked = Matcher::rank(&live, &map).unwrap();
        let mut expected: Vec<_> = map.iter().map(|p| fingerprint_distance(&live, p)).collect();
        expected.sort_by(compare_by_distance);
        assert_eq!(ranked, expected);
    }
}
