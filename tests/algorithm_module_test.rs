/// 算法模块综合测试
///
/// 覆盖离群过滤 → 建库 → 匹配 → KNN/WKNN → 误差评估的完整流程

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use fpnav::algorithms::*;
    use fpnav::FingerprintError;

    const TX_A: &str = "E5:53:39:5F:31:1A";
    const TX_B: &str = "F8:9D:4B:5D:44:F4";

    /// 两个参考点：A(0,0) = {-60, -70}，B(10,0) = {-65, -75}
    fn two_point_map() -> (TransmitterSet, ReferenceMap) {
        let set = TransmitterSet::parse(&[TX_A, TX_B]).unwrap();
        let (a, b) = (set.ids()[0], set.ids()[1]);
        let map = ReferenceMap::new(
            set.clone(),
            vec![
                ReferencePoint::new(
                    GridCoord::new(0, 0),
                    Fingerprint::from_pairs(vec![(a, -60), (b, -70)]),
                ),
                ReferencePoint::new(
                    GridCoord::new(10, 0),
                    Fingerprint::from_pairs(vec![(a, -65), (b, -75)]),
                ),
            ],
        )
        .unwrap();
        (set, map)
    }

    fn live(set: &TransmitterSet, a: Rssi, b: Rssi) -> Fingerprint {
        Fingerprint::from_pairs(vec![(set.ids()[0], a), (set.ids()[1], b)])
    }

    #[test]
    fn test_scenario_nearest_single_match() {
        let (set, map) = two_point_map();
        let fp = live(&set, -61, -71);

        let ranked = Matcher::rank(&fp, &map).unwrap();
        assert_eq!(ranked[0].distance, 2);
        assert_eq!(ranked[1].distance, 8);

        let top = Matcher::nearest(&fp, &map, 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].coord, GridCoord::new(0, 0));

        let knn = PositionEstimator::knn(&top).unwrap();
        assert_eq!(knn, Position::new(0, 0));
        assert_eq!(
            ErrorEvaluator::mean_error(&[knn], &[GroundTruth::new(0.0, 0.0)]).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_scenario_tie_broken_by_map_order() {
        let (set, map) = two_point_map();
        let fp = live(&set, -62, -73);

        let top = Matcher::nearest(&fp, &map, 2).unwrap();
        assert_eq!(top[0].coord, GridCoord::new(0, 0));
        assert_eq!(top[1].coord, GridCoord::new(10, 0));
        assert_eq!((top[0].distance, top[1].distance), (5, 5));

        assert_eq!(PositionEstimator::wknn(&top).unwrap(), Position::new(5, 0));
    }

    #[test]
    fn test_scenario_exact_hit_short_circuits_wknn() {
        let (set, map) = two_point_map();
        let fp = live(&set, -65, -75);

        let top = Matcher::nearest(&fp, &map, 2).unwrap();
        assert_eq!(top[0].coord, GridCoord::new(10, 0));
        assert_eq!(top[0].distance, 0);

        assert_eq!(PositionEstimator::wknn(&top).unwrap(), Position::new(10, 0));
        // KNN 不做短路，仍取平均
        assert_eq!(PositionEstimator::knn(&top).unwrap(), Position::new(5, 0));
    }

    #[test]
    fn test_scenario_empty_map_fails() {
        let set = TransmitterSet::parse(&[TX_A, TX_B]).unwrap();
        let map = ReferenceMap::new(set.clone(), Vec::new()).unwrap();
        let fp = live(&set, -60, -70);

        assert!(matches!(
            Matcher::nearest(&fp, &map, 1),
            Err(FingerprintError::EmptyReferenceMap)
        ));
        assert!(matches!(
            Matcher::rank(&fp, &map),
            Err(FingerprintError::EmptyReferenceMap)
        ));
        assert!(matches!(
            ErrorEvaluator::sweep(&fp, &map, GroundTruth::new(0.0, 0.0), 1..=3),
            Err(FingerprintError::EmptyReferenceMap)
        ));
    }

    #[test]
    fn test_own_data_distance_is_zero() {
        let set = TransmitterSet::parse(&[TX_A, TX_B]).unwrap();
        let records = vec![
            RawRecord::new("t0", GridCoord::new(3, 4), "N", vec![Some(-58), Some(-81)]),
            RawRecord::new("t1", GridCoord::new(3, 4), "N", vec![Some(-60), None]),
            RawRecord::new("t2", GridCoord::new(3, 4), "E", vec![Some(-59), Some(-79)]),
        ];
        let map = DatabaseBuilder::build(&set, &records).unwrap();
        let point = map.get(GridCoord::new(3, 4)).unwrap();

        let m = fingerprint_distance(&point.fingerprint, point);
        assert_eq!(m.distance, 0);
        assert_eq!(m.shared, 2);
    }

    #[test]
    fn test_knn_with_full_map_is_map_centroid() {
        let set = TransmitterSet::parse(&[TX_A]).unwrap();
        let id = set.ids()[0];
        let coords = [(0, 0), (4, 0), (8, 2), (2, 6), (6, 6)];
        let points = coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                ReferencePoint::new(
                    GridCoord::new(x, y),
                    Fingerprint::from_pairs(vec![(id, -50 - 3 * i as Rssi)]),
                )
            })
            .collect();
        let map = ReferenceMap::new(set, points).unwrap();
        let fp = Fingerprint::from_pairs(vec![(id, -57)]);

        let all = Matcher::nearest(&fp, &map, map.len()).unwrap();
        // x = 20/5 = 4，y = 14/5 = 2.8 → 3
        assert_eq!(PositionEstimator::knn(&all).unwrap(), Position::new(4, 3));
    }

    #[test]
    fn test_outlier_filter_properties() {
        let clean = [-70, -71, -69, -70, -72, -68];
        assert_eq!(robust_mean(&clean), rounded_mean(&clean));

        let noisy = [-70, -71, -69, -70, -72, -68, -30, -99];
        let bounds = IqrBounds::from_readings(&noisy).unwrap();
        let kept = kept_readings(&noisy, &bounds);
        assert!(!kept.contains(&-30));
        assert!(!kept.contains(&-99));
        for r in kept {
            assert!(bounds.contains(r));
        }
        assert_eq!(robust_mean(&noisy), Some(-70));
    }

    #[test]
    fn test_sweep_produces_parallel_sequences() {
        let (set, map) = two_point_map();
        let fp = live(&set, -61, -71);
        let truth = GroundTruth::new(0.0, 0.0);

        let sweep = ErrorEvaluator::sweep(&fp, &map, truth, 1..=2).unwrap();
        assert_eq!(sweep.ks, vec![1, 2]);
        assert_eq!(sweep.knn_errors.len(), 2);
        assert_eq!(sweep.wknn_errors.len(), 2);

        // k=1: 两种方法都取 A
        assert_eq!(sweep.knn_errors[0], 0.0);
        assert_eq!(sweep.wknn_errors[0], 0.0);
        // k=2: KNN (5,0)；WKNN 权重 1/2 与 1/8 → x = 10·(1/8)/(5/8) = 2
        assert_relative_eq!(sweep.knn_errors[1], 5.0);
        assert_relative_eq!(sweep.wknn_errors[1], 2.0);

        assert_eq!(sweep.best_knn(), Some((1, 0.0)));
    }

    #[test]
    fn test_sweep_rejects_k_beyond_map() {
        let (set, map) = two_point_map();
        let fp = live(&set, -61, -71);
        assert!(matches!(
            ErrorEvaluator::sweep(&fp, &map, GroundTruth::new(0.0, 0.0), 1..=3),
            Err(FingerprintError::InvalidK { k: 3, available: 2 })
        ));
        assert!(matches!(
            ErrorEvaluator::sweep(&fp, &map, GroundTruth::new(0.0, 0.0), 0..=1),
            Err(FingerprintError::InvalidK { k: 0, .. })
        ));
    }

    #[test]
    fn test_algorithm_module_complete_workflow() {
        println!("\n========== 完整工作流演示 ==========\n");

        let set = TransmitterSet::parse(&[TX_A, TX_B, "FD:AF:34:29:05:FE"]).unwrap();

        // 1. 在 3×2 网格上模拟原始扫描（每点 5 次，含一个离群值）
        let mut records = Vec::new();
        for y in 0..2 {
            for x in 0..3 {
                for pass in 0..5 {
                    let base_a = -50 - 5 * x as Rssi;
                    let base_b = -50 - 5 * y as Rssi;
                    let base_c = -60 - 2 * (x + y) as Rssi;
                    let a = if pass == 4 { base_a - 40 } else { base_a };
                    let c = if x == 2 { None } else { Some(base_c) };
                    records.push(RawRecord::new(
                        format!("2024-05-01 10:0{}:00", pass),
                        GridCoord::new(x * 10, y * 10),
                        "N",
                        vec![Some(a), Some(base_b), c],
                    ));
                }
            }
        }

        // 2. 建库
        let map = DatabaseBuilder::build(&set, &records).unwrap();
        assert_eq!(map.len(), 6);
        let first = map.points()[0].coord;
        let last = map.points()[5].coord;
        println!("参考点: {} 个，首 {}，末 {}", map.len(), first, last);
        assert_eq!(first, GridCoord::new(0, 0));
        assert_eq!(last, GridCoord::new(20, 10));

        // 离群值 -90 被剔除
        let p = map.get(GridCoord::new(0, 0)).unwrap();
        assert_eq!(p.get(&set.ids()[0]), Some(-50));

        // 3. 实时指纹：(10, 10) 附近
        let fp = Fingerprint::from_pairs(vec![
            (set.ids()[0], -55),
            (set.ids()[1], -55),
            (set.ids()[2], -64),
        ]);

        // 4. 定位
        let top = Matcher::nearest(&fp, &map, 3).unwrap();
        for m in &top {
            println!("  {} 差值 {}", m.coord, m.distance);
        }
        assert_eq!(top[0].coord, GridCoord::new(10, 10));
        assert!(top[0].is_exact());

        let wknn = PositionEstimator::wknn(&top).unwrap();
        assert_eq!(wknn, Position::new(10, 10));

        let knn = PositionEstimator::knn(&top).unwrap();
        let truth = GroundTruth::new(10.0, 10.0);
        let error = ErrorEvaluator::euclidean(knn, truth);
        let estimate = Estimate::new(knn, EstimateMethod::Knn, top.len()).with_error(error);
        println!("{}", estimate.detailed_description());
        assert!(error < 10.0);

        println!("\n========== 演示完成 ==========\n");
    }
}
