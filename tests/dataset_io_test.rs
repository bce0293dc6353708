/// 数据文件读写测试
///
/// 原始数据集追加写入 → 建库 → 参考地图文件 → 重新读取

use fpnav::algorithms::*;
use fpnav::dataset;
use fpnav::FingerprintError;
use tempfile::tempdir;

fn set() -> TransmitterSet {
    TransmitterSet::parse(&["E5:53:39:5F:31:1A", "F8:9D:4B:5D:44:F4", "FD:AF:34:29:05:FE"])
        .unwrap()
}

fn session(time: &str, x: i32, y: i32, readings: [Option<Rssi>; 3]) -> RawRecord {
    RawRecord::new(time, GridCoord::new(x, y), "N", readings.to_vec())
}

#[test]
fn test_append_writes_header_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("raw.csv");
    let set = set();

    dataset::append_raw_records(
        &path,
        &set,
        &[session("2024-05-01 10:00:00", 0, 0, [Some(-60), None, Some(-80)])],
    )
    .unwrap();
    dataset::append_raw_records(
        &path,
        &set,
        &[
            session("2024-05-01 10:05:00", 5, 0, [Some(-66), Some(-71), None]),
            session("2024-05-01 10:05:01", 5, 0, [Some(-64), Some(-73), None]),
        ],
    )
    .unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "time,x,y,direction,E5:53:39:5F:31:1A,F8:9D:4B:5D:44:F4,FD:AF:34:29:05:FE"
    );
    assert_eq!(lines[1], "2024-05-01 10:00:00,0,0,N,-60,,-80");
    assert_eq!(contents.matches("time,x,y").count(), 1);

    let (read_set, records) = dataset::read_raw_dataset(&path).unwrap();
    assert_eq!(read_set, set);
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].readings, vec![Some(-64), Some(-73), None]);
}

#[test]
fn test_reference_map_file_roundtrip() {
    let dir = tempdir().unwrap();
    let raw_path = dir.path().join("raw.csv");
    let map_path = dir.path().join("avg.csv");
    let set = set();

    let records = vec![
        session("t", 5, 5, [Some(-70), Some(-72), None]),
        session("t", 0, 5, [Some(-61), None, Some(-90)]),
        session("t", 5, 0, [Some(-66), Some(-71), None]),
        session("t", 5, 0, [Some(-64), Some(-73), None]),
    ];
    dataset::append_raw_records(&raw_path, &set, &records).unwrap();

    let (read_set, read_records) = dataset::read_raw_dataset(&raw_path).unwrap();
    let map = DatabaseBuilder::build(&read_set, &read_records).unwrap();
    dataset::write_reference_map_file(&map_path, &map).unwrap();

    let contents = std::fs::read_to_string(&map_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines[0],
        "No,x,y,E5:53:39:5F:31:1A,F8:9D:4B:5D:44:F4,FD:AF:34:29:05:FE"
    );
    assert_eq!(lines[1], "1,5,0,-65,-72,");
    assert_eq!(lines[2], "2,0,5,-61,,-90");
    assert_eq!(lines[3], "3,5,5,-70,-72,");

    let reloaded = dataset::read_reference_map_file(&map_path).unwrap();
    assert_eq!(reloaded, map);
}

#[test]
fn test_missing_file_propagates_io_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.csv");
    assert!(matches!(
        dataset::read_reference_map_file(&missing),
        Err(FingerprintError::Io(_))
    ));
}

#[test]
fn test_reference_map_rejects_duplicate_rows() {
    let csv = "\
No,x,y,E5:53:39:5F:31:1A
1,0,0,-60
2,0,0,-61
";
    assert!(matches!(
        dataset::read_reference_map(csv.as_bytes()),
        Err(FingerprintError::DuplicateCoordinate { x: 0, y: 0 })
    ));
}

#[test]
fn test_raw_dataset_rejects_float_coordinate() {
    let csv = "\
time,x,y,direction,E5:53:39:5F:31:1A
2024-05-01 10:00:00,0,2.5,N,-60
";
    assert!(matches!(
        dataset::read_raw_records(csv.as_bytes()),
        Err(FingerprintError::InvalidCoordinate { field: "y", .. })
    ));
}

#[test]
fn test_append_rejects_reordered_transmitters() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("raw.csv");
    let first = TransmitterSet::parse(&["E5:53:39:5F:31:1A", "F8:9D:4B:5D:44:F4"]).unwrap();
    let swapped = TransmitterSet::parse(&["F8:9D:4B:5D:44:F4", "E5:53:39:5F:31:1A"]).unwrap();

    let row = |readings: Vec<Option<Rssi>>| {
        RawRecord::new("2024-05-01 10:00:00", GridCoord::new(0, 0), "N", readings)
    };
    dataset::append_raw_records(&path, &first, &[row(vec![Some(-60), Some(-90)])]).unwrap();

    let result = dataset::append_raw_records(&path, &swapped, &[row(vec![Some(-90), Some(-60)])]);
    assert!(matches!(result, Err(FingerprintError::Schema(_))));

    // 文件保持不变
    let (read_set, records) = dataset::read_raw_dataset(&path).unwrap();
    assert_eq!(read_set, first);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].readings, vec![Some(-60), Some(-90)]);
}
