/// 数据文件读写（CSV）
///
/// - 原始数据集：`time, x, y, direction, <信标地址>...`，每次扫描一行，只追加，表头只写一次
/// - 参考地图：`No, x, y, <信标地址>...`，按 (y, x) 升序，`No` 从 1 开始
///
/// 缺失的 RSSI 写为空单元格，不写 0

use crate::algorithms::{
    Fingerprint, GridCoord, RawRecord, ReferenceMap, ReferencePoint, Rssi, TransmitterSet,
};
use crate::error::{FingerprintError, Result};
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

const RAW_PREFIX: [&str; 4] = ["time", "x", "y", "direction"];
const MAP_PREFIX: [&str; 3] = ["No", "x", "y"];

// ============================================================================
// 原始数据集
// ============================================================================

/// 原始数据集表头
pub fn raw_header(transmitters: &TransmitterSet) -> Vec<String> {
    RAW_PREFIX
        .iter()
        .map(|s| s.to_string())
        .chain(transmitters.iter().map(|id| id.to_string()))
        .collect()
}

/// 追加写入原始记录；文件为空时先写表头
///
/// 文件已有表头时，信标列必须与 `transmitters` 完全一致（含顺序），否则返回 `Schema`
pub fn append_raw_records(
    path: &Path,
    transmitters: &TransmitterSet,
    records: &[RawRecord],
) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    let write_header = file.metadata()?.len() == 0;

    if !write_header {
        let mut rdr = csv::Reader::from_reader(&file);
        let existing = parse_header(rdr.headers()?, &RAW_PREFIX)?;
        if existing != *transmitters {
            return Err(FingerprintError::Schema(format!(
                "{} 的信标列与当前信标列表不一致",
                path.display()
            )));
        }
    }

    write_raw_records(&file, transmitters, records, write_header)?;
    info!("已追加 {} 条原始记录到 {}", records.len(), path.display());
    Ok(())
}

/// 写入原始记录
pub fn write_raw_records<W: Write>(
    writer: W,
    transmitters: &TransmitterSet,
    records: &[RawRecord],
    write_header: bool,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    if write_header {
        wtr.write_record(raw_header(transmitters))?;
    }

    for record in records {
        if record.readings.len() != transmitters.len() {
            return Err(FingerprintError::Schema(format!(
                "记录有 {} 个读数，信标数为 {}",
                record.readings.len(),
                transmitters.len()
            )));
        }
        let mut row = vec![
            record.time.clone(),
            record.coord.x.to_string(),
            record.coord.y.to_string(),
            record.direction.clone(),
        ];
        row.extend(record.readings.iter().map(format_rssi));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// 从文件读取原始数据集
pub fn read_raw_dataset(path: &Path) -> Result<(TransmitterSet, Vec<RawRecord>)> {
    let file = std::fs::File::open(path)?;
    read_raw_records(file)
}

/// 读取原始数据集，信标集合取自表头
pub fn read_raw_records<R: Read>(reader: R) -> Result<(TransmitterSet, Vec<RawRecord>)> {
    let mut rdr = csv::Reader::from_reader(reader);
    let transmitters = parse_header(rdr.headers()?, &RAW_PREFIX)?;
    let width = RAW_PREFIX.len() + transmitters.len();

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        check_width(&row, width)?;
        let coord = GridCoord::parse(&row[1], &row[2])?;
        let readings = parse_readings(&row, RAW_PREFIX.len(), &transmitters)?;
        records.push(RawRecord::new(&row[0], coord, &row[3], readings));
    }

    Ok((transmitters, records))
}

// ============================================================================
// 参考地图
// ============================================================================

/// 写入参考地图文件（覆盖）
pub fn write_reference_map_file(path: &Path, map: &ReferenceMap) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_reference_map(file, map)?;
    info!("参考地图已保存到 {}（{} 个参考点）", path.display(), map.len());
    Ok(())
}

pub fn write_reference_map<W: Write>(writer: W, map: &ReferenceMap) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    let header: Vec<String> = MAP_PREFIX
        .iter()
        .map(|s| s.to_string())
        .chain(map.transmitters().iter().map(|id| id.to_string()))
        .collect();
    wtr.write_record(&header)?;

    for (index, point) in map.iter().enumerate() {
        let mut row = vec![
            (index + 1).to_string(),
            point.coord.x.to_string(),
            point.coord.y.to_string(),
        ];
        row.extend(
            point
                .fingerprint
                .aligned(map.transmitters())
                .iter()
                .map(format_rssi),
        );
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// 从文件读取参考地图
pub fn read_reference_map_file(path: &Path) -> Result<ReferenceMap> {
    let file = std::fs::File::open(path)?;
    read_reference_map(file)
}

/// 读取参考地图；`No` 列只做格式校验，顺序由坐标决定
pub fn read_reference_map<R: Read>(reader: R) -> Result<ReferenceMap> {
    let mut rdr = csv::Reader::from_reader(reader);
    let transmitters = parse_header(rdr.headers()?, &MAP_PREFIX)?;
    let width = MAP_PREFIX.len() + transmitters.len();

    let mut points = Vec::new();
    for row in rdr.records() {
        let row = row?;
        check_width(&row, width)?;
        if row[0].trim().parse::<usize>().is_err() {
            return Err(FingerprintError::Schema(format!("行号无效: {:?}", &row[0])));
        }
        let coord = GridCoord::parse(&row[1], &row[2])?;
        let readings = parse_readings(&row, MAP_PREFIX.len(), &transmitters)?;
        points.push(ReferencePoint::new(
            coord,
            Fingerprint::from_aligned(&transmitters, &readings),
        ));
    }

    ReferenceMap::new(transmitters, points)
}

// ============================================================================
// 辅助函数
// ============================================================================

fn format_rssi(value: &Option<Rssi>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_header(headers: &csv::StringRecord, prefix: &[&str]) -> Result<TransmitterSet> {
    if headers.len() <= prefix.len() {
        return Err(FingerprintError::Schema(format!(
            "表头只有 {} 列，缺少信标列",
            headers.len()
        )));
    }
    for (i, expected) in prefix.iter().enumerate() {
        if headers[i].trim() != *expected {
            return Err(FingerprintError::Schema(format!(
                "第 {} 列应为 {:?}，实际为 {:?}",
                i + 1,
                expected,
                &headers[i]
            )));
        }
    }
    let addresses: Vec<&str> = headers.iter().skip(prefix.len()).collect();
    TransmitterSet::parse(&addresses)
}

fn check_width(row: &csv::StringRecord, width: usize) -> Result<()> {
    if row.len() != width {
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        return Err(FingerprintError::Schema(format!(
            "第 {} 行有 {} 列，应为 {}",
            line,
            row.len(),
            width
        )));
    }
    Ok(())
}

fn parse_readings(
    row: &csv::StringRecord,
    offset: usize,
    transmitters: &TransmitterSet,
) -> Result<Vec<Option<Rssi>>> {
    transmitters
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let cell = row[offset + i].trim();
            if cell.is_empty() {
                Ok(None)
            } else {
                cell.parse::<Rssi>()
                    .map(Some)
                    .map_err(|_| FingerprintError::InvalidReading {
                        transmitter: id.to_string(),
                        value: cell.to_string(),
                    })
            }
        })
        .collect()
}
