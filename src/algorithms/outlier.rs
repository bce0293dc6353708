/// 基于四分位距（IQR）的 RSSI 离群值过滤
///
/// 同一信标的一批原始读数 → 一个稳健平均值

/// RSSI 读数（dBm）
pub type Rssi = i16;

/// IQR 倍数
pub const IQR_FACTOR: f64 = 1.5;

/// 保留区间 `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]`（闭区间）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// 由读数计算区间，读数为空时返回 None
    pub fn from_readings(readings: &[Rssi]) -> Option<Self> {
        let mut sorted: Vec<f64> = readings.iter().map(|&r| r as f64).collect();
        sorted.sort_by(f64::total_cmp);

        let q1 = percentile(&sorted, 25.0)?;
        let q3 = percentile(&sorted, 75.0)?;
        let iqr = q3 - q1;

        Some(IqrBounds {
            q1,
            q3,
            lower: q1 - IQR_FACTOR * iqr,
            upper: q3 + IQR_FACTOR * iqr,
        })
    }

    pub fn contains(&self, value: Rssi) -> bool {
        let v = value as f64;
        self.lower <= v && v <= self.upper
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// 线性插值百分位数，`sorted` 必须已升序；空输入返回 None
///
/// 位置 = p/100 · (n-1)，在相邻两个样本之间线性插值
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;

    let rank = (p / 100.0).clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// 区间内保留下来的读数
pub fn kept_readings(readings: &[Rssi], bounds: &IqrBounds) -> Vec<Rssi> {
    readings.iter().copied().filter(|&r| bounds.contains(r)).collect()
}

/// 稳健平均
///
/// - 空输入 → None（无数据，而不是 0）
/// - 过滤后为空 → 退回到全部原始读数的平均值（信标确实被扫描到过，不丢弃）
/// - 平均值按四舍六入五成双取整
pub fn robust_mean(readings: &[Rssi]) -> Option<Rssi> {
    let bounds = IqrBounds::from_readings(readings)?;
    mean_within(readings, &bounds)
}

fn mean_within(readings: &[Rssi], bounds: &IqrBounds) -> Option<Rssi> {
    let kept = kept_readings(readings, bounds);
    if kept.is_empty() {
        rounded_mean(readings)
    } else {
        rounded_mean(&kept)
    }
}

/// 算术平均并取整
pub fn rounded_mean(values: &[Rssi]) -> Option<Rssi> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().map(|&v| v as i64).sum();
    let mean = sum as f64 / values.len() as f64;
    Some(mean.round_ties_even() as Rssi)
}
