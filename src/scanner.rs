/// 蓝牙扫描协作方
///
/// 核心算法只接收扫描完成后的一整批读数；异步扫描、超时都封装在这里

use crate::algorithms::{Fingerprint, GridCoord, RawRecord, Rssi, TransmitterId, TransmitterSet};
use crate::config::Config;
use crate::error::{FingerprintError, Result};
use btleplug::api::{Central, CentralEvent, Manager, Peripheral, ScanFilter};
use btleplug::platform::{Adapter, Manager as PlatformManager, PeripheralId};
use chrono::{DateTime, Local};
use futures::{Stream, StreamExt};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info};

/// 原始数据集中 `time` 列的格式
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 一次扫描得到的读数（只包含目标信标）
#[derive(Clone, Debug, PartialEq)]
pub struct ScanPass {
    pub timestamp: DateTime<Local>,
    pub readings: Fingerprint,
}

/// 一批扫描结果
#[derive(Clone, Debug, PartialEq)]
pub struct ScanBatch {
    pub transmitters: TransmitterSet,
    pub passes: Vec<ScanPass>,
}

impl ScanBatch {
    pub fn new(transmitters: TransmitterSet, passes: Vec<ScanPass>) -> Self {
        ScanBatch {
            transmitters,
            passes,
        }
    }

    /// 每个信标在所有扫描中的读数
    pub fn samples(&self) -> BTreeMap<TransmitterId, Vec<Rssi>> {
        let mut samples: BTreeMap<TransmitterId, Vec<Rssi>> = BTreeMap::new();
        for pass in &self.passes {
            for (id, rssi) in pass.readings.iter() {
                samples.entry(*id).or_default().push(*rssi);
            }
        }
        samples
    }

    /// 离群过滤后的实时指纹
    pub fn live_fingerprint(&self) -> Fingerprint {
        Fingerprint::from_raw_samples(&self.samples())
    }

    /// 转为原始数据集记录（每次扫描一行）
    pub fn to_raw_records(&self, coord: GridCoord, direction: &str) -> Vec<RawRecord> {
        self.passes
            .iter()
            .map(|pass| {
                RawRecord::new(
                    pass.timestamp.format(TIME_FORMAT).to_string(),
                    coord,
                    direction,
                    pass.readings.aligned(&self.transmitters),
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

/// 同步扫描接口：返回扫描完成后的一整批读数
pub trait RssiScanner {
    fn scan_batch(&mut self) -> Result<ScanBatch>;
}

/// 连续执行 `passes` 次扫描
///
/// `poll` 每次返回 (地址, RSSI) 列表；非目标信标和无法解析的地址被忽略，
/// 同一地址在一次扫描中出现多次时取最后一次
pub async fn collect_passes<F, Fut>(
    transmitters: &TransmitterSet,
    passes: usize,
    mut poll: F,
) -> Result<Vec<ScanPass>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<(String, Rssi)>>>,
{
    let mut collected = Vec::with_capacity(passes);

    for pass in 0..passes {
        let observations = poll().await?;
        let mut readings = Fingerprint::new();
        for (address, rssi) in observations {
            match address.parse::<TransmitterId>() {
                Ok(id) if transmitters.contains(&id) => readings.insert(id, rssi),
                _ => continue,
            }
        }

        debug!("第 {}/{} 次扫描: {} 个目标信标", pass + 1, passes, readings.count());
        collected.push(ScanPass {
            timestamp: Local::now(),
            readings,
        });
    }

    Ok(collected)
}

// ============================================================================
// btleplug 实现
// ============================================================================

/// 基于 btleplug 的 BLE 扫描器
///
/// 使用第一个蓝牙适配器；每次扫描：订阅事件 → 启动扫描 → 记录窗口内发出广播的外设 → 读取 RSSI → 停止扫描
///
/// btleplug 会跨扫描缓存外设及其最后的 RSSI，所以只读取本窗口内有事件的外设
pub struct BleScanner {
    transmitters: TransmitterSet,
    passes: usize,
    pass_duration: Duration,
}

impl BleScanner {
    pub fn new(transmitters: TransmitterSet, passes: usize, pass_duration: Duration) -> Self {
        BleScanner {
            transmitters,
            passes,
            pass_duration,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.transmitter_set()?,
            config.scan.passes,
            config.pass_duration(),
        ))
    }

    /// 总扫描时长
    pub fn total_duration(&self) -> Duration {
        self.pass_duration * self.passes as u32
    }

    async fn scan_async(&self) -> Result<Vec<ScanPass>> {
        let manager = PlatformManager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FingerprintError::Scan("未找到蓝牙适配器".to_string()))?;

        let adapter = &adapter;
        let duration = self.pass_duration;
        collect_passes(&self.transmitters, self.passes, move || {
            poll_adapter(adapter, duration)
        })
        .await
    }
}

impl RssiScanner for BleScanner {
    fn scan_batch(&mut self) -> Result<ScanBatch> {
        info!(
            "开始扫描: {} 次 × {:?}，共 {:?}",
            self.passes,
            self.pass_duration,
            self.total_duration()
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let passes = runtime.block_on(self.scan_async())?;

        Ok(ScanBatch::new(self.transmitters.clone(), passes))
    }
}

async fn poll_adapter(adapter: &Adapter, duration: Duration) -> Result<Vec<(String, Rssi)>> {
    let events = adapter.events().await?;
    adapter.start_scan(ScanFilter::default()).await?;

    let heard: Vec<PeripheralId> = events_within(events, duration)
        .await
        .into_iter()
        .filter_map(|event| match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => Some(id),
            _ => None,
        })
        .collect();

    let mut seen = HashSet::new();
    let mut observations = Vec::new();
    for id in heard {
        if !seen.insert(id.clone()) {
            continue;
        }
        // 单个设备查询失败不影响其他设备
        let Ok(peripheral) = adapter.peripheral(&id).await else {
            continue;
        };
        if let Ok(Some(props)) = peripheral.properties().await {
            if let Some(rssi) = props.rssi {
                observations.push((peripheral.address().to_string(), rssi));
            }
        }
    }

    adapter.stop_scan().await?;
    Ok(observations)
}

/// 收集 `window` 时长内到达的事件；流提前结束时立即返回
pub(crate) async fn events_within<S, T>(mut events: S, window: Duration) -> Vec<T>
where
    S: Stream<Item = T> + Unpin,
{
    let deadline = Instant::now() + window;
    let mut collected = Vec::new();
    while let Ok(Some(event)) = timeout_at(deadline, events.next()).await {
        collected.push(event);
    }
    collected
}
