/// 信标（发射端）标识及有序信标集合

use crate::error::{FingerprintError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// MAC 地址格式；模式是编译期常量，构造失败属于程序错误
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[0-9A-Fa-f]{2}(:[0-9A-Fa-f]{2}){5}$").expect("静态正则表达式")
});

/// 信标 MAC 地址（6 字节）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransmitterId([u8; 6]);

impl TransmitterId {
    pub fn new(bytes: [u8; 6]) -> Self {
        TransmitterId(bytes)
    }

    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for TransmitterId {
    type Err = FingerprintError;

    /// 解析 `AA:BB:CC:DD:EE:FF` 格式，大小写均可
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if !ADDRESS_PATTERN.is_match(s) {
            return Err(FingerprintError::InvalidTransmitterId(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (slot, part) in bytes.iter_mut().zip(s.split(':')) {
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| FingerprintError::InvalidTransmitterId(s.to_string()))?;
        }
        Ok(TransmitterId(bytes))
    }
}

impl fmt::Display for TransmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}", a, b, c, d, e, g)
    }
}

/// 有序信标集合
///
/// 同一数据集内所有指纹共享同一个集合，顺序即 CSV 列顺序和特征向量顺序
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransmitterSet {
    ids: Vec<TransmitterId>,
    index: HashMap<TransmitterId, usize>,
}

impl TransmitterSet {
    /// 从有序列表创建，拒绝空列表和重复地址
    pub fn new(ids: Vec<TransmitterId>) -> Result<Self> {
        if ids.is_empty() {
            return Err(FingerprintError::Schema("信标列表为空".to_string()));
        }

        let mut index = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if index.insert(*id, i).is_some() {
                return Err(FingerprintError::Schema(format!("信标 {} 重复", id)));
            }
        }

        Ok(TransmitterSet { ids, index })
    }

    /// 从地址字符串创建
    pub fn parse<S: AsRef<str>>(addresses: &[S]) -> Result<Self> {
        let ids = addresses
            .iter()
            .map(|a| a.as_ref().parse())
            .collect::<Result<Vec<TransmitterId>>>()?;
        Self::new(ids)
    }

    /// 信标在集合中的位置
    pub fn position(&self, id: &TransmitterId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &TransmitterId) -> bool {
        self.index.contains_key(id)
    }

    pub fn ids(&self) -> &[TransmitterId] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransmitterId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
