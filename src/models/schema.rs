//! 持久化数据的版本封装与迁移
//!
//! 所有写入存储的数据都包在 `{ "version": N, "records": ... }` 中。
//! 旧版数据（裸数组 / 裸对象、毫秒时间戳）在读取时识别为待迁移，
//! 由调用方在打开存储时写回当前版本。

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::StorageError;

/// 当前数据版本
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    records: T,
}

/// 读取结果
#[derive(Debug, PartialEq)]
pub enum Decoded<T> {
    /// 已是当前版本
    Current(T),
    /// 旧版数据，已在内存中转换，需要写回
    Migrated(T),
}

impl<T> Decoded<T> {
    pub fn into_inner(self) -> T {
        match self {
            Decoded::Current(v) | Decoded::Migrated(v) => v,
        }
    }

    pub fn needs_write_back(&self) -> bool {
        matches!(self, Decoded::Migrated(_))
    }
}

/// 解析一块存储数据
pub fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<Decoded<T>, StorageError> {
    let corrupt = |source| StorageError::CorruptBlob {
        key: key.to_string(),
        source,
    };

    let value: JsonValue = serde_json::from_str(raw).map_err(corrupt)?;

    let is_envelope = value
        .as_object()
        .map(|obj| obj.contains_key("version") && obj.contains_key("records"))
        .unwrap_or(false);

    if !is_envelope {
        // v0：没有版本信息的原始数据
        let records = serde_json::from_value(value).map_err(corrupt)?;
        return Ok(Decoded::Migrated(records));
    }

    let envelope: Envelope<T> = serde_json::from_value(value).map_err(corrupt)?;
    if envelope.version > CURRENT_VERSION {
        return Err(StorageError::UnsupportedVersion {
            key: key.to_string(),
            found: envelope.version,
            supported: CURRENT_VERSION,
        });
    }
    if envelope.version < CURRENT_VERSION {
        Ok(Decoded::Migrated(envelope.records))
    } else {
        Ok(Decoded::Current(envelope.records))
    }
}

/// 以当前版本编码数据
pub fn encode<T: Serialize>(key: &str, records: &T) -> Result<String, StorageError> {
    serde_json::to_string(&Envelope {
        version: CURRENT_VERSION,
        records,
    })
    .map_err(|source| StorageError::CorruptBlob {
        key: key.to_string(),
        source,
    })
}

/// 兼容毫秒时间戳（整数 / 浮点 / 数字字符串）与 RFC 3339 字符串
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{Error, Visitor};
    use std::fmt;

    struct TimestampVisitor;

    impl<'de> Visitor<'de> for TimestampVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an RFC 3339 string or a millisecond timestamp")
        }

        fn visit_i64<E: Error>(self, value: i64) -> Result<Self::Value, E> {
            Utc.timestamp_millis_opt(value)
                .single()
                .ok_or_else(|| E::custom(format!("时间戳超出范围: {}", value)))
        }

        fn visit_u64<E: Error>(self, value: u64) -> Result<Self::Value, E> {
            let millis = i64::try_from(value).map_err(E::custom)?;
            self.visit_i64(millis)
        }

        fn visit_f64<E: Error>(self, value: f64) -> Result<Self::Value, E> {
            self.visit_i64(value as i64)
        }

        fn visit_str<E: Error>(self, value: &str) -> Result<Self::Value, E> {
            if let Ok(millis) = value.trim().parse::<i64>() {
                return self.visit_i64(millis);
            }
            DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(E::custom)
        }
    }

    deserializer.deserialize_any(TimestampVisitor)
}
