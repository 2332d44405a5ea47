//! Wire representation of timestamps.
//!
//! In memory every timestamp is milliseconds since the UNIX epoch. On the
//! wire it is an RFC 3339 string with millisecond precision, which keeps the
//! codec lossless. Incoming documents may also carry plain integer
//! milliseconds.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use super::entities::Timestamp;

/// Current wall-clock time in milliseconds.
pub fn now_millis() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Timestamp
}

/// Format a timestamp as RFC 3339 (`2025-07-18T10:00:00.123Z`).
pub fn to_rfc3339(ts: Timestamp) -> Option<String> {
    let millis = i64::try_from(ts).ok()?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parse an RFC 3339 string into milliseconds since the epoch.
pub fn parse_rfc3339(text: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .and_then(|dt| Timestamp::try_from(dt.timestamp_millis()).ok())
}

/// Accept either an RFC 3339 string or integer milliseconds.
pub fn from_wire(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(text) => parse_rfc3339(text),
        Value::Number(number) => number.as_u64(),
        _ => None,
    }
}

/// Serde adapter for `Timestamp` fields.
pub mod rfc3339_millis {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    use crate::domain::entities::Timestamp;

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        let text = super::to_rfc3339(*ts)
            .ok_or_else(|| S::Error::custom("timestamp out of range"))?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let value = Value::deserialize(deserializer)?;
        super::from_wire(&value)
            .ok_or_else(|| D::Error::custom("expected RFC 3339 timestamp or epoch milliseconds"))
    }
}
