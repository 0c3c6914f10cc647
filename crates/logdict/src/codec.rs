// Copyright (c) 2026 the logdict authors.
// Licensed under the MIT license or the Apache License, Version 2.0, at your
// option. See LICENSE-MIT and LICENSE-APACHE in the repository root.

//! The on-the-wire record envelope: `[timestamp_ms, binary_flag, payload]`.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

use crate::error::{DictError, Result};

/// The tombstone value published to delete a key. Stored locally as a
/// zero-length byte string, never as a `Record`.
pub const TOMBSTONE: &[u8] = b"";

/// Legacy tombstone marker accepted on consume for backward compatibility
/// with older writers. New writers never produce this; see [`TOMBSTONE`].
pub const LEGACY_TOMBSTONE: &[u8] = b"__delete_key__";

/// The logical value a caller works with, as opposed to the raw record bytes
/// stored in the log and the local store.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalValue {
    /// An opaque byte string, carried base64-encoded in the record.
    Bytes(Vec<u8>),
    /// A JSON-representable scalar or structure, carried verbatim in the
    /// record.
    Json(Value),
}

impl LogicalValue {
    /// Returns the byte string if this value was published as one.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            LogicalValue::Bytes(b) => Some(b),
            LogicalValue::Json(_) => None,
        }
    }

    /// Returns the JSON value if this value was published as one.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            LogicalValue::Json(v) => Some(v),
            LogicalValue::Bytes(_) => None,
        }
    }
}

impl From<Vec<u8>> for LogicalValue {
    fn from(value: Vec<u8>) -> Self {
        LogicalValue::Bytes(value)
    }
}

impl From<&[u8]> for LogicalValue {
    fn from(value: &[u8]) -> Self {
        LogicalValue::Bytes(value.to_vec())
    }
}

impl From<String> for LogicalValue {
    fn from(value: String) -> Self {
        LogicalValue::Json(Value::String(value))
    }
}

impl From<&str> for LogicalValue {
    fn from(value: &str) -> Self {
        LogicalValue::Json(Value::String(value.to_owned()))
    }
}

impl From<Value> for LogicalValue {
    fn from(value: Value) -> Self {
        LogicalValue::Json(value)
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as i64
}

/// Encodes a logical value into the record byte string published to the log
/// and written verbatim into the local store.
///
/// Non-ASCII JSON text is preserved rather than `\uXXXX`-escaped, matching
/// `serde_json`'s default output.
pub fn encode(value: &LogicalValue, timestamp_ms: Option<i64>) -> Vec<u8> {
    let ts = timestamp_ms.unwrap_or_else(now_millis);
    let record = match value {
        LogicalValue::Bytes(bytes) => {
            serde_json::json!([ts, 1, BASE64.encode(bytes)])
        }
        LogicalValue::Json(json) => {
            serde_json::json!([ts, 0, json])
        }
    };
    serde_json::to_vec(&record).expect("record envelope always serializes")
}

/// Decodes a record byte string back into its logical value and timestamp.
///
/// Fails with [`DictError::Decode`] if `record_bytes` is not a JSON array of
/// exactly three elements of the expected shapes, or with
/// [`DictError::Base64`] if the binary flag is set but the payload is not
/// valid base64.
pub fn decode(record_bytes: &[u8]) -> Result<(LogicalValue, i64)> {
    let array: Vec<Value> = serde_json::from_slice(record_bytes)?;
    let [ts_value, flag_value, payload] = <[Value; 3]>::try_from(array).map_err(|_| {
        DictError::Decode(serde_json::Error::io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "record is not a 3-element array",
        )))
    })?;

    let ts = ts_value.as_i64().ok_or_else(|| {
        DictError::Decode(serde_json::Error::io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "record timestamp is not an integer",
        )))
    })?;
    let is_binary = flag_value.as_i64() == Some(1);

    if is_binary {
        let text = payload.as_str().ok_or_else(|| {
            DictError::Decode(serde_json::Error::io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "binary record payload is not a string",
            )))
        })?;
        let bytes = BASE64.decode(text)?;
        Ok((LogicalValue::Bytes(bytes), ts))
    } else {
        Ok((LogicalValue::Json(payload), ts))
    }
}

/// True if `value` is a log tombstone: an empty byte string, or (for
/// backward compatibility with older writers) the legacy literal
/// `__delete_key__`.
pub fn is_tombstone(value: &[u8]) -> bool {
    value == TOMBSTONE || value == LEGACY_TOMBSTONE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bytes() {
        let value = LogicalValue::Bytes(vec![0x00, 0xff, 0x10]);
        let encoded = encode(&value, Some(1_700_000_000_000));
        let (decoded, ts) = decode(&encoded).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(ts, 1_700_000_000_000);
    }

    #[test]
    fn round_trips_json_scalar() {
        let value = LogicalValue::from("one");
        let encoded = encode(&value, Some(42));
        let (decoded, ts) = decode(&encoded).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(ts, 42);
    }

    #[test]
    fn preserves_non_ascii_text() {
        let value = LogicalValue::from("héllo wörld");
        let encoded = encode(&value, Some(1));
        let text = std::str::from_utf8(&encoded).unwrap();
        assert!(text.contains("héllo wörld"));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn defaults_timestamp_to_now() {
        let before = now_millis();
        let encoded = encode(&LogicalValue::from("x"), None);
        let (_, ts) = decode(&encoded).unwrap();
        let after = now_millis();
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(decode(b"not json").is_err());
        assert!(decode(b"[1,2]").is_err());
        assert!(decode(b"[1,1,\"not base64!!\"]").is_err());
    }

    #[test]
    fn empty_bytes_and_legacy_literal_are_tombstones() {
        assert!(is_tombstone(b""));
        assert!(is_tombstone(b"__delete_key__"));
        assert!(!is_tombstone(b"x"));
    }
}
