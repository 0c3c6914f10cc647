// Copyright (c) 2026 the logdict authors.
// Licensed under the MIT license or the Apache License, Version 2.0, at your
// option. See LICENSE-MIT and LICENSE-APACHE in the repository root.

use std::path::PathBuf;

/// The closed error surface of this crate.
///
/// There is no persistent error state: a failed call leaves the [`crate::Dict`]
/// usable for subsequent attempts. Transient conditions (a full producer buffer,
/// a per-poll consumer error) are recovered internally by the log client and
/// never surface as a variant here.
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    /// A point lookup found no entry for the given key.
    #[error("key not found: {0:?}")]
    NotFound(Vec<u8>),

    /// A write or delete was attempted on a read-only instance.
    #[error("dict was opened read-only")]
    ReadOnly,

    /// The requested operation is not available on the active local store
    /// backend, or requires configuration (such as a prefix extractor) that
    /// was not supplied.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// A key or value did not have the type the wire protocol requires.
    #[error("type error: {0}")]
    Type(&'static str),

    /// A stored record could not be parsed as the three-element
    /// `[timestamp_ms, binary_flag, payload]` envelope.
    #[error("failed to decode record: {0}")]
    Decode(#[from] serde_json::Error),

    /// The payload's `binary_flag` claimed a base64 body but the bytes did not
    /// decode.
    #[error("failed to decode base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The message broker failed in a way the log client could not locally
    /// recover from (e.g. unreachable past the session timeout).
    #[error("broker error: {0}")]
    Broker(String),

    /// The embedded local store failed.
    #[error("local store error: {0}")]
    Store(#[from] rocksdb::Error),

    /// Local filesystem I/O failed, e.g. creating the store directory.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(feature = "kafka")]
impl From<rdkafka::error::KafkaError> for DictError {
    fn from(value: rdkafka::error::KafkaError) -> Self {
        DictError::Broker(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DictError>;
