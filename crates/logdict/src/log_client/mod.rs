// Copyright (c) 2026 the logdict authors.
// Licensed under the MIT license or the Apache License, Version 2.0, at your
// option. See LICENSE-MIT and LICENSE-APACHE in the repository root.

//! The log client contract: bounded read of all records up to the current
//! high-water mark, and best-effort publish with buffered flush.
//!
//! [`kafka::KafkaLogClient`] is the real implementation, backed by
//! `rdkafka`. [`fake::FakeLogClient`] is an in-process stand-in used by
//! tests so the dict core's catch-up and convergence properties can be
//! exercised without a live broker.

#[cfg(feature = "kafka")]
pub mod kafka;

pub mod fake;

use crate::error::Result;

/// One record read back from the log during catch-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub timestamp_ms: i64,
}

/// The log client contract. A `Dict` is generic over this trait so it can
/// be driven by a real broker in production and by [`fake::FakeLogClient`]
/// in tests.
pub trait LogClient: Send {
    /// Publishes `value` under `key`. `value = None` is a tombstone
    /// synonym for empty bytes. Ordered within the partition: publishes
    /// issued in sequence on one client are observed in that order by any
    /// consumer.
    fn publish(&self, key: Vec<u8>, value: Option<Vec<u8>>) -> Result<()>;

    /// Blocks until every publish issued so far has been acknowledged.
    fn flush(&self) -> Result<()>;

    /// Consumes every record up to the partition's current high-water
    /// mark, returning once that mark is reached. See the crate-level
    /// catch-up protocol documentation in [`crate::dict`] for the exact
    /// watermark/assignment semantics a real implementation must
    /// reproduce.
    fn consume(&self) -> Result<Vec<ConsumedRecord>>;
}
