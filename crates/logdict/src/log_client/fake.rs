// Copyright (c) 2026 the logdict authors.
// Licensed under the MIT license or the Apache License, Version 2.0, at your
// option. See LICENSE-MIT and LICENSE-APACHE in the repository root.

//! An in-process stand-in for a real broker, used by tests to exercise the
//! catch-up protocol's *observable* contract (bounded replay to the
//! watermark at call time, per-client read cursors, flush-before-visible
//! publishing) without a live broker.
//!
//! This intentionally does not reproduce every quirk of the real
//! `rdkafka`-backed client's polling loop (see [`super::kafka`]'s module
//! docs for the precise wire protocol that one follows) -- only the
//! contract [`super::LogClient`] documents, which is what every testable
//! property in this crate's test suite actually depends on.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ConsumedRecord, LogClient};
use crate::error::Result;

#[derive(Debug, Clone)]
struct Entry {
    key: Vec<u8>,
    value: Vec<u8>,
    timestamp_ms: i64,
}

/// A shared, single-partition in-memory topic. Clone cheaply (it's an
/// `Arc` underneath) and hand a [`FakeLogClient`] to each simulated
/// process that should observe it.
#[derive(Clone, Default)]
pub struct FakeTopic {
    entries: Arc<Mutex<Vec<Entry>>>,
}

static FAKE_CLOCK: AtomicI64 = AtomicI64::new(1);

fn next_fake_timestamp() -> i64 {
    FAKE_CLOCK.fetch_add(1, Ordering::Relaxed)
}

impl FakeTopic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a client reading and writing this topic, as if it were a
    /// fresh process with its own read cursor.
    pub fn client(&self) -> FakeLogClient {
        FakeLogClient {
            topic: self.clone(),
            cursor: Mutex::new(0),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Directly appends a record to the topic, bypassing any client's
    /// publish/flush buffering. Used to pre-seed a topic the way an
    /// out-of-band legacy writer would have, e.g. to test the legacy
    /// `__delete_key__` tombstone literal.
    pub fn seed(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.entries.lock().push(Entry {
            key: key.into(),
            value: value.into(),
            timestamp_ms: next_fake_timestamp(),
        });
    }

    fn high_watermark(&self) -> usize {
        self.entries.lock().len()
    }
}

/// A [`LogClient`] backed by a [`FakeTopic`]. Publishes are buffered until
/// [`LogClient::flush`], matching the real client's "not visible to
/// consumers until acknowledged" behavior; each client keeps its own cursor
/// into the shared topic, so two different GUIDs reading the same topic
/// have independent read positions.
pub struct FakeLogClient {
    topic: FakeTopic,
    cursor: Mutex<usize>,
    pending: Mutex<Vec<Entry>>,
}

impl LogClient for FakeLogClient {
    fn publish(&self, key: Vec<u8>, value: Option<Vec<u8>>) -> Result<()> {
        self.pending.lock().push(Entry {
            key,
            value: value.unwrap_or_default(),
            timestamp_ms: next_fake_timestamp(),
        });
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return Ok(());
        }
        self.topic.entries.lock().extend(pending.drain(..));
        Ok(())
    }

    fn consume(&self) -> Result<Vec<ConsumedRecord>> {
        let watermark = self.topic.high_watermark();
        let mut cursor = self.cursor.lock();
        if *cursor >= watermark {
            return Ok(Vec::new());
        }

        let entries = self.topic.entries.lock();
        let records = entries[*cursor..watermark]
            .iter()
            .map(|e| ConsumedRecord {
                key: e.key.clone(),
                value: e.value.clone(),
                timestamp_ms: e.timestamp_ms,
            })
            .collect();
        *cursor = watermark;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_is_not_visible_until_flush() {
        let topic = FakeTopic::new();
        let client = topic.client();
        client.publish(b"a".to_vec(), Some(b"1".to_vec())).unwrap();
        assert!(client.consume().unwrap().is_empty());
        client.flush().unwrap();
        let records = client.consume().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, b"a");
    }

    #[test]
    fn independent_cursors_per_client() {
        let topic = FakeTopic::new();
        let writer = topic.client();
        writer.publish(b"a".to_vec(), Some(b"1".to_vec())).unwrap();
        writer.flush().unwrap();

        let reader_a = topic.client();
        let reader_b = topic.client();
        assert_eq!(reader_a.consume().unwrap().len(), 1);
        // reader_a has now caught up; reader_b, with an independent
        // cursor, still sees the same backlog.
        assert!(reader_a.consume().unwrap().is_empty());
        assert_eq!(reader_b.consume().unwrap().len(), 1);
    }

    #[test]
    fn consume_is_bounded_by_watermark_at_call_time() {
        let topic = FakeTopic::new();
        let writer = topic.client();
        let reader = topic.client();

        writer.publish(b"a".to_vec(), Some(b"1".to_vec())).unwrap();
        writer.flush().unwrap();

        let first_batch = reader.consume().unwrap();
        assert_eq!(first_batch.len(), 1);

        writer.publish(b"b".to_vec(), Some(b"2".to_vec())).unwrap();
        writer.flush().unwrap();

        let second_batch = reader.consume().unwrap();
        assert_eq!(second_batch.len(), 1);
        assert_eq!(second_batch[0].key, b"b");
    }
}
