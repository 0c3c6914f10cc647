// Copyright (c) 2026 the logdict authors.
// Licensed under the MIT license or the Apache License, Version 2.0, at your
// option. See LICENSE-MIT and LICENSE-APACHE in the repository root.

//! The real log client, backed by `rdkafka`'s blocking, thread-based
//! producer and consumer handles.
//!
//! [`KafkaLogClient::consume`] reproduces the catch-up wire protocol
//! exactly: an initial poll to obtain partition assignment, a per-partition
//! watermark/position check to build a "still pending" set, and a drain
//! loop that always yields the record obtained by the initial poll before
//! polling again, terminating once every assigned partition has been
//! observed at or past its high-water mark at the moment `consume` was
//! called.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::{KafkaError, KafkaResult, RDKafkaErrorCode};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::producer::{BaseProducer, BaseRecord, Producer};
use rdkafka::Offset;

use super::{ConsumedRecord, LogClient};
use crate::error::{DictError, Result};

pub struct KafkaLogClient {
    brokers: String,
    topic: String,
    group_id: String,
    session_timeout: Duration,
    poll_timeout: Duration,
    producer: Mutex<Option<BaseProducer>>,
    consumer: Mutex<Option<BaseConsumer>>,
}

impl KafkaLogClient {
    /// `group_id` should be the dict's GUID: it both isolates one
    /// replica's read position from another's and, combined with
    /// `auto.offset.reset = earliest`, makes a brand-new GUID replay the
    /// whole topic from the start.
    pub fn new(
        brokers: &[String],
        topic: impl Into<String>,
        group_id: impl Into<String>,
        session_timeout: Duration,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            brokers: brokers.join(","),
            topic: topic.into(),
            group_id: group_id.into(),
            session_timeout,
            poll_timeout,
            producer: Mutex::new(None),
            consumer: Mutex::new(None),
        }
    }

    fn build_producer(&self) -> Result<BaseProducer> {
        ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("api.version.request", "true")
            .create()
            .map_err(DictError::from)
    }

    fn build_consumer(&self) -> Result<BaseConsumer> {
        let consumer: BaseConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("api.version.request", "true")
            .set("socket.keepalive.enable", "true")
            .set(
                "session.timeout.ms",
                self.session_timeout.as_millis().to_string(),
            )
            .set("auto.offset.reset", "earliest")
            .create()?;
        consumer.subscribe(&[self.topic.as_str()])?;
        Ok(consumer)
    }
}

impl LogClient for KafkaLogClient {
    fn publish(&self, key: Vec<u8>, value: Option<Vec<u8>>) -> Result<()> {
        let payload = value.unwrap_or_default();

        let mut guard = self.producer.lock();
        if guard.is_none() {
            *guard = Some(self.build_producer()?);
        }
        let producer = guard.as_ref().unwrap();

        let record = BaseRecord::to(&self.topic).key(&key).payload(&payload);
        match producer.send(record) {
            Ok(()) => Ok(()),
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {
                // Transient buffer-full: flush synchronously and retry exactly once.
                producer.flush(self.poll_timeout)?;
                let retry = BaseRecord::to(&self.topic).key(&key).payload(&payload);
                producer.send(retry).map_err(|(err, _)| err.into())
            }
            Err((err, _)) => Err(err.into()),
        }
    }

    fn flush(&self) -> Result<()> {
        let guard = self.producer.lock();
        if let Some(producer) = guard.as_ref() {
            producer.flush(self.poll_timeout)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(topic = %self.topic, group_id = %self.group_id))]
    fn consume(&self) -> Result<Vec<ConsumedRecord>> {
        let mut guard = self.consumer.lock();
        if guard.is_none() {
            *guard = Some(self.build_consumer()?);
        }
        let consumer = guard.as_ref().unwrap();

        // An initial poll to trigger partition assignment. Its result, if
        // any, is retained and yielded before subsequent polls.
        let initial = consumer.poll(self.poll_timeout);

        // Build the pending set from the current assignment's watermarks
        // and positions.
        let mut pending = pending_partitions(consumer, &self.topic, self.poll_timeout)?;

        let mut out = Vec::new();
        let mut first_message = true;
        let mut initial = Some(initial);

        while first_message || !pending.is_empty() {
            let msg = if first_message {
                first_message = false;
                initial.take().flatten()
            } else {
                consumer.poll(self.poll_timeout)
            };
            apply_polled_message(msg, &mut pending, &mut out);
        }

        Ok(out)
    }
}

/// Builds the "still waiting to reach the watermark" set for every
/// currently assigned partition.
fn pending_partitions(
    consumer: &BaseConsumer,
    topic: &str,
    timeout: Duration,
) -> Result<HashMap<i32, i64>> {
    let assignment = consumer.assignment()?;
    let positions = consumer.position()?;

    let mut pending = HashMap::new();
    for elem in assignment.elements() {
        let partition = elem.partition();
        let (_low, high) = consumer.fetch_watermarks(topic, partition, timeout)?;
        let last_offset = high - 1;
        if last_offset < 0 {
            // Empty partition.
            continue;
        }

        let raw_position = positions
            .elements_for_topic(topic)
            .into_iter()
            .find(|p| p.partition() == partition)
            .map(|p| p.offset())
            .unwrap_or(Offset::Invalid);
        // Normalize "never read" sentinels (librdkafka returns a large
        // negative constant for Offset::Invalid/Offset::Beginning-ish
        // states) to -1.
        let position = match raw_position {
            Offset::Offset(n) => n,
            _ => -1,
        };
        let start_reference = (position - 1).max(-1);

        if last_offset > start_reference {
            pending.insert(partition, last_offset);
        }
    }
    Ok(pending)
}

/// Applies one polled message to the pending set and output buffer: skip
/// `None`/errored messages, remove a partition from `pending` once its
/// target offset is reached, and always yield whatever was actually
/// received.
///
/// Takes the message by value so the borrow it holds on the consumer ends
/// when this function returns, before the next `poll` call is made.
fn apply_polled_message(
    msg: Option<KafkaResult<BorrowedMessage<'_>>>,
    pending: &mut HashMap<i32, i64>,
    out: &mut Vec<ConsumedRecord>,
) {
    match msg {
        None => {}
        Some(Err(err)) => {
            tracing::warn!(error = %err, "skipping transient error while consuming");
        }
        Some(Ok(message)) => {
            let partition = message.partition();
            let offset = message.offset();
            if let Some(&target) = pending.get(&partition) {
                if offset >= target {
                    pending.remove(&partition);
                }
            }
            out.push(ConsumedRecord {
                key: message.key().unwrap_or_default().to_vec(),
                value: message.payload().unwrap_or_default().to_vec(),
                timestamp_ms: message.timestamp().to_millis().unwrap_or_default(),
            });
        }
    }
}
