// Copyright (c) 2026 the logdict authors.
// Licensed under the MIT license or the Apache License, Version 2.0, at your
// option. See LICENSE-MIT and LICENSE-APACHE in the repository root.

//! `logdict` is a durable, replayable key-value map whose authoritative
//! state lives in a partitioned append-only log (a message broker acting as
//! a change-log), while each process keeps a local materialized view for
//! fast point and range reads.
//!
//! Writes are published to the log and applied locally in the same call
//! (write-through); other processes catch up by replaying the log from
//! wherever their own consumer group last left off. Deletes publish a
//! tombstone record rather than removing history: the log is the single
//! source of truth, and any number of readers can independently rebuild
//! their local state by replaying it from the beginning.
//!
//! The [`Dict`] facade is generic over [`LogClient`](log_client::LogClient)
//! so it can be driven by a real broker (feature `kafka`, the default) or by
//! an in-process fake for tests.
//!
//! ```no_run
//! use logdict::{Options, OptionsBuilder};
//!
//! # #[cfg(feature = "kafka")]
//! # fn example() -> logdict::Result<()> {
//! let options: Options = OptionsBuilder::default()
//!     .brokers(vec!["localhost:9092".to_owned()])
//!     .topic("my-dict".to_owned())
//!     .build()
//!     .unwrap();
//! let mut dict = logdict::Dict::open(options)?;
//! dict.set("greeting", "hello", None)?;
//! let (value, _ts) = dict.get("greeting")?;
//! assert_eq!(value.as_json().and_then(|v| v.as_str()), Some("hello"));
//! # Ok(())
//! # }
//! ```

mod codec;
mod dict;
mod error;
mod log_client;
mod options;
mod prefix;
mod store;

pub use codec::LogicalValue;
pub use dict::{Dict, KeyBytes};
pub use error::{DictError, Result};
pub use log_client::fake::{FakeLogClient, FakeTopic};
#[cfg(feature = "kafka")]
pub use log_client::kafka::KafkaLogClient;
pub use log_client::{ConsumedRecord, LogClient};
pub use options::{Options, OptionsBuilder, DEFAULT_CATCHUP_DELAY, DEFAULT_MEMORY_BUDGET};
pub use prefix::PrefixExtractor;
pub use store::memory::MemoryLocalStore;
pub use store::rocks::RocksLocalStore;
pub use store::LocalStore;
