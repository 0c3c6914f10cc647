// Copyright (c) 2026 the logdict authors.
// Licensed under the MIT license or the Apache License, Version 2.0, at your
// option. See LICENSE-MIT and LICENSE-APACHE in the repository root.

//! Construction options for a [`crate::Dict`].
//!
//! This is the full configuration surface the crate itself reads: no
//! environment variables or config files are consulted here. `Options`
//! derives `Serialize`/`Deserialize` purely so that an embedding
//! application's own config layer (YAML, env, whatever it already uses) can
//! produce one and hand it to [`crate::Dict::open`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::prefix::PrefixExtractor;

/// Default write-buffer memory budget for the embedded store: 4 MiB.
pub const DEFAULT_MEMORY_BUDGET: usize = 4 * 1024 * 1024;

/// Default minimum interval between two catch-ups.
pub const DEFAULT_CATCHUP_DELAY: Duration = Duration::from_secs(30);

/// Default consumer group session timeout.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(6);

/// Default per-poll bound used while draining the consumer during catch-up.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize, derive_builder::Builder)]
#[builder(default, build_fn(error = "derive_builder::UninitializedFieldError"))]
pub struct Options {
    /// Broker bootstrap addresses, e.g. `["localhost:9092"]`.
    pub brokers: Vec<String>,

    /// The single-partition topic this dict is backed by.
    pub topic: String,

    /// Use the embedded RocksDB-backed local store. When `false`, an
    /// in-memory `BTreeMap` is used instead, which does not support prefix
    /// scans, reverse iteration, or compaction.
    pub use_embedded_store: bool,

    /// Parent directory under which `rocksdb-<guid>` is created. Defaults to
    /// the process's current working directory.
    pub db_dir: Option<PathBuf>,

    /// Memory budget used to size the embedded store's write buffers. The
    /// store is opened with `write_buffer_size = memory_budget / 2` and at
    /// most two write buffers.
    pub memory_budget: usize,

    /// Minimum interval between two catch-ups triggered by reads/writes.
    #[serde(with = "humantime_serde")]
    pub catchup_delay: Duration,

    /// Instance identity: names both the local store directory
    /// (`rocksdb-<guid>`) and the consumer group used to track read
    /// position. A fresh random GUID is minted when not supplied.
    pub guid: Option<String>,

    /// Enables `items(Some(prefix))` prefix scans; requires
    /// `use_embedded_store`.
    #[serde(skip)]
    pub prefix_extractor: Option<PrefixExtractor>,

    /// Reject writes and deletes when set. Defaults to `true`: opening a
    /// dict read-write is an explicit opt-in rather than the default.
    pub read_only: bool,

    /// When set, catch up exactly once over the instance's lifetime and
    /// never again, regardless of `catchup_delay`.
    pub unique_producer: bool,

    /// Consumer group session timeout.
    #[serde(with = "humantime_serde")]
    pub consumer_session_timeout: Duration,

    /// Per-poll timeout bound used while draining the consumer.
    #[serde(with = "humantime_serde")]
    pub poll_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            brokers: Vec::new(),
            topic: String::new(),
            use_embedded_store: true,
            db_dir: None,
            memory_budget: DEFAULT_MEMORY_BUDGET,
            catchup_delay: DEFAULT_CATCHUP_DELAY,
            guid: None,
            prefix_extractor: None,
            read_only: true,
            unique_producer: false,
            consumer_session_timeout: DEFAULT_SESSION_TIMEOUT,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl Options {
    /// Resolves the GUID, minting a fresh random one if none was configured.
    pub(crate) fn resolved_guid(&self) -> String {
        self.guid
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    /// Resolves the parent directory for the local store, defaulting to the
    /// current working directory.
    pub(crate) fn resolved_db_dir(&self) -> std::io::Result<PathBuf> {
        match &self.db_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }

    /// The write-buffer size derived from `memory_budget`, per the formula
    /// documented on the field itself.
    pub(crate) fn write_buffer_size(&self) -> usize {
        self.memory_budget / 2
    }
}
