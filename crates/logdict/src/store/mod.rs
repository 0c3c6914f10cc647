// Copyright (c) 2026 the logdict authors.
// Licensed under the MIT license or the Apache License, Version 2.0, at your
// option. See LICENSE-MIT and LICENSE-APACHE in the repository root.

//! The local store contract: an ordered byte-key -> byte-value map with
//! point get, prefix seek, forward/reverse iteration, delete, and compact.
//!
//! Two backends implement [`LocalStore`]: [`memory::MemoryLocalStore`] (an
//! ordered in-memory map) and [`rocks::RocksLocalStore`] (an embedded
//! RocksDB instance). Every entry's value is the verbatim record byte
//! string produced by [`crate::codec::encode`] -- decoding to a logical
//! value happens only on read, at the `Dict` layer.

pub mod memory;
pub mod rocks;

use crate::error::Result;
use crate::prefix::PrefixExtractor;

/// The capability set both local store backends implement.
///
/// Operations that a backend cannot support (prefix scans on the in-memory
/// map, reverse iteration on the in-memory map, anything needing a prefix
/// extractor that was never configured) must fail with
/// [`crate::error::DictError::Unsupported`] rather than panic or silently do
/// the wrong thing.
pub trait LocalStore: Send {
    /// Point lookup. Returns `None` if the key is absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Inserts or overwrites `key`'s value.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Removes `key`. Idempotent: deleting a missing key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// True if `key` is present.
    fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// All keys, in ascending order.
    fn iter_keys(&self) -> Result<Vec<Vec<u8>>>;

    /// All values, in ascending key order.
    fn iter_values(&self) -> Result<Vec<Vec<u8>>>;

    /// All `(key, value)` pairs, in ascending key order.
    fn iter_items(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// `(key, value)` pairs whose key's prefix (per `extractor`) equals
    /// `prefix`, in ascending key order, stopping at the first key whose
    /// prefix no longer matches. Fails with `Unsupported` on a backend that
    /// cannot seek by prefix.
    fn iter_items_with_prefix(
        &self,
        prefix: &[u8],
        extractor: &PrefixExtractor,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// The smallest-keyed entry, if any.
    fn first_item(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>>;

    /// The largest-keyed entry, if any. Fails with `Unsupported` on a
    /// backend without reverse iteration.
    fn last_item(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>>;

    /// Issues a range compaction. A no-op (not an error) on backends without
    /// a compaction concept.
    fn compact(&self) -> Result<()>;

    /// Whether this backend supports prefix scans (`iter_items_with_prefix`).
    fn supports_prefix(&self) -> bool;

    /// Whether this backend supports reverse iteration (`last_item`).
    fn supports_reverse(&self) -> bool;
}
