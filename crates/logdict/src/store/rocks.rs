// Copyright (c) 2026 the logdict authors.
// Licensed under the MIT license or the Apache License, Version 2.0, at your
// option. See LICENSE-MIT and LICENSE-APACHE in the repository root.

//! The embedded local store backend, wrapping a single-column-family
//! `rocksdb::DB`: `create_if_missing`, a write-buffer size derived from a
//! caller-supplied memory budget, an optional prefix extractor, and a
//! `DBRawIterator` for cursor-style scans.

use std::path::Path;

use rocksdb::{Options as RocksOptions, PrefixRange, ReadOptions, DB};

use crate::error::{DictError, Result};
use crate::prefix::PrefixExtractor;

use super::LocalStore;

/// Read options for a full, unbounded key-order scan. When a prefix
/// extractor is configured on the column family, RocksDB defaults iterators
/// to prefix-seek mode (`total_order_seek = false`), under which traversal
/// across prefix boundaries is not guaranteed -- a full scan must opt back
/// into total-order iteration explicitly.
fn total_order_read_options() -> ReadOptions {
    let mut opts = ReadOptions::default();
    opts.set_total_order_seek(true);
    opts
}

/// Read options for a scan bounded to `prefix`: RocksDB itself restricts
/// iteration to keys sharing that byte prefix, rather than leaving
/// termination entirely to a post-hoc key check.
fn prefix_read_options(prefix: &[u8]) -> ReadOptions {
    let mut opts = ReadOptions::default();
    opts.set_prefix_same_as_start(true);
    opts.set_iterate_range(PrefixRange(prefix.to_vec()));
    opts.set_total_order_seek(false);
    opts
}

pub struct RocksLocalStore {
    db: DB,
    prefix_extractor: Option<PrefixExtractor>,
}

impl RocksLocalStore {
    /// Opens (or creates) the database at `path`.
    ///
    /// `write_buffer_size` should already be the final per-buffer size
    /// (i.e. `memory_budget / 2`, per [`crate::options::Options`]'s
    /// formula); this function caps the buffer count at two.
    pub fn open(
        path: &Path,
        write_buffer_size: usize,
        prefix_extractor: Option<PrefixExtractor>,
    ) -> Result<Self> {
        let mut opts = RocksOptions::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(write_buffer_size);
        opts.set_max_write_buffer_number(2);
        if let Some(extractor) = &prefix_extractor {
            opts.set_prefix_extractor(extractor.to_rocksdb_slice_transform());
        }

        let db = DB::open(&opts, path).map_err(|source| map_open_error(path, source))?;

        Ok(Self {
            db,
            prefix_extractor,
        })
    }
}

fn map_open_error(path: &Path, source: rocksdb::Error) -> DictError {
    tracing::warn!(path = %path.display(), error = %source, "failed to open local store");
    DictError::Store(source)
}

impl LocalStore for RocksLocalStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|pinned| pinned.to_vec()))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.put(key, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.db.delete(key)?;
        Ok(())
    }

    fn iter_keys(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.iter_items()?.into_iter().map(|(k, _)| k).collect())
    }

    fn iter_values(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.iter_items()?.into_iter().map(|(_, v)| v).collect())
    }

    fn iter_items(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut iter = self.db.raw_iterator_opt(total_order_read_options());
        iter.seek_to_first();
        let mut out = Vec::new();
        while iter.valid() {
            let (Some(key), Some(value)) = (iter.key(), iter.value()) else {
                break;
            };
            out.push((key.to_vec(), value.to_vec()));
            iter.next();
        }
        Ok(out)
    }

    fn iter_items_with_prefix(
        &self,
        prefix: &[u8],
        extractor: &PrefixExtractor,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if self.prefix_extractor.is_none() {
            return Err(DictError::Unsupported(
                "prefix search only supported if a prefix extractor was configured at open time",
            ));
        }

        let mut iter = self.db.raw_iterator_opt(prefix_read_options(prefix));
        iter.seek(prefix);
        let mut out = Vec::new();
        while iter.valid() {
            let (Some(key), Some(value)) = (iter.key(), iter.value()) else {
                break;
            };
            if extractor.extract(key) != prefix {
                break;
            }
            out.push((key.to_vec(), value.to_vec()));
            iter.next();
        }
        Ok(out)
    }

    fn first_item(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let mut iter = self.db.raw_iterator_opt(total_order_read_options());
        iter.seek_to_first();
        Ok(iter
            .valid()
            .then(|| (iter.key().unwrap().to_vec(), iter.value().unwrap().to_vec())))
    }

    fn last_item(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let mut iter = self.db.raw_iterator_opt(total_order_read_options());
        iter.seek_to_last();
        Ok(iter
            .valid()
            .then(|| (iter.key().unwrap().to_vec(), iter.value().unwrap().to_vec())))
    }

    fn compact(&self) -> Result<()> {
        self.db.compact_range(None::<&[u8]>, None::<&[u8]>);
        Ok(())
    }

    fn supports_prefix(&self) -> bool {
        self.prefix_extractor.is_some()
    }

    fn supports_reverse(&self) -> bool {
        true
    }
}
