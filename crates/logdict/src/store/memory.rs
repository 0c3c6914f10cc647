// Copyright (c) 2026 the logdict authors.
// Licensed under the MIT license or the Apache License, Version 2.0, at your
// option. See LICENSE-MIT and LICENSE-APACHE in the repository root.

//! The in-memory local store backend: an ordered `BTreeMap` guarded by a
//! `parking_lot::Mutex`. Used when `Options::use_embedded_store` is `false`,
//! and by tests that don't want to touch the filesystem.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::error::{DictError, Result};
use crate::prefix::PrefixExtractor;

use super::LocalStore;

/// An ordered in-memory map, standing in for the embedded store. Does not
/// support prefix scans, reverse iteration, or compaction: callers asking
/// for those get [`DictError::Unsupported`].
#[derive(Default)]
pub struct MemoryLocalStore {
    map: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.lock().get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.lock().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.map.lock().remove(key);
        Ok(())
    }

    fn iter_keys(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.map.lock().keys().cloned().collect())
    }

    fn iter_values(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.map.lock().values().cloned().collect())
    }

    fn iter_items(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .map
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn iter_items_with_prefix(
        &self,
        _prefix: &[u8],
        _extractor: &PrefixExtractor,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Err(DictError::Unsupported(
            "prefix search only supported if using the embedded store",
        ))
    }

    fn first_item(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .map
            .lock()
            .iter()
            .next()
            .map(|(k, v)| (k.clone(), v.clone())))
    }

    fn last_item(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        Err(DictError::Unsupported(
            "last_item only supported if using the embedded store",
        ))
    }

    fn compact(&self) -> Result<()> {
        // Nothing to compact; this is a legitimate no-op, not an
        // unsupported operation.
        Ok(())
    }

    fn supports_prefix(&self) -> bool {
        false
    }

    fn supports_reverse(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_get_put_delete() {
        let mut store = MemoryLocalStore::new();
        assert_eq!(store.get(b"a").unwrap(), None);
        store.put(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        // deleting a missing key is not an error
        store.delete(b"a").unwrap();
    }

    #[test]
    fn iteration_is_key_ordered() {
        let mut store = MemoryLocalStore::new();
        store.put(b"b", b"2").unwrap();
        store.put(b"a", b"1").unwrap();
        store.put(b"c", b"3").unwrap();
        assert_eq!(
            store.iter_keys().unwrap(),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
    }

    #[test]
    fn prefix_and_reverse_are_unsupported() {
        let store = MemoryLocalStore::new();
        let extractor = PrefixExtractor::fixed_length(1);
        assert!(store.iter_items_with_prefix(b"a", &extractor).is_err());
        assert!(store.last_item().is_err());
        assert!(!store.supports_prefix());
        assert!(!store.supports_reverse());
    }

    #[test]
    fn compact_is_a_harmless_noop() {
        let store = MemoryLocalStore::new();
        store.compact().unwrap();
    }
}
