// Copyright (c) 2026 the logdict authors.
// Licensed under the MIT license or the Apache License, Version 2.0, at your
// option. See LICENSE-MIT and LICENSE-APACHE in the repository root.

//! The prefix extractor: a user-supplied function mapping a key to the
//! `[start, end)` slice used for prefix comparisons.

use std::fmt;
use std::sync::Arc;

/// A capability object wrapping a caller-supplied `transform(key) -> (start,
/// end)` function. Passed to the embedded store at open time to accelerate
/// `seek(prefix)`, and used by [`crate::Dict::items`] to decide where a
/// prefix scan must stop.
///
/// `in_domain` and `in_range`, required by RocksDB's `SliceTransform`
/// interface, are not modeled as separate callbacks here: this crate always
/// registers them as trivially-true.
#[derive(Clone)]
pub struct PrefixExtractor(Arc<dyn Fn(&[u8]) -> (usize, usize) + Send + Sync>);

impl PrefixExtractor {
    /// Wraps `transform` as a prefix extractor.
    pub fn new(transform: impl Fn(&[u8]) -> (usize, usize) + Send + Sync + 'static) -> Self {
        Self(Arc::new(transform))
    }

    /// A fixed-length prefix extractor: the first `len` bytes of every key,
    /// the common case for a `SliceTransform` (cf.
    /// `rocksdb::SliceTransform::create_fixed_prefix`).
    pub fn fixed_length(len: usize) -> Self {
        Self::new(move |key| (0, len.min(key.len())))
    }

    /// Returns the `[start, end)` bounds of `key`'s prefix.
    pub fn transform(&self, key: &[u8]) -> (usize, usize) {
        (self.0)(key)
    }

    /// Extracts the prefix slice of `key`.
    pub fn extract<'a>(&self, key: &'a [u8]) -> &'a [u8] {
        let (start, end) = self.transform(key);
        &key[start..end]
    }

    /// Builds the `rocksdb::SliceTransform` registered on the embedded
    /// store's column family options. `in_domain` is passed as `None`, which
    /// `rocksdb-rs` documents as "always in domain" -- the Rust equivalent of
    /// the original's `in_domain`/`in_range` both trivially returning `true`.
    pub(crate) fn to_rocksdb_slice_transform(&self) -> rocksdb::SliceTransform {
        let extractor = self.clone();
        rocksdb::SliceTransform::create(
            "prefix_extractor",
            move |key: &[u8]| -> &[u8] { extractor.extract(key) },
            None,
        )
    }
}

impl fmt::Debug for PrefixExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrefixExtractor(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_length_clamps_to_key_length() {
        let extractor = PrefixExtractor::fixed_length(4);
        assert_eq!(extractor.extract(b"ab"), b"ab");
        assert_eq!(extractor.extract(b"abcdef"), b"abcd");
    }

    #[test]
    fn custom_transform() {
        // prefix up to (not including) the first `:` byte
        let extractor = PrefixExtractor::new(|key| {
            let end = key.iter().position(|&b| b == b':').unwrap_or(key.len());
            (0, end)
        });
        assert_eq!(extractor.extract(b"users:42"), b"users");
        assert_eq!(extractor.extract(b"noColon"), b"noColon");
    }
}
