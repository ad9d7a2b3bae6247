#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Construction errors.
pub mod error;

/// A HashMap implementation on top of the chained hash table.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers.
pub mod hash_map;

/// The raw chained hash table, driven by caller-supplied hashes and equality
/// predicates.
pub mod hash_table;

pub use error::InvalidConfiguration;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_table::HashTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Hasher builder used when the map's `S` parameter is left to the
        /// crate: foldhash's randomly seeded state.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Hasher builder used when the map's `S` parameter is left to the
        /// crate: the standard library's randomly seeded SipHash state.
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    }
}
