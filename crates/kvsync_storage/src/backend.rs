//! Key-value store trait definition.

use crate::error::StorageResult;
use std::sync::Arc;

/// A string-only key-value store.
///
/// Stores are the durable medium an engine keeps in sync with. They may be
/// mutated at any time by writers outside this process, and they offer no way
/// to be told about it.
///
/// # Invariants
///
/// - `get` returns `None` for a key that is not present, never `Some("")`
/// - `set` followed by `get` on the same key returns the written string
///   unless another writer intervened
/// - `remove` on an absent key succeeds
/// - Stores must be `Send + Sync` for sharing between engines
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For durable storage
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The store is unavailable
    /// - The store's quota would be exceeded
    /// - An I/O error occurs
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key` from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Returns true if the store can currently be used.
    ///
    /// Engines probe this once, when they are constructed.
    fn is_available(&self) -> bool;

    /// Returns every key currently present, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }
}
