//! # kvsync Storage
//!
//! String key-value store trait and implementations for kvsync.
//!
//! This crate provides the lowest-level storage abstraction for kvsync.
//! Stores are **opaque string maps** - they hold whatever string a caller
//! wrote under a key and know nothing about the engines polling them.
//!
//! ## Design Principles
//!
//! - Stores offer `get`, `set`, `remove` and an availability probe
//! - No change notification: observers must poll
//! - Must be `Send + Sync`, a single store is shared by many engines
//! - Single-key operations are atomic; there are no multi-key transactions
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral state
//! - [`FileStore`] - Durable JSON file that other processes may edit
//!
//! ## Example
//!
//! ```rust
//! use kvsync_storage::{KeyValueStore, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! store.set("theme", "dark").unwrap();
//! assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
//! store.remove("theme").unwrap();
//! assert_eq!(store.get("theme").unwrap(), None);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::KeyValueStore;
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
