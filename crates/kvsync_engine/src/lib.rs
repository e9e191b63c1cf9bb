//! # kvsync Engine
//!
//! Keeps in-memory observable state consistent with a string key-value store
//! that other processes may change behind our back.
//!
//! This crate provides:
//! - [`KeySync`] - one key, observable as `Option<String>`
//! - [`BatchSync`] - a fixed set of keys, observable as a sorted map
//! - Repeating [`Timer`]s: [`TokioTimer`] for real time, [`ManualTimer`] for tests
//! - [`Observer`]s: any closure, or a channel via [`observer_channel`]
//!
//! ## Architecture
//!
//! The store has no change notifications, so an engine polls:
//! 1. Construction reads every tracked key once to seed state
//! 2. Every `poll_interval` a tick re-reads the keys and diffs them against
//!    the last known values
//! 3. Changed keys are merged in one step and the observer is told once
//!
//! Writes go to the store first, then the observable state becomes exactly
//! what was written, then the observer runs. A reader reacting to a write
//! therefore always finds the store already updated.
//!
//! ## Key Invariants
//!
//! - Observable state is either this engine's latest write or the latest
//!   store reading, per key
//! - A removed entry and an absent value are the same thing
//! - Batch engines never gain or lose keys
//! - No notification after disposal
//! - An unavailable store makes the engine inert, not an error

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod config;
mod engine;
mod error;
mod observer;
mod single;
mod state;
mod timer;

pub use batch::BatchSync;
pub use config::{SyncConfig, DEFAULT_POLL_INTERVAL};
pub use engine::Slots;
pub use error::{SyncError, SyncResult};
pub use observer::{observer_channel, ChannelObserver, Observer};
pub use single::KeySync;
pub use state::{EngineState, SyncStats};
pub use timer::{ManualTimer, PollHandle, TickFn, Timer, TokioTimer};

pub use kvsync_codec::{Encoded, StoreValue};
pub use kvsync_storage::{KeyValueStore, StorageError};
