//! Multi-key sync engine.

use crate::config::SyncConfig;
use crate::engine::{Engine, Slots};
use crate::error::{SyncError, SyncResult};
use crate::observer::Observer;
use crate::state::{EngineState, SyncStats};
use crate::timer::{PollHandle, Timer};
use kvsync_codec::{encode, StoreValue};
use kvsync_storage::KeyValueStore;
use std::fmt;
use std::sync::Arc;

/// Keeps a fixed set of store keys and an observable map in sync.
///
/// The key set is chosen at construction and never grows or shrinks; only
/// values change. A poll or read that finds several changed keys merges
/// them in one step and notifies the observer once with the whole map.
///
/// # Example
///
/// ```rust
/// use kvsync_engine::{BatchSync, ManualTimer, Slots, SyncConfig};
/// use kvsync_storage::{InMemoryStore, KeyValueStore};
/// use std::sync::Arc;
///
/// let store = Arc::new(InMemoryStore::new());
/// let sync = BatchSync::open(
///     Arc::clone(&store),
///     [("a", None::<&str>), ("b", Some("placeholder"))],
///     &SyncConfig::no_sync(),
///     &ManualTimer::new(),
///     |values: &Slots| println!("{values:?}"),
/// )
/// .unwrap();
///
/// // "b" is absent from the store, so seeding replaced the placeholder.
/// assert_eq!(sync.get("b"), None);
///
/// sync.write([("a", Some("x"))]).unwrap();
/// assert_eq!(store.get("a").unwrap().as_deref(), Some("x"));
/// ```
pub struct BatchSync<S: KeyValueStore + ?Sized + 'static> {
    engine: Arc<Engine<S>>,
    poll: PollHandle,
}

impl<S: KeyValueStore + ?Sized + 'static> BatchSync<S> {
    /// Creates an engine tracking the keys of `placeholders`.
    ///
    /// Each key starts at its placeholder value (`None` for absent), then
    /// one read of every key seeds the map before this returns. Polling,
    /// no-sync mode and inert behavior work as for [`crate::KeySync`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the seed read
    /// fails.
    pub fn open<I, K, V, O>(
        store: Arc<S>,
        placeholders: I,
        config: &SyncConfig,
        timer: &dyn Timer,
        observer: O,
    ) -> SyncResult<Self>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: StoreValue,
        O: Observer<Slots>,
    {
        let slots: Slots = placeholders
            .into_iter()
            .map(|(key, value)| (key.into(), encode(value).into_value()))
            .collect();
        let label = format!("batch[{}]", slots.len());
        let notify = move |slots: &Slots| observer.on_change(slots);

        let (engine, poll) = Engine::start(store, slots, config, timer, Box::new(notify), label)?;
        Ok(Self { engine, poll })
    }

    /// Returns the tracked keys in scan order.
    pub fn keys(&self) -> Vec<String> {
        self.engine.keys()
    }

    /// Returns the last known value of every tracked key.
    pub fn values(&self) -> Slots {
        self.engine.snapshot()
    }

    /// Returns the last known value of one key.
    ///
    /// Untracked keys read as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        self.engine.get(key)
    }

    /// Reads every tracked key now and returns the merged map.
    ///
    /// Notifies the observer once if any key changed.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails; state is left unchanged.
    pub fn read(&self) -> SyncResult<Slots> {
        self.engine.refresh()
    }

    /// Writes several keys; `None` removes a key.
    ///
    /// Tracked keys missing from `entries` keep their value. After the store
    /// is updated the observer is notified once with the full map.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UntrackedKey`] before touching the store if any
    /// key is not tracked, [`SyncError::StoreUnavailable`] on an inert
    /// engine, or the store's error if a write fails.
    pub fn write<I, K, V>(&self, entries: I) -> SyncResult<()>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: StoreValue,
    {
        let writes = entries
            .into_iter()
            .map(|(key, value)| {
                let key = key.into();
                if self.engine.tracks(&key) {
                    Ok((key, encode(value)))
                } else {
                    Err(SyncError::UntrackedKey(key))
                }
            })
            .collect::<SyncResult<Vec<_>>>()?;

        self.engine.apply(writes)
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    /// Returns operation counters.
    pub fn stats(&self) -> SyncStats {
        self.engine.stats()
    }

    /// Returns true while a poll timer is armed.
    pub fn is_polling(&self) -> bool {
        self.poll.is_armed()
    }

    /// Tears the engine down. Equivalent to dropping it.
    pub fn dispose(self) {}
}

impl<S: KeyValueStore + ?Sized + 'static> Drop for BatchSync<S> {
    fn drop(&mut self) {
        self.engine.dispose();
        self.poll.cancel();
    }
}

impl<S: KeyValueStore + ?Sized + 'static> fmt::Debug for BatchSync<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchSync")
            .field("values", &self.values())
            .field("state", &self.state())
            .field("polling", &self.is_polling())
            .finish()
    }
}
