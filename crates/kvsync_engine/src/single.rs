//! Single-key sync engine.

use crate::config::SyncConfig;
use crate::engine::{Engine, Slots};
use crate::error::SyncResult;
use crate::observer::Observer;
use crate::state::{EngineState, SyncStats};
use crate::timer::{PollHandle, Timer};
use kvsync_codec::{encode, StoreValue};
use kvsync_storage::KeyValueStore;
use std::fmt;
use std::sync::Arc;

/// Keeps one store key and an observable value in sync.
///
/// The observable value starts absent, is seeded by one read at
/// construction, then follows every write made through this engine and
/// every external change found by polling.
///
/// Dropping the engine (or calling [`KeySync::dispose`]) cancels polling;
/// no notification is delivered afterwards.
///
/// # Example
///
/// ```rust
/// use kvsync_engine::{KeySync, ManualTimer, SyncConfig};
/// use kvsync_storage::{InMemoryStore, KeyValueStore};
/// use std::sync::Arc;
///
/// let store = Arc::new(InMemoryStore::with_entries([("count", "42")]));
/// let timer = ManualTimer::new();
/// let sync = KeySync::open(
///     Arc::clone(&store),
///     "count",
///     &SyncConfig::default(),
///     &timer,
///     |value: &Option<String>| println!("count is now {value:?}"),
/// )
/// .unwrap();
///
/// assert_eq!(sync.value().as_deref(), Some("42"));
///
/// sync.set(7).unwrap();
/// assert_eq!(store.get("count").unwrap().as_deref(), Some("7"));
///
/// store.set("count", "8").unwrap();
/// timer.fire();
/// assert_eq!(sync.value().as_deref(), Some("8"));
/// ```
pub struct KeySync<S: KeyValueStore + ?Sized + 'static> {
    key: String,
    engine: Arc<Engine<S>>,
    poll: PollHandle,
}

impl<S: KeyValueStore + ?Sized + 'static> KeySync<S> {
    /// Creates an engine tracking `key`.
    ///
    /// Reads the store once before returning. Unless `config.no_sync` is
    /// set, arms a repeating poll on `timer`. If the store reports itself
    /// unavailable the engine is inert: no read, no timer, no error.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the seed read
    /// fails.
    pub fn open<O>(
        store: Arc<S>,
        key: impl Into<String>,
        config: &SyncConfig,
        timer: &dyn Timer,
        observer: O,
    ) -> SyncResult<Self>
    where
        O: Observer<Option<String>>,
    {
        let key = key.into();
        let watched = key.clone();
        let notify = move |slots: &Slots| {
            let value = slots.get(&watched).cloned().flatten();
            observer.on_change(&value);
        };

        let slots = Slots::from([(key.clone(), None)]);
        let (engine, poll) =
            Engine::start(store, slots, config, timer, Box::new(notify), key.clone())?;

        Ok(Self { key, engine, poll })
    }

    /// Returns the tracked key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the last known value without touching the store.
    pub fn value(&self) -> Option<String> {
        self.engine.get(&self.key)
    }

    /// Reads the store now and returns the freshest value.
    ///
    /// Notifies the observer if the value changed. On an inert engine this
    /// returns the placeholder without reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn read(&self) -> SyncResult<Option<String>> {
        let slots = self.engine.refresh()?;
        Ok(slots.get(&self.key).cloned().flatten())
    }

    /// Writes a value, or removes the key when `value` is `None`.
    ///
    /// The store is updated first, then the observable value becomes
    /// exactly what was written and the observer is notified, even if the
    /// value is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::StoreUnavailable`] on an inert engine, or
    /// the store's error if the write fails.
    pub fn write<V: StoreValue>(&self, value: Option<V>) -> SyncResult<()> {
        self.engine.apply(vec![(self.key.clone(), encode(value))])
    }

    /// Writes a value.
    ///
    /// # Errors
    ///
    /// See [`KeySync::write`].
    pub fn set<V: StoreValue>(&self, value: V) -> SyncResult<()> {
        self.write(Some(value))
    }

    /// Removes the key from the store.
    ///
    /// # Errors
    ///
    /// See [`KeySync::write`].
    pub fn remove(&self) -> SyncResult<()> {
        self.write(None::<&str>)
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

impl<S: KeyValueStore + ?Sized + 'static> Drop for KeySync<S> {
    fn drop(&mut self) {
        self.engine.dispose();
        self.poll.cancel();
    }
}

impl<S: KeyValueStore + ?Sized + 'static> fmt::Debug for KeySync<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySync")
            .field("key", &self.key)
            .field("value", &self.value())
            .field("state", &self.state())
            .field("polling", &self.is_polling())
            .finish()
    }
}
