//! The poll-and-diff core shared by single-key and batch engines.
//!
//! Every operation (seed read, explicit read, write, poll tick, disposal)
//! runs under one reentrant gate, so operations on an engine never
//! interleave. The gate is reentrant because observers run while it is held
//! and may call back into the engine.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::state::{EngineState, SyncStats};
use crate::timer::{PollHandle, Timer};
use kvsync_codec::{classify_change, Encoded};
use kvsync_storage::KeyValueStore;
use parking_lot::{ReentrantMutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Last known value of every tracked key, `None` meaning absent.
///
/// Keys are scanned in this map's sorted order.
pub type Slots = BTreeMap<String, Option<String>>;

pub(crate) type Notify = Box<dyn Fn(&Slots) + Send + Sync>;

pub(crate) struct Engine<S: ?Sized> {
    store: Arc<S>,
    gate: ReentrantMutex<()>,
    slots: RwLock<Slots>,
    state: RwLock<EngineState>,
    stats: RwLock<SyncStats>,
    notify: Notify,
    label: String,
}

impl<S: KeyValueStore + ?Sized + 'static> Engine<S> {
    /// Builds an engine, seeds it from the store and arms its poll timer.
    ///
    /// An unavailable store yields an inert engine and an unarmed handle.
    pub(crate) fn start(
        store: Arc<S>,
        slots: Slots,
        config: &SyncConfig,
        timer: &dyn Timer,
        notify: Notify,
        label: String,
    ) -> SyncResult<(Arc<Self>, PollHandle)> {
        config.validate()?;

        let available = store.is_available();
        let engine = Arc::new(Self {
            store,
            gate: ReentrantMutex::new(()),
            slots: RwLock::new(slots),
            state: RwLock::new(if available {
                EngineState::Active
            } else {
                EngineState::Inert
            }),
            stats: RwLock::new(SyncStats::default()),
            notify,
            label,
        });

        if !available {
            tracing::debug!(engine = %engine.label, "store unavailable, engine is inert");
            return Ok((engine, PollHandle::inert()));
        }

        engine.refresh()?;

        if config.no_sync {
            tracing::debug!(engine = %engine.label, "no-sync mode, poll timer not armed");
            return Ok((engine, PollHandle::inert()));
        }

        let weak = Arc::downgrade(&engine);
        let handle = timer.arm(
            config.poll_interval,
            Box::new(move || {
                if let Some(engine) = weak.upgrade() {
                    engine.tick();
                }
            }),
        );
        tracing::debug!(
            engine = %engine.label,
            interval = ?config.poll_interval,
            "engine polling"
        );

        Ok((engine, handle))
    }

    pub(crate) fn state(&self) -> EngineState {
        *self.state.read()
    }

    pub(crate) fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    pub(crate) fn snapshot(&self) -> Slots {
        self.slots.read().clone()
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.slots.read().get(key).cloned().flatten()
    }

    pub(crate) fn tracks(&self, key: &str) -> bool {
        self.slots.read().contains_key(key)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.slots.read().keys().cloned().collect()
    }

    /// Re-reads every tracked key and merges the ones that changed.
    ///
    /// Observers are notified once, and only if something changed. On an
    /// engine that is not active this returns the current state untouched.
    pub(crate) fn refresh(&self) -> SyncResult<Slots> {
        let _gate = self.gate.lock();
        if !self.state().is_active() {
            return Ok(self.snapshot());
        }

        let staged = {
            let slots = self.slots.read();
            let mut staged = Vec::new();
            for (key, known) in slots.iter() {
                let current = self.store.get(key)?;
                if classify_change(known.as_deref(), current.as_deref()) {
                    staged.push((key.clone(), current));
                }
            }
            staged
        };
        self.stats.write().reads += 1;

        if staged.is_empty() {
            return Ok(self.snapshot());
        }

        let changed = staged.len();
        let snapshot = {
            let mut slots = self.slots.write();
            slots.extend(staged);
            slots.clone()
        };
        self.stats.write().changes_detected += changed as u64;
        tracing::debug!(engine = %self.label, changed, "store change detected");

        self.emit(&snapshot);
        Ok(snapshot)
    }

    /// Applies writes to the store in order, then to observable state.
    ///
    /// Observers always hear about a write that reached the store, even when
    /// the value did not change. If a store mutation fails, the entries
    /// written before it are still merged and notified, then the error is
    /// returned.
    pub(crate) fn apply(&self, writes: Vec<(String, Encoded)>) -> SyncResult<()> {
        let _gate = self.gate.lock();
        if !self.state().is_active() {
            return Err(SyncError::StoreUnavailable);
        }

        let requested = writes.len();
        let mut applied = Vec::with_capacity(requested);
        let mut failure = None;
        for (key, encoded) in writes {
            let result = match &encoded {
                Encoded::Set(value) => self.store.set(&key, value),
                Encoded::Remove => self.store.remove(&key),
            };
            match result {
                Ok(()) => applied.push((key, encoded.into_value())),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = &failure {
            tracing::warn!(
                engine = %self.label,
                applied = applied.len(),
                requested,
                error = %e,
                "store write failed"
            );
        }
        if applied.is_empty() {
            if let Some(e) = failure {
                return Err(e.into());
            }
        }

        let snapshot = {
            let mut slots = self.slots.write();
            slots.extend(applied);
            slots.clone()
        };
        self.stats.write().writes += 1;
        tracing::debug!(engine = %self.label, entries = requested, "write applied");

        self.emit(&snapshot);
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// One poll cycle. Failures are logged and counted, never raised.
    pub(crate) fn tick(&self) {
        let _gate = self.gate.lock();
        if !self.state().is_active() {
            return;
        }

        self.stats.write().ticks += 1;
        let before = self.stats.read().notifications;
        match self.refresh() {
            Ok(_) if self.stats.read().notifications == before => {
                tracing::trace!(engine = %self.label, "tick: no change");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(engine = %self.label, error = %e, "poll tick failed");
                let mut stats = self.stats.write();
                stats.tick_errors += 1;
                stats.last_error = Some(e.to_string());
            }
        }
    }

    /// Stops all further activity. Safe to call more than once.
    pub(crate) fn dispose(&self) {
        let _gate = self.gate.lock();
        let mut state = self.state.write();
        if *state != EngineState::Disposed {
            *state = EngineState::Disposed;
            tracing::debug!(engine = %self.label, "engine disposed");
        }
    }

    fn emit(&self, snapshot: &Slots) {
        if self.state() == EngineState::Disposed {
            return;
        }
        self.stats.write().notifications += 1;
        (self.notify)(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualTimer;
    use kvsync_storage::InMemoryStore;
    use parking_lot::Mutex;

    fn recording() -> (Arc<Mutex<Vec<Slots>>>, Notify) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let notify: Notify = Box::new(move |slots: &Slots| sink.lock().push(slots.clone()));
        (seen, notify)
    }

    fn slots(entries: &[(&str, Option<&str>)]) -> Slots {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn seed_merges_store_values() {
        let store = Arc::new(InMemoryStore::with_entries([("a", "1")]));
        let (seen, notify) = recording();
        let timer = ManualTimer::new();

        let (engine, handle) = Engine::start(
            store,
            slots(&[("a", None), ("b", None)]),
            &SyncConfig::new(),
            &timer,
            notify,
            "test".into(),
        )
        .unwrap();

        assert!(handle.is_armed());
        assert_eq!(engine.get("a").as_deref(), Some("1"));
        assert_eq!(engine.get("b"), None);
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(engine.stats().reads, 1);
    }

    #[test]
    fn tick_after_dispose_is_silent() {
        let store = Arc::new(InMemoryStore::new());
        let (seen, notify) = recording();
        let timer = ManualTimer::new();

        let (engine, _handle) = Engine::start(
            Arc::clone(&store),
            slots(&[("a", None)]),
            &SyncConfig::new(),
            &timer,
            notify,
            "test".into(),
        )
        .unwrap();

        engine.dispose();
        engine.dispose();
        store.set("a", "late").unwrap();
        timer.fire();

        assert!(seen.lock().is_empty());
        assert_eq!(engine.state(), EngineState::Disposed);
        assert_eq!(engine.get("a"), None);
    }

    #[test]
    fn tick_failure_is_counted() {
        let store = Arc::new(InMemoryStore::new());
        let (_seen, notify) = recording();
        let timer = ManualTimer::new();

        let (engine, _handle) = Engine::start(
            Arc::clone(&store),
            slots(&[("a", None)]),
            &SyncConfig::new(),
            &timer,
            notify,
            "test".into(),
        )
        .unwrap();

        store.set_available(false);
        timer.fire();

        let stats = engine.stats();
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.tick_errors, 1);
        assert!(stats.last_error.unwrap().contains("unavailable"));
        assert_eq!(engine.state(), EngineState::Active);
    }

    #[test]
    fn partial_write_failure_keeps_applied_entries() {
        let store = Arc::new(InMemoryStore::new().with_quota(4));
        let (seen, notify) = recording();
        let timer = ManualTimer::new();

        let (engine, _handle) = Engine::start(
            Arc::clone(&store),
            slots(&[("a", None), ("b", None)]),
            &SyncConfig::no_sync(),
            &timer,
            notify,
            "test".into(),
        )
        .unwrap();

        let result = engine.apply(vec![
            ("a".into(), Encoded::Set("1".into())),
            ("b".into(), Encoded::Set("too long".into())),
        ]);

        assert!(matches!(result, Err(SyncError::Storage(_))));
        assert_eq!(engine.get("a").as_deref(), Some("1"));
        assert_eq!(engine.get("b"), None);
        assert_eq!(seen.lock().len(), 1);
    }
}
