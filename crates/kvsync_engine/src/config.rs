//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;

/// Default time between two polls of the store.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Configuration for a sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Time between re-reads of the store.
    pub poll_interval: Duration,
    /// Disables the poll timer; state is refreshed only by explicit reads.
    pub no_sync: bool,
}

impl SyncConfig {
    /// Creates a configuration that polls every second.
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            no_sync: false,
        }
    }

    /// Creates a configuration with polling disabled.
    pub fn no_sync() -> Self {
        Self::new().with_no_sync(true)
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the poll interval in milliseconds.
    pub fn with_poll_interval_ms(self, millis: u64) -> Self {
        self.with_poll_interval(Duration::from_millis(millis))
    }

    /// Enables or disables no-sync mode.
    pub fn with_no_sync(mut self, no_sync: bool) -> Self {
        self.no_sync = no_sync;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if polling is enabled with a
    /// zero interval.
    pub fn validate(&self) -> SyncResult<()> {
        if !self.no_sync && self.poll_interval.is_zero() {
            return Err(SyncError::InvalidConfig(
                "poll interval must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
