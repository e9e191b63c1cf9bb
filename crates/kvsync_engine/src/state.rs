//! Engine lifecycle state and statistics.

/// The lifecycle state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// The store was unavailable at construction. The engine never reads,
    /// never polls and keeps its placeholder state forever.
    Inert,
    /// The engine reads, writes and (unless in no-sync mode) polls.
    Active,
    /// The engine was torn down. No further notifications are sent.
    Disposed,
}

impl EngineState {
    /// Returns true if the engine talks to its store.
    pub fn is_active(&self) -> bool {
        matches!(self, EngineState::Active)
    }
}

/// Statistics about an engine's operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Poll ticks run.
    pub ticks: u64,
    /// Store scans, from seeding, explicit reads and ticks.
    pub reads: u64,
    /// Completed writes.
    pub writes: u64,
    /// Keys whose store value differed from the last known value.
    pub changes_detected: u64,
    /// Observer notifications sent.
    pub notifications: u64,
    /// Poll ticks that failed on a store error.
    pub tick_errors: u64,
    /// Last error seen by a poll tick.
    pub last_error: Option<String>,
}
