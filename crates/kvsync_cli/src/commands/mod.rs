//! CLI command implementations.

pub mod entry;
pub mod watch;
