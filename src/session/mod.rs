//! Session-level accounting of look-away events.
//!
//! The engine only emits events; this module is one consumer of them,
//! turning a stream of events into counts and an exportable summary.

pub mod tracker;

// Re-export commonly used types
pub use tracker::{SessionSummary, SessionTracker, PRODUCER_NAME};
