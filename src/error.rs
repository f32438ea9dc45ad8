//! Error types for the task engine.

use uuid::Uuid;

use crate::event::EventStatus;

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Parameter error: {0}")]
    Param(#[from] ParamError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Scheduler wiring errors.
///
/// These are the only faults that cross the scheduler's public boundary;
/// per-task failures are expressed through the task's terminal status instead.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Scheduler has not been started")]
    NotStarted,

    #[error("Scheduler has been shut down")]
    ShutDown,
}

/// Event lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Event {id} cannot transition from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: EventStatus,
        to: EventStatus,
    },

    #[error("Invalid event status: {0:?}")]
    InvalidStatus(String),
}

/// Parameter bag encode/decode errors.
#[derive(Debug, thiserror::Error)]
pub enum ParamError {
    #[error("Failed to encode parameters: {0}")]
    Encode(String),

    #[error("Failed to decode parameters: {0}")]
    Decode(String),
}

/// Event store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Stored record is invalid: {0}")]
    Serialization(String),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
