//! Event lifecycle — the status model shared by every long-running
//! operation in the platform.
//!
//! Core components:
//! - `status` — the `NEW -> RUNNING -> COMPLETE/FAIL` state machine
//! - `model` — `Event` records and their `Task` specialization
//! - `manager` — factory and transition helper with best-effort persistence

pub mod manager;
pub mod model;
pub mod status;

pub use manager::EventManager;
pub use model::{Event, Task};
pub use status::EventStatus;
