//! Worker pool — task dispatch and per-task execution.
//!
//! Core components:
//! - `scheduler` — fixed pool over one FIFO queue, start/submit/shutdown
//! - `worker` — drives a single dequeued task to a terminal status

pub mod scheduler;
pub mod worker;

pub use scheduler::TaskScheduler;
pub use worker::{Worker, WorkerDeps};
