//! Transformation handlers — the pluggable work a task executes.

pub mod registry;

pub use registry::HandlerRegistry;

use async_trait::async_trait;

use crate::event::Task;

/// A transformation the engine can run on behalf of a task.
///
/// `execute` returns `Ok(true)` on success and `Ok(false)` when the
/// transformation ran but did not produce a usable result; any `Err` is a
/// fault. All three outcomes are absorbed at the task boundary and expressed
/// through the task's terminal status.
#[async_trait]
pub trait TransformationHandler: Send + Sync {
    /// Identifier this handler is registered under.
    fn id(&self) -> &str;

    /// Run the transformation. May block for the full duration of the work,
    /// including external queries and network calls.
    async fn execute(&self, task: &Task) -> anyhow::Result<bool>;
}
