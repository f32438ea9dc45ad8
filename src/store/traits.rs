//! `EventStore` trait — durable save/find for status records.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::event::{Event, Task};

/// Backend-agnostic store for event and task snapshots.
///
/// Saves are upserts: the engine saves the same record once per status
/// transition. Implementations must tolerate concurrent, unordered saves
/// from different tasks; no cross-task transactions are expected, and
/// callers treat every save as best-effort.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Save (or replace) an event snapshot.
    async fn save_event(&self, event: &Event) -> Result<(), StoreError>;

    /// Save (or replace) a task snapshot, including its parameter blob.
    async fn save_task(&self, task: &Task) -> Result<(), StoreError>;

    /// Find an event by id. A stored task is visible here as its event half.
    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    /// Find a task by id. The returned task's in-memory parameter bag is
    /// empty until `load_params` runs.
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;
}
