//! In-memory event store for tests and small deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::event::{Event, Task};
use crate::store::traits::EventStore;

/// Event store backed by process memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<Uuid, Event>>,
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (events plus tasks).
    pub async fn len(&self) -> usize {
        self.events.read().await.len() + self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn save_event(&self, event: &Event) -> Result<(), StoreError> {
        self.events.write().await.insert(event.id(), event.clone());
        Ok(())
    }

    async fn save_task(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks.write().await.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        if let Some(event) = self.events.read().await.get(&id) {
            return Ok(Some(event.clone()));
        }
        // Tasks are events too; surface the event half.
        Ok(self.tasks.read().await.get(&id).map(|t| t.event().clone()))
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventStatus;

    #[tokio::test]
    async fn save_and_find_event() {
        let store = MemoryEventStore::new();
        let event = Event::new(Some("alice".into()), None);
        store.save_event(&event).await.unwrap();

        let found = store.find_event(event.id()).await.unwrap().unwrap();
        assert_eq!(found.id(), event.id());
        assert_eq!(found.status(), EventStatus::New);
    }

    #[tokio::test]
    async fn find_absent_returns_none() {
        let store = MemoryEventStore::new();
        assert!(store.find_event(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.find_task(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_is_an_upsert() {
        let store = MemoryEventStore::new();
        let mut event = Event::new(None, None);
        store.save_event(&event).await.unwrap();

        event.transition_to(EventStatus::Running).unwrap();
        store.save_event(&event).await.unwrap();

        assert_eq!(store.len().await, 1);
        let found = store.find_event(event.id()).await.unwrap().unwrap();
        assert_eq!(found.status(), EventStatus::Running);
    }

    #[tokio::test]
    async fn stored_task_is_visible_as_event() {
        let store = MemoryEventStore::new();
        let task = Task::new("csv-to-rdf", None, Some("source/9".into()));
        store.save_task(&task).await.unwrap();

        let event = store.find_event(task.id()).await.unwrap().unwrap();
        assert_eq!(event.id(), task.id());
        assert_eq!(event.used_resource(), Some("source/9"));

        let found = store.find_task(task.id()).await.unwrap().unwrap();
        assert_eq!(found.transformation_id(), "csv-to-rdf");
    }
}
