//! Event factory and status-transition helpers.

use std::sync::Arc;

use crate::error::EventError;
use crate::event::{Event, EventStatus, Task};
use crate::store::EventStore;

/// Creates events and drives their status transitions, persisting a snapshot
/// after every change.
///
/// Persistence is best-effort: a failed save is logged and never surfaces to
/// the caller. It is also not transactional with the side effects a task
/// produces, so a crash between a handler finishing and the terminal save
/// can leave a record stuck at `RUNNING`.
pub struct EventManager {
    store: Arc<dyn EventStore>,
}

impl EventManager {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Create and persist a fresh `NEW` event linked to a user and resource.
    pub async fn new_creation_event(
        &self,
        user: impl Into<String>,
        resource: impl Into<String>,
    ) -> Event {
        let event = Event::new(Some(user.into()), Some(resource.into()));
        self.persist_event(&event).await;
        event
    }

    /// Create and persist a fresh `NEW` task.
    pub async fn new_task(
        &self,
        transformation_id: impl Into<String>,
        user: Option<String>,
        resource: Option<String>,
    ) -> Task {
        let task = Task::new(transformation_id, user, resource);
        self.persist_task(&task).await;
        task
    }

    /// `NEW -> RUNNING`.
    pub async fn mark_running(&self, event: &mut Event) -> Result<(), EventError> {
        event.transition_to(EventStatus::Running)?;
        self.persist_event(event).await;
        Ok(())
    }

    /// `RUNNING -> COMPLETE`, stamping `ended_at`.
    pub async fn mark_complete(&self, event: &mut Event) -> Result<(), EventError> {
        event.transition_to(EventStatus::Complete)?;
        self.persist_event(event).await;
        Ok(())
    }

    /// `-> FAIL`, stamping `ended_at` and recording the cause.
    pub async fn mark_failed(
        &self,
        event: &mut Event,
        cause: Option<String>,
    ) -> Result<(), EventError> {
        event.transition_to(EventStatus::Fail)?;
        if let Some(cause) = cause {
            event.record_failure_cause(cause);
        }
        self.persist_event(event).await;
        Ok(())
    }

    /// `NEW -> RUNNING` for a task record.
    ///
    /// This save is the point where "in progress" becomes observable to the
    /// rest of the platform.
    pub async fn task_running(&self, task: &mut Task) -> Result<(), EventError> {
        task.event_mut().transition_to(EventStatus::Running)?;
        self.persist_task(task).await;
        Ok(())
    }

    /// `RUNNING -> COMPLETE` for a task record.
    pub async fn task_complete(&self, task: &mut Task) -> Result<(), EventError> {
        task.event_mut().transition_to(EventStatus::Complete)?;
        self.persist_task(task).await;
        Ok(())
    }

    /// `-> FAIL` for a task record, with the cause of the failure.
    pub async fn task_failed(
        &self,
        task: &mut Task,
        cause: impl Into<String>,
    ) -> Result<(), EventError> {
        task.event_mut().transition_to(EventStatus::Fail)?;
        task.event_mut().record_failure_cause(cause);
        self.persist_task(task).await;
        Ok(())
    }

    async fn persist_event(&self, event: &Event) {
        if let Err(e) = self.store.save_event(event).await {
            tracing::warn!(event_id = %event.id(), error = %e, "Failed to persist event");
        }
    }

    async fn persist_task(&self, task: &Task) {
        if let Err(e) = self.store.save_task(task).await {
            tracing::warn!(task_id = %task.id(), error = %e, "Failed to persist task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryEventStore;

    fn manager() -> (EventManager, Arc<MemoryEventStore>) {
        let store = Arc::new(MemoryEventStore::new());
        (EventManager::new(store.clone()), store)
    }

    #[tokio::test]
    async fn creation_event_is_persisted_as_new() {
        let (manager, store) = manager();
        let event = manager.new_creation_event("alice", "project/7").await;

        let stored = store.find_event(event.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), EventStatus::New);
        assert_eq!(stored.associated_user(), Some("alice"));
        assert_eq!(stored.used_resource(), Some("project/7"));
    }

    #[tokio::test]
    async fn full_lifecycle_persists_each_transition() {
        let (manager, store) = manager();
        let mut event = manager.new_creation_event("alice", "source/1").await;

        manager.mark_running(&mut event).await.unwrap();
        let stored = store.find_event(event.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), EventStatus::Running);

        manager.mark_complete(&mut event).await.unwrap();
        let stored = store.find_event(event.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), EventStatus::Complete);
        assert!(stored.ended_at().unwrap() >= stored.started_at());
    }

    #[tokio::test]
    async fn failed_transition_does_not_persist() {
        let (manager, store) = manager();
        let mut event = manager.new_creation_event("alice", "source/1").await;
        manager.mark_running(&mut event).await.unwrap();
        manager.mark_failed(&mut event, Some("boom".into())).await.unwrap();

        // Terminal: a second transition is rejected and the stored record
        // keeps its FAIL status.
        assert!(manager.mark_running(&mut event).await.is_err());
        let stored = store.find_event(event.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), EventStatus::Fail);
        assert_eq!(stored.failure_cause(), Some("boom"));
    }

    #[tokio::test]
    async fn task_lifecycle_round_trips_through_store() {
        let (manager, store) = manager();
        let mut task = manager
            .new_task("rdf-convert", Some("bob".into()), Some("source/2".into()))
            .await;
        task.params_mut().add("graph", "staging");
        task.save_params().unwrap();

        manager.task_running(&mut task).await.unwrap();
        manager.task_complete(&mut task).await.unwrap();

        let stored = store.find_task(task.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), EventStatus::Complete);
        assert_eq!(stored.transformation_id(), "rdf-convert");
        assert!(stored.param_blob().is_some());
    }
}
