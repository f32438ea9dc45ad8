//! Per-task execution engine.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::event::{EventManager, Task};
use crate::handler::HandlerRegistry;

/// Shared dependencies for task execution.
#[derive(Clone)]
pub struct WorkerDeps {
    pub registry: Arc<HandlerRegistry>,
    pub events: Arc<EventManager>,
}

/// Executes one dequeued task at a time, driving each to exactly one
/// terminal status.
pub struct Worker {
    deps: WorkerDeps,
}

impl Worker {
    pub fn new(deps: WorkerDeps) -> Self {
        Self { deps }
    }

    /// Run `task` to a terminal status.
    ///
    /// Every per-task fault — undecodable parameters, unknown handler,
    /// handler error, handler panic — is absorbed here and expressed through
    /// the task's status; nothing escapes to the scheduler. Returns the task
    /// in its terminal state.
    pub async fn run(&self, mut task: Task) -> Task {
        let task_id = task.id();

        // The task may have been rehydrated from storage since submission;
        // rebuild its in-memory parameters first.
        if let Err(e) = task.load_params() {
            self.fail(&mut task, format!("Undecodable parameters: {e}"))
                .await;
            return task;
        }

        // An unknown transformation id fails the task with a recorded
        // cause, without ever reaching RUNNING.
        let Some(handler) = self.deps.registry.get(task.transformation_id()).await else {
            let cause = format!(
                "No handler registered for transformation {:?}",
                task.transformation_id()
            );
            self.fail(&mut task, cause).await;
            return task;
        };

        // This persisted transition is the point where "in progress" becomes
        // observable to the rest of the platform.
        if let Err(e) = self.deps.events.task_running(&mut task).await {
            tracing::warn!(task_id = %task_id, error = %e, "Refusing to run task");
            return task;
        }
        tracing::info!(
            task_id = %task_id,
            transformation_id = task.transformation_id(),
            "Task running"
        );

        let outcome = AssertUnwindSafe(handler.execute(&task)).catch_unwind().await;

        match outcome {
            Ok(Ok(true)) => {
                if let Err(e) = self.deps.events.task_complete(&mut task).await {
                    tracing::warn!(task_id = %task_id, error = %e, "Completion transition rejected");
                } else {
                    tracing::info!(task_id = %task_id, "Task complete");
                }
            }
            Ok(Ok(false)) => {
                self.fail(&mut task, "Handler reported failure").await;
            }
            Ok(Err(e)) => {
                self.fail(&mut task, format!("Handler fault: {e:#}")).await;
            }
            Err(panic) => {
                self.fail(
                    &mut task,
                    format!("Handler panicked: {}", panic_message(panic.as_ref())),
                )
                .await;
            }
        }

        task
    }

    async fn fail(&self, task: &mut Task, cause: impl Into<String>) {
        let cause = cause.into();
        match self.deps.events.task_failed(task, cause.clone()).await {
            Ok(()) => {
                tracing::info!(task_id = %task.id(), cause = %cause, "Task failed");
            }
            Err(e) => {
                tracing::warn!(task_id = %task.id(), error = %e, "Failure transition rejected");
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::RwLock;
    use uuid::Uuid;

    use crate::error::StoreError;
    use crate::event::{Event, EventStatus};
    use crate::handler::TransformationHandler;
    use crate::store::{EventStore, MemoryEventStore};

    /// Store wrapper that records the status of every task save, so tests
    /// can assert on the observed status sequence.
    struct RecordingStore {
        inner: MemoryEventStore,
        saved_statuses: RwLock<Vec<EventStatus>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                inner: MemoryEventStore::new(),
                saved_statuses: RwLock::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EventStore for RecordingStore {
        async fn save_event(&self, event: &Event) -> Result<(), StoreError> {
            self.inner.save_event(event).await
        }

        async fn save_task(&self, task: &Task) -> Result<(), StoreError> {
            self.saved_statuses.write().await.push(task.status());
            self.inner.save_task(task).await
        }

        async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
            self.inner.find_event(id).await
        }

        async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
            self.inner.find_task(id).await
        }
    }

    struct FixedHandler {
        id: &'static str,
        outcome: anyhow::Result<bool>,
    }

    #[async_trait]
    impl TransformationHandler for FixedHandler {
        fn id(&self) -> &str {
            self.id
        }

        async fn execute(&self, _task: &Task) -> anyhow::Result<bool> {
            match &self.outcome {
                Ok(b) => Ok(*b),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl TransformationHandler for PanickingHandler {
        fn id(&self) -> &str {
            "panics"
        }

        async fn execute(&self, _task: &Task) -> anyhow::Result<bool> {
            panic!("handler blew up");
        }
    }

    async fn worker_with(
        handlers: Vec<Arc<dyn TransformationHandler>>,
    ) -> (Worker, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::new());
        let registry = Arc::new(HandlerRegistry::new());
        for handler in handlers {
            registry.register(handler).await;
        }
        let deps = WorkerDeps {
            registry,
            events: Arc::new(EventManager::new(store.clone())),
        };
        (Worker::new(deps), store)
    }

    #[tokio::test]
    async fn successful_handler_completes_task() {
        let (worker, store) = worker_with(vec![Arc::new(FixedHandler {
            id: "ok",
            outcome: Ok(true),
        })])
        .await;

        let task = worker.run(Task::new("ok", None, None)).await;
        assert_eq!(task.status(), EventStatus::Complete);
        assert!(task.event().ended_at().is_some());
        assert_eq!(
            *store.saved_statuses.read().await,
            vec![EventStatus::Running, EventStatus::Complete]
        );
    }

    #[tokio::test]
    async fn false_outcome_fails_task() {
        let (worker, _store) = worker_with(vec![Arc::new(FixedHandler {
            id: "no",
            outcome: Ok(false),
        })])
        .await;

        let task = worker.run(Task::new("no", None, None)).await;
        assert_eq!(task.status(), EventStatus::Fail);
        assert_eq!(task.event().failure_cause(), Some("Handler reported failure"));
    }

    #[tokio::test]
    async fn handler_fault_is_absorbed() {
        let (worker, store) = worker_with(vec![Arc::new(FixedHandler {
            id: "faults",
            outcome: Err(anyhow::anyhow!("SPARQL endpoint unreachable")),
        })])
        .await;

        let task = worker.run(Task::new("faults", None, None)).await;
        assert_eq!(task.status(), EventStatus::Fail);
        assert!(
            task.event()
                .failure_cause()
                .unwrap()
                .contains("SPARQL endpoint unreachable")
        );
        assert_eq!(
            *store.saved_statuses.read().await,
            vec![EventStatus::Running, EventStatus::Fail]
        );
    }

    #[tokio::test]
    async fn handler_panic_is_absorbed() {
        let (worker, _store) = worker_with(vec![Arc::new(PanickingHandler)]).await;

        let task = worker.run(Task::new("panics", None, None)).await;
        assert_eq!(task.status(), EventStatus::Fail);
        assert!(
            task.event()
                .failure_cause()
                .unwrap()
                .contains("handler blew up")
        );
    }

    #[tokio::test]
    async fn unknown_handler_fails_without_running() {
        let (worker, store) = worker_with(vec![]).await;

        let task = worker.run(Task::new("missing", None, None)).await;
        assert_eq!(task.status(), EventStatus::Fail);
        assert!(
            task.event()
                .failure_cause()
                .unwrap()
                .contains("No handler registered")
        );
        // The task never observed RUNNING: the only persisted status is FAIL.
        assert_eq!(*store.saved_statuses.read().await, vec![EventStatus::Fail]);
    }

    #[tokio::test]
    async fn cold_task_loads_params_before_execute() {
        struct AssertsParams;

        #[async_trait]
        impl TransformationHandler for AssertsParams {
            fn id(&self) -> &str {
                "asserts-params"
            }

            async fn execute(&self, task: &Task) -> anyhow::Result<bool> {
                Ok(task.params().get_str("graph") == Some("published"))
            }
        }

        let (worker, _store) = worker_with(vec![Arc::new(AssertsParams)]).await;

        let mut warm = Task::new("asserts-params", None, None);
        warm.params_mut().add("graph", "published");
        warm.save_params().unwrap();

        // Drop the in-memory bag, as if reloaded from storage.
        let cold = Task::from_stored(
            warm.event().clone(),
            warm.transformation_id().to_string(),
            warm.param_blob().map(String::from),
        );

        let task = worker.run(cold).await;
        assert_eq!(task.status(), EventStatus::Complete);
    }
}
