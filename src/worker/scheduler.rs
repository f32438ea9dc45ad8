//! Task scheduler — a fixed worker pool fed by one FIFO submission queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::event::Task;
use crate::worker::worker::{Worker, WorkerDeps};

enum PoolState {
    Idle,
    Running {
        queue_tx: mpsc::Sender<Task>,
        workers: Vec<JoinHandle<()>>,
    },
    ShutDown,
}

/// Runs submitted tasks concurrently on a fixed pool of workers.
///
/// Submission order determines dispatch order; completion order across tasks
/// is unordered. The scheduler performs no retries and no per-task timeouts:
/// the only coarse wait bound is [`shutdown`](Self::shutdown). A faulting
/// task never takes its worker down with it.
pub struct TaskScheduler {
    config: SchedulerConfig,
    deps: WorkerDeps,
    state: Mutex<PoolState>,
}

impl TaskScheduler {
    /// Create a scheduler. No workers exist until [`start`](Self::start).
    pub fn new(config: SchedulerConfig, deps: WorkerDeps) -> Self {
        Self {
            config,
            deps,
            state: Mutex::new(PoolState::Idle),
        }
    }

    /// Allocate the worker pool and begin accepting submissions.
    ///
    /// A scheduler starts once; calling `start` on a running or shut-down
    /// scheduler is a wiring error.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().await;
        if !matches!(*state, PoolState::Idle) {
            return Err(SchedulerError::AlreadyRunning);
        }

        // Bounded queue; `submit` waits for a slot when it is full.
        let (queue_tx, queue_rx) = mpsc::channel::<Task>(self.config.queue_capacity.max(1));
        let queue_rx = Arc::new(Mutex::new(queue_rx));

        let worker_count = self.config.workers.max(1);
        let workers = (0..worker_count)
            .map(|index| {
                let queue_rx = Arc::clone(&queue_rx);
                let worker = Worker::new(self.deps.clone());
                tokio::spawn(async move {
                    loop {
                        // Workers share one receiver; holding the lock only
                        // while dequeuing keeps dispatch FIFO and execution
                        // parallel.
                        let task = {
                            let mut rx = queue_rx.lock().await;
                            rx.recv().await
                        };
                        match task {
                            Some(task) => {
                                worker.run(task).await;
                            }
                            None => break,
                        }
                    }
                    tracing::debug!(worker = index, "Worker exiting");
                })
            })
            .collect();

        *state = PoolState::Running { queue_tx, workers };
        tracing::info!(
            workers = worker_count,
            queue_capacity = self.config.queue_capacity,
            "Scheduler started"
        );
        Ok(())
    }

    /// Enqueue a task for execution.
    ///
    /// Waits when the queue is full. Fails if the scheduler was never
    /// started or no longer accepts submissions.
    pub async fn submit(&self, task: Task) -> Result<(), SchedulerError> {
        let queue_tx = {
            let state = self.state.lock().await;
            match &*state {
                PoolState::Idle => return Err(SchedulerError::NotStarted),
                PoolState::ShutDown => return Err(SchedulerError::ShutDown),
                PoolState::Running { queue_tx, .. } => queue_tx.clone(),
            }
        };
        tracing::debug!(task_id = %task.id(), "Task submitted");
        // Send outside the state lock so waiting for queue capacity never
        // blocks shutdown or other submitters.
        queue_tx
            .send(task)
            .await
            .map_err(|_| SchedulerError::ShutDown)
    }

    /// Stop accepting submissions and let the pool drain.
    ///
    /// With `wait`, blocks until every queued and in-flight task finished or
    /// `timeout` elapsed, returning whether everything finished in time.
    /// Without `wait`, signals stop and returns immediately (true only if
    /// the pool happened to be drained already). Tasks still running when
    /// the timeout expires are not killed; they run to completion detached.
    pub async fn shutdown(&self, wait: bool, timeout: Duration) -> Result<bool, SchedulerError> {
        let mut workers = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, PoolState::ShutDown) {
                PoolState::Idle => {
                    *state = PoolState::Idle;
                    return Err(SchedulerError::NotStarted);
                }
                PoolState::ShutDown => return Err(SchedulerError::ShutDown),
                PoolState::Running { queue_tx, workers } => {
                    // Closing the queue lets workers drain it and exit.
                    drop(queue_tx);
                    workers
                }
            }
        };
        tracing::info!(wait, ?timeout, "Scheduler shutting down");

        if !wait {
            return Ok(workers.iter().all(|handle| handle.is_finished()));
        }

        let drained = tokio::time::timeout(timeout, async {
            for handle in &mut workers {
                // Worker bodies absorb all task faults; a JoinError here
                // would only mean the runtime is shutting down.
                let _ = handle.await;
            }
        })
        .await
        .is_ok();

        if drained {
            tracing::info!("Scheduler drained");
        } else {
            tracing::warn!("Shutdown timeout elapsed; remaining tasks run on detached");
        }
        Ok(drained)
    }

    /// Check if the scheduler is accepting submissions.
    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, PoolState::Running { .. })
    }
}
