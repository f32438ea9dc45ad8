//! Configuration types.

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of worker tasks in the fixed pool.
    pub workers: usize,
    /// Capacity of the submission queue. `submit` waits for a free slot
    /// when the queue is full.
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_capacity: 256,
        }
    }
}
