// src/events.rs
//! Observable engine events.
//!
//! Events are plain values on a broadcast channel. Emitting never fails:
//! with no subscribers the event is only logged, and a lagging subscriber
//! loses old events instead of blocking the engine.

use crate::JobId;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The broker could not be reached or rejected an operation.
    QueueError { queue: String, cause: String },
    /// A handler broke outside normal failure handling, e.g. panicked.
    WorkerError {
        queue: String,
        job_id: Option<JobId>,
        cause: String,
    },
    /// A job exhausted its attempts.
    JobDead {
        queue: String,
        job_id: JobId,
        last_error: String,
    },
    JobCompleted { queue: String, job_id: JobId },
    JobRetryScheduled {
        queue: String,
        job_id: JobId,
        attempt: u32,
        delay: Duration,
    },
}

impl EngineEvent {
    /// Dotted name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::QueueError { .. } => "queue.error",
            EngineEvent::WorkerError { .. } => "worker.error",
            EngineEvent::JobDead { .. } => "job.dead",
            EngineEvent::JobCompleted { .. } => "job.completed",
            EngineEvent::JobRetryScheduled { .. } => "job.retry_scheduled",
        }
    }

    pub fn queue(&self) -> &str {
        match self {
            EngineEvent::QueueError { queue, .. }
            | EngineEvent::WorkerError { queue, .. }
            | EngineEvent::JobDead { queue, .. }
            | EngineEvent::JobCompleted { queue, .. }
            | EngineEvent::JobRetryScheduled { queue, .. } => queue,
        }
    }
}

/// Cloneable sender side shared by queues and worker pools.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: EngineEvent) {
        match &event {
            EngineEvent::QueueError { queue, cause } => {
                error!(kind = event.name(), queue = %queue, cause = %cause, "Broker error");
            }
            EngineEvent::WorkerError {
                queue,
                job_id,
                cause,
            } => {
                error!(kind = event.name(), queue = %queue, job_id = ?job_id, cause = %cause, "Worker error");
            }
            EngineEvent::JobDead {
                queue,
                job_id,
                last_error,
            } => {
                warn!(kind = event.name(), queue = %queue, job_id = %job_id, last_error = %last_error, "Job is dead");
            }
            EngineEvent::JobCompleted { queue, job_id } => {
                debug!(kind = event.name(), queue = %queue, job_id = %job_id, "Job completed");
            }
            EngineEvent::JobRetryScheduled {
                queue,
                job_id,
                attempt,
                delay,
            } => {
                info!(kind = event.name(), queue = %queue, job_id = %job_id, attempt, delay = ?delay, "Job retry scheduled");
            }
        }

        // No receivers is fine.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
