// src/broker/mod.rs
//! Storage seam for the engine.
//!
//! A broker owns every persisted job. Queues and worker pools only hold the
//! short-lived [`Lease`] views it hands out, and every state change goes
//! through one of the atomic primitives below.

pub mod memory;
pub mod redis_store;

use crate::{JobId, JobMetadata, LeaseToken, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;

pub use self::memory::MemoryBroker;
pub use self::redis_store::{RedisBroker, RedisBrokerOptions};

/// An exclusive, time-bounded claim on one job.
#[derive(Debug, Clone)]
pub struct Lease {
    pub job: JobMetadata,
    pub token: LeaseToken,
}

/// How a failed lease is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Retry {
        attempt: u32,
        next_run_at: DateTime<Utc>,
        error: String,
    },
    Dead {
        attempt: u32,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub waiting: usize,
    pub leased: usize,
    pub retry_scheduled: usize,
    pub completed: usize,
    pub dead: usize,
}

#[async_trait::async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Persist a `Waiting` or `RetryScheduled` job. Pushing an id that already
    /// exists is a no-op.
    async fn push(&self, job: JobMetadata) -> Result<()>;

    /// Atomically lease one eligible job of `queue`, or `None` when nothing is
    /// due. Leases older than their visibility timeout are reclaimed first.
    async fn lease_next(&self, queue: &str, visibility_timeout: Duration)
        -> Result<Option<Lease>>;

    /// Mark a leased job `Completed`. Fails with `LeaseExpired` on a stale token.
    async fn ack(&self, job_id: &JobId, token: &LeaseToken) -> Result<()>;

    /// Reschedule or bury a leased job. Fails with `LeaseExpired` on a stale token.
    async fn nack(&self, job_id: &JobId, token: &LeaseToken, disposition: Disposition)
        -> Result<()>;

    async fn get_job(&self, job_id: &JobId) -> Result<Option<JobMetadata>>;

    async fn stats(&self, queue: &str) -> Result<QueueStats>;
}
