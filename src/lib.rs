// src/lib.rs
//! notiq: a job queue for notification delivery
//!
//! Producers enqueue jobs through a [`Queue`]; a [`WorkerPool`] leases them
//! from a [`Broker`], runs the registered handler, and resolves each lease by
//! acking it, scheduling a retry with backoff, or burying it as dead.
//! Dispatch is rate limited per queue, and everything observable is reported
//! as an [`EngineEvent`].

pub mod backoff;
pub mod broker;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod handler;
pub mod job;
pub mod lua;
pub mod notification;
pub mod queue;
pub mod rate_limit;
pub mod registry;
pub mod worker;

pub use backoff::{Backoff, BackoffStrategy, next_delay};
pub use broker::{
    Broker, Disposition, Lease, MemoryBroker, QueueStats, RedisBroker, RedisBrokerOptions,
};
pub use config::{Config, ConnectionConfig};
pub use context::{AppContext, EmptyContext, JobContext};
pub use error::{NotiqError, Result};
pub use events::{EngineEvent, EventBus};
pub use handler::{FnHandler, JobHandler, handler_fn};
pub use job::{Job, JobId, JobMetadata, JobOptions, JobState, LeaseToken};
pub use notification::{EmailNotification, EmailSender, LogEmailSender, NotificationManager};
pub use queue::Queue;
pub use rate_limit::{RateLimit, RateLimiter};
pub use registry::JobRegistry;
pub use worker::{WorkerBuilder, WorkerConfig, WorkerOptions, WorkerPool, WorkerStats};

// Re-export commonly used types
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
