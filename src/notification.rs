// src/notification.rs
//! Email notifications on top of the engine.
//!
//! `EmailNotification` is a typed job on the `email-queue`. Its payload is
//! validated before it reaches the broker; the actual delivery is left to an
//! [`EmailSender`].

use crate::broker::Broker;
use crate::{
    AppContext, BackoffStrategy, EngineEvent, EventBus, Job, JobContext, JobId, JobOptions,
    JobRegistry, NotiqError, Queue, Result, WorkerConfig, WorkerOptions, WorkerPool,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

pub const EMAIL_QUEUE: &str = "email-queue";
pub const EMAIL_JOB: &str = "email-notifications";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailNotification {
    pub email: String,
    pub body: String,
}

impl EmailNotification {
    pub fn new(email: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            body: body.into(),
        }
    }
}

fn is_email(address: &str) -> bool {
    let mut parts = address.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !address.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

/// Delivery side effect for email jobs.
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync + 'static {
    async fn send(&self, notification: &EmailNotification) -> anyhow::Result<()>;
}

/// Sender that only logs. Useful for local runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailSender;

#[async_trait::async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, notification: &EmailNotification) -> anyhow::Result<()> {
        info!(to = %notification.email, bytes = notification.body.len(), "Email sent");
        Ok(())
    }
}

/// App context carrying the sender into email jobs.
#[derive(Clone)]
pub struct NotificationContext {
    pub sender: Arc<dyn EmailSender>,
}

impl AppContext for NotificationContext {
    fn clone_context(&self) -> Arc<dyn AppContext> {
        Arc::new(self.clone())
    }
}

#[async_trait::async_trait]
impl Job for EmailNotification {
    async fn perform(&self, ctx: &JobContext) -> anyhow::Result<()> {
        let app = ctx
            .app::<NotificationContext>()
            .ok_or_else(|| anyhow::anyhow!("email jobs need a NotificationContext"))?;
        app.sender.send(self).await
    }

    fn name() -> &'static str {
        EMAIL_JOB
    }

    fn queue_name() -> &'static str {
        EMAIL_QUEUE
    }

    fn default_options() -> JobOptions {
        JobOptions {
            max_attempts: 3,
            backoff: BackoffStrategy::exponential(Duration::from_millis(2000)),
            delay: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if !is_email(&self.email) {
            return Err(NotiqError::InvalidOptions(format!(
                "'{}' is not a valid email address",
                self.email
            )));
        }
        if self.body.is_empty() {
            return Err(NotiqError::InvalidOptions("email body must not be empty".into()));
        }
        Ok(())
    }
}

/// Email queue limits: 10 jobs per second on a single lane.
pub fn email_worker_options() -> WorkerOptions {
    WorkerOptions::new(1).with_rate_limit(10, Duration::from_secs(1))
}

/// Owns the email queue and its worker pool.
pub struct NotificationManager {
    queue: Queue,
    pool: WorkerPool,
}

impl NotificationManager {
    pub fn new(broker: Arc<dyn Broker>, sender: Arc<dyn EmailSender>) -> Result<Self> {
        Self::with_config(broker, sender, WorkerConfig::default())
    }

    pub fn with_config(
        broker: Arc<dyn Broker>,
        sender: Arc<dyn EmailSender>,
        config: WorkerConfig,
    ) -> Result<Self> {
        let events = EventBus::new();
        let mut registry = JobRegistry::new();
        registry.register::<EmailNotification>();

        let pool = WorkerPool::builder(Arc::clone(&broker))
            .with_config(config)
            .with_events(events.clone())
            .with_app_context(Arc::new(NotificationContext { sender }))
            .register(EMAIL_QUEUE, registry, email_worker_options())
            .build()?;

        Ok(Self {
            queue: Queue::with_events(broker, events),
            pool,
        })
    }

    /// Validate and enqueue an email. Returns as soon as it is persisted.
    pub async fn send_email(&self, notification: &EmailNotification) -> Result<JobId> {
        self.queue.enqueue_job(notification).await
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.pool.subscribe()
    }

    pub fn start(&mut self) -> Result<()> {
        self.pool.start()
    }

    pub async fn shutdown(&mut self) {
        self.pool.shutdown().await;
    }
}
