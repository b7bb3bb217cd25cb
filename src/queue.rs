// src/queue.rs
use crate::broker::{Broker, QueueStats};
use crate::{EngineEvent, EventBus, Job, JobId, JobMetadata, JobOptions, Result};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Producer side of the engine. Enqueueing persists the job and returns
/// without waiting for it to run.
#[derive(Clone)]
pub struct Queue {
    broker: Arc<dyn Broker>,
    events: EventBus,
}

impl Queue {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self::with_events(broker, EventBus::new())
    }

    pub fn with_events(broker: Arc<dyn Broker>, events: EventBus) -> Self {
        Self { broker, events }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Enqueue an untyped payload. The job name defaults to the queue name.
    pub async fn enqueue(
        &self,
        queue_name: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<JobId> {
        self.enqueue_named(queue_name, queue_name, payload, options)
            .await
    }

    /// Enqueue a typed job with its default options
    pub async fn enqueue_job<T: Job>(&self, job: &T) -> Result<JobId> {
        self.enqueue_job_with_options(job, T::default_options())
            .await
    }

    /// Enqueue a typed job with custom options
    pub async fn enqueue_job_with_options<T: Job>(
        &self,
        job: &T,
        options: JobOptions,
    ) -> Result<JobId> {
        job.validate()?;
        self.enqueue_named(T::queue_name(), T::name(), serde_json::to_value(job)?, options)
            .await
    }

    #[instrument(skip_all, fields(queue = %queue_name, job_name = %name))]
    async fn enqueue_named(
        &self,
        queue_name: &str,
        name: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<JobId> {
        options.validate()?;

        let job = JobMetadata::new(name, queue_name, payload, options);
        let job_id = job.id;
        let next_run_at = job.next_run_at;

        if let Err(e) = self.broker.push(job).await {
            self.events.emit(EngineEvent::QueueError {
                queue: queue_name.to_string(),
                cause: e.to_string(),
            });
            return Err(e);
        }

        debug!(job_id = %job_id, next_run_at = %next_run_at, "Job enqueued");
        Ok(job_id)
    }

    /// Get job by ID
    pub async fn get_job(&self, job_id: &JobId) -> Result<Option<JobMetadata>> {
        self.broker.get_job(job_id).await
    }

    /// Get queue statistics
    pub async fn stats(&self, queue_name: &str) -> Result<QueueStats> {
        self.broker.stats(queue_name).await
    }
}
