// src/context.rs
use crate::{JobId, JobMetadata, Result};
use std::sync::Arc;
use tracing::Span;

/// Application context containing shared resources handed to every job
pub trait AppContext: AsAny + Send + Sync + 'static {
    /// Clone the context for use in another task
    fn clone_context(&self) -> Arc<dyn AppContext>;
}

/// Placeholder context for pools that do not need shared resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl AppContext for EmptyContext {
    fn clone_context(&self) -> Arc<dyn AppContext> {
        Arc::new(*self)
    }
}

/// Context provided to job execution
pub struct JobContext {
    pub job_id: JobId,
    pub job_metadata: JobMetadata,
    pub app_context: Arc<dyn AppContext>,
    pub span: Span,
}

impl JobContext {
    pub fn new(job_metadata: JobMetadata, app_context: Arc<dyn AppContext>) -> Self {
        let span = tracing::info_span!(
            "job_execution",
            job_id = %job_metadata.id,
            job_name = %job_metadata.name,
            queue = %job_metadata.queue_name,
            attempt = job_metadata.attempt + 1,
        );

        Self {
            job_id: job_metadata.id,
            job_metadata,
            app_context,
            span,
        }
    }

    /// 1-indexed number of the attempt currently running.
    pub fn attempt(&self) -> u32 {
        self.job_metadata.attempt + 1
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.job_metadata.payload
    }

    /// Deserialize the payload into a concrete type.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.job_metadata.payload.clone())?)
    }

    /// Get typed app context
    pub fn app<T: AppContext>(&self) -> Option<&T> {
        self.app_context.as_ref().as_any().downcast_ref::<T>()
    }
}

// Helper trait for downcasting
pub trait AsAny {
    fn as_any(&self) -> &dyn std::any::Any;
}

impl<T: AppContext> AsAny for T {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
