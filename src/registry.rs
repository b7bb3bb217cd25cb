// src/registry.rs
use crate::{Job, JobContext, JobHandler, NotiqError, Result};
use std::collections::HashMap;

/// Registry for typed jobs sharing a queue, dispatching by job name
#[derive(Default)]
pub struct JobRegistry {
    jobs: HashMap<String, Box<dyn JobExecutor>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
        }
    }

    /// Register a job type
    pub fn register<T: Job>(&mut self) -> &mut Self {
        self.jobs
            .insert(T::name().to_string(), Box::new(TypedJobExecutor::<T>::new()));
        self
    }

    /// Execute a job by name with payload
    pub async fn execute_job(&self, name: &str, ctx: &JobContext) -> Result<()> {
        let executor = self
            .jobs
            .get(name)
            .ok_or_else(|| NotiqError::Registry(format!("Job type '{}' not registered", name)))?;

        executor.execute(ctx).await
    }

    /// Get registered job names
    pub fn job_names(&self) -> Vec<String> {
        self.jobs.keys().cloned().collect()
    }

    /// Check if job type is registered
    pub fn contains_job(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }
}

#[async_trait::async_trait]
impl JobHandler for JobRegistry {
    async fn handle(&self, ctx: &JobContext) -> anyhow::Result<()> {
        self.execute_job(&ctx.job_metadata.name, ctx)
            .await
            .map_err(|e| match e {
                NotiqError::JobExecution(inner) => inner,
                other => anyhow::Error::new(other),
            })
    }
}

#[async_trait::async_trait]
trait JobExecutor: Send + Sync {
    async fn execute(&self, ctx: &JobContext) -> Result<()>;
}

struct TypedJobExecutor<T: Job> {
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T: Job> TypedJobExecutor<T> {
    fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<T: Job> JobExecutor for TypedJobExecutor<T> {
    async fn execute(&self, ctx: &JobContext) -> Result<()> {
        let job: T = ctx.payload_as()?;
        job.perform(ctx).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EmptyContext, JobMetadata, JobOptions};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Serialize, Deserialize)]
    struct Greet {
        name: String,
    }

    #[async_trait::async_trait]
    impl Job for Greet {
        async fn perform(&self, _ctx: &JobContext) -> anyhow::Result<()> {
            anyhow::ensure!(!self.name.is_empty(), "nobody to greet");
            Ok(())
        }

        fn name() -> &'static str {
            "greet"
        }
    }

    fn ctx(name: &str, payload: serde_json::Value) -> JobContext {
        let job = JobMetadata::new(name, "default", payload, JobOptions::default());
        JobContext::new(job, Arc::new(EmptyContext))
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let mut registry = JobRegistry::new();
        registry.register::<Greet>();
        assert!(registry.contains_job("greet"));
        assert_eq!(registry.job_names(), vec!["greet".to_string()]);

        let ok = ctx("greet", serde_json::json!({ "name": "ada" }));
        assert!(registry.handle(&ok).await.is_ok());

        let failing = ctx("greet", serde_json::json!({ "name": "" }));
        let err = registry.handle(&failing).await.unwrap_err();
        assert_eq!(err.to_string(), "nobody to greet");
    }

    #[tokio::test]
    async fn unknown_name_and_bad_payload_fail() {
        let mut registry = JobRegistry::new();
        registry.register::<Greet>();

        let unknown = ctx("wave", serde_json::json!({}));
        assert!(registry.handle(&unknown).await.is_err());

        let malformed = ctx("greet", serde_json::json!({ "nom": 1 }));
        assert!(registry.handle(&malformed).await.is_err());
    }
}
