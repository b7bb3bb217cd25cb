// src/error.rs
use crate::JobId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotiqError {
    #[error("Invalid job options: {0}")]
    InvalidOptions(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Handler failed: {0}")]
    HandlerFailure(String),

    #[error("Lease expired for job {0}")]
    LeaseExpired(JobId),

    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("Job {0} exhausted its attempts")]
    Exhausted(JobId),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job execution failed: {0}")]
    JobExecution(#[from] anyhow::Error),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Registry error: {0}")]
    Registry(String),
}

impl NotiqError {
    /// True when the error comes from talking to the broker rather than from
    /// the job itself. Lanes back off on these instead of failing jobs.
    pub fn is_connectivity(&self) -> bool {
        match self {
            NotiqError::BrokerUnavailable(_) => true,
            NotiqError::Redis(e) => {
                e.is_io_error()
                    || e.is_connection_refusal()
                    || e.is_connection_dropped()
                    || e.is_timeout()
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, NotiqError>;
