// src/job.rs
use crate::{BackoffStrategy, JobContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Token proving ownership of a lease. A new one is issued on every lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseToken(pub Uuid);

impl LeaseToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LeaseToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Waiting,
    Leased,
    Completed,
    RetryScheduled,
    Dead,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "Waiting",
            JobState::Leased => "Leased",
            JobState::Completed => "Completed",
            JobState::RetryScheduled => "RetryScheduled",
            JobState::Dead => "Dead",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Dead)
    }

    /// Whether a job in this state may be handed to a lane.
    pub fn is_leasable(&self) -> bool {
        matches!(self, JobState::Waiting | JobState::RetryScheduled)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Waiting" => Ok(JobState::Waiting),
            "Leased" => Ok(JobState::Leased),
            "Completed" => Ok(JobState::Completed),
            "RetryScheduled" => Ok(JobState::RetryScheduled),
            "Dead" => Ok(JobState::Dead),
            other => Err(format!("unknown job state '{}'", other)),
        }
    }
}

/// Job execution options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    /// Hold the job back this long before its first lease.
    pub delay: Option<Duration>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::default(),
            delay: None,
        }
    }
}

impl JobOptions {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.max_attempts < 1 {
            return Err(crate::NotiqError::InvalidOptions(format!(
                "max_attempts must be at least 1, got {}",
                self.max_attempts
            )));
        }
        self.backoff
            .validate()
            .map_err(crate::NotiqError::InvalidOptions)
    }
}

/// A job as stored by the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub id: JobId,
    pub name: String,
    pub queue_name: String,
    pub payload: serde_json::Value,
    pub options: JobOptions,
    pub state: JobState,
    pub attempt: u32,
    pub next_run_at: DateTime<Utc>,
    pub lease_token: Option<LeaseToken>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobMetadata {
    /// Fresh `Waiting` record, eligible at `now + options.delay`.
    pub fn new(
        name: impl Into<String>,
        queue_name: impl Into<String>,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Self {
        let now = Utc::now();
        let next_run_at = match options.delay {
            Some(delay) => now + chrono::Duration::milliseconds(delay.as_millis() as i64),
            None => now,
        };

        Self {
            id: JobId::new(),
            name: name.into(),
            queue_name: queue_name.into(),
            payload,
            options,
            state: JobState::Waiting,
            attempt: 0,
            next_run_at,
            lease_token: None,
            last_error: None,
            created_at: now,
            finished_at: None,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.options.max_attempts
    }

    /// `Ok(true)` once completed, `Ok(false)` while still pending, and
    /// `Exhausted` for a dead job.
    pub fn completion(&self) -> crate::Result<bool> {
        match self.state {
            JobState::Completed => Ok(true),
            JobState::Dead => Err(crate::NotiqError::Exhausted(self.id)),
            _ => Ok(false),
        }
    }
}

/// Core trait for typed jobs
#[async_trait::async_trait]
pub trait Job: Send + Sync + 'static + serde::de::DeserializeOwned + serde::Serialize {
    /// Execute the job with the provided context
    async fn perform(&self, ctx: &JobContext) -> anyhow::Result<()>;

    /// Job type name for registration and deserialization
    fn name() -> &'static str
    where
        Self: Sized;

    /// Queue name for this job type
    fn queue_name() -> &'static str
    where
        Self: Sized,
    {
        "default"
    }

    /// Default options for this job type
    fn default_options() -> JobOptions
    where
        Self: Sized,
    {
        JobOptions::default()
    }

    /// Reject a payload before it is enqueued.
    fn validate(&self) -> crate::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_notification_defaults() {
        let opts = JobOptions::default();
        assert_eq!(opts.max_attempts, 3);
        assert_eq!(
            opts.backoff,
            BackoffStrategy::Exponential {
                base_ms: 2000,
                max_ms: None
            }
        );
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn zero_attempts_is_invalid() {
        let err = JobOptions::default().with_max_attempts(0).validate().unwrap_err();
        assert!(matches!(err, crate::NotiqError::InvalidOptions(_)));
    }

    #[test]
    fn new_job_starts_waiting() {
        let job = JobMetadata::new("n", "q", serde_json::json!({}), JobOptions::default());
        assert_eq!(job.state, JobState::Waiting);
        assert_eq!(job.attempt, 0);
        assert!(job.lease_token.is_none());
        assert!(job.next_run_at >= job.created_at);
    }

    #[test]
    fn delayed_job_runs_later() {
        let opts = JobOptions::default().with_delay(Duration::from_secs(10));
        let job = JobMetadata::new("n", "q", serde_json::json!(null), opts);
        assert_eq!(
            (job.next_run_at - job.created_at).num_milliseconds(),
            10_000
        );
    }

    #[test]
    fn completion_reports_dead_jobs_as_exhausted() {
        let mut job = JobMetadata::new("n", "q", serde_json::json!({}), JobOptions::default());
        assert!(!job.completion().unwrap());

        job.state = JobState::Completed;
        assert!(job.completion().unwrap());

        job.state = JobState::Dead;
        let err = job.completion().unwrap_err();
        assert!(matches!(err, crate::NotiqError::Exhausted(id) if id == job.id));
    }

    #[test]
    fn state_round_trips_through_str() {
        for state in [
            JobState::Waiting,
            JobState::Leased,
            JobState::Completed,
            JobState::RetryScheduled,
            JobState::Dead,
        ] {
            assert_eq!(state.as_str().parse::<JobState>().unwrap(), state);
        }
        assert!("Active".parse::<JobState>().is_err());
    }
}
