// src/broker/memory.rs
use super::{Broker, Disposition, Lease, QueueStats};
use crate::{JobId, JobMetadata, JobState, LeaseToken, NotiqError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct Entry {
    job: JobMetadata,
    /// Monotonic twin of `job.next_run_at`, so paused test clocks work.
    run_at: Instant,
    lease_deadline: Option<Instant>,
}

/// In-process broker. Every operation runs under a single lock, which gives
/// the same atomicity the Redis scripts provide.
#[derive(Default)]
pub struct MemoryBroker {
    jobs: Mutex<HashMap<JobId, Entry>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<JobId, Entry>>> {
        self.jobs
            .lock()
            .map_err(|_| NotiqError::BrokerUnavailable("memory broker lock poisoned".into()))
    }
}

/// Roughly 30 years, for schedules past what `Instant` can represent.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn instant_for(at: DateTime<Utc>) -> Instant {
    let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    let now = Instant::now();
    now.checked_add(wait).unwrap_or_else(|| now + FAR_FUTURE)
}

fn reclaim(entry: &mut Entry, now: Instant) {
    if entry.job.state != JobState::Leased {
        return;
    }
    if matches!(entry.lease_deadline, Some(deadline) if deadline <= now) {
        debug!(job_id = %entry.job.id, queue = %entry.job.queue_name, "Lease expired, job returned to waiting");
        entry.job.state = JobState::Waiting;
        entry.job.lease_token = None;
        entry.job.next_run_at = Utc::now();
        entry.run_at = now;
        entry.lease_deadline = None;
    }
}

/// Look up the entry a lease refers to, reclaiming it first if it timed out.
fn leased_entry<'a>(
    jobs: &'a mut HashMap<JobId, Entry>,
    job_id: &JobId,
    token: &LeaseToken,
) -> Result<&'a mut Entry> {
    let entry = jobs.get_mut(job_id).ok_or(NotiqError::JobNotFound(*job_id))?;
    reclaim(entry, Instant::now());
    if entry.job.state != JobState::Leased || entry.job.lease_token.as_ref() != Some(token) {
        return Err(NotiqError::LeaseExpired(*job_id));
    }
    Ok(entry)
}

#[async_trait::async_trait]
impl Broker for MemoryBroker {
    async fn push(&self, job: JobMetadata) -> Result<()> {
        if !job.state.is_leasable() {
            return Err(NotiqError::InvalidOptions(format!(
                "cannot push a job in state {}",
                job.state
            )));
        }
        let mut jobs = self.lock()?;
        jobs.entry(job.id).or_insert_with(|| Entry {
            run_at: instant_for(job.next_run_at),
            lease_deadline: None,
            job,
        });
        Ok(())
    }

    async fn lease_next(
        &self,
        queue: &str,
        visibility_timeout: Duration,
    ) -> Result<Option<Lease>> {
        let mut jobs = self.lock()?;
        let now = Instant::now();

        let mut next: Option<&mut Entry> = None;
        for entry in jobs.values_mut().filter(|e| e.job.queue_name == queue) {
            reclaim(entry, now);
            if !entry.job.state.is_leasable() || entry.run_at > now {
                continue;
            }
            let earlier = match &next {
                Some(current) => {
                    (entry.run_at, entry.job.created_at) < (current.run_at, current.job.created_at)
                }
                None => true,
            };
            if earlier {
                next = Some(entry);
            }
        }

        Ok(next.map(|entry| {
            let token = LeaseToken::new();
            entry.job.state = JobState::Leased;
            entry.job.lease_token = Some(token);
            let deadline = now.checked_add(visibility_timeout);
            entry.lease_deadline = Some(deadline.unwrap_or_else(|| now + FAR_FUTURE));
            Lease {
                job: entry.job.clone(),
                token,
            }
        }))
    }

    async fn ack(&self, job_id: &JobId, token: &LeaseToken) -> Result<()> {
        let mut jobs = self.lock()?;
        let entry = leased_entry(&mut jobs, job_id, token)?;
        entry.job.state = JobState::Completed;
        entry.job.lease_token = None;
        entry.job.finished_at = Some(Utc::now());
        entry.lease_deadline = None;
        Ok(())
    }

    async fn nack(
        &self,
        job_id: &JobId,
        token: &LeaseToken,
        disposition: Disposition,
    ) -> Result<()> {
        let mut jobs = self.lock()?;
        let entry = leased_entry(&mut jobs, job_id, token)?;
        entry.job.lease_token = None;
        entry.lease_deadline = None;
        match disposition {
            Disposition::Retry {
                attempt,
                next_run_at,
                error,
            } => {
                entry.job.state = JobState::RetryScheduled;
                entry.job.attempt = attempt;
                entry.job.last_error = Some(error);
                entry.run_at = instant_for(next_run_at);
                entry.job.next_run_at = next_run_at;
            }
            Disposition::Dead { attempt, error } => {
                entry.job.state = JobState::Dead;
                entry.job.attempt = attempt;
                entry.job.last_error = Some(error);
                entry.job.finished_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<JobMetadata>> {
        let mut jobs = self.lock()?;
        Ok(jobs.get_mut(job_id).map(|entry| {
            reclaim(entry, Instant::now());
            entry.job.clone()
        }))
    }

    async fn stats(&self, queue: &str) -> Result<QueueStats> {
        let mut jobs = self.lock()?;
        let now = Instant::now();
        let mut stats = QueueStats::default();
        for entry in jobs.values_mut().filter(|e| e.job.queue_name == queue) {
            reclaim(entry, now);
            match entry.job.state {
                JobState::Waiting => stats.waiting += 1,
                JobState::Leased => stats.leased += 1,
                JobState::RetryScheduled => stats.retry_scheduled += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Dead => stats.dead += 1,
            }
        }
        Ok(stats)
    }
}
