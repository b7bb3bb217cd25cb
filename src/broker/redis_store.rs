// src/broker/redis_store.rs
use super::{Broker, Disposition, Lease, QueueStats};
use crate::{
    ConnectionConfig, JobId, JobMetadata, JobState, LeaseToken, NotiqError, Result,
    lua::LuaScripts,
};
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client as RedisClient};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Options for the Redis key layout and retention
#[derive(Debug, Clone)]
pub struct RedisBrokerOptions {
    pub key_prefix: String,
    /// Delete the job hash on ack instead of keeping it in the completed list.
    pub remove_on_complete: bool,
}

impl Default for RedisBrokerOptions {
    fn default() -> Self {
        Self {
            key_prefix: "notiq".to_string(),
            remove_on_complete: false,
        }
    }
}

/// Redis-backed broker.
///
/// Each job lives in a hash `{prefix}:job:{id}`. Per queue, due jobs sit in
/// the `scheduled` sorted set scored by `next_run_at`, leased jobs in the
/// `leased` sorted set scored by lease deadline, and finished ids in the
/// `completed` and `dead` lists. All transitions run as Lua scripts.
pub struct RedisBroker {
    conn: ConnectionManager,
    options: RedisBrokerOptions,
    scripts: LuaScripts,
}

impl RedisBroker {
    pub async fn connect(config: &ConnectionConfig, options: RedisBrokerOptions) -> Result<Self> {
        config.validate()?;
        let client = RedisClient::open(config.redis_url())?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| NotiqError::BrokerUnavailable(e.to_string()))?;

        info!(host = %config.host, port = config.port, prefix = %options.key_prefix, "Connected to Redis");
        Ok(Self::from_manager(conn, options))
    }

    pub fn from_manager(conn: ConnectionManager, options: RedisBrokerOptions) -> Self {
        Self {
            conn,
            options,
            scripts: LuaScripts::new(),
        }
    }

    async fn queue_of(&self, job_id: &JobId) -> Result<String> {
        let mut conn = self.conn.clone();
        let queue: Option<String> = conn.hget(self.job_key(job_id), "queue").await?;
        queue.ok_or(NotiqError::JobNotFound(*job_id))
    }

    /// Queue of a job being resolved through a lease. A vanished hash means
    /// the lease was reclaimed and the job finished elsewhere.
    async fn leased_queue_of(&self, job_id: &JobId) -> Result<String> {
        match self.queue_of(job_id).await {
            Err(NotiqError::JobNotFound(_)) => Err(NotiqError::LeaseExpired(*job_id)),
            other => other,
        }
    }

    // Redis key helpers
    fn job_prefix(&self) -> String {
        format!("{}:job:", self.options.key_prefix)
    }

    fn job_key(&self, job_id: &JobId) -> String {
        format!("{}{}", self.job_prefix(), job_id)
    }

    fn scheduled_key(&self, queue_name: &str) -> String {
        format!("{}:queue:{}:scheduled", self.options.key_prefix, queue_name)
    }

    fn leased_key(&self, queue_name: &str) -> String {
        format!("{}:queue:{}:leased", self.options.key_prefix, queue_name)
    }

    fn completed_key(&self, queue_name: &str) -> String {
        format!("{}:queue:{}:completed", self.options.key_prefix, queue_name)
    }

    fn dead_key(&self, queue_name: &str) -> String {
        format!("{}:queue:{}:dead", self.options.key_prefix, queue_name)
    }
}

fn from_millis(ms: &str) -> Option<DateTime<Utc>> {
    ms.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

fn corrupt(field: &str, value: &str) -> NotiqError {
    NotiqError::Serialization(serde::de::Error::custom(format!(
        "stored job has bad {} '{}'",
        field, value
    )))
}

/// Rebuild a job from its hash. The JSON snapshot is overlaid with the
/// fields the scripts keep current.
fn decode(fields: HashMap<String, String>) -> Result<Option<JobMetadata>> {
    let Some(data) = fields.get("data") else {
        return Ok(None);
    };
    let mut job: JobMetadata = serde_json::from_str(data)?;

    if let Some(state) = fields.get("state") {
        job.state = state.parse().map_err(|_| corrupt("state", state))?;
    }
    if let Some(attempt) = fields.get("attempt") {
        job.attempt = attempt.parse().map_err(|_| corrupt("attempt", attempt))?;
    }
    job.lease_token = match fields.get("token") {
        Some(token) => Some(LeaseToken(
            token.parse().map_err(|_| corrupt("lease token", token))?,
        )),
        None => None,
    };
    if let Some(error) = fields.get("last_error") {
        job.last_error = Some(error.clone());
    }
    if let Some(at) = fields.get("next_run_at").and_then(|ms| from_millis(ms)) {
        job.next_run_at = at;
    }
    job.finished_at = fields.get("finished_at").and_then(|ms| from_millis(ms));

    Ok(Some(job))
}

#[async_trait::async_trait]
impl Broker for RedisBroker {
    async fn push(&self, job: JobMetadata) -> Result<()> {
        if !job.state.is_leasable() {
            return Err(NotiqError::InvalidOptions(format!(
                "cannot push a job in state {}",
                job.state
            )));
        }

        let mut conn = self.conn.clone();
        let mut invocation = self.scripts.push.prepare_invoke();
        invocation
            .key(self.job_key(&job.id))
            .key(self.scheduled_key(&job.queue_name))
            .arg(job.id.to_string())
            .arg(serde_json::to_string(&job)?)
            .arg(&job.queue_name)
            .arg(job.state.as_str())
            .arg(job.attempt)
            .arg(job.next_run_at.timestamp_millis());
        let created: i64 = invocation.invoke_async(&mut conn).await?;

        if created == 0 {
            debug!(job_id = %job.id, "Duplicate push ignored");
        }
        Ok(())
    }

    async fn lease_next(
        &self,
        queue: &str,
        visibility_timeout: Duration,
    ) -> Result<Option<Lease>> {
        let token = LeaseToken::new();
        let mut conn = self.conn.clone();
        let mut invocation = self.scripts.lease.prepare_invoke();
        invocation
            .key(self.scheduled_key(queue))
            .key(self.leased_key(queue))
            .arg(Utc::now().timestamp_millis())
            .arg(visibility_timeout.as_millis() as u64)
            .arg(token.to_string())
            .arg(self.job_prefix());
        let leased: Option<String> = invocation.invoke_async(&mut conn).await?;

        let Some(id) = leased else {
            return Ok(None);
        };
        let job_id: JobId = id
            .parse()
            .map_err(|_| NotiqError::BrokerUnavailable(format!("invalid job id '{}'", id)))?;
        let job = self
            .get_job(&job_id)
            .await?
            .ok_or(NotiqError::JobNotFound(job_id))?;

        Ok(Some(Lease { job, token }))
    }

    async fn ack(&self, job_id: &JobId, token: &LeaseToken) -> Result<()> {
        let queue = self.leased_queue_of(job_id).await?;
        let mut conn = self.conn.clone();
        let mut invocation = self.scripts.ack.prepare_invoke();
        invocation
            .key(self.job_key(job_id))
            .key(self.leased_key(&queue))
            .key(self.scheduled_key(&queue))
            .key(self.completed_key(&queue))
            .arg(job_id.to_string())
            .arg(token.to_string())
            .arg(Utc::now().timestamp_millis())
            .arg(if self.options.remove_on_complete { "1" } else { "0" });
        let acked: i64 = invocation.invoke_async(&mut conn).await?;

        if acked == 1 {
            Ok(())
        } else {
            Err(NotiqError::LeaseExpired(*job_id))
        }
    }

    async fn nack(
        &self,
        job_id: &JobId,
        token: &LeaseToken,
        disposition: Disposition,
    ) -> Result<()> {
        let queue = self.leased_queue_of(job_id).await?;
        let now = Utc::now().timestamp_millis();
        let (state, attempt, error, next_run_at) = match disposition {
            Disposition::Retry {
                attempt,
                next_run_at,
                error,
            } => (
                JobState::RetryScheduled,
                attempt,
                error,
                next_run_at.timestamp_millis(),
            ),
            Disposition::Dead { attempt, error } => (JobState::Dead, attempt, error, now),
        };

        let mut conn = self.conn.clone();
        let mut invocation = self.scripts.nack.prepare_invoke();
        invocation
            .key(self.job_key(job_id))
            .key(self.leased_key(&queue))
            .key(self.scheduled_key(&queue))
            .key(self.dead_key(&queue))
            .arg(job_id.to_string())
            .arg(token.to_string())
            .arg(now)
            .arg(state.as_str())
            .arg(attempt)
            .arg(error)
            .arg(next_run_at);
        let nacked: i64 = invocation.invoke_async(&mut conn).await?;

        if nacked == 1 {
            Ok(())
        } else {
            Err(NotiqError::LeaseExpired(*job_id))
        }
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<JobMetadata>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(self.job_key(job_id)).await?;
        decode(fields)
    }

    async fn stats(&self, queue: &str) -> Result<QueueStats> {
        let mut conn = self.conn.clone();

        let scheduled: Vec<String> = conn.zrange(self.scheduled_key(queue), 0, -1).await?;
        let leased: usize = conn.zcard(self.leased_key(queue)).await?;
        let completed: usize = conn.llen(self.completed_key(queue)).await?;
        let dead: usize = conn.llen(self.dead_key(queue)).await?;

        let mut stats = QueueStats {
            leased,
            completed,
            dead,
            ..QueueStats::default()
        };
        if scheduled.is_empty() {
            return Ok(stats);
        }

        let mut pipe = redis::pipe();
        for id in &scheduled {
            pipe.hget(format!("{}{}", self.job_prefix(), id), "state");
        }
        let states: Vec<Option<String>> = pipe.query_async(&mut conn).await?;
        for state in states.into_iter().flatten() {
            match state.parse::<JobState>() {
                Ok(JobState::RetryScheduled) => stats.retry_scheduled += 1,
                Ok(_) => stats.waiting += 1,
                Err(_) => {}
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobOptions;

    fn stored(job: &JobMetadata) -> HashMap<String, String> {
        HashMap::from([
            ("data".to_string(), serde_json::to_string(job).unwrap()),
            ("queue".to_string(), job.queue_name.clone()),
            ("state".to_string(), "Leased".to_string()),
            ("attempt".to_string(), "2".to_string()),
        ])
    }

    #[test]
    fn decode_overlays_live_fields() {
        let job = JobMetadata::new("n", "email-queue", serde_json::json!({}), JobOptions::default());
        let token = LeaseToken::new();
        let mut fields = stored(&job);
        fields.insert("token".into(), token.to_string());
        fields.insert("last_error".into(), "smtp timeout".into());

        let decoded = decode(fields).unwrap().unwrap();
        assert_eq!(decoded.id, job.id);
        assert_eq!(decoded.state, JobState::Leased);
        assert_eq!(decoded.attempt, 2);
        assert_eq!(decoded.lease_token, Some(token));
        assert_eq!(decoded.last_error.as_deref(), Some("smtp timeout"));
    }

    #[test]
    fn missing_hash_decodes_to_none() {
        assert!(decode(HashMap::new()).unwrap().is_none());
    }

    #[test]
    fn corrupt_fields_are_not_connectivity_errors() {
        let job = JobMetadata::new("n", "q", serde_json::json!({}), JobOptions::default());
        for (field, value) in [("state", "Active"), ("attempt", "-1"), ("token", "nope")] {
            let mut fields = stored(&job);
            fields.insert(field.to_string(), value.to_string());

            let err = decode(fields).unwrap_err();
            assert!(matches!(err, NotiqError::Serialization(_)), "{}: {:?}", field, err);
            assert!(!err.is_connectivity());
        }
    }
}
