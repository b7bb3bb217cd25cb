//! Integration tests for the Redis broker.
//!
//! These tests require a running Redis server and the `NOTIQ_REDIS_HOST` and
//! `NOTIQ_REDIS_PORT` environment variables (or a `.env` file). Run with:
//!
//! ```bash
//! NOTIQ_REDIS_HOST=127.0.0.1 NOTIQ_REDIS_PORT=6379 cargo test --test redis_broker -- --ignored --nocapture
//! ```

use chrono::Utc;
use notiq::{
    Broker, ConnectionConfig, Disposition, JobMetadata, JobOptions, JobState, NotiqError,
    RedisBroker, RedisBrokerOptions,
};
use std::time::Duration;

const VISIBILITY: Duration = Duration::from_secs(30);

/// Connect with a fresh key prefix so runs never see each other's data.
async fn setup(remove_on_complete: bool) -> RedisBroker {
    let config = ConnectionConfig::from_env().unwrap();
    let options = RedisBrokerOptions {
        key_prefix: format!("notiq-test-{}", uuid::Uuid::new_v4()),
        remove_on_complete,
    };
    RedisBroker::connect(&config, options).await.unwrap()
}

fn make_job(queue: &str) -> JobMetadata {
    JobMetadata::new(
        "email-notifications",
        queue,
        serde_json::json!({ "email": "ada@example.com", "body": "hello" }),
        JobOptions::default(),
    )
}

#[tokio::test]
#[ignore] // Requires Redis, run explicitly with --ignored
async fn test_push_lease_ack() {
    let broker = setup(false).await;
    let job = make_job("email-queue");
    broker.push(job.clone()).await.unwrap();
    broker.push(job.clone()).await.unwrap();
    assert_eq!(broker.stats("email-queue").await.unwrap().waiting, 1);

    let lease = broker
        .lease_next("email-queue", VISIBILITY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lease.job.id, job.id);
    assert_eq!(lease.job.state, JobState::Leased);
    assert_eq!(lease.job.payload, job.payload);
    assert!(broker.lease_next("email-queue", VISIBILITY).await.unwrap().is_none());

    broker.ack(&job.id, &lease.token).await.unwrap();
    let stored = broker.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(stored.state, JobState::Completed);
    assert!(stored.lease_token.is_none());
    assert!(stored.finished_at.is_some());

    let stats = broker.stats("email-queue").await.unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.leased, 0);
}

#[tokio::test]
#[ignore] // Requires Redis, run explicitly with --ignored
async fn test_expired_lease_is_reclaimed() {
    let broker = setup(false).await;
    let job = make_job("email-queue");
    broker.push(job.clone()).await.unwrap();

    let stale = broker
        .lease_next("email-queue", Duration::from_millis(200))
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    let fresh = broker
        .lease_next("email-queue", VISIBILITY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fresh.job.id, job.id);
    assert_ne!(fresh.token, stale.token);
    assert_eq!(fresh.job.attempt, 0);

    let err = broker.ack(&job.id, &stale.token).await.unwrap_err();
    assert!(matches!(err, NotiqError::LeaseExpired(id) if id == job.id));
    broker.ack(&job.id, &fresh.token).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis, run explicitly with --ignored
async fn test_retry_then_dead() {
    let broker = setup(false).await;
    let job = make_job("email-queue");
    broker.push(job.clone()).await.unwrap();

    let lease = broker
        .lease_next("email-queue", VISIBILITY)
        .await
        .unwrap()
        .unwrap();
    broker
        .nack(
            &job.id,
            &lease.token,
            Disposition::Retry {
                attempt: 1,
                next_run_at: Utc::now() + chrono::Duration::milliseconds(300),
                error: "smtp timeout".into(),
            },
        )
        .await
        .unwrap();

    let stored = broker.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(stored.state, JobState::RetryScheduled);
    assert_eq!(stored.attempt, 1);
    assert_eq!(stored.last_error.as_deref(), Some("smtp timeout"));
    assert_eq!(broker.stats("email-queue").await.unwrap().retry_scheduled, 1);
    assert!(broker.lease_next("email-queue", VISIBILITY).await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(400)).await;
    let lease = broker
        .lease_next("email-queue", VISIBILITY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lease.job.attempt, 1);

    broker
        .nack(
            &job.id,
            &lease.token,
            Disposition::Dead {
                attempt: 2,
                error: "mailbox full".into(),
            },
        )
        .await
        .unwrap();

    let stored = broker.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(stored.state, JobState::Dead);
    assert_eq!(stored.last_error.as_deref(), Some("mailbox full"));
    assert_eq!(broker.stats("email-queue").await.unwrap().dead, 1);
    assert!(broker.lease_next("email-queue", VISIBILITY).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Redis, run explicitly with --ignored
async fn test_remove_on_complete() {
    let broker = setup(true).await;
    let job = make_job("email-queue");
    broker.push(job.clone()).await.unwrap();

    let lease = broker
        .lease_next("email-queue", VISIBILITY)
        .await
        .unwrap()
        .unwrap();
    broker.ack(&job.id, &lease.token).await.unwrap();

    assert!(broker.get_job(&job.id).await.unwrap().is_none());
    assert_eq!(broker.stats("email-queue").await.unwrap().completed, 0);
}

#[tokio::test]
#[ignore] // Requires Redis, run explicitly with --ignored
async fn test_stale_ack_after_removal_is_lease_expired() {
    let broker = setup(true).await;
    let job = make_job("email-queue");
    broker.push(job.clone()).await.unwrap();

    let stale = broker
        .lease_next("email-queue", Duration::from_millis(200))
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    let fresh = broker
        .lease_next("email-queue", VISIBILITY)
        .await
        .unwrap()
        .unwrap();
    broker.ack(&job.id, &fresh.token).await.unwrap();
    assert!(broker.get_job(&job.id).await.unwrap().is_none());

    let err = broker.ack(&job.id, &stale.token).await.unwrap_err();
    assert!(matches!(err, NotiqError::LeaseExpired(id) if id == job.id));

    let err = broker
        .nack(
            &job.id,
            &stale.token,
            Disposition::Dead {
                attempt: 1,
                error: "late".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, NotiqError::LeaseExpired(id) if id == job.id));
}
