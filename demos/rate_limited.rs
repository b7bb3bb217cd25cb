//! Four lanes sharing a 5-per-second budget. Runs in memory.

use notiq::{
    Broker, EngineEvent, JobOptions, MemoryBroker, Queue, WorkerOptions, WorkerPool, handler_fn,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

const JOBS: usize = 20;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let broker: Arc<dyn Broker> = Arc::new(MemoryBroker::new());
    let queue = Queue::new(Arc::clone(&broker));
    for n in 0..JOBS {
        queue
            .enqueue("sms-queue", serde_json::json!({ "n": n }), JobOptions::default())
            .await?;
    }

    let started = Instant::now();
    let mut pool = WorkerPool::builder(Arc::clone(&broker))
        .with_poll_interval(Duration::from_millis(20))
        .register(
            "sms-queue",
            handler_fn(move |payload| async move {
                info!(n = %payload["n"], elapsed = ?started.elapsed(), "Sending sms");
                Ok(())
            }),
            WorkerOptions::new(4).with_rate_limit(5, Duration::from_secs(1)),
        )
        .build()?;
    let mut events = pool.subscribe();
    pool.start()?;

    let mut completed = 0;
    while completed < JOBS {
        if let EngineEvent::JobCompleted { .. } = events.recv().await? {
            completed += 1;
        }
    }

    info!(elapsed = ?started.elapsed(), "All jobs completed");
    pool.shutdown().await;
    Ok(())
}
