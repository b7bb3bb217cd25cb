//! A handler that fails twice, then succeeds. Runs in memory.

use notiq::{
    BackoffStrategy, Broker, EngineEvent, JobOptions, MemoryBroker, Queue, WorkerOptions,
    WorkerPool, handler_fn,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let broker: Arc<dyn Broker> = Arc::new(MemoryBroker::new());
    let attempts = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&attempts);
    let mut pool = WorkerPool::builder(Arc::clone(&broker))
        .with_poll_interval(Duration::from_millis(20))
        .register(
            "flaky",
            handler_fn(move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    info!(attempt = n, "Running flaky handler");
                    anyhow::ensure!(n > 2, "simulated failure {}", n);
                    Ok(())
                }
            }),
            WorkerOptions::new(1),
        )
        .build()?;
    let mut events = pool.subscribe();
    pool.start()?;

    let queue = Queue::with_events(Arc::clone(&broker), pool.events().clone());
    let options = JobOptions::default()
        .with_max_attempts(3)
        .with_backoff(BackoffStrategy::exponential(Duration::from_millis(500)));
    let id = queue.enqueue("flaky", serde_json::json!({}), options).await?;
    info!(job_id = %id, "Enqueued flaky job");

    while let Ok(event) = events.recv().await {
        info!(kind = event.name(), ?event, "Engine event");
        if matches!(
            event,
            EngineEvent::JobCompleted { .. } | EngineEvent::JobDead { .. }
        ) {
            break;
        }
    }

    pool.shutdown().await;
    Ok(())
}
