//! Email worker against Redis.
//!
//! ```bash
//! NOTIQ_REDIS_HOST=127.0.0.1 NOTIQ_REDIS_PORT=6379 cargo run --example email_worker
//! ```

use notiq::{
    ConnectionConfig, EmailNotification, EngineEvent, LogEmailSender, NotificationManager,
    RedisBroker, RedisBrokerOptions,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ConnectionConfig::from_env()?;
    let broker = RedisBroker::connect(&config, RedisBrokerOptions::default()).await?;
    let mut manager = NotificationManager::new(Arc::new(broker), Arc::new(LogEmailSender))?;

    let mut events = manager.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match &event {
                EngineEvent::QueueError { .. } | EngineEvent::WorkerError { .. } => {
                    error!(kind = event.name(), ?event, "Engine error")
                }
                _ => info!(kind = event.name(), ?event, "Engine event"),
            }
        }
    });

    manager.start()?;

    for n in 1..=3 {
        let email = EmailNotification::new(
            format!("user{}@example.com", n),
            format!("Hello #{}, your order has shipped.", n),
        );
        let id = manager.send_email(&email).await?;
        info!(job_id = %id, to = %email.email, "Enqueued email");
    }

    tokio::signal::ctrl_c().await?;
    manager.shutdown().await;
    Ok(())
}
