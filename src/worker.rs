// src/worker.rs
use crate::broker::{Broker, Disposition, Lease};
use crate::{
    AppContext, EmptyContext, EngineEvent, EventBus, JobContext, JobHandler, NotiqError,
    RateLimit, RateLimiter, Result, backoff,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{Duration, sleep, timeout},
};
use tracing::{Instrument, debug, info, instrument, warn};

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    /// Wait between lease attempts on an empty queue.
    pub poll_interval: Duration,
    /// How long a lease stays valid before the broker reclaims the job.
    pub visibility_timeout: Duration,
    /// Drain budget for in-flight handlers on shutdown.
    pub shutdown_timeout: Duration,
    pub reconnect_backoff_min: Duration,
    pub reconnect_backoff_max: Duration,
    /// Wait used when the rate limiter denies a token but reports no refill time.
    pub rate_limit_retry: Duration,
}

/// Upper bound for any configured wait.
const MAX_CONFIGURED_WAIT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

impl WorkerConfig {
    /// Reject waits that are zero where a loop depends on them, or too large
    /// for the runtime clock.
    pub fn validate(&self) -> Result<()> {
        let bounded = [
            ("poll_interval", self.poll_interval),
            ("visibility_timeout", self.visibility_timeout),
            ("reconnect_backoff_min", self.reconnect_backoff_min),
            ("rate_limit_retry", self.rate_limit_retry),
        ];
        for (name, value) in bounded {
            if value.is_zero() || value > MAX_CONFIGURED_WAIT {
                return Err(NotiqError::InvalidOptions(format!(
                    "{} must be above zero and at most {:?}, got {:?}",
                    name, MAX_CONFIGURED_WAIT, value
                )));
            }
        }
        if self.shutdown_timeout > MAX_CONFIGURED_WAIT {
            return Err(NotiqError::InvalidOptions(format!(
                "shutdown_timeout must be at most {:?}, got {:?}",
                MAX_CONFIGURED_WAIT, self.shutdown_timeout
            )));
        }
        if self.reconnect_backoff_max < self.reconnect_backoff_min
            || self.reconnect_backoff_max > MAX_CONFIGURED_WAIT
        {
            return Err(NotiqError::InvalidOptions(format!(
                "reconnect_backoff_max must be between {:?} and {:?}, got {:?}",
                self.reconnect_backoff_min, MAX_CONFIGURED_WAIT, self.reconnect_backoff_max
            )));
        }
        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", uuid::Uuid::new_v4()),
            poll_interval: Duration::from_millis(100),
            visibility_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            reconnect_backoff_min: Duration::from_millis(500),
            reconnect_backoff_max: Duration::from_secs(30),
            rate_limit_retry: Duration::from_millis(50),
        }
    }
}

/// Per-queue execution options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    pub concurrency: usize,
    pub rate_limit: Option<RateLimit>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            rate_limit: None,
        }
    }
}

impl WorkerOptions {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            rate_limit: None,
        }
    }

    pub fn with_rate_limit(mut self, max: u32, duration: Duration) -> Self {
        self.rate_limit = Some(RateLimit::new(max, duration));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency < 1 {
            return Err(NotiqError::InvalidOptions(
                "concurrency must be at least 1".into(),
            ));
        }
        match &self.rate_limit {
            Some(limit) => limit.validate(),
            None => Ok(()),
        }
    }
}

struct Registration {
    queue: String,
    handler: Arc<dyn JobHandler>,
    options: WorkerOptions,
}

/// Worker builder for fluent configuration
pub struct WorkerBuilder {
    broker: Arc<dyn Broker>,
    config: WorkerConfig,
    events: Option<EventBus>,
    app_context: Option<Arc<dyn AppContext>>,
    limiter: Option<Arc<RateLimiter>>,
    registrations: Vec<Registration>,
}

impl WorkerBuilder {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self {
            broker,
            config: WorkerConfig::default(),
            events: None,
            app_context: None,
            limiter: None,
            registrations: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_app_context(mut self, ctx: Arc<dyn AppContext>) -> Self {
        self.app_context = Some(ctx);
        self
    }

    /// Share a limiter between pools living in the same process.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn with_visibility_timeout(mut self, visibility: Duration) -> Self {
        self.config.visibility_timeout = visibility;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Attach a handler to a queue. Options are checked by [`build`](Self::build).
    pub fn register(
        self,
        queue: impl Into<String>,
        handler: impl JobHandler,
        options: WorkerOptions,
    ) -> Self {
        self.register_arc(queue, Arc::new(handler), options)
    }

    pub fn register_arc(
        mut self,
        queue: impl Into<String>,
        handler: Arc<dyn JobHandler>,
        options: WorkerOptions,
    ) -> Self {
        self.registrations.push(Registration {
            queue: queue.into(),
            handler,
            options,
        });
        self
    }

    pub fn build(self) -> Result<WorkerPool> {
        if self.registrations.is_empty() {
            return Err(NotiqError::Worker("no queues registered".into()));
        }
        self.config.validate()?;

        let limiter = self.limiter.unwrap_or_default();
        let mut seen = HashSet::new();
        for registration in &self.registrations {
            registration.options.validate()?;
            if !seen.insert(registration.queue.as_str()) {
                return Err(NotiqError::InvalidOptions(format!(
                    "queue '{}' registered twice",
                    registration.queue
                )));
            }
            if let Some(limit) = registration.options.rate_limit {
                limiter.set_limit(&registration.queue, limit)?;
            }
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(WorkerPool {
            config: Arc::new(self.config),
            broker: self.broker,
            registrations: self.registrations,
            limiter,
            events: self.events.unwrap_or_default(),
            app_context: self
                .app_context
                .unwrap_or_else(|| Arc::new(EmptyContext)),
            handles: Vec::new(),
            shutdown_tx,
            is_shutting_down: Arc::new(AtomicBool::new(false)),
            active_jobs: Arc::new(AtomicUsize::new(0)),
        })
    }
}

/// Runs `concurrency` lanes per registered queue. Each lane leases a job,
/// runs its handler and resolves the lease through the broker.
pub struct WorkerPool {
    config: Arc<WorkerConfig>,
    broker: Arc<dyn Broker>,
    registrations: Vec<Registration>,
    limiter: Arc<RateLimiter>,
    events: EventBus,
    app_context: Arc<dyn AppContext>,
    /// Lane tasks, keyed by queue.
    handles: Vec<(String, JoinHandle<()>)>,
    shutdown_tx: broadcast::Sender<()>,
    is_shutting_down: Arc<AtomicBool>,
    active_jobs: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn builder(broker: Arc<dyn Broker>) -> WorkerBuilder {
        WorkerBuilder::new(broker)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.limiter)
    }

    /// Spawn every lane. Returns once they are running.
    pub fn start(&mut self) -> Result<()> {
        if self.is_shutting_down.load(Ordering::SeqCst) {
            return Err(NotiqError::Worker("worker pool was shut down".into()));
        }
        if !self.handles.is_empty() {
            return Err(NotiqError::Worker("worker pool already started".into()));
        }

        for registration in &self.registrations {
            info!(
                worker_id = %self.config.worker_id,
                queue = %registration.queue,
                concurrency = registration.options.concurrency,
                rate_limit = ?registration.options.rate_limit,
                "Starting lanes"
            );
            for index in 0..registration.options.concurrency {
                let lane = Lane {
                    index,
                    queue: registration.queue.clone(),
                    handler: Arc::clone(&registration.handler),
                    broker: Arc::clone(&self.broker),
                    limiter: Arc::clone(&self.limiter),
                    events: self.events.clone(),
                    app_context: Arc::clone(&self.app_context),
                    config: Arc::clone(&self.config),
                    is_shutting_down: Arc::clone(&self.is_shutting_down),
                    active_jobs: Arc::clone(&self.active_jobs),
                    shutdown_rx: self.shutdown_tx.subscribe(),
                };
                self.handles
                    .push((registration.queue.clone(), tokio::spawn(lane.run())));
            }
        }

        info!(worker_id = %self.config.worker_id, lanes = self.handles.len(), "Worker pool started");
        Ok(())
    }

    /// Stop leasing, let in-flight handlers finish within the shutdown
    /// timeout, then abort whatever is left. Aborted jobs come back through
    /// lease expiry.
    pub async fn shutdown(&mut self) {
        info!(worker_id = %self.config.worker_id, "Initiating graceful shutdown");

        self.is_shutting_down.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());

        let mut handles = std::mem::take(&mut self.handles);
        let drained = timeout(self.config.shutdown_timeout, async {
            for (queue, handle) in handles.iter_mut() {
                if let Err(e) = handle.await {
                    report_lane_exit(&self.events, queue, e);
                }
            }
        })
        .await;

        match drained {
            Ok(()) => info!(worker_id = %self.config.worker_id, "Worker pool drained"),
            Err(_) => {
                let remaining = self.active_jobs.load(Ordering::SeqCst);
                warn!(
                    worker_id = %self.config.worker_id,
                    remaining,
                    "Shutdown timeout reached, abandoning in-flight jobs to lease expiry"
                );
                for (_, handle) in &handles {
                    handle.abort();
                }
            }
        }
    }

    /// Start, then shut down on SIGINT/SIGTERM (or Ctrl+C off unix).
    pub async fn run_until_signal(&mut self) -> Result<()> {
        self.start()?;
        let signal = wait_for_shutdown_signal().await;
        self.shutdown().await;
        signal
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            worker_id: self.config.worker_id.clone(),
            queues: self.registrations.iter().map(|r| r.queue.clone()).collect(),
            lanes: self.handles.len(),
            active_jobs: self.active_jobs.load(Ordering::SeqCst),
            is_shutting_down: self.is_shutting_down.load(Ordering::SeqCst),
        }
    }
}

/// A lane only ends with an error if it panicked outside a handler.
fn report_lane_exit(events: &EventBus, queue: &str, error: tokio::task::JoinError) {
    if !error.is_panic() {
        debug!(queue = %queue, "Lane was cancelled");
        return;
    }
    let cause = format!("lane panicked: {}", panic_message(error.into_panic()));
    warn!(queue = %queue, cause = %cause, "Lane died");
    events.emit(EngineEvent::WorkerError {
        queue: queue.to_string(),
        job_id: None,
        cause,
    });
}

async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal;

    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| NotiqError::Worker(format!("failed to set up SIGTERM handler: {}", e)))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| NotiqError::Worker(format!("failed to set up SIGINT handler: {}", e)))?;

        tokio::select! {
            _ = sigterm.recv() => info!("SIGTERM received"),
            _ = sigint.recv() => info!("SIGINT received"),
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .map_err(|e| NotiqError::Worker(format!("failed to listen for Ctrl+C: {}", e)))?;
        info!("CTRL+C received");
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct WorkerStats {
    pub worker_id: String,
    pub queues: Vec<String>,
    pub lanes: usize,
    pub active_jobs: usize,
    pub is_shutting_down: bool,
}

/// Aborts the handler task if the lane is dropped mid-await.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Lane {
    index: usize,
    queue: String,
    handler: Arc<dyn JobHandler>,
    broker: Arc<dyn Broker>,
    limiter: Arc<RateLimiter>,
    events: EventBus,
    app_context: Arc<dyn AppContext>,
    config: Arc<WorkerConfig>,
    is_shutting_down: Arc<AtomicBool>,
    active_jobs: Arc<AtomicUsize>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl Lane {
    async fn run(mut self) {
        let mut reconnect_delay: Option<Duration> = None;

        loop {
            if self.is_shutting_down.load(Ordering::SeqCst) {
                break;
            }

            let Some(permit) = self.limiter.try_acquire_permit(&self.queue) else {
                let refill = self.limiter.time_until_refill(&self.queue);
                let wait = if refill.is_zero() {
                    self.config.rate_limit_retry
                } else {
                    refill
                };
                if !self.pause(wait).await {
                    break;
                }
                continue;
            };

            let outcome = match self
                .broker
                .lease_next(&self.queue, self.config.visibility_timeout)
                .await
            {
                Ok(Some(lease)) => self.process(lease).await,
                Ok(None) => {
                    self.limiter.release(permit);
                    reconnect_delay = None;
                    if !self.pause(self.config.poll_interval).await {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    self.limiter.release(permit);
                    Err(e)
                }
            };

            match outcome {
                Ok(()) => reconnect_delay = None,
                Err(e) if !e.is_connectivity() => {
                    reconnect_delay = None;
                    warn!(queue = %self.queue, lane = self.index, error = %e, "Broker rejected a lease operation");
                    if !self.pause(self.config.poll_interval).await {
                        break;
                    }
                }
                Err(e) => {
                    self.events.emit(EngineEvent::QueueError {
                        queue: self.queue.clone(),
                        cause: e.to_string(),
                    });
                    let delay = reconnect_delay.map_or(self.config.reconnect_backoff_min, |d| {
                        (d * 2).min(self.config.reconnect_backoff_max)
                    });
                    reconnect_delay = Some(delay);
                    debug!(queue = %self.queue, lane = self.index, delay = ?delay, "Backing off before talking to the broker again");
                    if !self.pause(delay).await {
                        break;
                    }
                }
            }
        }

        debug!(queue = %self.queue, lane = self.index, "Lane stopped");
    }

    /// Sleep unless shutdown arrives first. False means stop.
    async fn pause(&mut self, wait: Duration) -> bool {
        tokio::select! {
            _ = sleep(wait) => !self.is_shutting_down.load(Ordering::SeqCst),
            _ = self.shutdown_rx.recv() => false,
        }
    }

    /// Run the handler for a lease and resolve it. Errors returned here are
    /// broker errors; job failures are absorbed.
    #[instrument(skip_all, fields(queue = %self.queue, lane = self.index, job_id = %lease.job.id))]
    async fn process(&self, lease: Lease) -> Result<()> {
        let _active = ActiveGuard::new(&self.active_jobs);
        let started = std::time::Instant::now();

        let ctx = JobContext::new(lease.job.clone(), Arc::clone(&self.app_context));
        let span = ctx.span.clone();
        let handler = Arc::clone(&self.handler);
        let mut task = AbortOnDrop(tokio::spawn(
            async move { handler.handle(&ctx).await }.instrument(span),
        ));

        let result = match (&mut task.0).await {
            Ok(result) => result.map_err(|e| NotiqError::HandlerFailure(format!("{:#}", e))),
            Err(join_error) => {
                let cause = if join_error.is_panic() {
                    format!("handler panicked: {}", panic_message(join_error.into_panic()))
                } else {
                    "handler task was cancelled".to_string()
                };
                self.events.emit(EngineEvent::WorkerError {
                    queue: self.queue.clone(),
                    job_id: Some(lease.job.id),
                    cause: cause.clone(),
                });
                Err(NotiqError::HandlerFailure(cause))
            }
        };

        match result {
            Ok(()) => {
                debug!(elapsed = ?started.elapsed(), "Handler succeeded");
                self.complete(&lease).await
            }
            Err(failure) => {
                warn!(elapsed = ?started.elapsed(), error = %failure, "Handler failed");
                self.fail(&lease, failure).await
            }
        }
    }

    async fn complete(&self, lease: &Lease) -> Result<()> {
        match self.broker.ack(&lease.job.id, &lease.token).await {
            Ok(()) => {
                self.events.emit(EngineEvent::JobCompleted {
                    queue: self.queue.clone(),
                    job_id: lease.job.id,
                });
                Ok(())
            }
            Err(NotiqError::LeaseExpired(job_id)) => {
                warn!(job_id = %job_id, "Lease expired before ack, result discarded");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn fail(&self, lease: &Lease, failure: NotiqError) -> Result<()> {
        let error = match failure {
            NotiqError::HandlerFailure(message) => message,
            other => other.to_string(),
        };
        let job = &lease.job;
        let attempt = job.attempt + 1;

        let (disposition, event) = if attempt < job.max_attempts() {
            let delay = backoff::next_delay(attempt, &job.options.backoff);
            let disposition = Disposition::Retry {
                attempt,
                next_run_at: run_at_after(delay),
                error,
            };
            let event = EngineEvent::JobRetryScheduled {
                queue: self.queue.clone(),
                job_id: job.id,
                attempt,
                delay,
            };
            (disposition, event)
        } else {
            let event = EngineEvent::JobDead {
                queue: self.queue.clone(),
                job_id: job.id,
                last_error: error.clone(),
            };
            (Disposition::Dead { attempt, error }, event)
        };

        match self.broker.nack(&job.id, &lease.token, disposition).await {
            Ok(()) => {
                self.events.emit(event);
                Ok(())
            }
            Err(NotiqError::LeaseExpired(job_id)) => {
                warn!(job_id = %job_id, "Lease expired before nack, failure discarded");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn run_at_after(delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryBroker;
    use crate::handler_fn;

    fn broker() -> Arc<dyn Broker> {
        Arc::new(MemoryBroker::new())
    }

    #[test]
    fn build_requires_a_registration() {
        assert!(WorkerPool::builder(broker()).build().is_err());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let result = WorkerPool::builder(broker())
            .register("q", handler_fn(|_| async { Ok(()) }), WorkerOptions::new(0))
            .build();
        assert!(matches!(result, Err(NotiqError::InvalidOptions(_))));
    }

    #[test]
    fn invalid_rate_limit_is_rejected() {
        let result = WorkerPool::builder(broker())
            .register(
                "q",
                handler_fn(|_| async { Ok(()) }),
                WorkerOptions::new(1).with_rate_limit(0, Duration::from_secs(1)),
            )
            .build();
        assert!(matches!(result, Err(NotiqError::InvalidOptions(_))));
    }

    #[test]
    fn duplicate_queue_is_rejected() {
        let result = WorkerPool::builder(broker())
            .register("q", handler_fn(|_| async { Ok(()) }), WorkerOptions::new(1))
            .register("q", handler_fn(|_| async { Ok(()) }), WorkerOptions::new(2))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn unusable_config_is_rejected_on_build() {
        let cases = [
            WorkerConfig {
                visibility_timeout: Duration::MAX,
                ..WorkerConfig::default()
            },
            WorkerConfig {
                visibility_timeout: Duration::ZERO,
                ..WorkerConfig::default()
            },
            WorkerConfig {
                poll_interval: Duration::ZERO,
                ..WorkerConfig::default()
            },
            WorkerConfig {
                shutdown_timeout: Duration::MAX,
                ..WorkerConfig::default()
            },
            WorkerConfig {
                reconnect_backoff_max: Duration::from_millis(100),
                ..WorkerConfig::default()
            },
        ];
        for config in cases {
            let result = WorkerPool::builder(broker())
                .with_config(config.clone())
                .register("q", handler_fn(|_| async { Ok(()) }), WorkerOptions::new(1))
                .build();
            assert!(
                matches!(result, Err(NotiqError::InvalidOptions(_))),
                "accepted {:?}",
                config
            );
        }
        assert!(WorkerConfig::default().validate().is_ok());
    }

    #[test]
    fn rate_limits_are_installed_on_build() {
        let pool = WorkerPool::builder(broker())
            .register(
                "email-queue",
                handler_fn(|_| async { Ok(()) }),
                WorkerOptions::new(1).with_rate_limit(10, Duration::from_secs(1)),
            )
            .build()
            .unwrap();
        assert_eq!(
            pool.rate_limiter().limit("email-queue"),
            Some(RateLimit::new(10, Duration::from_secs(1)))
        );
    }

    #[tokio::test]
    async fn start_spawns_lanes_and_refuses_restart() {
        let mut pool = WorkerPool::builder(broker())
            .register("a", handler_fn(|_| async { Ok(()) }), WorkerOptions::new(3))
            .register("b", handler_fn(|_| async { Ok(()) }), WorkerOptions::new(2))
            .with_shutdown_timeout(Duration::from_secs(1))
            .build()
            .unwrap();

        pool.start().unwrap();
        assert_eq!(pool.stats().lanes, 5);
        assert!(pool.start().is_err());

        pool.shutdown().await;
        let stats = pool.stats();
        assert!(stats.is_shutting_down);
        assert_eq!(stats.lanes, 0);
        assert!(pool.start().is_err());
    }

    #[test]
    fn run_at_after_saturates() {
        assert_eq!(run_at_after(Duration::MAX), DateTime::<Utc>::MAX_UTC);
        assert!(run_at_after(Duration::from_secs(1)) > Utc::now());
    }

    #[test]
    fn panic_messages_are_extracted() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42u8)), "non-string panic payload");
    }
}
