// src/rate_limit.rs
use crate::{NotiqError, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// At most `max` grants per `duration` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max: u32,
    pub duration: Duration,
}

impl RateLimit {
    pub fn new(max: u32, duration: Duration) -> Self {
        Self { max, duration }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max == 0 {
            return Err(NotiqError::InvalidOptions(
                "rate limit max must be at least 1".into(),
            ));
        }
        if self.duration.is_zero() {
            return Err(NotiqError::InvalidOptions(
                "rate limit duration must be above zero".into(),
            ));
        }
        Ok(())
    }
}

/// A granted token. Handing it back through [`RateLimiter::release`] only
/// counts while its window is still current.
#[derive(Debug)]
pub struct Permit {
    queue: String,
    window: u64,
}

#[derive(Debug)]
struct Window {
    limit: RateLimit,
    started: Instant,
    generation: u64,
    used: u32,
}

impl Window {
    fn roll(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed >= self.limit.duration {
            // Align to the window grid so idle periods do not shift it.
            let periods = (elapsed.as_nanos() / self.limit.duration.as_nanos())
                .min(u32::MAX as u128) as u32;
            self.started += self.limit.duration * periods;
            self.generation += u64::from(periods);
            self.used = 0;
        }
    }
}

/// Fixed-window token bucket per queue. The bucket refills to `max` at the
/// start of every window. Check, reset and take happen under one lock, so
/// concurrent lanes never share or lose a token.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_limit(&self, queue: &str, limit: RateLimit) -> Result<()> {
        limit.validate()?;
        let mut windows = self.lock()?;
        windows.insert(
            queue.to_string(),
            Window {
                limit,
                started: Instant::now(),
                generation: 0,
                used: 0,
            },
        );
        Ok(())
    }

    pub fn limit(&self, queue: &str) -> Option<RateLimit> {
        self.lock().ok()?.get(queue).map(|w| w.limit)
    }

    /// Take a token if the current window has one left. Never blocks.
    pub fn try_acquire(&self, queue: &str) -> bool {
        self.try_acquire_permit(queue).is_some()
    }

    pub fn try_acquire_permit(&self, queue: &str) -> Option<Permit> {
        let mut windows = self.lock().ok()?;
        let Some(window) = windows.get_mut(queue) else {
            return Some(Permit {
                queue: queue.to_string(),
                window: 0,
            });
        };

        window.roll(Instant::now());
        if window.used < window.limit.max {
            window.used += 1;
            Some(Permit {
                queue: queue.to_string(),
                window: window.generation,
            })
        } else {
            None
        }
    }

    /// Return an unused token. Ignored once the window has rolled over.
    pub fn release(&self, permit: Permit) {
        let Ok(mut windows) = self.lock() else {
            return;
        };
        if let Some(window) = windows.get_mut(&permit.queue) {
            window.roll(Instant::now());
            if window.generation == permit.window {
                window.used = window.used.saturating_sub(1);
            }
        }
    }

    /// Time until the queue's bucket refills. Zero for unlimited queues.
    pub fn time_until_refill(&self, queue: &str) -> Duration {
        let Ok(mut windows) = self.lock() else {
            return Duration::ZERO;
        };
        match windows.get_mut(queue) {
            Some(window) => {
                let now = Instant::now();
                window.roll(now);
                (window.started + window.limit.duration).saturating_duration_since(now)
            }
            None => Duration::ZERO,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Window>>> {
        self.windows
            .lock()
            .map_err(|_| NotiqError::Worker("rate limiter lock poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(max: u32, ms: u64) -> RateLimiter {
        let limiter = RateLimiter::new();
        limiter
            .set_limit("email-queue", RateLimit::new(max, Duration::from_millis(ms)))
            .unwrap();
        limiter
    }

    #[test]
    fn unlimited_queue_always_grants() {
        let limiter = RateLimiter::new();
        for _ in 0..1000 {
            assert!(limiter.try_acquire("anything"));
        }
        assert_eq!(limiter.time_until_refill("anything"), Duration::ZERO);
    }

    #[test]
    fn invalid_limits_are_rejected() {
        let limiter = RateLimiter::new();
        assert!(limiter.set_limit("q", RateLimit::new(0, Duration::from_secs(1))).is_err());
        assert!(limiter.set_limit("q", RateLimit::new(5, Duration::ZERO)).is_err());
        assert!(limiter.limit("q").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn grants_max_per_window_then_refills() {
        let limiter = limiter(3, 1000);
        assert!(limiter.try_acquire("email-queue"));
        assert!(limiter.try_acquire("email-queue"));
        assert!(limiter.try_acquire("email-queue"));
        assert!(!limiter.try_acquire("email-queue"));

        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(!limiter.try_acquire("email-queue"));
        assert_eq!(
            limiter.time_until_refill("email-queue"),
            Duration::from_millis(600)
        );

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(limiter.try_acquire("email-queue"));
    }

    #[tokio::test(start_paused = true)]
    async fn queues_are_independent() {
        let limiter = limiter(1, 1000);
        limiter
            .set_limit("sms-queue", RateLimit::new(1, Duration::from_secs(1)))
            .unwrap();
        assert!(limiter.try_acquire("email-queue"));
        assert!(!limiter.try_acquire("email-queue"));
        assert!(limiter.try_acquire("sms-queue"));
    }

    #[tokio::test(start_paused = true)]
    async fn release_returns_token_in_same_window_only() {
        let limiter = limiter(1, 1000);
        let permit = limiter.try_acquire_permit("email-queue").unwrap();
        assert!(!limiter.try_acquire("email-queue"));
        limiter.release(permit);
        assert!(limiter.try_acquire("email-queue"));

        let stale = limiter.try_acquire_permit("email-queue");
        assert!(stale.is_none());

        // Rolled over: the new window already granted one, a stale release must not add another.
        tokio::time::advance(Duration::from_millis(1000)).await;
        let old = Permit {
            queue: "email-queue".into(),
            window: 0,
        };
        assert!(limiter.try_acquire("email-queue"));
        limiter.release(old);
        assert!(!limiter.try_acquire("email-queue"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_never_exceed_max() {
        let limiter = Arc::new(limiter(10, 60_000));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                let mut granted = 0;
                for _ in 0..50 {
                    if limiter.try_acquire("email-queue") {
                        granted += 1;
                    }
                    tokio::task::yield_now().await;
                }
                granted
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        assert_eq!(total, 10);
    }
}
