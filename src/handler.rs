// src/handler.rs
use crate::JobContext;
use std::future::Future;
use std::marker::PhantomData;

/// Consumer side of a queue. The returned result is the only success signal:
/// `Err` sends the job through the retry state machine.
#[async_trait::async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, ctx: &JobContext) -> anyhow::Result<()>;
}

/// Handler backed by a closure over the job's JSON payload.
pub struct FnHandler<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

/// Wrap an async closure taking the payload as a [`JobHandler`].
///
/// ```ignore
/// let handler = notiq::handler_fn(|payload| async move {
///     tracing::info!(?payload, "sending");
///     Ok(())
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F, Fut>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnHandler {
        f,
        _fut: PhantomData,
    }
}

#[async_trait::async_trait]
impl<F, Fut> JobHandler for FnHandler<F, Fut>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, ctx: &JobContext) -> anyhow::Result<()> {
        (self.f)(ctx.payload().clone()).await
    }
}
