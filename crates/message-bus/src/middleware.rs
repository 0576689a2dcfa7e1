//! Router middleware.
//!
//! A middleware wraps a handler in another handler. The router applies its
//! middleware in registration order, the first one registered being the
//! outermost.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;

use crate::error::HandlerError;
use crate::handler::{BoxedHandler, Handler};
use crate::message::Message;
use crate::retry::RetryPolicy;

/// Decorates a handler.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

/// Wraps `handler` in `middleware`, first element outermost.
pub fn apply(handler: BoxedHandler, middleware: &[Arc<dyn Middleware>]) -> BoxedHandler {
    middleware
        .iter()
        .rev()
        .fold(handler, |next, layer| layer.wrap(next))
}

/// Copies the incoming message's correlation id onto every produced message.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationId;

impl Middleware for CorrelationId {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(CorrelationIdHandler { next })
    }
}

struct CorrelationIdHandler {
    next: BoxedHandler,
}

#[async_trait]
impl Handler for CorrelationIdHandler {
    async fn handle(&self, message: &Message) -> Result<Vec<Message>, HandlerError> {
        let mut produced = self.next.handle(message).await?;
        if let Some(id) = message.correlation_id() {
            for out in &mut produced {
                out.set_correlation_id(&id);
            }
        }
        Ok(produced)
    }
}

/// Re-invokes a failing handler according to a [`RetryPolicy`].
///
/// With `max_retries = n` a persistently failing handler runs `n + 1` times
/// and the last error is returned.
#[derive(Debug, Clone, Default)]
pub struct Retry {
    policy: RetryPolicy,
}

impl Retry {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl Middleware for Retry {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RetryHandler {
            next,
            policy: self.policy.clone(),
        })
    }
}

struct RetryHandler {
    next: BoxedHandler,
    policy: RetryPolicy,
}

#[async_trait]
impl Handler for RetryHandler {
    async fn handle(&self, message: &Message) -> Result<Vec<Message>, HandlerError> {
        let mut retry = 0;
        loop {
            match self.next.handle(message).await {
                Ok(produced) => return Ok(produced),
                Err(err) if retry < self.policy.max_retries => {
                    let delay = self.policy.delay_for_retry(retry);
                    retry += 1;
                    tracing::warn!(
                        message_id = %message.uuid(),
                        correlation_id = message.correlation_label(),
                        retry,
                        max_retries = self.policy.max_retries,
                        ?delay,
                        error = %err,
                        "handler failed, retrying"
                    );
                    metrics::counter!("bus_handler_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Turns a handler panic into [`HandlerError::Panicked`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Recoverer;

impl Middleware for Recoverer {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RecovererHandler { next })
    }
}

struct RecovererHandler {
    next: BoxedHandler,
}

#[async_trait]
impl Handler for RecovererHandler {
    async fn handle(&self, message: &Message) -> Result<Vec<Message>, HandlerError> {
        match AssertUnwindSafe(self.next.handle(message)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(
                    message_id = %message.uuid(),
                    correlation_id = message.correlation_label(),
                    panic = %reason,
                    "handler panicked"
                );
                metrics::counter!("bus_handler_panics_total").increment(1);
                Err(HandlerError::Panicked(reason))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
