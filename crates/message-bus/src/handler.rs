//! Message handler trait and closure adapters.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::message::Message;

/// Processes one message, optionally producing messages to publish.
///
/// An `Err` means the message was not processed; the router nacks it.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, message: &Message) -> Result<Vec<Message>, HandlerError>;
}

/// Shared handler, as stored by the router and wrapped by middleware.
pub type BoxedHandler = Arc<dyn Handler>;

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn handle(&self, message: &Message) -> Result<Vec<Message>, HandlerError> {
        (**self).handle(message).await
    }
}

/// Handler built from an async closure that produces messages.
pub struct HandlerFn<F>(F);

/// Adapts `f` into a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Message>, HandlerError>> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Message>, HandlerError>> + Send + 'static,
{
    async fn handle(&self, message: &Message) -> Result<Vec<Message>, HandlerError> {
        (self.0)(message.clone()).await
    }
}

/// Handler built from an async closure that produces nothing.
pub struct NoPublishHandlerFn<F>(F);

/// Adapts `f` into a [`Handler`] with no output messages.
pub fn no_publish_handler_fn<F, Fut>(f: F) -> NoPublishHandlerFn<F>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    NoPublishHandlerFn(f)
}

#[async_trait]
impl<F, Fut> Handler for NoPublishHandlerFn<F>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, message: &Message) -> Result<Vec<Message>, HandlerError> {
        (self.0)(message.clone()).await?;
        Ok(Vec::new())
    }
}
