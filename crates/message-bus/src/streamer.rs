//! The message bus as the rest of the system sees it.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{SecondsFormat, Utc};

use crate::channel::{Publisher, Subscriber};
use crate::error::Result;
use crate::handler::Handler;
use crate::middleware::{CorrelationId, Recoverer, Retry};
use crate::retry::RetryPolicy;
use crate::router::{Router, RouterConfig, RouterState};

/// A router preloaded with the standard middleware chain:
/// correlation-id propagation, then retry, then panic recovery.
///
/// Registrations are keyed by topic and registration time, so the same
/// topic can be registered any number of times; each registration gets its
/// own delivery stream.
pub struct Streamer {
    router: Router,
    sequence: AtomicU64,
}

impl Streamer {
    pub fn new(config: RouterConfig, retry: RetryPolicy) -> Self {
        let router = Router::new(config);
        router.add_middleware(CorrelationId);
        router.add_middleware(Retry::new(retry));
        router.add_middleware(Recoverer);
        Self {
            router,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Subscribes `handler` to `topic` on `channel` and returns the
    /// registration key.
    pub fn register_handler(
        &self,
        channel: &dyn Subscriber,
        topic: &str,
        handler: impl Handler + 'static,
    ) -> Result<String> {
        let key = self.registration_key(topic);
        self.router
            .add_no_publisher_handler(key.clone(), topic, channel, handler)?;
        Ok(key)
    }

    /// Like [`register_handler`](Self::register_handler), publishing the
    /// handler's output to `publish_topic`.
    pub fn register_publishing_handler(
        &self,
        channel: &dyn Subscriber,
        topic: &str,
        publish_topic: &str,
        publisher: Arc<dyn Publisher>,
        handler: impl Handler + 'static,
    ) -> Result<String> {
        let key = self.registration_key(topic);
        self.router
            .add_handler(key.clone(), topic, channel, publish_topic, publisher, handler)?;
        Ok(key)
    }

    /// Dispatches until `shutdown` resolves or the process is signalled,
    /// then drains in-flight handlers.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        self.router.run(shutdown).await
    }

    pub fn close(&self) {
        self.router.close();
    }

    pub fn state(&self) -> RouterState {
        self.router.state()
    }

    pub async fn running(&self) {
        self.router.running().await;
    }

    fn registration_key(&self, topic: &str) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "{topic}_{}_{seq}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
        )
    }
}

impl Default for Streamer {
    fn default() -> Self {
        Self::new(RouterConfig::default(), RetryPolicy::default())
    }
}
