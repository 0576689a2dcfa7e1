//! Fire-and-forget publishing.

use std::fmt;
use std::sync::Arc;

use common::{CorrelationId, MessageId};

use crate::channel::Publisher;
use crate::error::BusError;
use crate::message::Message;

/// Details of a publish that did not go through.
#[derive(Debug)]
pub struct PublishFailure<'a> {
    pub topic: &'a str,
    pub message_id: MessageId,
    pub correlation_id: Option<CorrelationId>,
    pub error: &'a BusError,
}

type FailureHook = Arc<dyn Fn(&PublishFailure<'_>) + Send + Sync>;

/// Publishes without reporting failure to the caller.
///
/// A failed publish is logged with the message's correlation id and passed
/// to the failure hook, if one is installed. The caller's own work is never
/// rolled back because an event could not be sent.
#[derive(Clone)]
pub struct EventPublisher {
    publisher: Arc<dyn Publisher>,
    on_failure: Option<FailureHook>,
}

impl EventPublisher {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            publisher,
            on_failure: None,
        }
    }

    /// Installs a callback invoked for every failed publish.
    #[must_use]
    pub fn with_failure_hook(
        mut self,
        hook: impl Fn(&PublishFailure<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    pub fn publish(&self, topic: &str, message: Message) {
        let message_id = message.uuid();
        let correlation_id = message.correlation_id();

        match self.publisher.publish(topic, message) {
            Ok(()) => {
                tracing::debug!(topic, %message_id, "message published");
            }
            Err(err) => {
                tracing::error!(
                    topic,
                    %message_id,
                    correlation_id = correlation_id.as_ref().map(CorrelationId::as_str).unwrap_or_default(),
                    error = %err,
                    "failed to publish message"
                );
                metrics::counter!("bus_publish_failures_total", "topic" => topic.to_string())
                    .increment(1);
                if let Some(hook) = &self.on_failure {
                    hook(&PublishFailure {
                        topic,
                        message_id,
                        correlation_id,
                        error: &err,
                    });
                }
            }
        }
    }
}

impl fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("on_failure", &self.on_failure.is_some())
            .finish_non_exhaustive()
    }
}
