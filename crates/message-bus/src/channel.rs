//! In-process pub/sub channel.
//!
//! Each topic fans out to every live subscription. Publishing never blocks.
//! Messages published to a topic nobody subscribes to are dropped. A nacked
//! message is redelivered to the same subscription after a delay, up to
//! `max_redeliveries` times; after that it is moved to the dead-letter list.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{BusError, Result};
use crate::message::Message;

/// Sends messages to a topic.
pub trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, message: Message) -> Result<()>;
}

/// Opens subscriptions on a topic.
pub trait Subscriber: Send + Sync {
    fn subscribe(&self, topic: &str) -> Result<Subscription>;
}

/// Channel behavior settings.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// How often a nacked message is redelivered before it is dead-lettered.
    pub max_redeliveries: u32,
    /// Pause before a nacked message is handed out again.
    pub redelivery_delay: Duration,
    /// Dead letters kept for inspection; the oldest are discarded first.
    pub dead_letter_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_redeliveries: 0,
            redelivery_delay: Duration::from_millis(100),
            dead_letter_capacity: 1024,
        }
    }
}

/// A message that exhausted its redeliveries.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub topic: String,
    pub message: Message,
    /// Total deliveries attempted.
    pub deliveries: u32,
}

struct Shared {
    config: ChannelConfig,
    closed: AtomicBool,
    subscribers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<Message>>>>,
    dead_letters: Mutex<VecDeque<DeadLetter>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory pub/sub channel. Clones share the same topics.
#[derive(Clone)]
pub struct Channel {
    shared: Arc<Shared>,
}

impl Channel {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                closed: AtomicBool::new(false),
                subscribers: Mutex::new(HashMap::new()),
                dead_letters: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Closes the channel: further publishes and subscribes fail, and open
    /// subscriptions end once their buffered messages are consumed.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.shared.subscribers).clear();
        tracing::debug!("channel closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Messages that exhausted their redeliveries, oldest first.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        lock(&self.shared.dead_letters).iter().cloned().collect()
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        lock(&self.shared.subscribers)
            .get(topic)
            .map_or(0, |subs| subs.iter().filter(|tx| !tx.is_closed()).count())
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new(ChannelConfig::default())
    }
}

impl Publisher for Channel {
    fn publish(&self, topic: &str, message: Message) -> Result<()> {
        if self.is_closed() {
            return Err(BusError::ChannelClosed);
        }

        let mut subscribers = lock(&self.shared.subscribers);
        let Some(subs) = subscribers.get_mut(topic) else {
            tracing::debug!(topic, message_id = %message.uuid(), "no subscribers, message dropped");
            return Ok(());
        };

        // Drop dead subscriptions while publishing.
        subs.retain(|tx| tx.send(message.clone()).is_ok());
        metrics::counter!("bus_messages_published_total", "topic" => topic.to_string()).increment(1);
        Ok(())
    }
}

impl Subscriber for Channel {
    fn subscribe(&self, topic: &str) -> Result<Subscription> {
        if self.is_closed() {
            return Err(BusError::ChannelClosed);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.shared.subscribers)
            .entry(topic.to_string())
            .or_default()
            .push(tx);

        Ok(Subscription {
            topic: topic.to_string(),
            receiver: rx,
            redelivery: None,
            deliveries: 0,
            shared: Arc::clone(&self.shared),
        })
    }
}

/// One subscriber's view of a topic.
///
/// Messages are handed out one at a time; each must be acked or nacked
/// before the next one is taken.
pub struct Subscription {
    topic: String,
    receiver: mpsc::UnboundedReceiver<Message>,
    redelivery: Option<Message>,
    deliveries: u32,
    shared: Arc<Shared>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the next message. Returns `None` once the channel is closed
    /// and the buffer is drained.
    ///
    /// Cancel safe: a pending redelivery is returned without awaiting.
    pub async fn next(&mut self) -> Option<Message> {
        if let Some(message) = self.redelivery.take() {
            self.deliveries += 1;
            return Some(message);
        }
        let message = self.receiver.recv().await?;
        self.deliveries = 1;
        Some(message)
    }

    /// Marks the current message as processed.
    pub fn ack(&mut self) {
        self.deliveries = 0;
    }

    /// Marks the current message as failed.
    ///
    /// The message comes back from [`next`](Self::next) after the configured
    /// delay, or is dead-lettered once redeliveries are exhausted.
    pub async fn nack(&mut self, message: Message) {
        let config = &self.shared.config;
        let redeliveries = self.deliveries.saturating_sub(1);

        if redeliveries < config.max_redeliveries {
            tracing::debug!(
                topic = %self.topic,
                message_id = %message.uuid(),
                redelivery = redeliveries + 1,
                "redelivering nacked message"
            );
            tokio::time::sleep(config.redelivery_delay).await;
            self.redelivery = Some(message);
            return;
        }

        tracing::error!(
            topic = %self.topic,
            message_id = %message.uuid(),
            correlation_id = message.correlation_label(),
            deliveries = self.deliveries,
            "message dead-lettered"
        );
        metrics::counter!("bus_dead_letters_total", "topic" => self.topic.clone()).increment(1);

        let mut dead_letters = lock(&self.shared.dead_letters);
        if config.dead_letter_capacity > 0 {
            if dead_letters.len() == config.dead_letter_capacity {
                dead_letters.pop_front();
            }
            dead_letters.push_back(DeadLetter {
                topic: self.topic.clone(),
                message,
                deliveries: self.deliveries,
            });
        }
        self.deliveries = 0;
    }
}
