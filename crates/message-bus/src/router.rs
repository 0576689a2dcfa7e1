//! Message router: dispatches subscribed messages through middleware to handlers.
//!
//! Lifecycle: `Stopped -> Running -> Draining -> Stopped`. Each registration
//! gets its own task and processes its messages one at a time, in arrival
//! order. Different registrations run concurrently.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::channel::{Publisher, Subscriber, Subscription};
use crate::error::{BusError, Result};
use crate::handler::{BoxedHandler, Handler};
use crate::message::Message;
use crate::middleware::{self, Middleware};
use crate::signal::shutdown_signal;

/// Router settings.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Upper bound on waiting for in-flight handlers during shutdown.
    pub close_timeout: Duration,
    /// Also stop on SIGINT/SIGTERM.
    pub handle_signals: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            close_timeout: Duration::from_secs(60 * 60),
            handle_signals: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    Stopped,
    Running,
    Draining,
}

struct Output {
    topic: String,
    publisher: Arc<dyn Publisher>,
}

struct Registration {
    name: String,
    subscription: Subscription,
    handler: BoxedHandler,
    output: Option<Output>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn closed(close: &mut watch::Receiver<bool>) {
    // A dropped sender means the router is gone; stop as well.
    let _ = close.wait_for(|closed| *closed).await;
}

/// Hosts handler registrations and runs them until shut down.
pub struct Router {
    config: RouterConfig,
    middleware: Mutex<Vec<Arc<dyn Middleware>>>,
    names: Mutex<HashSet<String>>,
    pending: Mutex<Vec<Registration>>,
    tasks: Mutex<Vec<JoinHandle<Registration>>>,
    state: watch::Sender<RouterState>,
    close: watch::Sender<bool>,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            middleware: Mutex::new(Vec::new()),
            names: Mutex::new(HashSet::new()),
            pending: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
            state: watch::channel(RouterState::Stopped).0,
            close: watch::channel(false).0,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Appends a middleware. The first one added is the outermost.
    ///
    /// Middleware applies to handlers started after it is added.
    pub fn add_middleware(&self, middleware: impl Middleware + 'static) {
        lock(&self.middleware).push(Arc::new(middleware));
    }

    /// Registers a handler whose output messages are published to `publish_topic`.
    pub fn add_handler(
        &self,
        name: impl Into<String>,
        subscribe_topic: &str,
        subscriber: &dyn Subscriber,
        publish_topic: &str,
        publisher: Arc<dyn Publisher>,
        handler: impl Handler + 'static,
    ) -> Result<()> {
        let output = Output {
            topic: publish_topic.to_string(),
            publisher,
        };
        self.register(name.into(), subscribe_topic, subscriber, Arc::new(handler), Some(output))
    }

    /// Registers a handler that produces no messages.
    pub fn add_no_publisher_handler(
        &self,
        name: impl Into<String>,
        subscribe_topic: &str,
        subscriber: &dyn Subscriber,
        handler: impl Handler + 'static,
    ) -> Result<()> {
        self.register(name.into(), subscribe_topic, subscriber, Arc::new(handler), None)
    }

    fn register(
        &self,
        name: String,
        topic: &str,
        subscriber: &dyn Subscriber,
        handler: BoxedHandler,
        output: Option<Output>,
    ) -> Result<()> {
        let mut pending = lock(&self.pending);
        let state = *self.state.borrow();
        if state == RouterState::Draining {
            return Err(BusError::RouterNotStopped);
        }
        if !lock(&self.names).insert(name.clone()) {
            return Err(BusError::DuplicateHandler(name));
        }

        let subscription = match subscriber.subscribe(topic) {
            Ok(subscription) => subscription,
            Err(err) => {
                lock(&self.names).remove(&name);
                return Err(err);
            }
        };
        tracing::info!(handler = %name, topic, "handler registered");

        let registration = Registration {
            name,
            subscription,
            handler,
            output,
        };
        if state == RouterState::Running {
            let middleware = lock(&self.middleware).clone();
            let task = self.spawn(registration, &middleware);
            lock(&self.tasks).push(task);
        } else {
            pending.push(registration);
        }
        Ok(())
    }

    pub fn state(&self) -> RouterState {
        *self.state.borrow()
    }

    /// Resolves once the router is running.
    pub async fn running(&self) {
        let mut state = self.state.subscribe();
        let _ = state.wait_for(|state| *state == RouterState::Running).await;
    }

    /// Asks a running router to stop. `run` then drains and returns.
    pub fn close(&self) {
        self.close.send_replace(true);
    }

    /// Runs every registered handler until `shutdown` resolves, [`close`](Self::close)
    /// is called, or (with `handle_signals`) a termination signal arrives.
    ///
    /// In-flight handlers are then given `close_timeout` to finish. If they do
    /// not, `run` returns [`BusError::CloseTimeout`] and leaves them running
    /// detached.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        {
            let mut pending = lock(&self.pending);
            if *self.state.borrow() != RouterState::Stopped {
                return Err(BusError::RouterNotStopped);
            }
            self.close.send_replace(false);

            let middleware = lock(&self.middleware).clone();
            let started: Vec<_> = pending
                .drain(..)
                .map(|registration| self.spawn(registration, &middleware))
                .collect();
            tracing::info!(handlers = started.len(), "router running");
            lock(&self.tasks).extend(started);
            self.state.send_replace(RouterState::Running);
        }

        let mut close = self.close.subscribe();
        let handle_signals = self.config.handle_signals;
        let signals = async move {
            if handle_signals {
                shutdown_signal().await;
            } else {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            () = shutdown => tracing::info!("router shutdown requested"),
            () = signals => {}
            () = closed(&mut close) => tracing::info!("router closed"),
        }

        self.drain().await
    }

    async fn drain(&self) -> Result<()> {
        // Registration holds `pending` while it reads the state, so no task can
        // be pushed after the take below.
        let tasks = {
            let _pending = lock(&self.pending);
            self.state.send_replace(RouterState::Draining);
            self.close.send_replace(true);
            std::mem::take(&mut *lock(&self.tasks))
        };
        tracing::info!(handlers = tasks.len(), timeout = ?self.config.close_timeout, "draining handlers");

        let result = match tokio::time::timeout(self.config.close_timeout, join_all(tasks)).await {
            Ok(finished) => {
                let mut pending = lock(&self.pending);
                for task in finished {
                    match task {
                        Ok(registration) => pending.push(registration),
                        Err(err) => tracing::error!(error = %err, "handler task failed"),
                    }
                }
                tracing::info!("router stopped");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.config.close_timeout,
                    "close timeout elapsed, leaving in-flight handlers detached"
                );
                Err(BusError::CloseTimeout(self.config.close_timeout))
            }
        };

        self.state.send_replace(RouterState::Stopped);
        result
    }

    fn spawn(
        &self,
        registration: Registration,
        middleware: &[Arc<dyn Middleware>],
    ) -> JoinHandle<Registration> {
        let handler = middleware::apply(Arc::clone(&registration.handler), middleware);
        let close = self.close.subscribe();
        tokio::spawn(dispatch(registration, handler, close))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

async fn dispatch(
    mut registration: Registration,
    handler: BoxedHandler,
    mut close: watch::Receiver<bool>,
) -> Registration {
    loop {
        let message = tokio::select! {
            biased;
            () = closed(&mut close) => break,
            message = registration.subscription.next() => match message {
                Some(message) => message,
                None => {
                    tracing::debug!(handler = %registration.name, "subscription ended");
                    break;
                }
            },
        };
        registration.process(&handler, message).await;
    }
    registration
}

impl Registration {
    async fn process(&mut self, handler: &BoxedHandler, message: Message) {
        let started = Instant::now();
        let span = tracing::info_span!(
            "handle_message",
            handler = %self.name,
            topic = %self.subscription.topic(),
            message_id = %message.uuid(),
            correlation_id = message.correlation_label(),
        );

        let result = handler.handle(&message).instrument(span).await;
        metrics::histogram!("bus_handler_duration_seconds", "handler" => self.name.clone())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(produced) => {
                self.subscription.ack();
                metrics::counter!("bus_messages_handled_total", "handler" => self.name.clone())
                    .increment(1);
                self.publish(produced);
            }
            Err(err) => {
                tracing::error!(
                    handler = %self.name,
                    message_id = %message.uuid(),
                    correlation_id = message.correlation_label(),
                    error = %err,
                    "handler failed, nacking message"
                );
                metrics::counter!("bus_handler_errors_total", "handler" => self.name.clone())
                    .increment(1);
                metrics::counter!("bus_messages_nacked_total", "handler" => self.name.clone())
                    .increment(1);
                self.subscription.nack(message).await;
            }
        }
    }

    fn publish(&self, produced: Vec<Message>) {
        let Some(output) = &self.output else {
            if !produced.is_empty() {
                tracing::warn!(
                    handler = %self.name,
                    count = produced.len(),
                    "handler has no publisher, produced messages dropped"
                );
            }
            return;
        };

        for message in produced {
            let message_id = message.uuid();
            if let Err(err) = output.publisher.publish(&output.topic, message) {
                tracing::error!(
                    handler = %self.name,
                    topic = %output.topic,
                    %message_id,
                    error = %err,
                    "failed to publish handler output"
                );
            }
        }
    }
}
