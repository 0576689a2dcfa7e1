//! Integration tests for the streamer's middleware chain and lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::MessageId;
use message_bus::{
    Channel, ChannelConfig, HandlerError, Message, Publisher, RetryPolicy, RouterConfig,
    RouterState, Streamer, envelope, handler_fn, no_publish_handler_fn,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Ping {
    n: u32,
}

struct TestHarness {
    streamer: Arc<Streamer>,
    channel: Channel,
    run: Option<tokio::task::JoinHandle<message_bus::Result<()>>>,
}

impl TestHarness {
    fn new(retry: RetryPolicy) -> Self {
        let config = RouterConfig {
            close_timeout: Duration::from_secs(1),
            handle_signals: false,
        };
        Self {
            streamer: Arc::new(Streamer::new(config, retry)),
            channel: Channel::new(ChannelConfig::default()),
            run: None,
        }
    }

    async fn start(&mut self) {
        let streamer = Arc::clone(&self.streamer);
        self.run = Some(tokio::spawn(async move {
            streamer.run(std::future::pending()).await
        }));
        self.streamer.running().await;
    }

    async fn stop(&mut self) -> message_bus::Result<()> {
        self.streamer.close();
        match self.run.take() {
            Some(run) => run.await.expect("router task panicked"),
            None => Ok(()),
        }
    }
}

fn counting_failures(calls: Arc<AtomicUsize>, failures: usize) -> impl message_bus::Handler {
    no_publish_handler_fn(move |_message: Message| {
        let calls = Arc::clone(&calls);
        async move {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            if call < failures {
                Err(HandlerError::new("transient"))
            } else {
                Ok(())
            }
        }
    })
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    while !condition() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn persistent_failure_is_invoked_four_times_then_dead_lettered() {
    let mut harness = TestHarness::new(RetryPolicy::default());
    let calls = Arc::new(AtomicUsize::new(0));
    harness
        .streamer
        .register_handler(
            &harness.channel,
            "orders",
            counting_failures(Arc::clone(&calls), usize::MAX),
        )
        .unwrap();
    harness.start().await;

    harness
        .channel
        .publish("orders", envelope::encode("Ping", &Ping { n: 1 }).unwrap())
        .unwrap();

    let channel = harness.channel.clone();
    wait_until(|| !channel.dead_letters().is_empty()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn transient_failure_recovers_within_retries() {
    let mut harness = TestHarness::new(RetryPolicy::default());
    let calls = Arc::new(AtomicUsize::new(0));
    harness
        .streamer
        .register_handler(&harness.channel, "orders", counting_failures(Arc::clone(&calls), 2))
        .unwrap();
    harness.start().await;

    harness
        .channel
        .publish("orders", envelope::encode("Ping", &Ping { n: 1 }).unwrap())
        .unwrap();

    let counter = Arc::clone(&calls);
    wait_until(|| counter.load(Ordering::SeqCst) == 3).await;
    harness.stop().await.unwrap();

    assert!(harness.channel.dead_letters().is_empty());
}

#[tokio::test(start_paused = true)]
async fn panics_are_retried_like_errors() {
    let mut harness = TestHarness::new(RetryPolicy::fixed(2, Duration::from_millis(10)));
    let calls = Arc::new(AtomicUsize::new(0));
    harness
        .streamer
        .register_handler(
            &harness.channel,
            "orders",
            no_publish_handler_fn({
                let calls = Arc::clone(&calls);
                move |_message: Message| {
                    let calls = Arc::clone(&calls);
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                            panic!("first delivery explodes");
                        }
                        Ok(())
                    }
                }
            }),
        )
        .unwrap();
    harness.start().await;

    harness
        .channel
        .publish("orders", envelope::encode("Ping", &Ping { n: 1 }).unwrap())
        .unwrap();

    let counter = Arc::clone(&calls);
    wait_until(|| counter.load(Ordering::SeqCst) == 2).await;
    assert_eq!(harness.streamer.state(), RouterState::Running);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn registrations_on_one_topic_each_receive_every_message() {
    let mut harness = TestHarness::new(RetryPolicy::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    for label in ["first", "second"] {
        let tx = tx.clone();
        harness
            .streamer
            .register_handler(
                &harness.channel,
                "orders",
                no_publish_handler_fn(move |message: Message| {
                    let tx = tx.clone();
                    async move {
                        let ping: Ping = envelope::decode(message.payload())?.data;
                        let _ = tx.send((label, ping.n));
                        Ok(())
                    }
                }),
            )
            .unwrap();
    }
    harness.start().await;

    harness
        .channel
        .publish("orders", envelope::encode("Ping", &Ping { n: 5 }).unwrap())
        .unwrap();

    let mut seen = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
    seen.sort();
    assert_eq!(seen, vec![("first", 5), ("second", 5)]);

    harness.stop().await.unwrap();
}

#[tokio::test]
async fn delivery_within_a_registration_is_sequential() {
    let mut harness = TestHarness::new(RetryPolicy::default());
    let (tx, mut rx) = mpsc::unbounded_channel();
    harness
        .streamer
        .register_handler(
            &harness.channel,
            "orders",
            no_publish_handler_fn(move |message: Message| {
                let tx = tx.clone();
                async move {
                    let ping: Ping = envelope::decode(message.payload())?.data;
                    tokio::time::sleep(Duration::from_millis(u64::from(10 - ping.n))).await;
                    let _ = tx.send(ping.n);
                    Ok(())
                }
            }),
        )
        .unwrap();
    harness.start().await;

    for n in 0..10 {
        harness
            .channel
            .publish("orders", envelope::encode("Ping", &Ping { n }).unwrap())
            .unwrap();
    }

    let mut order = Vec::new();
    for _ in 0..10 {
        order.push(rx.recv().await.unwrap());
    }
    assert_eq!(order, (0..10).collect::<Vec<_>>());

    harness.stop().await.unwrap();
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_handler() {
    let mut harness = TestHarness::new(RetryPolicy::default());
    let finished = Arc::new(AtomicUsize::new(0));
    let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
    harness
        .streamer
        .register_handler(
            &harness.channel,
            "orders",
            no_publish_handler_fn({
                let finished = Arc::clone(&finished);
                move |_message: Message| {
                    let finished = Arc::clone(&finished);
                    let entered_tx = entered_tx.clone();
                    async move {
                        let _ = entered_tx.send(());
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        finished.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }
            }),
        )
        .unwrap();
    harness.start().await;

    harness
        .channel
        .publish("orders", envelope::encode("Ping", &Ping { n: 1 }).unwrap())
        .unwrap();
    entered_rx.recv().await.unwrap();

    harness.stop().await.unwrap();
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(harness.streamer.state(), RouterState::Stopped);
}

#[tokio::test]
async fn external_shutdown_future_stops_the_router() {
    let streamer = Arc::new(Streamer::default());
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let run = tokio::spawn({
        let streamer = Arc::clone(&streamer);
        async move {
            streamer
                .run(async {
                    let _ = stop_rx.await;
                })
                .await
        }
    });
    streamer.running().await;

    stop_tx.send(()).unwrap();
    run.await.unwrap().unwrap();
    assert_eq!(streamer.state(), RouterState::Stopped);
}

#[tokio::test]
async fn produced_messages_carry_the_trigger_correlation_id() {
    let mut harness = TestHarness::new(RetryPolicy::default());
    let mut replies = message_bus::Subscriber::subscribe(&harness.channel, "replies").unwrap();
    harness
        .streamer
        .register_publishing_handler(
            &harness.channel,
            "orders",
            "replies",
            Arc::new(harness.channel.clone()),
            handler_fn(|_message: Message| async {
                Ok(vec![Message::new(MessageId::new(), b"pong".to_vec())])
            }),
        )
        .unwrap();
    harness.start().await;

    let trigger = envelope::encode("Ping", &Ping { n: 1 }).unwrap();
    let correlation_id = trigger.correlation_id();
    harness.channel.publish("orders", trigger).unwrap();

    let reply = replies.next().await.unwrap();
    assert_eq!(reply.correlation_id(), correlation_id);

    harness.stop().await.unwrap();
}
