//! In-process message bus.
//!
//! This crate provides:
//! - [`Message`]: uuid + metadata + opaque payload
//! - the [`envelope`] codec (`{"EventName": .., "Data": ..}`)
//! - [`Channel`]: topic-based pub/sub with nack redelivery and dead letters
//! - [`Router`]: runs handlers behind middleware, with graceful drain
//! - [`Streamer`]: router preloaded with correlation-id, retry and recoverer middleware
//! - [`EventPublisher`]: fire-and-forget publishing

pub mod channel;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod message;
pub mod middleware;
pub mod publisher;
pub mod retry;
pub mod router;
pub mod signal;
pub mod streamer;

pub use channel::{Channel, ChannelConfig, DeadLetter, Publisher, Subscriber, Subscription};
pub use envelope::{Envelope, TaggedEvent};
pub use error::{BusError, DecodeError, EncodeError, HandlerError, Result};
pub use handler::{BoxedHandler, Handler, handler_fn, no_publish_handler_fn};
pub use message::{CORRELATION_ID_KEY, Message, Metadata};
pub use middleware::Middleware;
pub use publisher::{EventPublisher, PublishFailure};
pub use retry::RetryPolicy;
pub use router::{Router, RouterConfig, RouterState};
pub use streamer::Streamer;
