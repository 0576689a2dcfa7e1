//! Bus error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by channels and the router.
#[derive(Debug, Error)]
pub enum BusError {
    /// The channel has been closed and accepts no more messages or subscribers.
    #[error("Channel is closed")]
    ChannelClosed,

    /// A handler with this name is already registered on the router.
    #[error("Duplicate handler name: {0}")]
    DuplicateHandler(String),

    /// The router is already running or draining.
    #[error("Router is not stopped")]
    RouterNotStopped,

    /// In-flight handlers did not finish within the close timeout.
    #[error("Router close timed out after {0:?}")]
    CloseTimeout(Duration),
}

/// Failure to turn a payload into an envelope message.
#[derive(Debug, Error)]
#[error("Envelope encoding error: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

/// Failure to read an envelope or its payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The message body is not a well-formed envelope.
    #[error("Malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// The envelope's `Data` does not match the type its event name calls for.
    #[error("Malformed payload for {event_name}: {source}")]
    Payload {
        event_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The envelope names an event the decoder does not know.
    #[error("Unknown event name: {0}")]
    UnknownEvent(String),
}

/// Error returned by a message handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error(transparent)]
    Failed(Box<dyn std::error::Error + Send + Sync>),

    /// The handler panicked; the panic was caught by the recoverer middleware.
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Wraps any error as a handler failure.
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Failed(err.into())
    }
}

impl From<DecodeError> for HandlerError {
    fn from(err: DecodeError) -> Self {
        Self::new(err)
    }
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
