//! Event envelope codec.
//!
//! Every event travels as a JSON object `{"EventName": <string>, "Data": <payload>}`.
//! Decoding is two-stage: the envelope is read with `Data` left as raw JSON,
//! then the payload is decoded into the type selected by the event name.

use common::{CorrelationId, MessageId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DecodeError, EncodeError};
use crate::message::Message;

/// The JSON wrapper every event is carried in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "EventName")]
    pub event_name: String,
    #[serde(rename = "Data")]
    pub data: T,
}

/// A closed set of events sharing one topic, identified by their envelope name.
pub trait TaggedEvent: Sized {
    /// Name written into `EventName`.
    fn event_name(&self) -> &'static str;

    /// Builds the variant named by `event_name` from its raw payload.
    ///
    /// Unknown names fail with [`DecodeError::UnknownEvent`].
    fn from_parts(event_name: &str, data: Value) -> Result<Self, DecodeError>;
}

/// Wraps `data` in an envelope and builds a message with a fresh uuid and a
/// fresh correlation id.
pub fn encode<T: Serialize + ?Sized>(event_name: &str, data: &T) -> Result<Message, EncodeError> {
    let envelope = Envelope {
        event_name: event_name.to_string(),
        data,
    };
    let payload = serde_json::to_vec(&envelope)?;
    let mut message = Message::new(MessageId::new(), payload);
    message.set_correlation_id(&CorrelationId::new());
    Ok(message)
}

/// First stage: reads the envelope, leaving `Data` undecoded.
pub fn decode_envelope(payload: &[u8]) -> Result<Envelope<Value>, DecodeError> {
    serde_json::from_slice(payload).map_err(DecodeError::Envelope)
}

/// Decodes an envelope whose payload type is known up front.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<Envelope<T>, DecodeError> {
    let Envelope { event_name, data } = decode_envelope(payload)?;
    let data = decode_data(&event_name, data)?;
    Ok(Envelope { event_name, data })
}

/// Second stage: decodes a raw payload, attributing failures to `event_name`.
pub fn decode_data<T: DeserializeOwned>(event_name: &str, data: Value) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|source| DecodeError::Payload {
        event_name: event_name.to_string(),
        source,
    })
}

/// Decodes a message into one of the events of `E`.
pub fn decode_event<E: TaggedEvent>(message: &Message) -> Result<E, DecodeError> {
    let Envelope { event_name, data } = decode_envelope(message.payload())?;
    E::from_parts(&event_name, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ping {
        id: u64,
    }

    #[derive(Debug, PartialEq)]
    enum TestEvent {
        Ping(Ping),
        Pong(Ping),
    }

    impl TaggedEvent for TestEvent {
        fn event_name(&self) -> &'static str {
            match self {
                Self::Ping(_) => "Ping",
                Self::Pong(_) => "Pong",
            }
        }

        fn from_parts(event_name: &str, data: Value) -> Result<Self, DecodeError> {
            match event_name {
                "Ping" => decode_data(event_name, data).map(Self::Ping),
                "Pong" => decode_data(event_name, data).map(Self::Pong),
                other => Err(DecodeError::UnknownEvent(other.to_string())),
            }
        }
    }

    #[test]
    fn encode_writes_envelope_fields() {
        let message = encode("Ping", &Ping { id: 7 }).unwrap();

        let json: Value = serde_json::from_slice(message.payload()).unwrap();
        assert_eq!(json, serde_json::json!({"EventName": "Ping", "Data": {"id": 7}}));
        assert!(message.correlation_id().is_some());
    }

    #[test]
    fn encode_assigns_fresh_identifiers() {
        let a = encode("Ping", &Ping { id: 1 }).unwrap();
        let b = encode("Ping", &Ping { id: 1 }).unwrap();

        assert_ne!(a.uuid(), b.uuid());
        assert_ne!(a.correlation_id(), b.correlation_id());
    }

    #[test]
    fn decode_event_branches_on_name() {
        let message = encode("Pong", &Ping { id: 3 }).unwrap();
        let event: TestEvent = decode_event(&message).unwrap();
        assert_eq!(event, TestEvent::Pong(Ping { id: 3 }));
        assert_eq!(event.event_name(), "Pong");
    }

    #[test]
    fn malformed_envelope_is_rejected() {
        let err = decode_envelope(b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::Envelope(_)));

        let err = decode_envelope(br#"{"Data": {}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Envelope(_)));
    }

    #[test]
    fn malformed_payload_names_the_event() {
        let err = decode::<Ping>(br#"{"EventName": "Ping", "Data": {"id": "x"}}"#).unwrap_err();
        match err {
            DecodeError::Payload { event_name, .. } => assert_eq!(event_name, "Ping"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_is_rejected() {
        let message = encode("Nope", &Ping { id: 1 }).unwrap();
        let err = decode_event::<TestEvent>(&message).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownEvent(name) if name == "Nope"));
    }
}
