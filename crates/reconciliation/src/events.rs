//! Order lifecycle events.

use inventory::Order;
use message_bus::envelope::{self, TaggedEvent};
use message_bus::{DecodeError, EncodeError, Message};
use serde_json::Value;

pub const ORDER_CREATED: &str = "OrderCreated";
pub const ORDER_UPDATED: &str = "OrderUpdated";
pub const ORDER_DELETED: &str = "OrderDeleted";

/// A committed order state transition, carrying the order snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    Created(Order),
    Updated(Order),
    Deleted(Order),
}

impl OrderEvent {
    pub fn order(&self) -> &Order {
        match self {
            Self::Created(order) | Self::Updated(order) | Self::Deleted(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            Self::Created(order) | Self::Updated(order) | Self::Deleted(order) => order,
        }
    }

    /// Encodes the event into an envelope message with fresh identifiers.
    pub fn to_message(&self) -> Result<Message, EncodeError> {
        envelope::encode(self.event_name(), self.order())
    }

    pub fn from_message(message: &Message) -> Result<Self, DecodeError> {
        envelope::decode_event(message)
    }
}

impl TaggedEvent for OrderEvent {
    fn event_name(&self) -> &'static str {
        match self {
            Self::Created(_) => ORDER_CREATED,
            Self::Updated(_) => ORDER_UPDATED,
            Self::Deleted(_) => ORDER_DELETED,
        }
    }

    fn from_parts(event_name: &str, data: Value) -> Result<Self, DecodeError> {
        let variant = match event_name {
            ORDER_CREATED => Self::Created,
            ORDER_UPDATED => Self::Updated,
            ORDER_DELETED => Self::Deleted,
            other => return Err(DecodeError::UnknownEvent(other.to_string())),
        };
        envelope::decode_data(event_name, data).map(variant)
    }
}
