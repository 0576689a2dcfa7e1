//! Transport-level messages.

use std::collections::BTreeMap;

use common::{CorrelationId, MessageId};

/// Metadata key holding a message's correlation id.
pub const CORRELATION_ID_KEY: &str = "correlation_id";

/// Transport metadata attached to a message, kept apart from the payload.
pub type Metadata = BTreeMap<String, String>;

/// A message as it travels through channels and handlers.
///
/// The payload is opaque bytes; identifiers live in the uuid and metadata,
/// never in the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    uuid: MessageId,
    metadata: Metadata,
    payload: Vec<u8>,
}

impl Message {
    /// Creates a message with empty metadata.
    pub fn new(uuid: MessageId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            uuid,
            metadata: Metadata::new(),
            payload: payload.into(),
        }
    }

    pub fn uuid(&self) -> MessageId {
        self.uuid
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Sets a metadata entry, replacing any previous value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// The correlation id carried in metadata, if any.
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.metadata
            .get(CORRELATION_ID_KEY)
            .map(|id| CorrelationId::from(id.as_str()))
    }

    pub fn set_correlation_id(&mut self, id: &CorrelationId) {
        self.set_metadata(CORRELATION_ID_KEY, id.as_str());
    }

    /// Correlation id for log fields; empty when absent.
    pub fn correlation_label(&self) -> &str {
        self.metadata
            .get(CORRELATION_ID_KEY)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_lives_in_metadata() {
        let mut message = Message::new(MessageId::new(), b"{}".to_vec());
        assert!(message.correlation_id().is_none());

        let id = CorrelationId::new();
        message.set_correlation_id(&id);

        assert_eq!(message.correlation_id(), Some(id.clone()));
        assert_eq!(message.metadata().get(CORRELATION_ID_KEY), Some(&id.to_string()));
        assert_eq!(message.payload(), b"{}");
    }
}
