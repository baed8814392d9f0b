use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::msgid::MsgId;

/// The fixed `{header, body}` shape carried over every socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub header: Header,
    pub body: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub msg_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
}

impl Envelope {
    pub fn new(key: impl Into<String>, msg_id: MsgId, body: Value) -> Self {
        Self {
            header: Header {
                key: key.into(),
                msg_id: msg_id.to_string(),
                sender_id: None,
            },
            body,
        }
    }

    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.header.sender_id = Some(sender_id.into());
        self
    }

    /// Build a reply envelope that echoes this envelope's `msg_id`, with a
    /// (possibly different) key and sender identity, as peers do when
    /// answering the manager.
    pub fn reply(&self, key: impl Into<String>, sender_id: impl Into<String>, body: Value) -> Self {
        Self {
            header: Header {
                key: key.into(),
                msg_id: self.header.msg_id.clone(),
                sender_id: Some(sender_id.into()),
            },
            body,
        }
    }

    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(EnvelopeError::Encode)
    }

    pub fn from_json(s: &str) -> Result<Self, EnvelopeError> {
        serde_json::from_str(s).map_err(EnvelopeError::Decode)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode envelope: {0}")]
    Decode(#[source] serde_json::Error),
}
