/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Decoded message types.
//!
//! This module provides:
//! - [`MessageTypeId`]: numeric template id or textual FIX msgtype
//! - [`MessageIdentity`]: the resolved id and name of one frame
//! - [`DecodedMessage`]: the per-record decode result handed downstream

use crate::error::CapturedError;
use crate::value::Record;
use bytes::Bytes;
use std::fmt;

/// Name reported for messages whose type could not be resolved.
pub const UNKNOWN_MESSAGE_TYPE: &str = "UNKNOWN";

/// Identifier of a message type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageTypeId {
    /// Binary template id.
    Numeric(u32),
    /// FIX msgtype (tag 35 value).
    Text(String),
}

impl fmt::Display for MessageTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{}", id),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<u32> for MessageTypeId {
    fn from(id: u32) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for MessageTypeId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Resolved identity of a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIdentity {
    /// Type identifier.
    pub id: MessageTypeId,
    /// Type name from the schema.
    pub name: String,
}

impl MessageIdentity {
    /// Creates a new identity.
    #[must_use]
    pub fn new(id: impl Into<MessageTypeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Result of decoding one input record.
///
/// Decode failures never escape as `Err`; they are captured in
/// [`DecodedMessage::exception`] instead.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// Type identifier, when resolved.
    pub type_id: Option<MessageTypeId>,
    /// Type name, when resolved.
    pub type_name: Option<String>,
    /// The raw input record.
    pub buffer: Bytes,
    /// Decoded fields.
    pub dictionary: Record,
    /// Captured decode failure.
    pub exception: Option<CapturedError>,
    /// True when filtering, sampling or stats-only mode skipped field decode.
    pub ignored: bool,
}

impl DecodedMessage {
    /// Creates an empty result for a raw record.
    #[must_use]
    pub fn new(buffer: Bytes) -> Self {
        Self {
            type_id: None,
            type_name: None,
            buffer,
            dictionary: Record::new(),
            exception: None,
            ignored: false,
        }
    }

    /// Sets the resolved identity.
    pub fn set_identity(&mut self, identity: MessageIdentity) {
        self.type_id = Some(identity.id);
        self.type_name = Some(identity.name);
    }

    /// Returns the type name, or `"UNKNOWN"` when unresolved.
    #[must_use]
    pub fn name(&self) -> &str {
        self.type_name.as_deref().unwrap_or(UNKNOWN_MESSAGE_TYPE)
    }

    /// Returns true if a decode failure was captured.
    #[inline]
    #[must_use]
    pub const fn has_exception(&self) -> bool {
        self.exception.is_some()
    }

    /// Returns true if no fields were decoded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dictionary.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, DecodeStage};

    #[test]
    fn test_message_type_id_display() {
        assert_eq!(MessageTypeId::Numeric(12).to_string(), "12");
        assert_eq!(MessageTypeId::from("W").to_string(), "W");
    }

    #[test]
    fn test_decoded_message_name_fallback() {
        let mut msg = DecodedMessage::new(Bytes::from_static(b"\x01\x02"));
        assert_eq!(msg.name(), "UNKNOWN");
        assert!(msg.is_empty());

        msg.set_identity(MessageIdentity::new(7u32, "Trade"));
        assert_eq!(msg.name(), "Trade");
        assert_eq!(msg.type_id, Some(MessageTypeId::Numeric(7)));
    }

    #[test]
    fn test_decoded_message_exception() {
        let mut msg = DecodedMessage::new(Bytes::new());
        msg.exception = Some(CapturedError::new(
            None,
            DecodeStage::DecodeMessage,
            DecodeError::UnknownTemplate { template_id: 9 },
        ));
        assert!(msg.has_exception());
        assert!(!msg.ignored);
    }
}
