/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the marketcast decoders.
//!
//! Errors fall into three channels:
//! - [`SchemaError`]: fatal, raised while building a catalogue or FIX spec
//! - [`DecodeError`]: recoverable, captured on the decoded message
//! - [`ConfigError`]: fatal at the offending configuration or mutation call
//!
//! [`CapturedError`] wraps a [`DecodeError`] together with the stage and
//! message type it was raised for, so downstream loggers get the full context.

use std::fmt;
use thiserror::Error;

/// Result type alias using [`MarketcastError`] as the error type.
pub type Result<T> = std::result::Result<T, MarketcastError>;

/// Top-level error type for all marketcast operations.
#[derive(Debug, Error)]
pub enum MarketcastError {
    /// Schema or dictionary definition could not be built.
    #[error("schema definition error: {0}")]
    Schema(#[from] SchemaError),

    /// A single message failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Conflicting configuration or an invalid mutation request.
    #[error("configuration conflict: {0}")]
    Config(#[from] ConfigError),

    /// I/O error from the underlying source.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building a schema catalogue or FIX specification.
///
/// These are always fatal: no partially built catalogue is ever handed out.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The definition file could not be read.
    #[error("failed to read definition {path}: {reason}")]
    Io {
        /// Path of the definition file.
        path: String,
        /// Underlying I/O error text.
        reason: String,
    },

    /// The definition is not well-formed XML.
    #[error("malformed definition xml: {0}")]
    Xml(String),

    /// A field references a type that is not defined.
    #[error("undefined type '{type_name}' referenced by '{referenced_by}'")]
    UndefinedType {
        /// Name of the missing type.
        type_name: String,
        /// Field, group or type holding the reference.
        referenced_by: String,
    },

    /// A FIX composition references a field that is not defined.
    #[error("undefined field '{name}' referenced by '{referenced_by}'")]
    UndefinedField {
        /// Name of the missing field.
        name: String,
        /// Message, component or group holding the reference.
        referenced_by: String,
    },

    /// A FIX composition references a component that is not defined.
    #[error("undefined component '{name}' referenced by '{referenced_by}'")]
    UndefinedComponent {
        /// Name of the missing component.
        name: String,
        /// Message, component or group holding the reference.
        referenced_by: String,
    },

    /// A FIX component includes itself, directly or transitively.
    #[error("component '{0}' is defined recursively")]
    RecursiveComponent(String),

    /// A required attribute is missing from an element.
    #[error("element '{element}' is missing attribute '{attribute}'")]
    MissingAttribute {
        /// Element tag or name.
        element: String,
        /// Missing attribute name.
        attribute: String,
    },

    /// An attribute value could not be interpreted.
    #[error("element '{element}' has invalid {attribute}='{value}'")]
    InvalidAttribute {
        /// Element tag or name.
        element: String,
        /// Attribute name.
        attribute: String,
        /// Offending value.
        value: String,
    },

    /// A type definition cannot be used where it is referenced.
    #[error("type '{type_name}' is not supported here: {reason}")]
    UnsupportedType {
        /// Name of the type.
        type_name: String,
        /// Why the type cannot be used.
        reason: String,
    },

    /// Two templates share the same id.
    #[error("duplicate template id {0}")]
    DuplicateTemplate(u32),

    /// An element the definition cannot be decoded without is absent.
    #[error("missing required element '{0}'")]
    MissingElement(String),
}

/// Errors raised while decoding a single message.
///
/// These are recoverable: the parser captures them on the decoded message
/// instead of propagating them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The binary template id has no entry in the catalogue.
    #[error("schema not found for template_id: {template_id}")]
    UnknownTemplate {
        /// Template id read from the frame.
        template_id: u32,
    },

    /// The FIX msgtype has no entry in the specification.
    #[error("schema not found for msgtype: {msg_type}")]
    UnknownMessageType {
        /// Value of tag 35.
        msg_type: String,
    },

    /// The FIX message carries no msgtype (tag 35).
    #[error("missing msg type field (tag 35)")]
    MissingMsgType,

    /// A read would run past the end of the buffer.
    #[error("buffer too short: need {needed} bytes at offset {offset}, have {available}")]
    BufferTooShort {
        /// Absolute offset of the read.
        offset: usize,
        /// Bytes the read needs.
        needed: usize,
        /// Total buffer length.
        available: usize,
    },

    /// An enum raw value is absent from the field's value table.
    #[error("unknown value '{raw}' for enum field '{field}'")]
    UnknownEnumValue {
        /// Field name.
        field: String,
        /// Raw value as text.
        raw: String,
    },

    /// An enum value has no description and name fallback is disabled.
    #[error("enum field '{field}' has no description for value '{raw}'")]
    MissingEnumDescription {
        /// Field name.
        field: String,
        /// Raw value as text.
        raw: String,
    },

    /// A bit is set that the set field defines no choice for.
    #[error("bit {bit} set in field '{field}' has no choice")]
    UnknownSetChoice {
        /// Field name.
        field: String,
        /// Bit position.
        bit: u32,
    },

    /// A string value is not valid UTF-8.
    #[error("invalid utf-8 in field '{0}'")]
    InvalidUtf8(String),

    /// A FIX tag is not a valid number.
    #[error("invalid tag format: {0}")]
    InvalidTag(String),

    /// A FIX tag is not defined in the specification.
    #[error("tag {0} is not defined in the specification")]
    UnknownTag(u32),

    /// A tag=value pair is not delimited properly.
    #[error("malformed field at byte {offset}")]
    MalformedField {
        /// Offset of the pair in the record.
        offset: usize,
    },

    /// A value cannot be cast to the declared type.
    #[error("invalid field value for {field}: {reason}")]
    InvalidFieldValue {
        /// Field name or tag.
        field: String,
        /// Description of why the value is invalid.
        reason: String,
    },
}

impl DecodeError {
    /// Returns true if the error means the message type itself is unknown.
    #[must_use]
    pub const fn is_unknown_type(&self) -> bool {
        matches!(
            self,
            Self::UnknownTemplate { .. } | Self::UnknownMessageType { .. } | Self::MissingMsgType
        )
    }
}

/// Errors raised by conflicting configuration or invalid mutation calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A message type is both included and excluded.
    #[error("message type '{0}' is both included and excluded")]
    ConflictingFilters(String),

    /// An enum name is already registered for the tag.
    #[error("name {name} is already known in tag {tag}'s enum")]
    EnumConflict {
        /// Tag number.
        tag: u32,
        /// Duplicate enum name.
        name: String,
    },

    /// The supplied name and value do not match the recorded pairing.
    #[error("the known value {known} for enum name {name} differs from {given} for tag {tag}")]
    EnumMismatch {
        /// Tag number.
        tag: u32,
        /// Enum name.
        name: String,
        /// Value recorded for the name.
        known: String,
        /// Value supplied by the caller.
        given: String,
    },

    /// The enum name or value is not known for the tag.
    #[error("{0} is not known in tag {1}'s enum")]
    UnknownEnum(String, u32),

    /// Neither name nor value was given for an enum deletion.
    #[error("either name or value is required")]
    EnumSelectorMissing,

    /// A tag number is not defined in the specification.
    #[error("tag {0} is not defined in the specification")]
    UnknownTag(u32),

    /// A message type is not defined in the specification.
    #[error("message type '{0}' is not defined in the specification")]
    UnknownMessageType(String),

    /// A tag list entry is not a tag number.
    #[error("invalid tag '{0}' in tag list")]
    InvalidTagList(String),

    /// The requested parser kind is not supported.
    #[error("unsupported parser type '{0}'")]
    UnsupportedParser(String),
}

/// Stage of the decode pipeline at which an error was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStage {
    /// Resolving the message type from the raw frame.
    DecodeMessage,
    /// Decoding the fields of an identified message.
    ParseMessage,
}

impl DecodeStage {
    /// Returns the stage label used in error reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DecodeMessage => "decode_message",
            Self::ParseMessage => "parse_message",
        }
    }
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decode failure captured on a message rather than propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    /// Name of the message type, when it was resolved.
    pub message_type: Option<String>,
    /// Stage at which decoding failed.
    pub stage: DecodeStage,
    /// The original error.
    pub error: DecodeError,
}

impl CapturedError {
    /// Creates a captured error.
    #[must_use]
    pub fn new(message_type: Option<String>, stage: DecodeStage, error: DecodeError) -> Self {
        Self {
            message_type,
            stage,
            error,
        }
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message_type {
            Some(name) => write!(f, "{} [{}]: {}", self.stage, name, self.error),
            None => write!(f, "{}: {}", self.stage, self.error),
        }
    }
}

impl std::error::Error for CapturedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::UnknownTemplate { template_id: 42 };
        assert_eq!(err.to_string(), "schema not found for template_id: 42");
        assert!(err.is_unknown_type());

        let err = DecodeError::BufferTooShort {
            offset: 10,
            needed: 4,
            available: 12,
        };
        assert_eq!(
            err.to_string(),
            "buffer too short: need 4 bytes at offset 10, have 12"
        );
        assert!(!err.is_unknown_type());
    }

    #[test]
    fn test_marketcast_error_from_schema() {
        let schema_err = SchemaError::MissingElement("messageHeader".to_string());
        let err: MarketcastError = schema_err.into();
        assert!(matches!(err, MarketcastError::Schema(SchemaError::MissingElement(_))));
    }

    #[test]
    fn test_captured_error_display() {
        let captured = CapturedError::new(
            Some("Trade".to_string()),
            DecodeStage::ParseMessage,
            DecodeError::UnknownEnumValue {
                field: "side".to_string(),
                raw: "9".to_string(),
            },
        );
        assert_eq!(
            captured.to_string(),
            "parse_message [Trade]: unknown value '9' for enum field 'side'"
        );

        let captured =
            CapturedError::new(None, DecodeStage::DecodeMessage, DecodeError::MissingMsgType);
        assert_eq!(
            captured.to_string(),
            "decode_message: missing msg type field (tag 35)"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::EnumConflict {
            tag: 54,
            name: "BUY".to_string(),
        };
        assert_eq!(err.to_string(), "name BUY is already known in tag 54's enum");
    }
}
