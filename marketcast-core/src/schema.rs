/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Format-neutral schema descriptions.
//!
//! Parsers enumerate their message types as [`SchemaDescriptor`]s. Output
//! collaborators (JSON, Avro, BigQuery writers) only need the capability
//! methods on [`SchemaField`], which are backed by a [`LogicalType`].

use crate::message::MessageTypeId;

/// Logical type of a scalar field, independent of the wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    /// true/false.
    Boolean,
    /// Integer fitting in 32 bits.
    Int,
    /// Integer fitting in 64 bits.
    Long,
    /// Unsigned 64-bit integer.
    UnsignedLong,
    /// Exact numeric (FIX integer-like fields).
    Numeric,
    /// Single-precision or decimal float.
    Float,
    /// Double-precision float.
    Double,
    /// Text.
    String,
}

impl LogicalType {
    /// Returns the JSON schema type name.
    #[must_use]
    pub const fn json_type(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int | Self::Long | Self::UnsignedLong | Self::Numeric => "integer",
            Self::Float | Self::Double => "number",
            Self::String => "string",
        }
    }

    /// Returns the Avro primitive type name.
    ///
    /// Avro has no unsigned 64-bit type, so `UnsignedLong` widens to double.
    #[must_use]
    pub const fn avro_type(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int | Self::Numeric => "int",
            Self::Long => "long",
            Self::UnsignedLong | Self::Double => "double",
            Self::Float => "float",
            Self::String => "string",
        }
    }

    /// Returns the BigQuery column type name.
    #[must_use]
    pub const fn bigquery_type(self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Int | Self::Long => "INTEGER",
            Self::Numeric => "NUMERIC",
            Self::UnsignedLong | Self::Float | Self::Double => "FLOAT",
            Self::String => "STRING",
        }
    }
}

/// One field of a message schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaField {
    /// A single typed value.
    Scalar {
        /// Field name.
        name: String,
        /// Logical type of the value.
        logical: LogicalType,
    },
    /// A nested record of fixed parts.
    Composite {
        /// Field name.
        name: String,
        /// Constituent fields.
        parts: Vec<SchemaField>,
    },
    /// A repeating group.
    Group {
        /// Group name.
        name: String,
        /// Fields of one group instance.
        fields: Vec<SchemaField>,
    },
}

impl SchemaField {
    /// Creates a scalar field.
    #[must_use]
    pub fn scalar(name: impl Into<String>, logical: LogicalType) -> Self {
        Self::Scalar {
            name: name.into(),
            logical,
        }
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar { name, .. } | Self::Composite { name, .. } | Self::Group { name, .. } => {
                name
            }
        }
    }

    /// Returns the logical type of a scalar field.
    #[must_use]
    pub const fn logical_type(&self) -> Option<LogicalType> {
        match self {
            Self::Scalar { logical, .. } => Some(*logical),
            _ => None,
        }
    }

    /// Returns the JSON schema type name.
    #[must_use]
    pub const fn json_type(&self) -> &'static str {
        match self {
            Self::Scalar { logical, .. } => logical.json_type(),
            Self::Composite { .. } => "object",
            Self::Group { .. } => "array",
        }
    }

    /// Returns the Avro type name.
    #[must_use]
    pub const fn avro_type(&self) -> &'static str {
        match self {
            Self::Scalar { logical, .. } => logical.avro_type(),
            Self::Composite { .. } => "record",
            Self::Group { .. } => "array",
        }
    }

    /// Returns the BigQuery column type name.
    #[must_use]
    pub const fn bigquery_type(&self) -> &'static str {
        match self {
            Self::Scalar { logical, .. } => logical.bigquery_type(),
            Self::Composite { .. } | Self::Group { .. } => "RECORD",
        }
    }

    /// Returns the BigQuery column mode.
    #[must_use]
    pub const fn bigquery_mode(&self) -> &'static str {
        match self {
            Self::Group { .. } => "REPEATED",
            _ => "NULLABLE",
        }
    }

    /// Returns the child fields of a composite or group.
    #[must_use]
    pub fn children(&self) -> &[SchemaField] {
        match self {
            Self::Scalar { .. } => &[],
            Self::Composite { parts, .. } => parts,
            Self::Group { fields, .. } => fields,
        }
    }
}

/// Schema of one message type.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    /// Template id or msgtype.
    pub message_id: MessageTypeId,
    /// Message name.
    pub message_name: String,
    /// Fields in output order.
    pub fields: Vec<SchemaField>,
}

impl SchemaDescriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(
        message_id: impl Into<MessageTypeId>,
        message_name: impl Into<String>,
        fields: Vec<SchemaField>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            message_name: message_name.into(),
            fields,
        }
    }

    /// Returns the field with the given name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_type_mappings() {
        assert_eq!(LogicalType::UnsignedLong.avro_type(), "double");
        assert_eq!(LogicalType::UnsignedLong.bigquery_type(), "FLOAT");
        assert_eq!(LogicalType::Numeric.bigquery_type(), "NUMERIC");
        assert_eq!(LogicalType::Long.json_type(), "integer");
        assert_eq!(LogicalType::Float.json_type(), "number");
    }

    #[test]
    fn test_group_field_is_repeated() {
        let group = SchemaField::Group {
            name: "legs".to_string(),
            fields: vec![SchemaField::scalar("qty", LogicalType::Long)],
        };
        assert_eq!(group.bigquery_mode(), "REPEATED");
        assert_eq!(group.bigquery_type(), "RECORD");
        assert_eq!(group.children().len(), 1);

        let scalar = SchemaField::scalar("price", LogicalType::Double);
        assert_eq!(scalar.bigquery_mode(), "NULLABLE");
        assert_eq!(scalar.avro_type(), "double");
    }

    #[test]
    fn test_descriptor_field_lookup() {
        let desc = SchemaDescriptor::new(
            1u32,
            "Trade",
            vec![SchemaField::scalar("price", LogicalType::Long)],
        );
        assert!(desc.field("price").is_some());
        assert!(desc.field("missing").is_none());
    }
}
