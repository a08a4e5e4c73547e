/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tag definitions for FIX dictionaries.
//!
//! This module defines the structures that describe individual FIX tags:
//! - [`FieldType`]: Declared data type of a tag
//! - [`FixTag`]: Tag number, name, type and enum table
//! - [`TagsReference`]: All tags of a specification, by number and by name

use marketcast_core::{ConfigError, DecodeError, LogicalType, Value};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// FIX field data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Integer value.
    Int,
    /// Length field (for data fields).
    Length,
    /// Sequence number.
    SeqNum,
    /// Number of entries in a repeating group.
    NumInGroup,
    /// Tag number reference.
    TagNum,
    /// Day of month (1-31).
    DayOfMonth,
    /// Floating point number.
    Float,
    /// Quantity.
    Qty,
    /// Price.
    Price,
    /// Price offset.
    PriceOffset,
    /// Amount (price * quantity).
    Amt,
    /// Percentage.
    Percentage,
    /// Single character.
    Char,
    /// Boolean (Y/N).
    Boolean,
    /// String.
    String,
    /// Multiple character value (space-separated).
    MultipleCharValue,
    /// Multiple string value (space-separated).
    MultipleStringValue,
    /// Country code (ISO 3166).
    Country,
    /// Currency code (ISO 4217).
    Currency,
    /// Exchange code (ISO 10383 MIC).
    Exchange,
    /// Month-year (YYYYMM or YYYYMMDD or YYYYMMWW).
    MonthYear,
    /// UTC timestamp.
    UtcTimestamp,
    /// UTC time only.
    UtcTimeOnly,
    /// UTC date only.
    UtcDateOnly,
    /// Local market date.
    LocalMktDate,
    /// Raw data (binary).
    Data,
}

impl FieldType {
    /// Returns true if values are cast to integers.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Int | Self::Length | Self::SeqNum | Self::NumInGroup | Self::DayOfMonth
        )
    }

    /// Returns true if values are cast to exact decimals.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(
            self,
            Self::Float | Self::Qty | Self::Price | Self::PriceOffset | Self::Amt | Self::Percentage
        )
    }

    /// Returns true if this type represents a numeric value.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Returns the logical type used in schema descriptors.
    #[must_use]
    pub const fn logical_type(&self) -> LogicalType {
        if self.is_integer() {
            LogicalType::Numeric
        } else if self.is_float() {
            LogicalType::Float
        } else if matches!(self, Self::Boolean) {
            LogicalType::Boolean
        } else {
            LogicalType::String
        }
    }
}

impl FromStr for FieldType {
    type Err = std::convert::Infallible;

    /// Creates a FieldType from a dictionary type name.
    ///
    /// Unrecognized names map to `String`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "INT" => Self::Int,
            "LENGTH" => Self::Length,
            "SEQNUM" => Self::SeqNum,
            "NUMINGROUP" => Self::NumInGroup,
            "TAGNUM" => Self::TagNum,
            "DAYOFMONTH" => Self::DayOfMonth,
            "FLOAT" => Self::Float,
            "QTY" | "QUANTITY" => Self::Qty,
            "PRICE" => Self::Price,
            "PRICEOFFSET" => Self::PriceOffset,
            "AMT" | "AMOUNT" => Self::Amt,
            "PERCENTAGE" => Self::Percentage,
            "CHAR" => Self::Char,
            "BOOLEAN" => Self::Boolean,
            "MULTIPLECHARVALUE" => Self::MultipleCharValue,
            "MULTIPLESTRINGVALUE" | "MULTIPLEVALUESTRING" => Self::MultipleStringValue,
            "COUNTRY" => Self::Country,
            "CURRENCY" => Self::Currency,
            "EXCHANGE" => Self::Exchange,
            "MONTHYEAR" => Self::MonthYear,
            "UTCTIMESTAMP" => Self::UtcTimestamp,
            "UTCTIMEONLY" => Self::UtcTimeOnly,
            "UTCDATEONLY" | "UTCDATE" => Self::UtcDateOnly,
            "LOCALMKTDATE" => Self::LocalMktDate,
            "DATA" => Self::Data,
            _ => Self::String,
        })
    }
}

/// A FIX tag with its declared type and enum table.
///
/// The enum table is a list of `(value, name)` pairs, where the name is the
/// dictionary description such as `BUY`. Lookup maps in both directions are
/// kept in sync with the table on every mutation.
#[derive(Debug, Clone)]
pub struct FixTag {
    name: String,
    number: u32,
    type_name: String,
    field_type: FieldType,
    values: Vec<(String, String)>,
    by_value: HashMap<String, String>,
    by_name: HashMap<String, String>,
}

impl FixTag {
    /// Creates a tag.
    ///
    /// # Arguments
    /// * `name` - Tag name
    /// * `number` - Tag number
    /// * `type_name` - Type name as written in the dictionary
    /// * `values` - Enum `(value, name)` pairs, empty for non-enum tags
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        number: u32,
        type_name: impl Into<String>,
        values: Vec<(String, String)>,
    ) -> Self {
        let type_name = type_name.into();
        let field_type = type_name.parse().unwrap_or(FieldType::String);
        let mut tag = Self {
            name: name.into(),
            number,
            type_name,
            field_type,
            values,
            by_value: HashMap::new(),
            by_name: HashMap::new(),
        };
        tag.rebuild_maps();
        tag
    }

    fn rebuild_maps(&mut self) {
        self.by_value = self.values.iter().map(|(v, n)| (v.clone(), n.clone())).collect();
        self.by_name = self.values.iter().map(|(v, n)| (n.clone(), v.clone())).collect();
    }

    /// Returns the tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tag number.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Returns the type name as written in the dictionary.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the parsed field type.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns true if the tag has an enum table.
    #[must_use]
    pub fn is_enum(&self) -> bool {
        !self.values.is_empty()
    }

    /// Returns the enum `(value, name)` pairs in definition order.
    #[must_use]
    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    /// Returns the enum value registered for `name`.
    #[must_use]
    pub fn enum_by_name(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    /// Returns the enum name registered for `value`.
    #[must_use]
    pub fn enum_by_value(&self, value: &str) -> Option<&str> {
        self.by_value.get(value).map(String::as_str)
    }

    /// Adds a value to the enum table.
    ///
    /// # Errors
    /// Returns `ConfigError::EnumConflict` if `name` is already registered.
    pub fn add_enum_value(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ConfigError::EnumConflict {
                tag: self.number,
                name,
            });
        }
        let value = value.into();
        self.by_value.insert(value.clone(), name.clone());
        self.by_name.insert(name.clone(), value.clone());
        self.values.push((value, name));
        Ok(())
    }

    /// Removes entries from the enum table by name, by value, or by both.
    ///
    /// When both are given the value must match the one recorded for the
    /// name, and removal is by name.
    ///
    /// # Errors
    /// - `ConfigError::EnumSelectorMissing` if neither is given
    /// - `ConfigError::EnumMismatch` if name and value disagree
    /// - `ConfigError::UnknownEnum` if the name or value is not registered
    pub fn del_enum_value(
        &mut self,
        name: Option<&str>,
        value: Option<&str>,
    ) -> Result<(), ConfigError> {
        match (name, value) {
            (None, None) => return Err(ConfigError::EnumSelectorMissing),
            (Some(name), Some(value)) => {
                let known = self
                    .enum_by_name(name)
                    .ok_or_else(|| ConfigError::UnknownEnum(name.to_string(), self.number))?;
                if known != value {
                    return Err(ConfigError::EnumMismatch {
                        tag: self.number,
                        name: name.to_string(),
                        known: known.to_string(),
                        given: value.to_string(),
                    });
                }
                self.values.retain(|(_, n)| n != name);
            }
            (Some(name), None) => {
                if !self.by_name.contains_key(name) {
                    return Err(ConfigError::UnknownEnum(name.to_string(), self.number));
                }
                self.values.retain(|(_, n)| n != name);
            }
            (None, Some(value)) => {
                if !self.by_value.contains_key(value) {
                    return Err(ConfigError::UnknownEnum(value.to_string(), self.number));
                }
                self.values.retain(|(v, _)| v != value);
            }
        }
        self.rebuild_maps();
        Ok(())
    }

    /// Casts a raw wire value to the tag's declared type.
    ///
    /// Enum tags yield the value's name. Integer types yield `Int`, float
    /// types yield an exact `Decimal`, booleans accept `Y`/`N`, and all other
    /// types keep the text.
    ///
    /// # Errors
    /// Returns `DecodeError::UnknownEnumValue` for a value missing from the
    /// enum table, or `DecodeError::InvalidFieldValue` if the text does not
    /// parse as the declared type.
    pub fn cast_value(&self, raw: &str) -> Result<Value, DecodeError> {
        if self.is_enum() {
            return self
                .enum_by_value(raw)
                .map(Value::from)
                .ok_or_else(|| DecodeError::UnknownEnumValue {
                    field: self.name.clone(),
                    raw: raw.to_string(),
                });
        }

        let ft = self.field_type;
        if ft.is_integer() {
            raw.parse::<i64>()
                .map(Value::Int)
                .map_err(|e| self.invalid(raw, &e.to_string()))
        } else if ft.is_float() {
            Decimal::from_str(raw)
                .or_else(|_| Decimal::from_scientific(raw))
                .map(Value::Decimal)
                .map_err(|e| self.invalid(raw, &e.to_string()))
        } else if ft == FieldType::Boolean {
            match raw {
                "Y" => Ok(Value::Bool(true)),
                "N" => Ok(Value::Bool(false)),
                _ => Err(self.invalid(raw, "expected Y or N")),
            }
        } else {
            Ok(Value::from(raw))
        }
    }

    fn invalid(&self, raw: &str, reason: &str) -> DecodeError {
        DecodeError::InvalidFieldValue {
            field: self.name.clone(),
            reason: format!("'{raw}': {reason}"),
        }
    }

    /// Returns true if both tags have the same name, number and type.
    #[must_use]
    pub fn is_equal(&self, other: &Self) -> bool {
        self.name == other.name && self.number == other.number && self.type_name == other.type_name
    }

    /// Returns the logical type used in schema descriptors.
    ///
    /// Enum tags are always strings since values are cast to names.
    #[must_use]
    pub fn logical_type(&self) -> LogicalType {
        if self.is_enum() {
            LogicalType::String
        } else {
            self.field_type.logical_type()
        }
    }
}

/// Container for tags with lookup by number and by name.
#[derive(Debug, Clone, Default)]
pub struct TagsReference {
    by_number: HashMap<u32, FixTag>,
    by_name: HashMap<String, u32>,
}

impl TagsReference {
    /// Creates an empty reference.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag, replacing any tag with the same number.
    pub fn insert(&mut self, tag: FixTag) {
        if let Some(old) = self.by_number.get(&tag.number) {
            self.by_name.remove(&old.name);
        }
        self.by_name.insert(tag.name.clone(), tag.number);
        self.by_number.insert(tag.number, tag);
    }

    /// Registers a new string tag.
    pub fn add_tag(&mut self, number: u32, name: impl Into<String>) {
        self.insert(FixTag::new(name, number, "STRING", Vec::new()));
    }

    /// Gets a tag by number.
    #[must_use]
    pub fn by_number(&self, number: u32) -> Option<&FixTag> {
        self.by_number.get(&number)
    }

    /// Gets a mutable tag by number.
    pub fn by_number_mut(&mut self, number: u32) -> Option<&mut FixTag> {
        self.by_number.get_mut(&number)
    }

    /// Gets a tag by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&FixTag> {
        self.by_name.get(name).and_then(|n| self.by_number.get(n))
    }

    /// Returns the number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    /// Returns true if no tags are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }

    /// Returns an iterator over all tags.
    pub fn iter(&self) -> impl Iterator<Item = &FixTag> {
        self.by_number.values()
    }
}
