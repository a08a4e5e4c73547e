/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Primitive encodings and raw buffer reads.
//!
//! This module provides:
//! - [`PrimitiveType`]: the built-in SBE primitive types
//! - [`ByteOrder`]: schema-wide byte order
//! - bounds-checked slice and integer reads used by the field views
//! - [`convert_to_underscore`]: schema name to snake_case

use marketcast_core::{DecodeError, LogicalType};
use num_traits::Bounded;

/// Byte order of multi-byte values in a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Least significant byte first.
    #[default]
    LittleEndian,
    /// Most significant byte first.
    BigEndian,
}

impl ByteOrder {
    /// Parses the `byteOrder` schema attribute.
    #[must_use]
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "littleEndian" => Some(Self::LittleEndian),
            "bigEndian" => Some(Self::BigEndian),
            _ => None,
        }
    }

    /// Reads up to 8 bytes as an unsigned integer.
    #[inline]
    #[must_use]
    pub fn read_unsigned(self, bytes: &[u8]) -> u64 {
        match self {
            Self::LittleEndian => bytes
                .iter()
                .rev()
                .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
            Self::BigEndian => bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
        }
    }

    /// Reads up to 8 bytes as a sign-extended integer.
    #[inline]
    #[must_use]
    pub fn read_signed(self, bytes: &[u8]) -> i64 {
        let raw = self.read_unsigned(bytes);
        let width = bytes.len() * 8;
        if width == 0 || width >= 64 {
            return raw as i64;
        }
        let shift = 64 - width;
        ((raw << shift) as i64) >> shift
    }
}

/// Built-in SBE primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Single byte character.
    Char,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// IEEE 754 single precision.
    Float,
    /// IEEE 754 double precision.
    Double,
}

fn max_of<T: Bounded + Into<i128>>() -> i128 {
    T::max_value().into()
}

impl PrimitiveType {
    /// Looks up a primitive by its schema name. `int` is an alias of `int32`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "char" => Some(Self::Char),
            "int8" => Some(Self::Int8),
            "int16" => Some(Self::Int16),
            "int" | "int32" => Some(Self::Int32),
            "int64" => Some(Self::Int64),
            "uint8" => Some(Self::UInt8),
            "uint16" => Some(Self::UInt16),
            "uint32" => Some(Self::UInt32),
            "uint64" => Some(Self::UInt64),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            _ => None,
        }
    }

    /// Returns the schema name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Char => "char",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Returns the encoded size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Char | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float => 4,
            Self::Int64 | Self::UInt64 | Self::Double => 8,
        }
    }

    /// Returns true for the signed integer types.
    #[inline]
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Returns true for all integer types.
    #[inline]
    #[must_use]
    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Char | Self::Float | Self::Double)
    }

    /// Returns the maximum representable value used as the null sentinel.
    ///
    /// Only integer types have a sentinel; floats use NaN and chars use zero.
    #[must_use]
    pub fn null_sentinel(self) -> Option<i128> {
        match self {
            Self::Int8 => Some(max_of::<i8>()),
            Self::Int16 => Some(max_of::<i16>()),
            Self::Int32 => Some(max_of::<i32>()),
            Self::Int64 => Some(max_of::<i64>()),
            Self::UInt8 => Some(max_of::<u8>()),
            Self::UInt16 => Some(max_of::<u16>()),
            Self::UInt32 => Some(max_of::<u32>()),
            Self::UInt64 => Some(max_of::<u64>()),
            Self::Char | Self::Float | Self::Double => None,
        }
    }

    /// Returns the logical type of a scalar of this primitive.
    #[must_use]
    pub const fn logical_type(self) -> LogicalType {
        match self {
            Self::Char => LogicalType::String,
            Self::Int8 | Self::Int16 | Self::UInt8 | Self::UInt16 => LogicalType::Int,
            Self::Int32 | Self::UInt32 | Self::Int64 => LogicalType::Long,
            Self::UInt64 => LogicalType::UnsignedLong,
            Self::Float => LogicalType::Float,
            Self::Double => LogicalType::Double,
        }
    }
}

/// Returns `len` bytes at `offset`, or `BufferTooShort`.
///
/// # Errors
/// Returns `DecodeError::BufferTooShort` if the read runs past the buffer.
#[inline]
pub fn slice_at(buf: &[u8], offset: usize, len: usize) -> Result<&[u8], DecodeError> {
    offset
        .checked_add(len)
        .filter(|end| *end <= buf.len())
        .map(|end| &buf[offset..end])
        .ok_or(DecodeError::BufferTooShort {
            offset,
            needed: len,
            available: buf.len(),
        })
}

/// Converts a schema name such as `MDEntryPx` to `md_entry_px`.
#[must_use]
pub fn convert_to_underscore(name: &str) -> String {
    let trimmed = name.trim_matches(|c| c == '@' || c == '#');
    let chars: Vec<char> = trimmed.chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
            let prev_lower = prev.is_ascii_lowercase() || prev.is_ascii_digit();
            if prev != '_' && (prev_lower || next_lower) {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}
