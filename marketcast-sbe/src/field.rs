/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Zero-copy field views.
//!
//! A [`FieldView`] binds a [`FieldSpec`] to a borrowed buffer and a pair of
//! offsets. Nothing is read until [`FieldView::value`] is called.

use crate::primitive::{ByteOrder, PrimitiveType, slice_at};
use crate::schema::{ConstantValue, EnumValue, FieldKind, FieldSpec};
use marketcast_core::{DecodeError, Record, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

/// Lazily decoded view of one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    spec: &'a FieldSpec,
    buf: &'a [u8],
    base: usize,
    relative: usize,
}

impl<'a> FieldView<'a> {
    /// Wraps a field over a buffer.
    ///
    /// # Arguments
    /// * `spec` - Field layout
    /// * `buf` - Message buffer
    /// * `base` - Offset of the message in the buffer
    /// * `relative` - Offset of the enclosing block from the message start
    #[inline]
    #[must_use]
    pub const fn wrap(spec: &'a FieldSpec, buf: &'a [u8], base: usize, relative: usize) -> Self {
        Self {
            spec,
            buf,
            base,
            relative,
        }
    }

    /// Returns the field layout.
    #[inline]
    #[must_use]
    pub const fn spec(&self) -> &'a FieldSpec {
        self.spec
    }

    /// Returns the field name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.spec.name
    }

    /// Returns the absolute position of the field in the buffer.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.base + self.relative + self.spec.offset
    }

    /// Returns the raw encoded bytes.
    ///
    /// # Errors
    /// Returns `DecodeError::BufferTooShort` if the field extends past the buffer.
    pub fn raw_bytes(&self) -> Result<&'a [u8], DecodeError> {
        slice_at(self.buf, self.position(), self.spec.length)
    }

    /// Reads the field as an unsigned integer without any null handling.
    ///
    /// Used for dimension headers and the message size field.
    ///
    /// # Errors
    /// Returns `DecodeError::BufferTooShort` if the field extends past the buffer.
    pub fn raw_unsigned(&self) -> Result<u64, DecodeError> {
        let bytes = self.raw_bytes()?;
        Ok(self.byte_order().read_unsigned(&bytes[..bytes.len().min(8)]))
    }

    /// Returns the short enumerant name of an enum field.
    ///
    /// Returns `Ok(None)` for non-enum fields, null values and unknown raw values.
    ///
    /// # Errors
    /// Returns `DecodeError::BufferTooShort` if the field extends past the buffer.
    pub fn enumerant(&self) -> Result<Option<&'a str>, DecodeError> {
        let FieldKind::Enum {
            encoding,
            byte_order,
            values,
            ..
        } = &self.spec.kind
        else {
            return Ok(None);
        };
        let Some(key) = self.enum_key(*encoding, *byte_order)? else {
            return Ok(None);
        };
        Ok(values.get(&key).map(|v| v.name.as_str()))
    }

    /// Decodes the field value.
    ///
    /// # Errors
    /// Returns `DecodeError` if the buffer is too short or the raw value has
    /// no mapping in the field's enum or set table.
    pub fn value(&self) -> Result<Value, DecodeError> {
        match &self.spec.kind {
            FieldKind::Primitive {
                primitive,
                byte_order,
                array_len,
                constant,
                null_value,
            } => match constant {
                Some(constant) => Ok(self.constant_value(constant)),
                None => self.primitive_value(*primitive, *byte_order, *array_len, *null_value),
            },
            FieldKind::Enum {
                encoding,
                byte_order,
                values,
                fallback_to_name,
            } => self.enum_value(*encoding, *byte_order, values, *fallback_to_name),
            FieldKind::Set {
                encoding,
                byte_order,
                choices,
            } => self.set_value(*encoding, *byte_order, choices),
            FieldKind::Composite { parts } => {
                let relative = self.relative + self.spec.offset;
                let mut record = Record::with_capacity(parts.len());
                for part in parts {
                    let view = FieldView::wrap(part, self.buf, self.base, relative);
                    record.insert(part.name.clone(), view.value()?);
                }
                Ok(Value::Record(record))
            }
        }
    }

    fn byte_order(&self) -> ByteOrder {
        match &self.spec.kind {
            FieldKind::Primitive { byte_order, .. }
            | FieldKind::Enum { byte_order, .. }
            | FieldKind::Set { byte_order, .. } => *byte_order,
            FieldKind::Composite { .. } => ByteOrder::default(),
        }
    }

    fn constant_value(&self, constant: &ConstantValue) -> Value {
        if self.spec.is_bool() {
            return Value::Bool(matches!(constant, ConstantValue::Int(1))
                || matches!(constant, ConstantValue::Text(t) if t == "True"));
        }
        match constant {
            ConstantValue::Int(v) => Value::Int(*v),
            ConstantValue::Float(v) => Value::Float(*v),
            ConstantValue::Text(t) => Value::String(t.clone()),
        }
    }

    fn primitive_value(
        &self,
        primitive: PrimitiveType,
        byte_order: ByteOrder,
        array_len: usize,
        null_value: Option<i128>,
    ) -> Result<Value, DecodeError> {
        let bytes = self.raw_bytes()?;

        if primitive == PrimitiveType::Char {
            if bytes.iter().all(|b| *b == 0) {
                return Ok(Value::Null);
            }
            let end = memchr::memchr(0, bytes).unwrap_or(bytes.len());
            let text = std::str::from_utf8(&bytes[..end])
                .map_err(|_| DecodeError::InvalidUtf8(self.spec.name.clone()))?;
            if self.spec.is_bool() {
                return Ok(Value::Bool(text == "True"));
            }
            return Ok(Value::String(text.to_string()));
        }

        if array_len > 1 {
            if bytes.iter().all(|b| *b == 0) {
                return Ok(Value::Null);
            }
            if bytes.len() <= 8 {
                return Ok(Value::UInt(byte_order.read_unsigned(bytes)));
            }
            let mut hex = String::with_capacity(bytes.len() * 2);
            for b in bytes {
                let _ = write!(hex, "{:02x}", b);
            }
            return Ok(Value::String(hex));
        }

        match primitive {
            PrimitiveType::Float | PrimitiveType::Double => {
                let raw = byte_order.read_unsigned(bytes);
                let value = if primitive == PrimitiveType::Float {
                    f64::from(f32::from_bits(raw as u32))
                } else {
                    f64::from_bits(raw)
                };
                if value.is_nan() {
                    Ok(Value::Null)
                } else if self.spec.is_bool() {
                    Ok(Value::Bool(value == 1.0))
                } else {
                    Ok(Value::Float(value))
                }
            }
            _ => {
                let raw: i128 = if primitive.is_signed() {
                    i128::from(byte_order.read_signed(bytes))
                } else {
                    i128::from(byte_order.read_unsigned(bytes))
                };
                if primitive.null_sentinel() == Some(raw) || null_value == Some(raw) {
                    return Ok(Value::Null);
                }
                if self.spec.is_bool() {
                    return Ok(Value::Bool(raw == 1));
                }
                if primitive.is_signed() {
                    Ok(Value::Int(raw as i64))
                } else {
                    Ok(Value::UInt(raw as u64))
                }
            }
        }
    }

    /// Reads the lookup key of an enum value; `None` means null.
    fn enum_key(
        &self,
        encoding: PrimitiveType,
        byte_order: ByteOrder,
    ) -> Result<Option<String>, DecodeError> {
        let bytes = self.raw_bytes()?;
        if encoding == PrimitiveType::Char {
            return match bytes.first() {
                None | Some(0) => Ok(None),
                Some(b) => Ok(Some(char::from(*b).to_string())),
            };
        }
        let raw: i128 = if encoding.is_signed() {
            i128::from(byte_order.read_signed(bytes))
        } else {
            i128::from(byte_order.read_unsigned(bytes))
        };
        if encoding.null_sentinel() == Some(raw) {
            return Ok(None);
        }
        Ok(Some(raw.to_string()))
    }

    fn enum_value(
        &self,
        encoding: PrimitiveType,
        byte_order: ByteOrder,
        values: &HashMap<String, EnumValue>,
        fallback_to_name: bool,
    ) -> Result<Value, DecodeError> {
        let Some(key) = self.enum_key(encoding, byte_order)? else {
            return Ok(Value::Null);
        };
        let entry = values.get(&key).ok_or_else(|| DecodeError::UnknownEnumValue {
            field: self.spec.name.clone(),
            raw: key.clone(),
        })?;
        let text = if !entry.description.is_empty() {
            entry.description.as_str()
        } else if fallback_to_name {
            entry.name.as_str()
        } else {
            return Err(DecodeError::MissingEnumDescription {
                field: self.spec.name.clone(),
                raw: key,
            });
        };
        if self.spec.is_bool() {
            return Ok(Value::Bool(text == "True"));
        }
        Ok(Value::String(text.to_string()))
    }

    fn set_value(
        &self,
        encoding: PrimitiveType,
        byte_order: ByteOrder,
        choices: &BTreeMap<u32, String>,
    ) -> Result<Value, DecodeError> {
        let bytes = self.raw_bytes()?;
        let raw = byte_order.read_unsigned(bytes);
        if raw == 0 {
            return Ok(Value::Null);
        }
        let bits = (encoding.size() * 8) as u32;
        let mut names = Vec::new();
        for bit in (0..bits).filter(|&bit| (raw >> bit) & 1 == 1) {
            let name = choices.get(&bit).ok_or_else(|| DecodeError::UnknownSetChoice {
                field: self.spec.name.clone(),
                bit,
            })?;
            names.push(name.as_str());
        }
        Ok(Value::String(names.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tests::TEST_SCHEMA;
    use crate::schema::{CatalogueOptions, SchemaCatalogue};

    fn catalogue(options: CatalogueOptions) -> SchemaCatalogue {
        SchemaCatalogue::parse_str(TEST_SCHEMA, options).unwrap()
    }

    /// Builds a Quote body: symbol, px mantissa, side, flags, status, is_last.
    fn quote_buffer(symbol: &[u8; 8], side: u8, flags: u8, status: u8, is_last: u8) -> Vec<u8> {
        let mut buf = vec![0u8; 8];
        buf.extend_from_slice(symbol);
        buf.extend_from_slice(&12_345i64.to_le_bytes());
        buf.extend_from_slice(&[side, flags, status, is_last]);
        buf
    }

    fn decode(catalogue: &SchemaCatalogue, buf: &[u8], name: &str) -> Result<Value, DecodeError> {
        let spec = catalogue.template(2).unwrap().field(name).unwrap();
        FieldView::wrap(spec, buf, 0, 0).value()
    }

    #[test]
    fn test_string_and_composite_values() {
        let catalogue = catalogue(CatalogueOptions::default());
        let buf = quote_buffer(b"ESZ4\0\0\0\0", 1, 0, b'O', 1);
        assert_eq!(decode(&catalogue, &buf, "symbol").unwrap(), Value::from("ESZ4"));

        let px = decode(&catalogue, &buf, "px").unwrap();
        let px = px.as_record().unwrap();
        assert_eq!(px.get("mantissa"), Some(&Value::Int(12_345)));
        assert_eq!(px.get("exponent"), Some(&Value::Int(-9)));
    }

    #[test]
    fn test_enum_set_and_bool_values() {
        let catalogue = catalogue(CatalogueOptions::default());
        let buf = quote_buffer(b"ESZ4\0\0\0\0", 2, 0b1000_0001, b'O', 1);
        // empty description falls back to the enumerant name
        assert_eq!(decode(&catalogue, &buf, "side").unwrap(), Value::from("Sell"));
        assert_eq!(
            decode(&catalogue, &buf, "flags").unwrap(),
            Value::from("LastTrade, EndOfEvent")
        );
        assert_eq!(decode(&catalogue, &buf, "status").unwrap(), Value::from("Open"));
        assert_eq!(decode(&catalogue, &buf, "is_last").unwrap(), Value::Bool(true));

        let spec = catalogue.template(2).unwrap().field("side").unwrap();
        assert_eq!(FieldView::wrap(spec, &buf, 0, 0).enumerant().unwrap(), Some("Sell"));
    }

    #[test]
    fn test_enum_errors() {
        let catalogue = catalogue(CatalogueOptions::default());
        let buf = quote_buffer(b"ESZ4\0\0\0\0", 9, 0, 0, 0);
        assert_eq!(
            decode(&catalogue, &buf, "side").unwrap_err(),
            DecodeError::UnknownEnumValue {
                field: "side".to_string(),
                raw: "9".to_string()
            }
        );
        // zero char enum is null
        assert_eq!(decode(&catalogue, &buf, "status").unwrap(), Value::Null);

        let strict = catalogue_without_fallback();
        let buf = quote_buffer(b"ESZ4\0\0\0\0", 2, 0, 0, 0);
        assert!(matches!(
            decode(&strict, &buf, "side").unwrap_err(),
            DecodeError::MissingEnumDescription { .. }
        ));
    }

    fn catalogue_without_fallback() -> SchemaCatalogue {
        catalogue(CatalogueOptions::new().with_enum_fallback_to_name(false))
    }

    #[test]
    fn test_set_unknown_bit_and_null() {
        let catalogue = catalogue(CatalogueOptions::default());
        let buf = quote_buffer(b"ESZ4\0\0\0\0", 1, 0b0000_0010, 0, 0);
        assert_eq!(
            decode(&catalogue, &buf, "flags").unwrap_err(),
            DecodeError::UnknownSetChoice {
                field: "flags".to_string(),
                bit: 1
            }
        );
        let buf = quote_buffer(b"\0\0\0\0\0\0\0\0", 0xFF, 0, 0, 0);
        assert_eq!(decode(&catalogue, &buf, "flags").unwrap(), Value::Null);
        assert_eq!(decode(&catalogue, &buf, "symbol").unwrap(), Value::Null);
        assert_eq!(decode(&catalogue, &buf, "side").unwrap(), Value::Null);
    }

    #[test]
    fn test_null_sentinels_and_explicit_null() {
        let catalogue = catalogue(CatalogueOptions::default());
        let trade = catalogue.template(1).unwrap();
        let price = trade.field("price").unwrap();
        let qty = trade.field("qty").unwrap();

        let mut buf = vec![0u8; 8];
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(&i32::MIN.to_le_bytes());
        assert_eq!(FieldView::wrap(price, &buf, 0, 0).value().unwrap(), Value::Null);
        assert_eq!(FieldView::wrap(qty, &buf, 0, 0).value().unwrap(), Value::Null);

        buf[8..12].copy_from_slice(&7u32.to_le_bytes());
        buf[12..16].copy_from_slice(&(-3i32).to_le_bytes());
        let view = FieldView::wrap(price, &buf, 0, 0);
        assert_eq!(view.value().unwrap(), Value::UInt(7));
        assert_eq!(view.value().unwrap(), view.value().unwrap());
        assert_eq!(FieldView::wrap(qty, &buf, 0, 0).value().unwrap(), Value::Int(-3));
    }

    #[test]
    fn test_short_buffer() {
        let catalogue = catalogue(CatalogueOptions::default());
        let price = catalogue.template(1).unwrap().field("price").unwrap();
        let buf = [0u8; 10];
        assert_eq!(
            FieldView::wrap(price, &buf, 0, 0).value().unwrap_err(),
            DecodeError::BufferTooShort {
                offset: 8,
                needed: 4,
                available: 10
            }
        );
    }

    #[test]
    fn test_big_endian_schema() {
        let xml = TEST_SCHEMA.replace("littleEndian", "bigEndian");
        let catalogue = SchemaCatalogue::parse_str(&xml, CatalogueOptions::default()).unwrap();
        let price = catalogue.template(1).unwrap().field("price").unwrap();
        let mut buf = vec![0u8; 8];
        buf.extend_from_slice(&258u32.to_be_bytes());
        assert_eq!(FieldView::wrap(price, &buf, 0, 0).value().unwrap(), Value::UInt(258));
    }
}
