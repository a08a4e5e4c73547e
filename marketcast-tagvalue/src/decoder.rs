/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Zero-copy tag=value tokenizer.
//!
//! This module splits a FIX record into `(tag, value)` pairs without
//! allocating memory for field values. Values are returned as references to
//! the original buffer. The pair separator is configurable since captured
//! records often use `|` or `;` instead of SOH.

use marketcast_core::DecodeError;
use memchr::memchr;

/// SOH (Start of Header) delimiter used in FIX messages.
pub const SOH: u8 = 0x01;

/// Equals sign delimiter between tag and value.
pub const EQUALS: u8 = b'=';

/// A single tag=value pair borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    /// Tag number.
    pub tag: u32,
    /// Raw value bytes.
    pub value: &'a [u8],
}

impl<'a> Field<'a> {
    /// Returns the value as UTF-8 text.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidUtf8` if the value is not valid UTF-8.
    #[inline]
    pub fn as_str(&self) -> Result<&'a str, DecodeError> {
        std::str::from_utf8(self.value).map_err(|_| DecodeError::InvalidUtf8(self.tag.to_string()))
    }
}

/// Zero-copy tag=value tokenizer.
#[derive(Debug)]
pub struct Decoder<'a> {
    /// Input buffer.
    input: &'a [u8],
    /// Current position in the buffer.
    offset: usize,
    /// Pair separator.
    separator: u8,
    /// Set once an error has been returned.
    failed: bool,
}

impl<'a> Decoder<'a> {
    /// Creates a new decoder for the given input buffer using SOH.
    ///
    /// # Arguments
    /// * `input` - The FIX record bytes to tokenize
    #[inline]
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            separator: SOH,
            failed: false,
        }
    }

    /// Sets the pair separator.
    ///
    /// # Arguments
    /// * `separator` - Byte between pairs
    #[inline]
    #[must_use]
    pub const fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// Parses the next field from the buffer.
    ///
    /// The last pair may omit its trailing separator.
    ///
    /// # Returns
    /// The next field, or `None` if the buffer is exhausted.
    ///
    /// # Errors
    /// Returns `DecodeError::MalformedField` for a pair without `=`, or
    /// `DecodeError::InvalidTag` for a non-numeric tag.
    pub fn next_field(&mut self) -> Result<Option<Field<'a>>, DecodeError> {
        if self.offset >= self.input.len() {
            return Ok(None);
        }

        let remaining = &self.input[self.offset..];
        let pair_len = memchr(self.separator, remaining).unwrap_or(remaining.len());
        let pair = &remaining[..pair_len];

        let eq_pos = memchr(EQUALS, pair).ok_or(DecodeError::MalformedField {
            offset: self.offset,
        })?;
        let tag_bytes = &pair[..eq_pos];
        let tag = parse_tag(tag_bytes)
            .ok_or_else(|| {
                DecodeError::InvalidTag(String::from_utf8_lossy(tag_bytes).into_owned())
            })?;
        let value = &pair[eq_pos + 1..];

        self.offset += (pair_len + 1).min(remaining.len());
        Ok(Some(Field { tag, value }))
    }

    /// Returns the current offset in the buffer.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns true if the buffer has been fully consumed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offset >= self.input.len()
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<Field<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.next_field().transpose();
        if matches!(next, Some(Err(_))) {
            self.failed = true;
        }
        next
    }
}

/// Parses a tag number from ASCII bytes.
///
/// # Returns
/// The parsed tag number, or `None` if invalid.
#[inline]
fn parse_tag(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }

    let mut result: u32 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        result = result.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag(b"8"), Some(8));
        assert_eq!(parse_tag(b"35"), Some(35));
        assert_eq!(parse_tag(b""), None);
        assert_eq!(parse_tag(b"12a"), None);
        assert_eq!(parse_tag(b"99999999999"), None);
    }

    #[test]
    fn test_next_field() {
        let mut decoder = Decoder::new(b"8=FIX.4.4\x0135=D\x0158=a=b\x01");

        let field = decoder.next_field().unwrap().unwrap();
        assert_eq!(field.tag, 8);
        assert_eq!(field.as_str().unwrap(), "FIX.4.4");
        assert_eq!(decoder.next_field().unwrap().unwrap().tag, 35);

        let text = decoder.next_field().unwrap().unwrap();
        assert_eq!(text.as_str().unwrap(), "a=b");
        assert!(decoder.next_field().unwrap().is_none());
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_custom_separator_and_unterminated_last_pair() {
        let fields: Vec<_> = Decoder::new(b"35=0|112=ping")
            .with_separator(b'|')
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1], Field { tag: 112, value: b"ping" });
    }

    #[test]
    fn test_empty_value() {
        let field = Decoder::new(b"58=\x01").next_field().unwrap().unwrap();
        assert_eq!(field.tag, 58);
        assert!(field.value.is_empty());
    }

    #[test]
    fn test_errors_stop_iteration() {
        let mut decoder = Decoder::new(b"35=0\x01garbage\x0110=000\x01");
        assert!(decoder.next().unwrap().is_ok());
        assert_eq!(
            decoder.next().unwrap().unwrap_err(),
            DecodeError::MalformedField { offset: 5 }
        );
        assert!(decoder.next().is_none());

        let err = Decoder::new(b"ab=1\x01").next_field().unwrap_err();
        assert_eq!(err, DecodeError::InvalidTag("ab".to_string()));
    }
}
