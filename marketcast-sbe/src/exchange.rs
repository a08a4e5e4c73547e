/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Exchange framing conventions and the binary decoder.
//!
//! Each exchange stores the template id at a different place in the frame.
//! [`Exchange`] captures those conventions and [`SbeDecoder`] applies them to
//! resolve and wrap messages against a shared [`SchemaCatalogue`].

use crate::message::SbeMessage;
use crate::primitive::{ByteOrder, slice_at};
use crate::schema::{CatalogueOptions, SchemaCatalogue};
use marketcast_core::{ConfigError, DecodeError, SchemaError};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Exchange-specific framing of binary messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    /// ASX: one ASCII message type byte at the frame start.
    Asx,
    /// CME: little-endian u16 template id after the block length.
    Cme,
    /// MEMX: one byte template id at offset 2, messages always start at 0.
    Memx,
    /// CME MDP 3.0: u16 message size header, then the SBE header.
    Mdp,
}

impl Exchange {
    /// All supported exchanges.
    pub const ALL: [Self; 4] = [Self::Asx, Self::Cme, Self::Memx, Self::Mdp];

    /// Returns the lowercase exchange name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asx => "asx",
            Self::Cme => "cme",
            Self::Memx => "memx",
            Self::Mdp => "mdp",
        }
    }

    /// Returns true if frames start with a u16 message size.
    #[must_use]
    pub const fn has_message_size_header(self) -> bool {
        matches!(self, Self::Mdp)
    }

    /// Returns the catalogue options this exchange's schemas need.
    #[must_use]
    pub const fn catalogue_options(self) -> CatalogueOptions {
        CatalogueOptions::new().with_message_size_header(self.has_message_size_header())
    }

    /// Returns the offset the message is wrapped at.
    #[must_use]
    pub const fn wrap_offset(self, offset: usize) -> usize {
        match self {
            Self::Memx => 0,
            _ => offset,
        }
    }

    /// Reads the template id of the frame at `offset`.
    ///
    /// # Errors
    /// Returns `DecodeError::BufferTooShort` if the id lies past the buffer.
    pub fn template_id(self, buf: &[u8], offset: usize) -> Result<u32, DecodeError> {
        let le = ByteOrder::LittleEndian;
        let id = match self {
            Self::Asx => u64::from(slice_at(buf, offset, 1)?[0]),
            Self::Cme => le.read_unsigned(slice_at(buf, offset + 2, 2)?),
            Self::Memx => u64::from(slice_at(buf, self.wrap_offset(offset) + 2, 1)?[0]),
            Self::Mdp => le.read_unsigned(slice_at(buf, offset + 4, 2)?),
        };
        Ok(id as u32)
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnsupportedParser(s.to_string()))
    }
}

/// Resolves and wraps binary messages for one exchange.
#[derive(Debug, Clone)]
pub struct SbeDecoder {
    catalogue: Arc<SchemaCatalogue>,
    exchange: Exchange,
}

impl SbeDecoder {
    /// Creates a decoder over a shared catalogue.
    #[must_use]
    pub const fn new(catalogue: Arc<SchemaCatalogue>, exchange: Exchange) -> Self {
        Self { catalogue, exchange }
    }

    /// Parses the schema at `path` with the exchange's options.
    ///
    /// # Errors
    /// Returns `SchemaError` if the schema cannot be read or is invalid.
    pub fn from_path(path: impl AsRef<Path>, exchange: Exchange) -> Result<Self, SchemaError> {
        let catalogue = SchemaCatalogue::parse(path, exchange.catalogue_options())?;
        Ok(Self::new(Arc::new(catalogue), exchange))
    }

    /// Returns the catalogue.
    #[must_use]
    pub fn catalogue(&self) -> &Arc<SchemaCatalogue> {
        &self.catalogue
    }

    /// Returns the exchange.
    #[must_use]
    pub const fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Resolves the template at `offset` and wraps the message.
    ///
    /// Returns the message and the length of its frame.
    ///
    /// # Errors
    /// Returns `DecodeError::UnknownTemplate` for an unmapped id, or
    /// `DecodeError::BufferTooShort` if the frame is truncated.
    pub fn build<'a>(
        &'a self,
        buf: &'a [u8],
        offset: usize,
    ) -> Result<(SbeMessage<'a>, usize), DecodeError> {
        let template_id = self.exchange.template_id(buf, offset)?;
        let template = self
            .catalogue
            .template(template_id)
            .ok_or(DecodeError::UnknownTemplate { template_id })?;
        let start = self.exchange.wrap_offset(offset);
        let message = SbeMessage::wrap(template, buf, start)?;
        let frame_len = match message.message_size()? {
            Some(size) if self.exchange.has_message_size_header() => size as usize,
            _ => buf.len().saturating_sub(start),
        };
        Ok((message, frame_len))
    }

    /// Iterates over every message in a buffer holding consecutive frames.
    #[must_use]
    pub fn frames<'a>(&'a self, buf: &'a [u8]) -> Frames<'a> {
        Frames {
            decoder: self,
            buf,
            offset: 0,
            done: false,
        }
    }
}

/// Iterator over the messages of a multi-message buffer.
///
/// Stops after the first error or when a frame reports zero length.
#[derive(Debug)]
pub struct Frames<'a> {
    decoder: &'a SbeDecoder,
    buf: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<SbeMessage<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.buf.len() {
            return None;
        }
        match self.decoder.build(self.buf, self.offset) {
            Ok((message, frame_len)) => {
                if frame_len == 0 {
                    self.done = true;
                } else {
                    self.offset += frame_len;
                }
                Some(Ok(message))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
