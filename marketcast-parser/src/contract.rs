/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Shared parser lifecycle.
//!
//! This module defines the two layers every parser is built from:
//! - [`FormatDecoder`]: format hooks to enumerate schemas, identify a frame
//!   and decode its fields
//! - [`Parser`]: the lifecycle around a decoder, with filtering, sampling,
//!   per-type counting and error capture
//!
//! [`MessageParser`] is the object-safe view used for dynamic dispatch.

use crate::config::ParserConfig;
use bytes::Bytes;
use marketcast_core::{
    CapturedError, ConfigError, DecodeError, DecodeStage, DecodedMessage, MessageIdentity, Record,
    SchemaDescriptor, UNKNOWN_MESSAGE_TYPE,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Format-specific decoding hooks.
pub trait FormatDecoder {
    /// A resolved frame, parsed once and reused for field decoding.
    type Frame<'a>
    where
        Self: 'a;

    /// Returns the parser kinds this decoder serves.
    fn supported_types(&self) -> &'static [&'static str];

    /// Enumerates the message schemas, unfiltered.
    fn extract_schemas(&self) -> Vec<SchemaDescriptor>;

    /// Resolves the message type of a raw record.
    ///
    /// # Errors
    /// Returns a `DecodeError` if the type is unknown or the record cannot be
    /// framed.
    fn identify<'a>(
        &'a self,
        raw: &'a [u8],
    ) -> Result<(MessageIdentity, Self::Frame<'a>), DecodeError>;

    /// Decodes the fields of an identified frame.
    ///
    /// # Errors
    /// Returns the first `DecodeError` raised by any field.
    fn decode_fields(&self, frame: &Self::Frame<'_>) -> Result<Record, DecodeError>;
}

/// Lifecycle state of a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserState {
    /// Created, schemas not yet processed.
    Constructed,
    /// Schemas processed, no message seen yet.
    SchemaProcessed,
    /// At least one message processed.
    Streaming,
    /// Finished; further messages are refused.
    Done,
}

/// Counters collected while parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParserStats {
    /// Number of counted messages.
    pub record_count: u64,
    /// Number of schemas left after filtering.
    pub total_schema_count: usize,
    /// Counted messages by type name.
    pub summary_count: BTreeMap<String, u64>,
    /// Failed messages by type name or `UNKNOWN`.
    pub error_summary_count: BTreeMap<String, u64>,
}

impl ParserStats {
    /// Counts a message of the given type.
    pub fn increment_summary_count(&mut self, name: &str) {
        self.record_count += 1;
        *self.summary_count.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Counts a failure for the given type, or `UNKNOWN`.
    pub fn increment_error_summary_count(&mut self, name: Option<&str>) {
        let name = name.unwrap_or(UNKNOWN_MESSAGE_TYPE);
        *self.error_summary_count.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Returns the count for a type.
    #[must_use]
    pub fn summary_count(&self, name: &str) -> u64 {
        self.summary_count.get(name).copied().unwrap_or(0)
    }

    /// Returns the failure count for a type.
    #[must_use]
    pub fn error_count(&self, name: &str) -> u64 {
        self.error_summary_count.get(name).copied().unwrap_or(0)
    }
}

/// A decoder wrapped in the shared lifecycle.
#[derive(Debug)]
pub struct Parser<D: FormatDecoder> {
    decoder: D,
    config: ParserConfig,
    state: ParserState,
    stats: ParserStats,
}

impl<D: FormatDecoder> Parser<D> {
    /// Creates a parser.
    ///
    /// # Errors
    /// Returns `ConfigError::ConflictingFilters` if a type is both included
    /// and excluded.
    pub fn new(decoder: D, config: ParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.message_type_inclusions.is_some() && config.message_type_exclusions.is_some() {
            warn!("both inclusions and exclusions are set, exclusions are ignored");
        }
        Ok(Self {
            decoder,
            config,
            state: ParserState::Constructed,
            stats: ParserStats::default(),
        })
    }

    /// Returns the decoder.
    #[must_use]
    pub const fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ParserState {
        self.state
    }

    /// Returns the counters.
    #[must_use]
    pub const fn stats(&self) -> &ParserStats {
        &self.stats
    }

    fn transition(&mut self, next: ParserState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "parser state change");
            self.state = next;
        }
    }

    /// Enumerates the schemas that pass the type filters.
    ///
    /// Initializes the per-type counters to zero and records the number of
    /// schemas kept.
    pub fn process_schema(&mut self) -> Vec<SchemaDescriptor> {
        let schemas: Vec<SchemaDescriptor> = self
            .decoder
            .extract_schemas()
            .into_iter()
            .filter(|s| {
                self.config
                    .includes(&s.message_name, Some(s.message_id.to_string().as_str()))
            })
            .collect();

        self.stats.total_schema_count = schemas.len();
        for schema in &schemas {
            self.stats.summary_count.entry(schema.message_name.clone()).or_insert(0);
        }
        if self.state == ParserState::Constructed {
            self.transition(ParserState::SchemaProcessed);
        }
        schemas
    }

    /// Decodes one raw record.
    ///
    /// Returns `None` for an empty record or after [`Parser::finish`]. Decode
    /// failures are captured on the result.
    pub fn process_message(&mut self, raw: Bytes) -> Option<DecodedMessage> {
        if self.state == ParserState::Done || raw.is_empty() {
            return None;
        }
        if self.state == ParserState::Constructed {
            self.process_schema();
        }
        self.transition(ParserState::Streaming);

        let mut message = DecodedMessage::new(raw.clone());
        let frame = match self.decoder.identify(&raw) {
            Ok((identity, frame)) => {
                message.set_identity(identity);
                frame
            }
            Err(error) => {
                self.stats.increment_error_summary_count(None);
                let captured = CapturedError::new(None, DecodeStage::DecodeMessage, error);
                message.exception = Some(captured);
                return Some(message);
            }
        };

        let name = message.name().to_string();
        let id = message.type_id.as_ref().map(ToString::to_string);
        if self.config.use_filtering() && !self.config.includes(&name, id.as_deref()) {
            message.ignored = true;
            return Some(message);
        }

        let cap = self.config.sampling_count.unwrap_or(0);
        if self.config.use_sampling() && self.stats.summary_count(&name) >= cap {
            message.ignored = true;
            return Some(message);
        }

        self.stats.increment_summary_count(&name);
        if self.config.stats_only {
            message.ignored = true;
            return Some(message);
        }

        match self.decoder.decode_fields(&frame) {
            Ok(record) => message.dictionary = record,
            Err(error) => {
                self.stats.increment_error_summary_count(Some(&name));
                let captured = CapturedError::new(Some(name), DecodeStage::ParseMessage, error);
                message.exception = Some(captured);
            }
        }
        Some(message)
    }

    /// Counts a failure for a type, or `UNKNOWN` when `None`.
    pub fn increment_error_summary_count(&mut self, name: Option<&str>) {
        self.stats.increment_error_summary_count(name);
    }

    /// Finishes parsing, logs the summary and returns the counters.
    pub fn finish(&mut self) -> ParserStats {
        if self.state != ParserState::Done {
            self.transition(ParserState::Done);
            info!(
                records = self.stats.record_count,
                schemas = self.stats.total_schema_count,
                types = ?self.stats.summary_count,
                errors = ?self.stats.error_summary_count,
                sampling = ?self.config.sampling_count,
                filtering = self.config.use_filtering(),
                stats_only = self.config.stats_only,
                "parser finished"
            );
        }
        self.stats.clone()
    }
}

/// Object-safe parser interface.
pub trait MessageParser: Send {
    /// Returns the parser kinds served.
    fn supported_types(&self) -> &'static [&'static str];

    /// Enumerates the schemas that pass the type filters.
    fn process_schema(&mut self) -> Vec<SchemaDescriptor>;

    /// Decodes one raw record.
    fn process_message(&mut self, raw: Bytes) -> Option<DecodedMessage>;

    /// Counts a failure for a type, or `UNKNOWN` when `None`.
    fn increment_error_summary_count(&mut self, name: Option<&str>);

    /// Returns the lifecycle state.
    fn state(&self) -> ParserState;

    /// Returns the counters.
    fn stats(&self) -> &ParserStats;

    /// Finishes parsing and returns the counters.
    fn finish(&mut self) -> ParserStats;
}

impl<D: FormatDecoder + Send> MessageParser for Parser<D> {
    fn supported_types(&self) -> &'static [&'static str] {
        self.decoder.supported_types()
    }

    fn process_schema(&mut self) -> Vec<SchemaDescriptor> {
        Self::process_schema(self)
    }

    fn process_message(&mut self, raw: Bytes) -> Option<DecodedMessage> {
        Self::process_message(self, raw)
    }

    fn increment_error_summary_count(&mut self, name: Option<&str>) {
        Self::increment_error_summary_count(self, name);
    }

    fn state(&self) -> ParserState {
        self.state
    }

    fn stats(&self) -> &ParserStats {
        &self.stats
    }

    fn finish(&mut self) -> ParserStats {
        Self::finish(self)
    }
}
