/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Frame-only parser that counts records without decoding them.

use crate::contract::{MessageParser, ParserState, ParserStats};
use bytes::Bytes;
use marketcast_core::{DecodedMessage, SchemaDescriptor};
use tracing::{debug, info};

/// Parser kinds served by the counting parser.
pub const COUNTING_TYPES: [&str; 1] = ["count"];

/// Counts records and returns every one as ignored.
#[derive(Debug)]
pub struct CountingParser {
    state: ParserState,
    stats: ParserStats,
}

impl Default for CountingParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CountingParser {
    /// Creates a counting parser.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ParserState::Constructed,
            stats: ParserStats::default(),
        }
    }

    fn transition(&mut self, next: ParserState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "parser state change");
            self.state = next;
        }
    }
}

impl MessageParser for CountingParser {
    fn supported_types(&self) -> &'static [&'static str] {
        &COUNTING_TYPES
    }

    fn process_schema(&mut self) -> Vec<SchemaDescriptor> {
        if self.state == ParserState::Constructed {
            self.transition(ParserState::SchemaProcessed);
        }
        Vec::new()
    }

    fn process_message(&mut self, raw: Bytes) -> Option<DecodedMessage> {
        if self.state == ParserState::Done || raw.is_empty() {
            return None;
        }
        self.transition(ParserState::Streaming);
        self.stats.record_count += 1;
        let mut message = DecodedMessage::new(raw);
        message.ignored = true;
        Some(message)
    }

    fn increment_error_summary_count(&mut self, name: Option<&str>) {
        self.stats.increment_error_summary_count(name);
    }

    fn state(&self) -> ParserState {
        self.state
    }

    fn stats(&self) -> &ParserStats {
        &self.stats
    }

    fn finish(&mut self) -> ParserStats {
        if self.state != ParserState::Done {
            self.transition(ParserState::Done);
            info!(records = self.stats.record_count, "counting parser finished");
        }
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_without_decoding() {
        let mut parser = CountingParser::new();
        assert!(parser.process_schema().is_empty());
        assert!(parser.process_message(Bytes::new()).is_none());

        for payload in ["\u{1}\u{2}", "35=0", "x"] {
            let raw = Bytes::copy_from_slice(payload.as_bytes());
            let message = parser.process_message(raw).unwrap();
            assert!(message.ignored);
            assert!(message.type_id.is_none());
            assert!(message.is_empty());
        }
        assert_eq!(parser.stats().record_count, 3);
        assert!(parser.stats().summary_count.is_empty());

        assert_eq!(parser.finish().record_count, 3);
        assert_eq!(parser.state(), ParserState::Done);
        assert!(parser.process_message(Bytes::from_static(b"late")).is_none());
    }
}
