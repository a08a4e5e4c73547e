/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # marketcast
//!
//! Schema-driven decoding of exchange market data.
//!
//! marketcast turns raw SBE binary frames and FIX tag=value records into
//! ordered records, driven by the exchange's XML schema or a QuickFIX-style
//! dictionary. Every parser shares one lifecycle: schemas are enumerated and
//! filtered once, then each record is identified, counted, optionally sampled
//! and decoded, with decode failures captured on the result.
//!
//! ## Features
//!
//! - **Zero-copy views**: binary fields and FIX values borrow the raw buffer
//! - **Exchange framing**: ASX, CME, MEMX and CME MDP 3.0 template id rules
//! - **FIX repeating groups**: nested groups resolved through components
//! - **Stats**: per-type and per-error counters with an end-of-run summary
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marketcast::prelude::*;
//!
//! let config = ParserConfig::new("schemas/cme-mdp3.xml").with_sampling_count(100);
//! let mut parser = build_parser("mdp", config)?;
//! for frame in frames {
//!     if let Some(message) = parser.process_message(frame) {
//!         println!("{}: {:?}", message.name(), message.dictionary);
//!     }
//! }
//! let stats = parser.finish();
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Errors, the value model and schema descriptors
//! - [`dictionary`]: FIX dictionary parsing and sorting keys
//! - [`tagvalue`]: Tag=value tokenizing and the group-aware codec
//! - [`sbe`]: SBE schema catalogue and binary message views
//! - [`parser`]: Parser lifecycle, concrete parsers and the factory

pub mod core {
    //! Errors, the value model and schema descriptors.
    pub use marketcast_core::*;
}

pub mod dictionary {
    //! FIX dictionary parsing and sorting keys.
    pub use marketcast_dictionary::*;
}

pub mod tagvalue {
    //! Tag=value tokenizing and the group-aware codec.
    pub use marketcast_tagvalue::*;
}

pub mod sbe {
    //! SBE schema catalogue and binary message views.
    pub use marketcast_sbe::*;
}

pub mod parser {
    //! Parser lifecycle, concrete parsers and the factory.
    pub use marketcast_parser::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use marketcast_core::{
        CapturedError, ConfigError, DecodeError, DecodeStage, DecodedMessage, LogicalType,
        MarketcastError, MessageTypeId, Record, Result, SchemaDescriptor, SchemaError, SchemaField,
        Value,
    };

    // FIX dictionary
    pub use marketcast_dictionary::{FixSpec, FixTag, SortingKey};

    // Binary decoding
    pub use marketcast_sbe::{CatalogueOptions, Exchange, SbeDecoder, SchemaCatalogue};

    // Parsers
    pub use marketcast_parser::{
        CountingParser, FixParser, MessageParser, Parser, ParserConfig, ParserState, ParserStats,
        SbeParser, all_supported_types, build_parser,
    };
}
