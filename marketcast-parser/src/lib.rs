/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # marketcast Parser
//!
//! Message parsers with a shared lifecycle.
//!
//! This crate provides:
//! - **Contract**: `FormatDecoder` hooks and the generic `Parser` lifecycle
//!   with filtering, sampling, stats-only mode and captured errors
//! - **Binary parser**: SBE records for ASX, CME, MEMX and MDP framing
//! - **FIX parser**: tag=value records cast through a FIX dictionary
//! - **Factory**: `build_parser` selects a boxed parser by kind name

pub mod config;
pub mod contract;
pub mod counting;
pub mod factory;
pub mod fix;
pub mod sbe;

pub use config::{DEFAULT_FIX_SEPARATOR, ParserConfig};
pub use contract::{FormatDecoder, MessageParser, Parser, ParserState, ParserStats};
pub use counting::CountingParser;
pub use factory::{all_supported_types, build_parser};
pub use fix::FixParser;
pub use sbe::SbeParser;
