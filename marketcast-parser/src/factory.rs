/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Parser construction by kind name.

use crate::config::ParserConfig;
use crate::contract::MessageParser;
use crate::counting::{COUNTING_TYPES, CountingParser};
use crate::fix::{FIX_TYPES, FixParser};
use crate::sbe::{SBE_TYPES, SbeParser};
use marketcast_core::MarketcastError;
use marketcast_sbe::Exchange;

/// Returns every parser kind [`build_parser`] accepts.
#[must_use]
pub fn all_supported_types() -> Vec<&'static str> {
    SBE_TYPES
        .iter()
        .chain(FIX_TYPES.iter())
        .chain(COUNTING_TYPES.iter())
        .copied()
        .collect()
}

/// Builds a parser for the given kind.
///
/// # Arguments
/// * `kind` - One of [`all_supported_types`], case-insensitive
/// * `config` - Parser configuration
///
/// # Errors
/// Returns `ConfigError::UnsupportedParser` for an unknown kind,
/// `SchemaError` if the schema cannot be loaded, or `ConfigError` for
/// invalid settings.
pub fn build_parser(
    kind: &str,
    config: ParserConfig,
) -> Result<Box<dyn MessageParser>, MarketcastError> {
    if kind.eq_ignore_ascii_case("fix") {
        return Ok(Box::new(FixParser::from_config(config)?));
    }
    if kind.eq_ignore_ascii_case("count") {
        config.validate()?;
        return Ok(Box::new(CountingParser::new()));
    }
    let exchange: Exchange = kind.parse()?;
    Ok(Box::new(SbeParser::from_config(exchange, config)?))
}
