/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Binary (SBE) parser.

use crate::config::ParserConfig;
use crate::contract::{FormatDecoder, Parser};
use marketcast_core::{DecodeError, MarketcastError, MessageIdentity, Record, SchemaDescriptor};
use marketcast_sbe::{Exchange, FieldSpec, GroupSpec, SbeDecoder, SbeMessage};

/// Parser kinds served by the binary decoder.
pub const SBE_TYPES: [&str; 4] = ["asx", "cme", "memx", "mdp"];

/// Format hooks for SBE binary records.
#[derive(Debug, Clone)]
pub struct SbeParser {
    decoder: SbeDecoder,
}

impl SbeParser {
    /// Creates a parser over a prepared decoder.
    #[must_use]
    pub const fn new(decoder: SbeDecoder) -> Self {
        Self { decoder }
    }

    /// Loads the schema named by `config` and wraps it in the lifecycle.
    ///
    /// # Errors
    /// Returns `MarketcastError::Schema` if the schema cannot be loaded, or
    /// `MarketcastError::Config` if the filters conflict.
    pub fn from_config(
        exchange: Exchange,
        config: ParserConfig,
    ) -> Result<Parser<Self>, MarketcastError> {
        let decoder = SbeDecoder::from_path(&config.schema_path, exchange)?;
        Ok(Parser::new(Self::new(decoder), config)?)
    }

    /// Returns the underlying decoder.
    #[must_use]
    pub const fn decoder(&self) -> &SbeDecoder {
        &self.decoder
    }
}

impl FormatDecoder for SbeParser {
    type Frame<'a> = SbeMessage<'a>;

    fn supported_types(&self) -> &'static [&'static str] {
        &SBE_TYPES
    }

    fn extract_schemas(&self) -> Vec<SchemaDescriptor> {
        self.decoder
            .catalogue()
            .templates()
            .iter()
            .map(|template| {
                let fields = template
                    .body_fields()
                    .map(FieldSpec::schema_field)
                    .chain(template.groups.iter().map(GroupSpec::schema_field))
                    .collect();
                SchemaDescriptor::new(template.id, template.name.clone(), fields)
            })
            .collect()
    }

    fn identify<'a>(
        &'a self,
        raw: &'a [u8],
    ) -> Result<(MessageIdentity, SbeMessage<'a>), DecodeError> {
        let (message, _) = self.decoder.build(raw, 0)?;
        Ok((MessageIdentity::new(message.template().id, message.name()), message))
    }

    fn decode_fields(&self, frame: &SbeMessage<'_>) -> Result<Record, DecodeError> {
        frame.to_record()
    }
}
