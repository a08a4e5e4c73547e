/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # marketcast SBE
//!
//! Schema-driven decoding of SBE (Simple Binary Encoding) market data.
//!
//! SBE messages are fixed-layout binary blocks addressed by byte offsets,
//! followed by repeating groups whose size depends on runtime instance counts.
//!
//! ## Features
//!
//! - **Schema catalogue**: parses SBE XML into immutable message templates
//! - **Zero-copy views**: fields are decoded lazily from borrowed buffers
//! - **Repeating groups**: nested groups with exact span accounting
//! - **Exchange framing**: ASX, CME, MEMX and CME MDP 3.0 conventions

pub mod exchange;
pub mod field;
pub mod group;
pub mod message;
pub mod primitive;
pub mod schema;

pub use exchange::{Exchange, Frames, SbeDecoder};
pub use field::FieldView;
pub use group::{GroupContainer, GroupInstance};
pub use message::SbeMessage;
pub use primitive::{ByteOrder, PrimitiveType, convert_to_underscore};
pub use schema::{
    CatalogueOptions, ConstantValue, Dimension, EnumValue, FieldKind, FieldSpec, GroupSpec,
    MessageTemplate, SchemaCatalogue,
};
