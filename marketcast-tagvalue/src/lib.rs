/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Marketcast Tag-Value
//!
//! Zero-copy FIX tag=value decoding for the marketcast parsers.
//!
//! This crate splits FIX records into tag/value pairs and nests repeating
//! groups using the group tables of a [`marketcast_dictionary::FixSpec`].
//!
//! ## Features
//!
//! - **Zero-copy parsing**: Field values reference the original buffer
//! - **SIMD-accelerated**: Uses `memchr` for fast delimiter search
//! - **Custom separators**: SOH, `|` or any other single byte

pub mod codec;
pub mod decoder;

pub use codec::{Codec, FieldMap, RepeatingGroup, TagValue};
pub use decoder::{Decoder, EQUALS, Field, SOH};
