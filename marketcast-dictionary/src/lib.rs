/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Marketcast Dictionary
//!
//! FIX specification parsing for the marketcast decoders.
//!
//! This crate provides:
//! - **Tag definitions**: Tag types, enum tables and value casting
//! - **Compositions**: Messages, components and repeating groups
//! - **Sorting keys**: Wire order of a message's tags
//! - **Dictionary parsing**: QuickFIX XML format parser

pub mod composition;
pub mod schema;
pub mod spec;

pub use composition::{
    CHECKSUM_TAG, Component, Composition, DEFAULT_HEADER_TAGS, DEFAULT_TRAILER_TAGS, Element, Group,
    MSG_TYPE_TAG, MessageType, SortingKey,
};
pub use schema::{FieldType, FixTag, TagsReference};
pub use spec::FixSpec;
