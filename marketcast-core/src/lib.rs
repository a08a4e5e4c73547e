/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # marketcast Core
//!
//! Core types and error definitions shared by the marketcast decoders.
//!
//! This crate provides the fundamental building blocks used across all marketcast crates:
//! - **Error types**: schema, decode and configuration errors with `thiserror`
//! - **Value model**: `Value` and the insertion-ordered `Record`
//! - **Message types**: `DecodedMessage`, `MessageIdentity`, `MessageTypeId`
//! - **Schema capabilities**: `SchemaDescriptor`, `SchemaField`, `LogicalType`
//!
//! ## Ownership
//!
//! Decoders borrow caller-owned buffers while they run. The result keeps a
//! cheap `Bytes` handle to the raw record and owns the decoded `Record`.

pub mod error;
pub mod message;
pub mod schema;
pub mod value;

pub use error::{
    CapturedError, ConfigError, DecodeError, DecodeStage, MarketcastError, Result, SchemaError,
};
pub use message::{DecodedMessage, MessageIdentity, MessageTypeId, UNKNOWN_MESSAGE_TYPE};
pub use schema::{LogicalType, SchemaDescriptor, SchemaField};
pub use value::{Record, Value};
