//! Core types for entkv.
//!
//! This crate provides the foundational types shared by the engine and the entity
//! stores:
//! - [`Id`], the fixed-width identifier used for entities and organizations
//! - [`Entity`], the envelope passed through every store operation
//! - Codec helpers for postcard and JSON bodies
//! - Configuration types validated with fallible builders

#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod types;

// Re-export commonly used types at crate root
pub use codec::{CodecError, decode, decode_json, encode, encode_json};
pub use types::*;
