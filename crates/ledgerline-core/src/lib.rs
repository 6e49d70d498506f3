//! Core schema and rules for ledgerline.
//!
//! This crate defines the normalized music model (Genre, Artist, Album,
//! Track, OperationLog), the raw staging model, the SQLite schema with its
//! constraints, the trigger-backed integrity and audit hooks, and the pure
//! field normalization rules.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod hooks;
pub mod model;
pub mod normalize;
pub mod schema;

pub use error::{Error, Result};
