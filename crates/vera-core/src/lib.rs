//! # Vera-Core
//!
//! Core types and utilities for the Vera anonymous survey system.
//!
//! Responses are collected under a time-bounded session and, once the session
//! expires, replaced by a synthetic dataset before the raw records are purged.
//! This crate holds the vocabulary shared by the synthesis engine and the
//! session layer: identifiers, response records, the numeric table, the
//! correlation map, survey schemas, configuration and logging.

pub mod config;
pub mod error;
pub mod logging;
pub mod survey;
pub mod table;
pub mod types;

pub use self::config::*;
pub use error::{Error, Result};
pub use logging::*;
pub use survey::*;
pub use table::*;
pub use types::*;
