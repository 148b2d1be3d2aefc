//! # Smeta Common Library
//!
//! Shared code for the Smeta cost-estimation services:
//! - Price consensus engine (calculator and operator edits)
//! - Catalog and raw record models
//! - Configuration loading
//! - Error types

pub mod config;
pub mod consensus;
pub mod error;

pub use config::{ConsensusConfig, TomlConfig};
pub use error::{Error, Result};
