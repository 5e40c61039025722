//! # FloraCat Core
//!
//! Core types, traits, and configuration for the FloraCat species
//! recommendation platform. This crate provides the foundational types used
//! across ingestion, consolidation, envelope derivation, and the
//! recommendation API.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::*;
pub use traits::*;
pub use types::*;

/// Current version of the FloraCat platform
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
