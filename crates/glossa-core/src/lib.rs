//! # glossa-core
//!
//! Core types, traits, and abstractions for the glossa translation service.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other glossa crates depend on.

pub mod chunking;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use chunking::{ChunkerConfig, ParagraphChunker, PARAGRAPH_SEPARATOR};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
