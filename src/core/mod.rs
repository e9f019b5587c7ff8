//! # Core Module
//!
//! Core domain types, configuration and message chunking for the chime bot.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Line-aware chunking with oversized-line hard splitting
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod response;

// Re-export commonly used items
pub use config::Config;
pub use response::{chunk_message, chunk_text, MESSAGE_LIMIT};
