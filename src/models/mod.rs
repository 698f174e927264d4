// src/models/mod.rs

//! Domain models for the application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod recipients;
mod word;

// Re-export all public types
pub use config::{Config, LoggingConfig, ScraperConfig, TelegramConfig, WordSelectors};
pub use recipients::{ChatId, parse_recipients};
pub use word::Word;
