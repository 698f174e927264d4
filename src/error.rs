// src/error.rs

//! Unified error handling for the word-of-the-day application.

use std::fmt;
use std::num::ParseIntError;

use thiserror::Error;

use crate::models::ChatId;

/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or used
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration value out of range
    #[error("Validation error: {0}")]
    Validation(String),

    /// Logger could not be installed
    #[error("Logging setup error: {0}")]
    Logging(String),

    /// No recipient was configured
    #[error("WOD_RAE_RECIPIENTS is empty or not set")]
    NoRecipients,

    /// A recipient token is not a chat id
    #[error("error processing recipient ID {value}: {source}")]
    InvalidRecipient {
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// Bot credential missing
    #[error("WOD_RAE_BOT_TOKEN is not set or empty")]
    MissingToken,

    /// A page could not be fetched
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A scrape stage reported an error
    #[error("scraping did not complete")]
    ScrapeFailed,

    /// The front page exposed no headword
    #[error("failed to get a word")]
    NoWord,

    /// The detail page exposed no definitions
    #[error("failed to get definitions for '{word}'")]
    NoDefinitions { word: String },

    /// The message could not be sent to a recipient
    #[error("error sending request to recipient {recipient}: {source}")]
    Transport {
        recipient: ChatId,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with an unexpected body
    #[error("error decoding response from recipient {recipient}: {source}")]
    Decode {
        recipient: ChatId,
        #[source]
        source: serde_json::Error,
    },

    /// The API answered but refused the message
    #[error("request was not ok for recipient ID = {recipient}, got error {code}: {description}")]
    Rejected {
        recipient: ChatId,
        code: i64,
        description: String,
    },

    /// The run was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// A delivery task panicked
    #[error("delivery task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Process exit status for each failure class.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const NO_WORD: i32 = 1;
    pub const NO_DEFINITIONS: i32 = 2;
    pub const RECIPIENTS: i32 = 10;
    pub const TOKEN: i32 = 11;
    pub const LOGGING: i32 = 12;
    pub const CONFIG: i32 = 13;
    pub const DELIVERY: i32 = 20;
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a logging setup error.
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging(message.into())
    }

    /// True for errors raised by a single delivery attempt.
    pub fn is_delivery(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Decode { .. }
                | Self::Rejected { .. }
                | Self::Cancelled
                | Self::Join(_)
        )
    }

    /// Map the error to the process exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ScrapeFailed | Self::NoWord | Self::Fetch { .. } => exit_code::NO_WORD,
            Self::NoDefinitions { .. } => exit_code::NO_DEFINITIONS,
            Self::NoRecipients | Self::InvalidRecipient { .. } => exit_code::RECIPIENTS,
            Self::MissingToken => exit_code::TOKEN,
            Self::Logging(_) => exit_code::LOGGING,
            Self::Transport { .. }
            | Self::Decode { .. }
            | Self::Rejected { .. }
            | Self::Cancelled
            | Self::Join(_) => exit_code::DELIVERY,
            Self::Io(_)
            | Self::Http(_)
            | Self::Toml(_)
            | Self::Url(_)
            | Self::Selector { .. }
            | Self::Validation(_) => exit_code::CONFIG,
        }
    }
}
