// src/models/recipients.rs

//! Recipient list parsing.

use crate::error::{AppError, Result};

/// Telegram chat identifier.
pub type ChatId = i64;

/// Parse a whitespace-separated list of chat ids.
///
/// # Examples
/// ```
/// use wod_rae::models::parse_recipients;
///
/// assert_eq!(parse_recipients("12 -34").unwrap(), vec![12, -34]);
/// ```
pub fn parse_recipients(raw: &str) -> Result<Vec<ChatId>> {
    let recipients = raw
        .split_whitespace()
        .map(|value| {
            value
                .parse::<ChatId>()
                .map_err(|source| AppError::InvalidRecipient {
                    value: value.to_string(),
                    source,
                })
        })
        .collect::<Result<Vec<_>>>()?;

    if recipients.is_empty() {
        return Err(AppError::NoRecipients);
    }
    Ok(recipients)
}
