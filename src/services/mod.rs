//! Service layer for the application.
//!
//! This module contains the business logic for:
//! - Word scraping (`WordScraper`)
//! - Message formatting (`format_message`)
//! - Concurrent delivery (`Broadcaster`)
//! - The Bot API client (`TelegramClient`)

mod broadcaster;
mod formatter;
mod scraper;
mod telegram;

pub use broadcaster::{BroadcastReport, Broadcaster, DeliveryOutcome, FailureKind, MessageSender};
pub use formatter::{RESERVED, escape_markdown_v2, format_message};
pub use self::scraper::{ScrapeOutcome, WordScraper};
pub use telegram::{TelegramClient, TelegramResponse};
