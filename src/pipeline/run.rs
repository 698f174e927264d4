// src/pipeline/run.rs

//! Word-of-the-day pipeline: scrape, check, format, broadcast.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{ChatId, Config, Word};
use crate::services::{Broadcaster, ScrapeOutcome, TelegramClient, WordScraper, format_message};

/// Summary of a completed send run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub word: String,
    pub definition_count: usize,
    pub recipient_count: usize,
    pub delivered: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Decide whether a scrape produced something worth sending.
pub fn check_word(outcome: &ScrapeOutcome) -> Result<()> {
    if !outcome.ok {
        return Err(AppError::ScrapeFailed);
    }
    if !outcome.word.has_text() {
        return Err(AppError::NoWord);
    }
    if !outcome.word.has_definitions() {
        return Err(AppError::NoDefinitions {
            word: outcome.word.text.clone(),
        });
    }
    Ok(())
}

/// Scrape the word of the day and reject incomplete results.
pub async fn fetch_word(
    scraper: &WordScraper,
    root_url: &str,
    cancel: &CancellationToken,
) -> Result<Word> {
    let outcome = scraper.scrape(root_url, cancel).await;
    check_word(&outcome)?;
    Ok(outcome.word)
}

/// Scrape and format without sending anything.
pub async fn run_preview(config: &Config, cancel: &CancellationToken) -> Result<String> {
    let scraper = WordScraper::new(&config.scraper)?;
    let word = fetch_word(&scraper, &config.scraper.root_url, cancel).await?;
    Ok(format_message(&word))
}

/// Full run against the configured site and bot API.
pub async fn run_send(
    config: &Config,
    bot_token: &str,
    recipients: &[ChatId],
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let scraper = WordScraper::new(&config.scraper)?;
    let client = TelegramClient::new(&config.telegram, bot_token)?;
    let broadcaster = Broadcaster::new(Arc::new(client), config.telegram.max_concurrent);

    run_send_with(
        &scraper,
        &config.scraper.root_url,
        &broadcaster,
        recipients,
        cancel,
    )
    .await
}

/// Full run with injected scraper and broadcaster.
pub async fn run_send_with(
    scraper: &WordScraper,
    root_url: &str,
    broadcaster: &Broadcaster,
    recipients: &[ChatId],
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let start_time = Utc::now();

    log::info!("[STEP 1/3] Scraping word of the day from {root_url}");
    let word = fetch_word(scraper, root_url, cancel).await?;

    log::info!(
        "[STEP 2/3] Formatting '{}' with {} definitions",
        word.text,
        word.definitions.len()
    );
    let message = format_message(&word);

    log::info!("[STEP 3/3] Sending to {} recipients", recipients.len());
    let report = broadcaster.broadcast(&message, recipients, cancel).await;
    let delivered = report.delivered();
    report.into_result()?;

    Ok(RunSummary {
        word: word.text,
        definition_count: word.definitions.len(),
        recipient_count: recipients.len(),
        delivered,
        start_time,
        end_time: Utc::now(),
    })
}
