//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::log::{LogLevel, LogMode};
use crate::utils::parse_selector;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scrape target and selectors
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Bot API settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.scraper.root_url.trim().is_empty() {
            return Err(AppError::validation("scraper.root_url is empty"));
        }
        url::Url::parse(&self.scraper.root_url)?;
        if self.scraper.user_agent.trim().is_empty() {
            return Err(AppError::validation("scraper.user_agent is empty"));
        }
        if self.scraper.timeout_secs == Some(0) {
            return Err(AppError::validation("scraper.timeout_secs must be > 0"));
        }
        self.scraper.selectors.validate()?;

        url::Url::parse(&self.telegram.api_base)?;
        if self.telegram.max_concurrent == 0 {
            return Err(AppError::validation("telegram.max_concurrent must be > 0"));
        }
        if self.telegram.parse_mode.trim().is_empty() {
            return Err(AppError::validation("telegram.parse_mode is empty"));
        }
        if self.telegram.timeout_secs == Some(0) {
            return Err(AppError::validation("telegram.timeout_secs must be > 0"));
        }

        self.logging.level.parse::<LogLevel>()?;
        self.logging.mode.parse::<LogMode>()?;
        Ok(())
    }
}

/// Scrape target settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Front page carrying the word of the day
    #[serde(default = "defaults::root_url")]
    pub root_url: String,

    /// User-Agent header for page requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Optional request timeout; unset means only cancellation stops a request
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// CSS selectors for both stages
    #[serde(default)]
    pub selectors: WordSelectors,
}

impl ScraperConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            root_url: defaults::root_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: None,
            selectors: WordSelectors::default(),
        }
    }
}

/// CSS selectors for the front page and the detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSelectors {
    /// Anchor pointing at the detail page (front page)
    #[serde(default = "defaults::word_link")]
    pub word_link: String,

    /// Element holding the headword (front page)
    #[serde(default = "defaults::word")]
    pub word: String,

    /// Repeated definition items (detail page)
    #[serde(default = "defaults::definition")]
    pub definition: String,

    /// Attribute carrying the detail-page link
    #[serde(default = "defaults::link_attr")]
    pub link_attr: String,
}

impl WordSelectors {
    fn validate(&self) -> Result<()> {
        parse_selector(&self.word_link)?;
        parse_selector(&self.word)?;
        parse_selector(&self.definition)?;
        if self.link_attr.trim().is_empty() {
            return Err(AppError::validation("scraper.selectors.link_attr is empty"));
        }
        Ok(())
    }
}

impl Default for WordSelectors {
    fn default() -> Self {
        Self {
            word_link: defaults::word_link(),
            word: defaults::word(),
            definition: defaults::definition(),
            link_attr: defaults::link_attr(),
        }
    }
}

/// Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Base URL of the Bot API
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Maximum deliveries with an in-flight request; keeps the bot under the API rate limit
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Rich-text mode sent with every message
    #[serde(default = "defaults::parse_mode")]
    pub parse_mode: String,

    /// Suppress link preview expansion
    #[serde(default = "defaults::disable_web_page_preview")]
    pub disable_web_page_preview: bool,

    /// Optional request timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl TelegramConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            max_concurrent: defaults::max_concurrent(),
            parse_mode: defaults::parse_mode(),
            disable_web_page_preview: defaults::disable_web_page_preview(),
            timeout_secs: None,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of debug, info, warn, error
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Either text or json
    #[serde(default = "defaults::log_mode")]
    pub mode: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            mode: defaults::log_mode(),
        }
    }
}

mod defaults {
    // Scraper defaults
    pub fn root_url() -> String {
        "https://dle.rae.es/".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; wod-rae/1.0)".into()
    }
    pub fn word_link() -> String {
        "a[href].c-word-day__link".into()
    }
    pub fn word() -> String {
        "span.c-word-day__word".into()
    }
    pub fn definition() -> String {
        "div.c-definitions__item".into()
    }
    pub fn link_attr() -> String {
        "href".into()
    }

    // Telegram defaults
    pub fn api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn max_concurrent() -> usize {
        10
    }
    pub fn parse_mode() -> String {
        "MarkdownV2".into()
    }
    pub fn disable_web_page_preview() -> bool {
        true
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
    pub fn log_mode() -> String {
        "text".into()
    }
}
