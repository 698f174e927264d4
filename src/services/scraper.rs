// src/services/scraper.rs

//! Word-of-the-day scraper.
//!
//! Two linked stages: the front page yields the headword and the link to its
//! detail page, the detail page yields the definitions. Failures degrade to
//! empty fields plus `ok == false`; the caller decides how severe that is.

use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ScraperConfig, Word, WordSelectors};
use crate::utils::http::{create_async_client, fetch_text};
use crate::utils::{normalize_whitespace, parse_selector, resolve_url};

/// Result of a scrape run.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOutcome {
    pub word: Word,
    /// False when a stage failed to fetch its page
    pub ok: bool,
}

/// Two-stage scraper for the word of the day.
pub struct WordScraper {
    client: reqwest::Client,
    link_selector: Selector,
    word_selector: Selector,
    definition_selector: Selector,
    link_attr: String,
}

impl WordScraper {
    /// Create a scraper with its own HTTP client.
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = create_async_client(&config.user_agent, config.timeout())?;
        Self::with_client(client, &config.selectors)
    }

    /// Create a scraper reusing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, selectors: &WordSelectors) -> Result<Self> {
        Ok(Self {
            client,
            link_selector: parse_selector(&selectors.word_link)?,
            word_selector: parse_selector(&selectors.word)?,
            definition_selector: parse_selector(&selectors.definition)?,
            link_attr: selectors.link_attr.clone(),
        })
    }

    /// Scrape the front page at `root_url` and the detail page it links to.
    pub async fn scrape(&self, root_url: &str, cancel: &CancellationToken) -> ScrapeOutcome {
        let mut word = Word::default();

        // Stage 1: front page; links resolve against where it was served from
        let (base, front) = match self.fetch(root_url, cancel).await {
            Ok(page) => page,
            Err(e) => {
                log::error!("Error scraping front page {root_url}: {e}");
                return ScrapeOutcome { word, ok: false };
            }
        };

        let Some(detail_url) = self.read_front_page(&front, &base, &mut word) else {
            log::warn!("No word-of-the-day link found on {root_url}");
            return ScrapeOutcome { word, ok: true };
        };

        // Stage 2: detail page
        match self.fetch(&detail_url, cancel).await {
            Ok((_, html)) => {
                self.read_detail_page(&html, &mut word);
                ScrapeOutcome { word, ok: true }
            }
            Err(e) => {
                log::error!("Error scraping entry page {detail_url}: {e}");
                ScrapeOutcome { word, ok: false }
            }
        }
    }

    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<(Url, String)> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            result = fetch_text(&self.client, url) => result.map_err(|source| AppError::Fetch {
                url: url.to_string(),
                source,
            }),
        }
    }

    /// Record the headword and detail URL; returns the URL to visit next.
    fn read_front_page(&self, html: &str, base: &Url, word: &mut Word) -> Option<String> {
        let document = Html::parse_document(html);

        let detail_url = document
            .select(&self.link_selector)
            .find_map(|el| el.value().attr(&self.link_attr))
            .map(|href| resolve_url(base, href.trim()));

        if let Some(url) = &detail_url {
            log::debug!("found word URL: {url}");
            word.source_url = url.clone();
        }

        if let Some(text) = document
            .select(&self.word_selector)
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .find(|text| !text.is_empty())
        {
            log::info!("found word of the day: {text}");
            word.text = text;
        }

        detail_url
    }

    /// Append every definition item in document order.
    fn read_detail_page(&self, html: &str, word: &mut Word) {
        let document = Html::parse_document(html);

        for element in document.select(&self.definition_selector) {
            let definition = normalize_whitespace(&element.text().collect::<String>());
            if definition.is_empty() {
                continue;
            }
            log::debug!("found word definition: {definition}");
            word.definitions.push(definition);
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const FRONT_PAGE: &str = r#"
        <html><body>
          <section class="c-word-day">
            <a class="c-word-day__link" href="/osculo?m=wotd">
              <span class="c-word-day__word"> ósculo </span>
            </a>
          </section>
        </body></html>
    "#;

    const DETAIL_PAGE: &str = r#"
        <html><body>
          <div class="c-definitions">
            <div class="c-definitions__item">1. m. cult. Beso de respeto o de afecto.</div>
            <div class="c-definitions__item">2. m.
                Beso.</div>
            <div class="c-definitions__item">3. m. Acción de besar.</div>
          </div>
        </body></html>
    "#;

    fn scraper() -> WordScraper {
        WordScraper::new(&ScraperConfig::default()).unwrap()
    }

    async fn mount_page(server: &MockServer, page_path: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(page_path))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_read_front_page_resolves_link() {
        let base = Url::parse("https://dle.rae.es/").unwrap();
        let mut word = Word::default();

        let next = scraper().read_front_page(FRONT_PAGE, &base, &mut word);

        assert_eq!(next.as_deref(), Some("https://dle.rae.es/osculo?m=wotd"));
        assert_eq!(word.source_url, "https://dle.rae.es/osculo?m=wotd");
        assert_eq!(word.text, "ósculo");
    }

    #[test]
    fn test_read_front_page_without_matches() {
        let base = Url::parse("https://dle.rae.es/").unwrap();
        let mut word = Word::default();

        let next = scraper().read_front_page("<html><p>mantenimiento</p></html>", &base, &mut word);

        assert!(next.is_none());
        assert_eq!(word, Word::default());
    }

    #[test]
    fn test_read_detail_page_keeps_document_order() {
        let mut word = Word::default();
        scraper().read_detail_page(DETAIL_PAGE, &mut word);

        assert_eq!(
            word.definitions,
            vec![
                "1. m. cult. Beso de respeto o de afecto.",
                "2. m. Beso.",
                "3. m. Acción de besar.",
            ]
        );
    }

    #[test]
    fn test_with_client_rejects_bad_selector() {
        let selectors = WordSelectors {
            word: "[[invalid".to_string(),
            ..WordSelectors::default()
        };
        assert!(WordScraper::with_client(reqwest::Client::new(), &selectors).is_err());
    }

    #[tokio::test]
    async fn test_scrape_two_stages() {
        let server = MockServer::start().await;
        mount_page(&server, "/", 200, FRONT_PAGE).await;
        mount_page(&server, "/osculo", 200, DETAIL_PAGE).await;

        let root = format!("{}/", server.uri());
        let outcome = scraper().scrape(&root, &CancellationToken::new()).await;

        assert!(outcome.ok);
        assert_eq!(outcome.word.text, "ósculo");
        assert_eq!(
            outcome.word.source_url,
            format!("{}/osculo?m=wotd", server.uri())
        );
        assert_eq!(outcome.word.definitions.len(), 3);
        assert!(outcome.word.definitions[0].starts_with("1. m."));
        assert!(outcome.word.definitions[2].starts_with("3. m."));
    }

    #[tokio::test]
    async fn test_scrape_resolves_link_after_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/hoy/"))
            .mount(&server)
            .await;
        let front = FRONT_PAGE.replace("href=\"/osculo?m=wotd\"", "href=\"osculo\"");
        mount_page(&server, "/hoy/", 200, &front).await;
        mount_page(&server, "/hoy/osculo", 200, DETAIL_PAGE).await;

        let root = format!("{}/", server.uri());
        let outcome = scraper().scrape(&root, &CancellationToken::new()).await;

        assert!(outcome.ok);
        assert_eq!(outcome.word.source_url, format!("{}/hoy/osculo", server.uri()));
        assert_eq!(outcome.word.definitions.len(), 3);
    }

    #[tokio::test]
    async fn test_scrape_invalid_root_url() {
        let outcome = scraper().scrape("no es una url", &CancellationToken::new()).await;
        assert!(!outcome.ok);
        assert_eq!(outcome.word, Word::default());
    }

    #[tokio::test]
    async fn test_scrape_without_word_link() {
        let server = MockServer::start().await;
        mount_page(&server, "/", 200, "<html><body></body></html>").await;

        let root = format!("{}/", server.uri());
        let outcome = scraper().scrape(&root, &CancellationToken::new()).await;

        assert!(outcome.ok);
        assert!(outcome.word.text.is_empty());
        assert!(outcome.word.source_url.is_empty());
        assert!(outcome.word.definitions.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_front_page_error() {
        let server = MockServer::start().await;
        mount_page(&server, "/", 503, "down").await;

        let root = format!("{}/", server.uri());
        let outcome = scraper().scrape(&root, &CancellationToken::new()).await;

        assert!(!outcome.ok);
        assert!(outcome.word.text.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_detail_page_error_keeps_word() {
        let server = MockServer::start().await;
        mount_page(&server, "/", 200, FRONT_PAGE).await;
        mount_page(&server, "/osculo", 404, "not found").await;

        let root = format!("{}/", server.uri());
        let outcome = scraper().scrape(&root, &CancellationToken::new()).await;

        assert!(!outcome.ok);
        assert_eq!(outcome.word.text, "ósculo");
        assert!(outcome.word.definitions.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_cancelled_makes_no_request() {
        let server = MockServer::start().await;
        mount_page(&server, "/", 200, FRONT_PAGE).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let root = format!("{}/", server.uri());
        let outcome = scraper().scrape(&root, &cancel).await;

        assert!(!outcome.ok);
        assert_eq!(outcome.word, Word::default());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
