// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use url::Url;

use crate::error::Result;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(user_agent: &str, timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(user_agent);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Fetch a page, treating non-success statuses as errors.
///
/// Returns the URL the body was served from (after redirects) with the body.
pub async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
) -> std::result::Result<(Url, String), reqwest::Error> {
    let response = client.get(url).send().await?.error_for_status()?;
    let final_url = response.url().clone();
    let body = response.text().await?;
    Ok((final_url, body))
}
