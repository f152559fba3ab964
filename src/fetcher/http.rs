//! HTTP fetch collaborator
//!
//! This module handles the actual network requests, including:
//! - Building HTTP clients with a proper user agent string
//! - GET requests returning the response body
//! - Mapping transport failures and non-success statuses to `FetchError`

use crate::config::{Config, FetchConfig, UserAgentConfig};
use crate::fetcher::Fetch;
use crate::{FetchError, FetcherError};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;

/// A successfully fetched document
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value, if present
    pub content_type: Option<String>,

    /// Response body
    pub body: String,
}

impl AsRef<[u8]> for Page {
    fn as_ref(&self) -> &[u8] {
        self.body.as_bytes()
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Identification sent with every request
/// * `fetch` - Timeouts
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use adaptive_fetcher::config::{FetchConfig, UserAgentConfig};
/// use adaptive_fetcher::fetcher::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetch: &FetchConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(fetch.timeout_secs))
        .connect_timeout(Duration::from_secs(fetch.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetch collaborator backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Wraps an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the client from the user agent and fetch sections of `config`
    pub fn from_config(config: &Config) -> Result<Self, FetcherError> {
        let client =
            build_http_client(&config.user_agent, &config.fetch).map_err(FetcherError::Client)?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    type Payload = Page;

    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        fetch_page(&self.client, url).await
    }
}

/// Fetches a URL and returns its body
///
/// # Error Mapping
///
/// | Condition | Error |
/// |-----------|-------|
/// | Non-2xx status | `FetchError::Status` |
/// | Timeout (request or body) | `FetchError::Timeout` |
/// | Connection refused / TLS failure | `FetchError::Connect` |
/// | Body could not be read | `FetchError::Body` |
/// | Anything else | `FetchError::Http` |
pub async fn fetch_page(client: &Client, url: &str) -> Result<Page, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_request_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response.text().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Body {
                url: url.to_string(),
                source: e,
            }
        }
    })?;

    Ok(Page {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body,
    })
}

/// Classifies an error raised while sending a request
fn classify_request_error(url: &str, e: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if e.is_timeout() {
        FetchError::Timeout { url }
    } else if e.is_connect() {
        FetchError::Connect { url, source: e }
    } else {
        FetchError::Http { url, source: e }
    }
}
