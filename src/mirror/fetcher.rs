//! HTTP fetcher implementation
//!
//! This module handles the page request of a mirror operation, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - GET requests to fetch page content
//! - Content-Type checking
//! - Error classification

use crate::config::HttpConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Result of a page fetch
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: Url,
        /// HTTP status code
        status_code: u16,
        /// Raw page body
        body: Vec<u8>,
        /// Charset announced in the Content-Type header, if any
        charset: Option<String>,
    },

    /// Response is not markup (Content-Type mismatch)
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// The host name could not be resolved
    UnresolvedHost { error: reqwest::Error },

    /// Connection refused, reset or timed out
    ConnectionFailure { error: reqwest::Error },

    /// The connection was made but the exchange broke down
    /// (truncated body, undecodable content, redirect trouble)
    StreamFailure { error: reqwest::Error },

    /// Any other transport failure
    TransportFailure { error: reqwest::Error },
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use page_mirror::config::HttpConfig;
/// use page_mirror::mirror::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page
///
/// # Request Flow
///
/// 1. Send GET request (redirects are followed by the client)
/// 2. Non-success status → HttpError
/// 3. Content-Type that is neither text nor XML → ContentMismatch
/// 4. Read the raw body; decoding is left to the document parser, which
///    also looks at `<meta>` charset declarations
///
/// # Error Classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | DNS lookup failed | UnresolvedHost |
/// | Connection refused / timeout | ConnectionFailure |
/// | Body, decode or redirect error | StreamFailure |
/// | Anything else | TransportFailure |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
///
/// # Returns
///
/// A FetchResult indicating success or the type of failure
pub async fn fetch_page(client: &Client, url: &Url) -> FetchResult {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(e),
    };

    let status = response.status();
    let final_url = response.url().clone();

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_markup_content_type(&content_type) {
        return FetchResult::ContentMismatch { content_type };
    }

    let charset = header_charset(&content_type);

    match response.bytes().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body: body.to_vec(),
            charset,
        },
        Err(e) => classify_error(e),
    }
}

/// Maps a transport error onto the fetch failure kinds
pub fn classify_error(error: reqwest::Error) -> FetchResult {
    if is_dns_failure(&error) {
        FetchResult::UnresolvedHost { error }
    } else if error.is_connect() || error.is_timeout() {
        FetchResult::ConnectionFailure { error }
    } else if error.is_body() || error.is_decode() || error.is_redirect() {
        FetchResult::StreamFailure { error }
    } else {
        FetchResult::TransportFailure { error }
    }
}

/// Returns true if the Content-Type can be parsed as a document
///
/// A missing header is accepted; servers omit it surprisingly often.
pub fn is_markup_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    mime.is_empty() || mime.starts_with("text/") || mime.ends_with("xml")
}

/// Extracts the `charset` parameter of a Content-Type value
pub fn header_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Walks the error chain looking for a resolver failure
fn is_dns_failure(error: &reqwest::Error) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);

    while let Some(err) = current {
        let message = err.to_string().to_ascii_lowercase();
        if message.contains("dns error")
            || message.contains("failed to lookup address")
            || message.contains("name or service not known")
            || message.contains("no such host")
        {
            return true;
        }
        current = err.source();
    }

    false
}
