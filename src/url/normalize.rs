use crate::url::domain::is_valid_host;
use crate::{UrlError, UrlResult};
use url::Url;

/// Schemes a mirror request may use
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Scheme prefixed to input that does not name one
const DEFAULT_SCHEME_PREFIX: &str = "http://";

/// A validated request to mirror one page
///
/// Holds the normalized URL string exactly as it will be reported, plus its
/// parsed form. Constructed once through [`MirrorRequest::parse`] and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRequest {
    normalized: String,
    url: Url,
}

impl MirrorRequest {
    /// Normalizes and validates raw input into a request
    ///
    /// # Examples
    ///
    /// ```
    /// use page_mirror::url::MirrorRequest;
    ///
    /// let request = MirrorRequest::parse("example.com/docs/").unwrap();
    /// assert_eq!(request.as_str(), "http://example.com/docs/");
    /// assert_eq!(request.url().host_str(), Some("example.com"));
    /// ```
    pub fn parse(raw: &str) -> UrlResult<Self> {
        let normalized = normalize_input(raw)?;
        let url = parse_http_url(&normalized)?;
        Ok(Self { normalized, url })
    }

    /// The normalized URL string
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// The parsed URL
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Normalizes raw input into an absolute http(s) URL string
///
/// # Normalization Steps
///
/// 1. Reject empty (or whitespace-only) input
/// 2. Prefix `http://` when the input carries no `scheme://` marker
/// 3. Parse the result; reject if malformed
/// 4. Reject schemes other than http and https
/// 5. Reject URLs without a syntactically valid host
///
/// # Arguments
///
/// * `raw` - The user-supplied URL or bare hostname
///
/// # Returns
///
/// * `Ok(String)` - The normalized URL
/// * `Err(UrlError)` - `Missing` for empty input, any other variant for a malformed URL
///
/// # Examples
///
/// ```
/// use page_mirror::url::normalize_input;
///
/// assert_eq!(normalize_input("example.com").unwrap(), "http://example.com");
/// assert_eq!(
///     normalize_input("https://example.com/a").unwrap(),
///     "https://example.com/a"
/// );
/// assert!(normalize_input("ftp://example.com").is_err());
/// ```
pub fn normalize_input(raw: &str) -> UrlResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Missing);
    }

    let candidate = if has_scheme_marker(trimmed) {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME_PREFIX, trimmed)
    };

    parse_http_url(&candidate)?;
    Ok(candidate)
}

/// Returns true if the input starts with `<scheme>://`
///
/// A scheme is an ASCII letter followed by letters, digits, `+`, `-` or `.`.
pub fn has_scheme_marker(input: &str) -> bool {
    let Some((scheme, _)) = input.split_once("://") else {
        return false;
    };

    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'),
        _ => false,
    }
}

/// Parses a URL and checks it against the http(s)-only syntax rules
fn parse_http_url(candidate: &str) -> UrlResult<Url> {
    let url = Url::parse(candidate).map_err(|e| UrlError::Parse {
        url: candidate.to_string(),
        reason: e.to_string(),
    })?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(UrlError::InvalidScheme {
            url: candidate.to_string(),
            scheme: url.scheme().to_string(),
        });
    }

    match url.host() {
        Some(host) if is_valid_host(&host) => Ok(url),
        _ => Err(UrlError::InvalidHost {
            url: candidate.to_string(),
        }),
    }
}
