//! Page-Mirror: a single-page web mirroring tool
//!
//! This crate fetches one web page, downloads every image it references,
//! rewrites the image references to point at the local copies and saves the
//! result to a per-host folder on disk.

pub mod config;
pub mod mirror;
pub mod naming;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Page-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("No URL given")]
    InvalidInput,

    #[error("Malformed URL: {0}")]
    MalformedUrl(UrlError),

    #[error("Unable to resolve host for {url} (are you connected to the Internet?): {source}")]
    UnresolvedHost { url: String, source: reqwest::Error },

    #[error("Connection to {url} failed: {source}")]
    ConnectionFailure { url: String, source: reqwest::Error },

    #[error("Protocol or stream failure while downloading {url} (a firewall may be interfering): {source}")]
    ProtocolStreamFailure { url: String, source: reqwest::Error },

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("{url} responded with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("{url} is not an HTML page (Content-Type: {content_type})")]
    UnsupportedContent { url: String, content_type: String },

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to fetch image {url}: {source}")]
    ImageFetch { url: String, source: ImageFetchError },

    #[error("Counter file {} holds no valid number ({reason}); falling back to 1", path.display())]
    CounterCorruption { path: PathBuf, reason: String },

    #[error("Invalid stage transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::MirrorStage,
        to: state::MirrorStage,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),
}

impl MirrorError {
    /// Wraps an IO error together with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error ends the whole mirror operation
    ///
    /// Image and counter failures are recovered where they happen; everything
    /// else is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ImageFetch { .. } | Self::CounterCorruption { .. })
    }
}

impl From<UrlError> for MirrorError {
    fn from(err: UrlError) -> Self {
        match err {
            UrlError::Missing => Self::InvalidInput,
            other => Self::MalformedUrl(other),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("No URL given")]
    Missing,

    #[error("{url} could not be parsed: {reason}")]
    Parse { url: String, reason: String },

    #[error("{url} uses scheme '{scheme}', only http and https are supported")]
    InvalidScheme { url: String, scheme: String },

    #[error("{url} has no valid host")]
    InvalidHost { url: String },
}

/// Causes behind a failed image download
///
/// These never abort a mirror operation; the image reference is simply left
/// untouched.
#[derive(Debug, Error)]
pub enum ImageFetchError {
    #[error("not a valid http(s) URL")]
    MalformedUrl,

    #[error("no usable file name can be derived from the URL")]
    UnnamedResource,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with HTTP {0}")]
    HttpStatus(u16),

    #[error("failed writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias for Page-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use crate::config::Config;
pub use crate::mirror::{run_mirror, MirrorReport, PageMirror};
pub use crate::naming::{CounterStore, FileCounterStore, MemoryCounterStore, NameCounter};
pub use crate::state::MirrorStage;
pub use crate::url::{normalize_input, MirrorRequest};
