//! Mirror module for Page-Mirror
//!
//! This module contains the mirroring pipeline:
//! - Page fetching and failure classification
//! - HTML parsing, image listing and reference rewriting
//! - Bounded-concurrency image downloads
//! - Coordination of one mirror operation from URL to saved page

mod coordinator;
mod document;
mod downloader;
mod fetcher;

pub use coordinator::{run_mirror, MirrorReport, PageMirror};
pub use document::{trim_excerpt, Document, ImageElement};
pub use downloader::ImageDownloader;
pub use fetcher::{
    build_http_client, classify_error, fetch_page, header_charset, is_markup_content_type,
    FetchResult,
};
