//! Mirror coordinator - page mirroring orchestration
//!
//! This module drives one mirror operation through its stages:
//! - Validating the requested URL
//! - Fetching and parsing the page
//! - Preparing the host and image folders
//! - Listing, downloading and rewriting images
//! - Writing the rewritten page to disk

use crate::config::Config;
use crate::mirror::document::Document;
use crate::mirror::downloader::ImageDownloader;
use crate::mirror::fetcher::{build_http_client, fetch_page, FetchResult};
use crate::naming::{MirrorTarget, NameCounter};
use crate::state::MirrorStage;
use crate::url::MirrorRequest;
use crate::{MirrorError, Result};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Instant;

/// Summary of a finished mirror operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorReport {
    /// The normalized URL that was mirrored
    pub url: String,
    /// Folder holding the page and its image folder
    pub host_folder: PathBuf,
    /// Name the page was saved under
    pub page_file_name: String,
    /// Full path of the saved page
    pub page_path: PathBuf,
    /// Number of `<img src>` elements found
    pub images_found: usize,
    /// Images downloaded and rewritten to local references
    pub images_saved: usize,
    /// Images left pointing at their original source
    pub images_failed: usize,
}

/// Mirrors single pages to disk
pub struct PageMirror {
    config: Config,
    client: Client,
    counter: NameCounter,
    stage: MirrorStage,
}

impl PageMirror {
    /// Creates a mirror using the counter file under the storage root
    ///
    /// # Arguments
    ///
    /// * `config` - The mirror configuration
    ///
    /// # Returns
    ///
    /// * `Ok(PageMirror)` - Ready to mirror pages
    /// * `Err(MirrorError)` - The HTTP client could not be built
    pub fn new(config: Config) -> Result<Self> {
        let counter = NameCounter::file(config.storage.counter_path());
        Self::with_counter(config, counter)
    }

    /// Creates a mirror with an explicit name counter
    pub fn with_counter(config: Config, counter: NameCounter) -> Result<Self> {
        let client = build_http_client(&config.http).map_err(MirrorError::Client)?;

        Ok(Self {
            config,
            client,
            counter,
            stage: MirrorStage::Validating,
        })
    }

    /// The stage the most recent (or current) mirror operation reached
    pub fn stage(&self) -> MirrorStage {
        self.stage
    }

    /// Mirrors one page
    ///
    /// Fatal failures (bad URL, unreachable page, unwritable folders or
    /// output) end the operation with an error and leave the mirror in the
    /// `Failed` stage. Images that cannot be downloaded are reported and keep
    /// their original reference.
    ///
    /// # Arguments
    ///
    /// * `raw_url` - URL or bare host name as given by the user
    pub async fn mirror(&mut self, raw_url: &str) -> Result<MirrorReport> {
        self.stage = MirrorStage::Validating;
        let start_time = Instant::now();

        match self.run_stages(raw_url).await {
            Ok(report) => {
                tracing::debug!("Mirror of {} finished in {:?}", report.url, start_time.elapsed());
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Mirror failed while {}: {}", self.stage, e);
                self.stage = MirrorStage::Failed;
                Err(e)
            }
        }
    }

    async fn run_stages(&mut self, raw_url: &str) -> Result<MirrorReport> {
        // Validating
        let request = MirrorRequest::parse(raw_url)?;
        tracing::debug!("{} is a valid URL", request.as_str());

        // Fetching
        self.advance(MirrorStage::Fetching)?;
        let mut document = self.fetch_document(&request).await?;

        // Preparing folders
        self.advance(MirrorStage::PreparingFolders)?;
        let target = MirrorTarget::prepare(
            &self.config.storage.root,
            request.url(),
            &self.config.storage.image_folder,
        )?;

        // Extracting images
        self.advance(MirrorStage::ExtractingImages)?;
        let images = document.images();
        tracing::debug!("Found {} images on {}", images.len(), request.as_str());
        for image in &images {
            tracing::info!(
                " * img: <{}> {}x{} ({})",
                image.download_source(),
                image.width,
                image.height,
                image.alt_excerpt()
            );
        }

        // Downloading images
        self.advance(MirrorStage::DownloadingImages)?;
        let sources: Vec<String> = images.iter().map(|i| i.download_source()).collect();
        let downloader = ImageDownloader::new(self.client.clone(), target.clone());
        let replacements = downloader
            .download_all(&sources, self.config.images.max_concurrent_downloads)
            .await;

        // Rewriting markup
        self.advance(MirrorStage::RewritingMarkup)?;
        let mut images_saved = 0;
        for (image, replacement) in images.iter().zip(replacements) {
            if let Some(local) = replacement {
                document.set_image_source(image, &local);
                images_saved += 1;
            }
        }

        // Writing output
        self.advance(MirrorStage::WritingOutput)?;
        let page_file_name = target.page_file_name(request.url(), &mut self.counter);
        let page_path = target.page_path(&page_file_name);

        tracing::debug!(
            "Saving html response from {} to {}",
            request.as_str(),
            page_path.display()
        );
        let html = document
            .to_html()
            .map_err(|e| MirrorError::io(&page_path, e))?;
        tokio::fs::write(&page_path, html)
            .await
            .map_err(|e| MirrorError::io(&page_path, e))?;

        tracing::info!(
            "{} is saved to folder {}",
            page_file_name,
            target.host_folder().display()
        );

        self.advance(MirrorStage::Done)?;

        Ok(MirrorReport {
            url: request.as_str().to_string(),
            host_folder: target.host_folder().to_path_buf(),
            page_file_name,
            page_path,
            images_found: images.len(),
            images_saved,
            images_failed: images.len() - images_saved,
        })
    }

    /// Fetches and parses the page, mapping every failure kind to its error
    async fn fetch_document(&self, request: &MirrorRequest) -> Result<Document> {
        let url = request.as_str().to_string();
        tracing::debug!("Downloading html response from {}", url);

        let (final_url, body, charset) = match fetch_page(&self.client, request.url()).await {
            FetchResult::Success {
                final_url,
                status_code,
                body,
                charset,
            } => {
                tracing::debug!(
                    "html is downloaded from {} (HTTP {}, {} bytes)",
                    final_url,
                    status_code,
                    body.len()
                );
                (final_url, body, charset)
            }

            FetchResult::ContentMismatch { content_type } => {
                return Err(MirrorError::UnsupportedContent { url, content_type });
            }

            FetchResult::HttpError { status_code } => {
                return Err(MirrorError::HttpStatus {
                    url,
                    status: status_code,
                });
            }

            FetchResult::UnresolvedHost { error } => {
                return Err(MirrorError::UnresolvedHost { url, source: error });
            }

            FetchResult::ConnectionFailure { error } => {
                return Err(MirrorError::ConnectionFailure { url, source: error });
            }

            FetchResult::StreamFailure { error } => {
                return Err(MirrorError::ProtocolStreamFailure { url, source: error });
            }

            FetchResult::TransportFailure { error } => {
                return Err(MirrorError::Transport { url, source: error });
            }
        };

        Document::decode(&body, charset.as_deref(), &final_url).map_err(|e| MirrorError::HtmlParse {
            url,
            message: e.to_string(),
        })
    }

    /// Moves to the next stage, refusing illegal transitions
    fn advance(&mut self, to: MirrorStage) -> Result<()> {
        if !self.stage.can_transition_to(to) {
            return Err(MirrorError::InvalidTransition {
                from: self.stage,
                to,
            });
        }

        tracing::trace!("Stage {} -> {}", self.stage, to);
        self.stage = to;
        Ok(())
    }
}

/// Runs a complete mirror operation
///
/// # Arguments
///
/// * `config` - The mirror configuration
/// * `raw_url` - URL or bare host name to mirror
///
/// # Example
///
/// ```no_run
/// use page_mirror::config::Config;
/// use page_mirror::mirror::run_mirror;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_mirror(Config::default(), "example.com").await?;
/// println!("Saved {}", report.page_path.display());
/// # Ok(())
/// # }
/// ```
pub async fn run_mirror(config: Config, raw_url: &str) -> Result<MirrorReport> {
    let mut mirror = PageMirror::new(config)?;
    mirror.mirror(raw_url).await
}
