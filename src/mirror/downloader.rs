//! Image downloader
//!
//! Every image is fetched and written on its own: a failure is reported and
//! turns into "no replacement" for that image only, never into an error for
//! the mirror as a whole.

use crate::naming::{image_file_name, MirrorTarget};
use crate::{ImageFetchError, MirrorError};
use reqwest::{Client, Response};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Downloads images into the image folder of a mirror target
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: Client,
    target: MirrorTarget,
}

impl ImageDownloader {
    pub fn new(client: Client, target: MirrorTarget) -> Self {
        Self { client, target }
    }

    /// Downloads one image
    ///
    /// # Arguments
    ///
    /// * `absolute_url` - Absolute http(s) URL of the image
    ///
    /// # Returns
    ///
    /// * `Some(String)` - Reference to write into the page (`img/<name>`)
    /// * `None` - The download failed; the failure has been reported and the
    ///   page should keep its original reference
    pub async fn download(&self, absolute_url: &str) -> Option<String> {
        match self.try_download(absolute_url).await {
            Ok(reference) => {
                tracing::debug!("Saved {} as {}", absolute_url, reference);
                Some(reference)
            }
            Err(source) => {
                tracing::warn!(
                    "{}",
                    MirrorError::ImageFetch {
                        url: absolute_url.to_string(),
                        source,
                    }
                );
                None
            }
        }
    }

    /// Downloads a batch of images with bounded concurrency
    ///
    /// The returned vector is aligned with `sources`. A URL appearing more
    /// than once is fetched once. Distinct URLs that map to the same local
    /// file name are fetched one after another in input order, so the file
    /// ends up as a sequential run would leave it. A panicking download only
    /// loses its own results.
    ///
    /// # Arguments
    ///
    /// * `sources` - Image URLs in document order
    /// * `max_concurrent` - Upper bound on simultaneous downloads (at least 1)
    pub async fn download_all(&self, sources: &[String], max_concurrent: usize) -> Vec<Option<String>> {
        let mut results: Vec<Option<String>> = vec![None; sources.len()];

        // Group by local file name so no two tasks ever write the same file
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, source) in sources.iter().enumerate() {
            groups
                .entry(image_file_name(source))
                .or_default()
                .push(index);
        }

        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let mut tasks = JoinSet::new();

        for indices in groups.into_values() {
            let jobs: Vec<(usize, String)> = indices
                .into_iter()
                .map(|index| (index, sources[index].clone()))
                .collect();
            let downloader = self.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let mut done: HashMap<String, Option<String>> = HashMap::new();
                let mut outcomes = Vec::with_capacity(jobs.len());

                for (index, url) in jobs {
                    let outcome = match done.get(&url) {
                        Some(previous) => previous.clone(),
                        None => {
                            let outcome = downloader.download(&url).await;
                            done.insert(url, outcome.clone());
                            outcome
                        }
                    };
                    outcomes.push((index, outcome));
                }

                outcomes
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcomes) => {
                    for (index, outcome) in outcomes {
                        results[index] = outcome;
                    }
                }
                Err(e) => tracing::error!("Image download task aborted: {}", e),
            }
        }

        results
    }

    async fn try_download(&self, absolute_url: &str) -> Result<String, ImageFetchError> {
        let url = Url::parse(absolute_url).map_err(|_| ImageFetchError::MalformedUrl)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ImageFetchError::MalformedUrl);
        }

        let name = image_file_name(absolute_url);
        if name.is_empty() {
            return Err(ImageFetchError::UnnamedResource);
        }

        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageFetchError::HttpStatus(status.as_u16()));
        }

        // Written to `<name>.part`, renamed into place once complete
        let path = self.target.image_folder().join(&name);
        let partial = self.target.image_folder().join(format!("{}.part", name));
        let mut file = File::create(&partial)
            .await
            .map_err(|source| write_error(&partial, source))?;

        if let Err(e) = stream_to_file(&mut response, &mut file, &partial).await {
            drop(file);
            remove_partial(&partial).await;
            return Err(e);
        }
        drop(file);

        if let Err(source) = tokio::fs::rename(&partial, &path).await {
            remove_partial(&partial).await;
            return Err(write_error(&path, source));
        }

        Ok(self.target.image_reference(&name))
    }
}

/// Copies the response body to the file chunk by chunk
async fn stream_to_file(
    response: &mut Response,
    file: &mut File,
    path: &Path,
) -> Result<u64, ImageFetchError> {
    let mut written: u64 = 0;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|source| write_error(path, source))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|source| write_error(path, source))?;
    Ok(written)
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::debug!("Could not remove partial file {}: {}", path.display(), e);
    }
}

fn write_error(path: &Path, source: std::io::Error) -> ImageFetchError {
    ImageFetchError::Write {
        path: PathBuf::from(path),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::mirror::build_http_client;
    use tempfile::TempDir;

    fn downloader(dir: &TempDir) -> ImageDownloader {
        let url = Url::parse("http://example.com/").unwrap();
        let target = MirrorTarget::prepare(dir.path(), &url, "img").unwrap();
        let client = build_http_client(&HttpConfig::default()).unwrap();
        ImageDownloader::new(client, target)
    }

    #[tokio::test]
    async fn test_relative_source_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = downloader(&dir).try_download("/img/logo.png").await;
        assert!(matches!(result, Err(ImageFetchError::MalformedUrl)));
    }

    #[tokio::test]
    async fn test_data_uri_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = downloader(&dir)
            .try_download("data:image/png;base64,AAAA")
            .await;
        assert!(matches!(result, Err(ImageFetchError::MalformedUrl)));
    }

    #[tokio::test]
    async fn test_unnamed_resource_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = downloader(&dir)
            .try_download("http://example.com/images/")
            .await;
        assert!(matches!(result, Err(ImageFetchError::UnnamedResource)));
    }

    #[tokio::test]
    async fn test_failure_means_no_replacement() {
        let dir = TempDir::new().unwrap();
        assert_eq!(downloader(&dir).download("not a url").await, None);
    }

    #[tokio::test]
    async fn test_batch_keeps_alignment_on_failures() {
        let dir = TempDir::new().unwrap();
        let sources = vec![
            "relative.png".to_string(),
            "data:image/gif;base64,R0lGOD".to_string(),
            "http://example.com/dir/".to_string(),
        ];
        let results = downloader(&dir).download_all(&sources, 2).await;
        assert_eq!(results, vec![None, None, None]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dir = TempDir::new().unwrap();
        let results = downloader(&dir).download_all(&[], 4).await;
        assert!(results.is_empty());
    }

    // Successful downloads are exercised against a mock server in the
    // integration tests
}
