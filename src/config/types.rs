use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Page-Mirror
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub http: HttpConfig,
    pub images: ImageConfig,
}

/// Where mirrored sites and the naming counter live on disk
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root folder holding one sub-folder per mirrored host
    pub root: PathBuf,

    /// Name of the fallback-name counter file inside the root
    #[serde(rename = "counter-file")]
    pub counter_file: String,

    /// Name of the image sub-folder inside each host folder
    #[serde(rename = "image-folder")]
    pub image_folder: String,
}

impl StorageConfig {
    /// Full path of the counter state file
    pub fn counter_path(&self) -> PathBuf {
        self.root.join(&self.counter_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("wget_downloads"),
            counter_file: "last_site_ID".to_string(),
            image_folder: "img".to_string(),
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Maximum number of redirects followed per request
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("page-mirror/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 10,
        }
    }
}

/// Image download configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Upper bound on image downloads running at the same time
    #[serde(rename = "max-concurrent-downloads")]
    pub max_concurrent_downloads: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 4,
        }
    }
}
