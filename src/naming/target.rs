use crate::naming::counter::NameCounter;
use crate::naming::namer::{ensure_folder, file_name_for, host_folder};
use crate::MirrorError;
use std::path::{Path, PathBuf};
use url::Url;

/// Resolved destination of one mirror operation
#[derive(Debug, Clone)]
pub struct MirrorTarget {
    host_folder: PathBuf,
    image_folder: PathBuf,
    image_folder_name: String,
}

impl MirrorTarget {
    /// Creates the host folder and its image sub-folder
    ///
    /// Both folders may already exist.
    ///
    /// # Arguments
    ///
    /// * `root` - The storage root
    /// * `url` - The page URL; its host names the folder
    /// * `image_folder_name` - Name of the image sub-folder (normally `img`)
    pub fn prepare(root: &Path, url: &Url, image_folder_name: &str) -> Result<Self, MirrorError> {
        let host_folder = host_folder(root, url)?;
        let image_folder = host_folder.join(image_folder_name);
        ensure_folder(&image_folder)?;

        Ok(Self {
            host_folder,
            image_folder,
            image_folder_name: image_folder_name.to_string(),
        })
    }

    pub fn host_folder(&self) -> &Path {
        &self.host_folder
    }

    pub fn image_folder(&self) -> &Path {
        &self.image_folder
    }

    /// Reference written into the page for a saved image
    ///
    /// Always uses `/` as separator, whatever the platform.
    pub fn image_reference(&self, file_name: &str) -> String {
        format!("{}/{}", self.image_folder_name, file_name)
    }

    /// Decides the page file name, drawing on the counter if needed
    ///
    /// Every call that falls back to a numbered name consumes a counter
    /// value, so resolve the name once per mirror operation.
    pub fn page_file_name(&self, url: &Url, counter: &mut NameCounter) -> String {
        file_name_for(url, || counter.next_value())
    }

    /// Full path of a page saved under `file_name`
    pub fn page_path(&self, file_name: &str) -> PathBuf {
        self.host_folder.join(file_name)
    }
}
