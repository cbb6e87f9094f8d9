//! File and folder naming rules
//!
//! Pages land in `<root>/<host>/`, images in `<root>/<host>/img/`. Names taken
//! from URLs are stripped of characters that are unsafe on common
//! filesystems.

use crate::url::extract_host;
use crate::{MirrorError, UrlError};
use std::path::{Path, PathBuf};
use url::Url;

/// Characters never allowed in a file name
pub const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '<', '>', '|'];

/// Returns true if the name is non-empty and free of forbidden characters
pub fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(FORBIDDEN_CHARS)
}

/// Strips every forbidden character from a candidate file name
///
/// # Examples
///
/// ```
/// use page_mirror::naming::sanitize;
///
/// assert_eq!(sanitize("bad:name*.png"), "badname.png");
/// assert_eq!(sanitize("photo.jpg"), "photo.jpg");
/// ```
pub fn sanitize(name: &str) -> String {
    name.chars().filter(|c| !FORBIDDEN_CHARS.contains(c)).collect()
}

/// Derives the file name a page is saved under
///
/// The last segment of the URL path is used when it carries an extension
/// (contains a `.` after sanitizing). Otherwise - empty path, path ending in
/// `/`, or a segment without extension - `next_id` is called once and the
/// page is named `<n>.html`.
///
/// # Arguments
///
/// * `url` - The page URL
/// * `next_id` - Source of fallback numbers; only called when needed
pub fn file_name_for(url: &Url, next_id: impl FnOnce() -> u64) -> String {
    let path = url.path().replace('\\', "/");

    if !path.is_empty() && !path.ends_with('/') {
        let segment = path.rsplit('/').next().unwrap_or("");
        let name = sanitize(segment);
        if name.contains('.') {
            return name;
        }
    }

    format!("{}.html", next_id())
}

/// Derives the local file name of an image from its absolute URL
///
/// Takes everything after the last `/` (backslashes count as slashes) and
/// sanitizes it. The result is empty when the URL ends with a separator.
///
/// # Examples
///
/// ```
/// use page_mirror::naming::image_file_name;
///
/// assert_eq!(image_file_name("http://example.com/img/logo.png"), "logo.png");
/// assert_eq!(image_file_name("http://example.com/pic.png?v=2"), "pic.pngv=2");
/// ```
pub fn image_file_name(absolute_url: &str) -> String {
    let normalized = absolute_url.replace('\\', "/");
    let raw = normalized.rsplit('/').next().unwrap_or("");

    if is_valid_file_name(raw) {
        return raw.to_string();
    }

    let name = sanitize(raw);
    if name != raw {
        tracing::debug!("file {} was renamed to {}", raw, name);
    }
    name
}

/// Creates a folder (and any missing parents) if absent
pub fn ensure_folder(path: &Path) -> Result<(), MirrorError> {
    std::fs::create_dir_all(path).map_err(|e| MirrorError::io(path, e))
}

/// Returns the per-host folder for a URL, creating it if absent
///
/// The storage root is created first when needed. Creating folders that
/// already exist is not an error.
pub fn host_folder(root: &Path, url: &Url) -> Result<PathBuf, MirrorError> {
    let host = extract_host(url).ok_or_else(|| {
        MirrorError::MalformedUrl(UrlError::InvalidHost {
            url: url.to_string(),
        })
    })?;

    ensure_folder(root)?;
    let folder = root.join(host);
    ensure_folder(&folder)?;
    Ok(folder)
}
