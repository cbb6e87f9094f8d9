use url::{Host, Url};

/// Longest DNS label allowed
const MAX_LABEL_LEN: usize = 63;

/// Extracts the host from a URL
///
/// The host becomes the name of the per-site folder, so it is returned in
/// lowercase and without the port.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use page_mirror::url::extract_host;
///
/// let url = Url::parse("https://Example.COM:8443/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// Returns true if the host is an IP address or a well-formed DNS name
///
/// Every label of a DNS name must be 1-63 ASCII letters, digits or hyphens
/// and must not start or end with a hyphen.
pub fn is_valid_host(host: &Host<&str>) -> bool {
    match host {
        Host::Ipv4(_) | Host::Ipv6(_) => true,
        Host::Domain(domain) => {
            let domain = domain.strip_suffix('.').unwrap_or(domain);
            !domain.is_empty() && domain.split('.').all(is_valid_label)
        }
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
