use crate::{UrlError, UrlResult};
use url::Url;

/// Computes the domain key used for fairness and throttling
///
/// The key is the URL's origin authority: scheme, lowercase host and any
/// explicit non-default port, e.g. `https://example.com` or
/// `http://localhost:8080`. URLs sharing a key share a queue and a throttle.
///
/// # Arguments
///
/// * `url` - The absolute URL to partition
///
/// # Returns
///
/// * `Ok(String)` - The domain key
/// * `Err(UrlError)` - The URL could not be parsed or has no host
///
/// # Examples
///
/// ```
/// use ripple_crawl::url::domain_key;
///
/// assert_eq!(domain_key("https://Example.com/a?b=1").unwrap(), "https://example.com");
/// assert_eq!(domain_key("http://localhost:8080/x").unwrap(), "http://localhost:8080");
/// ```
pub fn domain_key(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;
    domain_key_of(&parsed)
}

/// Same as [`domain_key`] for an already parsed URL
pub fn domain_key_of(url: &Url) -> UrlResult<String> {
    let host = url
        .host_str()
        .ok_or_else(|| UrlError::MissingHost(url.to_string()))?
        .to_lowercase();

    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Extracts the lowercase host of a URL
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
