use crate::UrlError;
use url::Url;

/// Parses a site entry from a dataset into a canonical URL
///
/// Dataset rows usually carry full URLs, but bare hosts such as
/// `example.com` show up too; those are read as `https://`.
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Prefix `https://` when no scheme is present
/// 3. Parse the URL; reject if malformed
/// 4. Reject anything other than HTTP or HTTPS
/// 5. Require a host
///
/// # Examples
///
/// ```
/// use deco_sweep::url::canonical_url;
///
/// let url = canonical_url("  Example.COM/news ").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/news");
/// ```
pub fn canonical_url(site: &str) -> Result<Url, UrlError> {
    let trimmed = site.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty site".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}
