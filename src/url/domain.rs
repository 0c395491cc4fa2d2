use crate::UrlError;
use url::{Host, Url};

/// Extracts the registrable domain from a URL
///
/// The registrable domain is the public suffix plus one label, so
/// `news.bbc.co.uk` becomes `bbc.co.uk`. It names the per-site working
/// directory and is the substring the crawl tool puts in its output file
/// names. IP addresses and hosts without a known suffix (`localhost`) are
/// returned as-is.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use deco_sweep::url::registrable_domain;
///
/// let url = Url::parse("https://www.example.co.uk/path").unwrap();
/// assert_eq!(registrable_domain(&url).unwrap(), "example.co.uk");
/// ```
pub fn registrable_domain(url: &Url) -> Result<String, UrlError> {
    let host = url.host().ok_or(UrlError::MissingDomain)?;

    match host {
        Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_lowercase();
            if name.is_empty() {
                return Err(UrlError::MissingDomain);
            }
            Ok(psl::domain_str(&name)
                .map(str::to_string)
                .unwrap_or(name))
        }
        Host::Ipv4(addr) => Ok(addr.to_string()),
        Host::Ipv6(addr) => Ok(addr.to_string()),
    }
}
