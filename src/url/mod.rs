//! URL handling module for Deco-Sweep
//!
//! Site entries are canonicalized into [`url::Url`] values and reduced to
//! their registrable domain, which keys each site's working directory.

mod domain;
mod normalize;

pub use domain::registrable_domain;
pub use normalize::canonical_url;

use crate::UrlError;

/// Canonicalizes a site entry and derives its registrable domain in one step
///
/// # Examples
///
/// ```
/// use deco_sweep::url::site_identity;
///
/// let (url, domain) = site_identity("https://news.example.org/today").unwrap();
/// assert_eq!(url.host_str(), Some("news.example.org"));
/// assert_eq!(domain, "example.org");
/// ```
pub fn site_identity(site: &str) -> Result<(::url::Url, String), UrlError> {
    let url = canonical_url(site)?;
    let domain = registrable_domain(&url)?;
    Ok((url, domain))
}
