//! URL handling for listing and article links
//!
//! Links on listing and headline pages are often relative; they are resolved
//! against the page they appear on (or the configured base URL). Article URLs
//! are the natural key of every stored record, so they are canonicalized
//! before use: fragments and tracking parameters never make two keys differ.

use crate::{UrlError, UrlResult};
use url::Url;

/// Query parameters that only carry tracking information
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source"];

/// Resolves an `href` against `base` into an absolute http(s) URL
///
/// # Examples
///
/// ```
/// use newsharvest::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://news.example.jp/topics/top-picks").unwrap();
/// let next = resolve_link("/topics/top-picks?page=2", &base).unwrap();
/// assert_eq!(next.as_str(), "https://news.example.jp/topics/top-picks?page=2");
/// ```
pub fn resolve_link(href: &str, base: &Url) -> UrlResult<Url> {
    let href = href.trim();
    let unresolvable = || UrlError::Unresolvable {
        href: href.to_string(),
        base: base.to_string(),
    };

    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
    {
        return Err(unresolvable());
    }

    let absolute = base.join(href).map_err(|_| unresolvable())?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return Err(UrlError::InvalidScheme(absolute.scheme().to_string()));
    }

    Ok(absolute)
}

/// Canonical form of an article URL, used as the natural key
///
/// Removes the fragment and tracking query parameters; everything else,
/// including parameter order, is kept as the site published it.
pub fn canonical_article_url(url_str: &str) -> UrlResult<String> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url.to_string())
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
