use crate::{UrlError, UrlResult};
use url::Url;

/// Resolves the canonical domain of a URL
///
/// The host is lowercased, a leading `www.` label is stripped and the leading
/// run of domain characters (word characters, dots and hyphens) is returned.
///
/// # Arguments
///
/// * `url` - The URL to resolve
///
/// # Returns
///
/// * `Ok(String)` - The canonical domain
/// * `Err(UrlError)` - The URL could not be parsed or has no usable host
///
/// # Examples
///
/// ```
/// use crawl_session::url::resolve_domain;
///
/// assert_eq!(resolve_domain("https://www.example.com/a").unwrap(), "example.com");
/// assert_eq!(
///     resolve_domain("https://www.sub.example.co.uk/x").unwrap(),
///     "sub.example.co.uk"
/// );
/// assert!(resolve_domain("not a url").is_err());
/// ```
pub fn resolve_domain(url: &str) -> UrlResult<String> {
    let host = host_of(url)?;
    let domain: String = strip_www(&host)
        .chars()
        .take_while(|c| is_domain_char(*c))
        .collect();

    if domain.is_empty() {
        return Err(UrlError::MissingHost(url.to_string()));
    }

    Ok(domain)
}

/// Derives a short human-readable label from a URL's host
///
/// Returns the leading word-character run of the host after `www.` stripping.
/// When the host does not start with a word character, the whole host is
/// returned with every non-word character removed. An unparseable URL is
/// sanitized the same way, so this never fails.
///
/// # Examples
///
/// ```
/// use crawl_session::url::slugify;
///
/// assert_eq!(slugify("https://www.example.com/"), "example");
/// assert_eq!(slugify("https://docs.rs/url"), "docs");
/// ```
pub fn slugify(url: &str) -> String {
    let host = host_of(url).unwrap_or_else(|_| url.to_string());

    let slug: String = strip_www(&host)
        .chars()
        .take_while(|c| is_word_char(*c))
        .collect();

    if slug.is_empty() {
        host.chars().filter(|c| is_word_char(*c)).collect()
    } else {
        slug
    }
}

fn host_of(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url).map_err(|source| UrlError::Parse {
        url: url.to_string(),
        source,
    })?;

    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
        .ok_or_else(|| UrlError::MissingHost(url.to_string()))
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_domain_char(c: char) -> bool {
    is_word_char(c) || c == '.' || c == '-'
}
