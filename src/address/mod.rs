//! Deterministic content addressing
//!
//! Identifiers are name-based UUIDs (RFC 4122 version 3, MD5). A session's
//! namespace is derived from its domain under the DNS namespace, and every page
//! id is derived from that namespace and the page URL. Both are part of the
//! on-disk format: page ids name the files under `html/` and join audit rows to
//! stored content, so changing the algorithm orphans existing sessions.

use uuid::Uuid;

/// Derives the namespace identifier for a domain
///
/// Pure function of `domain`: the same domain yields the same namespace on
/// every host and in every process.
///
/// # Examples
///
/// ```
/// use crawl_session::address::namespace_for;
///
/// assert_eq!(
///     namespace_for("python.org").to_string(),
///     "6fa459ea-ee8a-3ca4-894e-db77e160355e"
/// );
/// ```
pub fn namespace_for(domain: &str) -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_DNS, domain.as_bytes())
}

/// Derives the page identifier for a URL within a namespace
///
/// Re-fetching the same URL in the same session yields the same id, so stored
/// content is overwritten rather than duplicated.
pub fn page_id_for(namespace: &Uuid, url: &str) -> Uuid {
    Uuid::new_v3(namespace, url.as_bytes())
}

/// Renders an identifier as 32 lowercase hex digits without hyphens
pub fn to_hex(id: &Uuid) -> String {
    id.simple().to_string()
}
