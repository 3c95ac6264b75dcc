//! URL canonicalization utilities.
//!
//! Every URL handed to a browsing context is pinned to one locale, and every
//! URL discovered on a page is normalized before it reaches the link registry
//! so that `?id=3`, `?id=3&lang=ru` and `?id=3#section` dedupe to one entry.

use anyhow::Result;
use url::Url;

/// Check if a URL is valid
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Drop every query pair named `name`, clearing the query when nothing is left
fn remove_query_param(url: &mut Url, name: &str) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

/// Force `name=value` onto a URL, replacing any existing value
///
/// Used right before a context is created so the LMS always renders in the
/// same locale.
///
/// # Examples
///
/// ```
/// use lms_autoscan::utils::canonicalize_url;
///
/// let url = canonicalize_url("https://lms.example/course/view.php?id=7&lang=en", "lang", "ru").unwrap();
/// assert_eq!(url, "https://lms.example/course/view.php?id=7&lang=ru");
/// ```
pub fn canonicalize_url(url: &str, name: &str, value: &str) -> Result<String> {
    let mut parsed = Url::parse(url)
        .map_err(|e| anyhow::anyhow!("Failed to parse URL for canonicalization: {e}"))?;
    parsed.set_fragment(None);
    remove_query_param(&mut parsed, name);
    parsed.query_pairs_mut().append_pair(name, value);
    Ok(parsed.to_string())
}

/// Resolve an anchor `href` against the page it was found on
///
/// Returns `None` for non-http targets. The fragment and the locale
/// parameter are stripped since neither identifies a different resource.
#[must_use]
pub fn normalize_discovered_url(base: &Url, href: &str, locale_param: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    remove_query_param(&mut resolved, locale_param);
    Some(resolved.to_string())
}

/// Whether `url` lives on the same host (and port) as `site`
#[must_use]
pub fn is_same_site(url: &str, site: &Url) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            parsed.host_str().is_some()
                && parsed.host_str() == site.host_str()
                && parsed.port_or_known_default() == site.port_or_known_default()
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_appends_locale() {
        let url = canonicalize_url("https://lms.example/mod/quiz/view.php?id=12", "lang", "ru")
            .expect("valid url");
        assert_eq!(url, "https://lms.example/mod/quiz/view.php?id=12&lang=ru");
    }

    #[test]
    fn canonicalize_replaces_existing_locale_and_drops_fragment() {
        let url = canonicalize_url(
            "https://lms.example/mod/quiz/review.php?lang=en&attempt=5#q3",
            "lang",
            "ru",
        )
        .expect("valid url");
        assert_eq!(url, "https://lms.example/mod/quiz/review.php?attempt=5&lang=ru");
    }

    #[test]
    fn canonicalize_rejects_garbage() {
        assert!(canonicalize_url("not a url", "lang", "ru").is_err());
    }

    #[test]
    fn normalize_resolves_relative_links() {
        let base = Url::parse("https://lms.example/my/").expect("valid base");
        assert_eq!(
            normalize_discovered_url(&base, "/course/view.php?id=4&lang=ru#top", "lang"),
            Some("https://lms.example/course/view.php?id=4".to_string())
        );
        assert_eq!(normalize_discovered_url(&base, "#main", "lang"), None);
        assert_eq!(normalize_discovered_url(&base, "javascript:void(0)", "lang"), None);
    }

    #[test]
    fn same_site_compares_host_and_port() {
        let site = Url::parse("https://lms.example").expect("valid site");
        assert!(is_same_site("https://lms.example/my/", &site));
        assert!(!is_same_site("https://other.example/my/", &site));
        assert!(!is_same_site("https://lms.example:8443/my/", &site));
    }
}
