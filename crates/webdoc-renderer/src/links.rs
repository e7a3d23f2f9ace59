//! Relative URL computation between absolute publish URLs.

use url::{ParseError, Url};

/// Compute the URL of `target` relative to the document at `from`.
///
/// Both arguments are absolute URLs. When they differ in scheme or authority
/// the target is returned unchanged. Otherwise the common leading path
/// segments are dropped, one `../` is emitted per remaining directory of
/// `from`, and the rest of the target path is appended. The target's query
/// and fragment are kept.
///
/// # Examples
///
/// ```
/// use webdoc_renderer::relative_url;
///
/// assert_eq!(relative_url("http://a/x/y.html", "http://a/x/z.html"), "y.html");
/// assert_eq!(relative_url("http://a/p/y.html", "http://a/q/z.html"), "../p/y.html");
/// assert_eq!(relative_url("http://b/x.html", "http://a/x.html"), "http://b/x.html");
/// assert_eq!(relative_url("http://a/x.html#top", "http://a/x.html"), "#top");
/// ```
#[must_use]
pub fn relative_url(target: &str, from: &str) -> String {
    let (Ok(target_url), Ok(from_url)) = (Url::parse(target), Url::parse(from)) else {
        return target.to_owned();
    };

    if target_url.scheme() != from_url.scheme() || authority(&target_url) != authority(&from_url)
    {
        return target.to_owned();
    }

    let from_chunks = path_chunks(from_url.path());
    let target_chunks = path_chunks(target_url.path());

    let common = from_chunks
        .iter()
        .zip(&target_chunks)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = String::new();

    // The last chunk of `from` is the document itself, only its directories climb.
    if let Some(dirs) = from_chunks.get(common..from_chunks.len() - 1) {
        for dir in dirs {
            if dir.len() > 1 {
                relative.push_str("../");
            }
        }
    }
    for chunk in &target_chunks[common..] {
        relative.push_str(chunk);
    }

    if let Some(query) = target_url.query() {
        relative.push('?');
        relative.push_str(query);
    }
    if let Some(fragment) = target_url.fragment() {
        relative.push('#');
        relative.push_str(fragment);
    }
    relative
}

/// Split a path into chunks that keep their trailing `/`.
///
/// `/x/y.html` becomes `["/", "x/", "y.html"]` and `/x/` becomes
/// `["/", "x/", ""]`, so the final chunk is always the file part.
fn path_chunks(path: &str) -> Vec<&str> {
    let mut chunks: Vec<&str> = path.split_inclusive('/').collect();
    if path.is_empty() || path.ends_with('/') {
        chunks.push("");
    }
    chunks
}

fn authority(url: &Url) -> (&str, Option<&str>, Option<&str>, Option<u16>) {
    (url.username(), url.password(), url.host_str(), url.port())
}

/// A reference without scheme or authority, split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalReference<'a> {
    /// Path component, e.g. an element id or `docs/intro.html`.
    pub path: &'a str,
    /// Query string without the leading `?`.
    pub query: Option<&'a str>,
    /// Fragment without the leading `#`.
    pub fragment: Option<&'a str>,
}

impl LocalReference<'_> {
    /// Re-attach this reference's query and fragment to a resolved URL.
    ///
    /// A fragment on the reference replaces any fragment `resolved` already
    /// carries. Same for the query.
    #[must_use]
    pub fn reattach(&self, resolved: &str) -> String {
        let (rest, own_fragment) = match resolved.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (resolved, None),
        };
        let (path, own_query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        let mut out = path.to_owned();
        if let Some(query) = self.query.or(own_query) {
            out.push('?');
            out.push_str(query);
        }
        if let Some(fragment) = self.fragment.or(own_fragment) {
            out.push('#');
            out.push_str(fragment);
        }
        out
    }
}

/// Split `href` into path, query and fragment if it has no scheme and no
/// authority.
///
/// Returns `None` for absolute URLs (`http://...`, `mailto:...`) and for
/// network-path references (`//host/...`), which are never id references.
///
/// ```
/// use webdoc_renderer::split_reference;
///
/// let r = split_reference("intro?x=1#top").unwrap();
/// assert_eq!(r.path, "intro");
/// assert_eq!(r.query, Some("x=1"));
/// assert_eq!(r.fragment, Some("top"));
///
/// assert!(split_reference("http://example.com/intro").is_none());
/// assert!(split_reference("//example.com/intro").is_none());
/// ```
#[must_use]
pub fn split_reference(href: &str) -> Option<LocalReference<'_>> {
    match Url::parse(href) {
        Err(ParseError::RelativeUrlWithoutBase) => {}
        _ => return None,
    }
    if href.starts_with("//") {
        return None;
    }

    let (rest, fragment) = match href.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (href, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    Some(LocalReference {
        path,
        query,
        fragment,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_relative_url_same_directory() {
        assert_eq!(relative_url("http://a/x/y.html", "http://a/x/z.html"), "y.html");
    }

    #[test]
    fn test_relative_url_sibling_directory() {
        assert_eq!(
            relative_url("http://a/p/y.html", "http://a/q/z.html"),
            "../p/y.html"
        );
    }

    #[test]
    fn test_relative_url_deep_to_shallow() {
        assert_eq!(
            relative_url("http://a/docs/intro.html", "http://a/x/y/page.html"),
            "../../docs/intro.html"
        );
    }

    #[test]
    fn test_relative_url_shallow_to_deep() {
        assert_eq!(
            relative_url("http://a/docs/intro.html", "http://a/index.html"),
            "docs/intro.html"
        );
    }

    #[test]
    fn test_relative_url_cross_origin_unchanged() {
        assert_eq!(
            relative_url("https://a/x.html", "http://a/x.html"),
            "https://a/x.html"
        );
        assert_eq!(
            relative_url("http://b/x.html", "http://a/x.html"),
            "http://b/x.html"
        );
        assert_eq!(
            relative_url("http://a:8080/x.html", "http://a/x.html"),
            "http://a:8080/x.html"
        );
    }

    #[test]
    fn test_relative_url_same_document_keeps_fragment() {
        assert_eq!(relative_url("http://a/x/p.html#sec", "http://a/x/p.html"), "#sec");
        assert_eq!(relative_url("http://a/x/p.html", "http://a/x/p.html"), "");
    }

    #[test]
    fn test_relative_url_keeps_query() {
        assert_eq!(
            relative_url("http://a/x/y.html?v=2#f", "http://a/x/z.html"),
            "y.html?v=2#f"
        );
    }

    #[test]
    fn test_relative_url_unparsable_returns_target() {
        assert_eq!(relative_url("not a url", "http://a/x.html"), "not a url");
    }

    #[test]
    fn test_relative_url_resolves_back_to_target() {
        let target = "http://a/docs/intro.html";
        for from in [
            "http://a/index.html",
            "http://a/x/y/deep.html",
            "http://a/docs/other.html",
        ] {
            let rel = relative_url(target, from);
            let base = Url::parse(from).unwrap();
            assert_eq!(base.join(&rel).unwrap().as_str(), target, "from {from}");
        }
    }

    #[test]
    fn test_split_reference_bare_id() {
        let r = split_reference("intro").unwrap();
        assert_eq!(r.path, "intro");
        assert_eq!(r.query, None);
        assert_eq!(r.fragment, None);
    }

    #[test]
    fn test_split_reference_with_scheme() {
        assert!(split_reference("mailto:someone@example.com").is_none());
        assert!(split_reference("https://example.com/").is_none());
    }

    #[test]
    fn test_reattach_prefers_reference_fragment() {
        let r = split_reference("intro#usage").unwrap();
        assert_eq!(r.reattach("docs/intro.html#id-3"), "docs/intro.html#usage");
        let r = split_reference("intro").unwrap();
        assert_eq!(r.reattach("docs/intro.html#id-3"), "docs/intro.html#id-3");
    }
}
