//! Pattern matching on response metadata and page bodies.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static HLS_CONTENT_TYPE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)application/vnd\.apple\.mpegurl").unwrap());

static LANDING_PAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/tc\.html").unwrap());

static LANDING_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(https?://.+)?/tc\.html\?id=").unwrap());

static BARE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"https?://[^"]+"#).unwrap());

// "url": "https://..."
static URL_FIELD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""url":\s?"https?://[^"]+""#).unwrap());

// <source src="https://..." type="video/mp4">
static SOURCE_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<source src="https?://[^"]+" type="[a-zA-Z]+/[\w\-]+">"#).unwrap()
});

/// Whether a `Content-Type` value denotes an HLS playlist.
pub fn is_hls_content_type(content_type: &str) -> bool {
    HLS_CONTENT_TYPE_REGEX.is_match(content_type)
}

/// Whether `url` points at the intermediate `tc.html` landing page.
pub fn is_landing_page(url: &str) -> bool {
    LANDING_PAGE_REGEX.is_match(url)
}

/// The wrapped target of a landing page URL.
///
/// Everything after `…/tc.html?id=` is taken verbatim so that an unescaped
/// inner URL keeps its own query string. When the id is not the first
/// parameter, the decoded `id` query pair is used instead.
pub fn landing_page_target(url: &str) -> Option<String> {
    if let Some(found) = LANDING_PREFIX_REGEX.find(url) {
        let target = &url[found.end()..];
        if !target.is_empty() {
            return Some(target.to_string());
        }
    }

    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(key, value)| key == "id" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Scans a page body for an embedded stream URL.
///
/// A JSON-style `"url": "…"` field wins over an HTML `<source>` tag. The
/// bare `http(s)://` portion is then cut out of whichever matched.
pub fn extract_stream_url(body: &str) -> Option<String> {
    let matched = URL_FIELD_REGEX
        .find(body)
        .or_else(|| SOURCE_TAG_REGEX.find(body))?;

    BARE_URL_REGEX
        .find(matched.as_str())
        .map(|url| url.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hls_content_type() {
        assert!(is_hls_content_type("application/vnd.apple.mpegurl"));
        assert!(is_hls_content_type("Application/VND.Apple.MpegURL; charset=utf-8"));
        assert!(!is_hls_content_type("text/html; charset=utf-8"));
        assert!(!is_hls_content_type("application/x-mpegurl"));
    }

    #[test]
    fn test_landing_page_target() {
        let url = "https://jump.example.com/tc.html?id=https://cdn.example.com/live/1.m3u8";
        assert!(is_landing_page(url));
        assert_eq!(
            landing_page_target(url).as_deref(),
            Some("https://cdn.example.com/live/1.m3u8")
        );
    }

    #[test]
    fn test_landing_page_keeps_inner_query() {
        let url = "http://jump.example.com/tc.html?id=http://cdn.example.com/play?ch=1&q=hd";
        assert_eq!(
            landing_page_target(url).as_deref(),
            Some("http://cdn.example.com/play?ch=1&q=hd")
        );
    }

    #[test]
    fn test_landing_page_id_not_first() {
        let url = "https://jump.example.com/tc.html?from=app&id=https%3A%2F%2Fcdn.example.com%2Fa.m3u8";
        assert_eq!(
            landing_page_target(url).as_deref(),
            Some("https://cdn.example.com/a.m3u8")
        );
    }

    #[test]
    fn test_landing_page_without_id() {
        let url = "https://jump.example.com/tc.html";
        assert!(is_landing_page(url));
        assert!(landing_page_target(url).is_none());
        assert!(!is_landing_page("https://example.com/index.html"));
    }

    #[test]
    fn test_extract_url_field() {
        let body = r#"<script>var player = {"title": "CCTV", "url": "https://example.com/stream.m3u8", "autoplay": true};</script>"#;
        assert_eq!(
            extract_stream_url(body).as_deref(),
            Some("https://example.com/stream.m3u8")
        );
    }

    #[test]
    fn test_extract_url_field_without_space() {
        let body = r#"{"url":"http://example.com/live/2.m3u8"}"#;
        assert_eq!(
            extract_stream_url(body).as_deref(),
            Some("http://example.com/live/2.m3u8")
        );
    }

    #[test]
    fn test_extract_source_tag() {
        let body = r#"<video controls><source src="https://example.com/a.mp4" type="video/mp4"></video>"#;
        assert_eq!(
            extract_stream_url(body).as_deref(),
            Some("https://example.com/a.mp4")
        );
    }

    #[test]
    fn test_url_field_preferred_over_source_tag() {
        let body = r#"<source src="https://example.com/a.mp4" type="video/mp4">
            <script>cfg = {"url": "https://example.com/b.m3u8"}</script>"#;
        assert_eq!(
            extract_stream_url(body).as_deref(),
            Some("https://example.com/b.m3u8")
        );
    }

    #[test]
    fn test_source_tag_with_dashed_subtype() {
        let body = r#"<source src="https://example.com/c.m3u8" type="application/x-mpegURL">"#;
        assert_eq!(
            extract_stream_url(body).as_deref(),
            Some("https://example.com/c.m3u8")
        );
    }

    #[test]
    fn test_no_match() {
        assert!(extract_stream_url("<html><body>offline</body></html>").is_none());
        // Relative sources and non-http schemes are not stream URLs.
        assert!(extract_stream_url(r#"<source src="/a.mp4" type="video/mp4">"#).is_none());
        assert!(extract_stream_url(r#"{"url": "rtmp://example.com/live"}"#).is_none());
    }
}
