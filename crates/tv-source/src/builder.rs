use crate::{codec, source::SourceDescriptor};

/// Path segment the resolve proxy listens on.
pub const RESOLVE_SEGMENT: &str = "/resolve/";

/// Returns the URL a player should open for `source`.
///
/// Direct sources are returned unchanged. Sources that need resolution are
/// routed through the proxy as `<proxy_base>/resolve/<token>`, with the
/// original URL carried as a [`codec`] token. `proxy_base` is used
/// verbatim.
pub fn build_playback_url(source: &SourceDescriptor, proxy_base: &str) -> String {
    if !source.parse {
        return source.url.clone();
    }
    format!("{proxy_base}{RESOLVE_SEGMENT}{}", codec::encode(&source.url))
}

/// Recovers the token from a URL built by [`build_playback_url`].
pub fn token_from_playback_url<'a>(url: &'a str, proxy_base: &str) -> Option<&'a str> {
    url.strip_prefix(proxy_base)?
        .strip_prefix(RESOLVE_SEGMENT)
        .filter(|token| !token.is_empty() && !token.contains('/'))
}
