use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{
    error::ResolveError,
    fetcher::{HttpFetcher, ReqwestFetcher},
    scrape,
};
use crate::{codec, config::ResolverConfig};

/// Result of resolving one source URL.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", content = "url", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Resolved(String),
    Failed,
}

impl ResolutionOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionOutcome::Resolved(_))
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ResolutionOutcome::Resolved(url) => Some(url),
            ResolutionOutcome::Failed => None,
        }
    }
}

impl From<Result<String, ResolveError>> for ResolutionOutcome {
    fn from(result: Result<String, ResolveError>) -> Self {
        match result {
            Ok(url) => ResolutionOutcome::Resolved(url),
            Err(_) => ResolutionOutcome::Failed,
        }
    }
}

/// Turns an indirect source URL into a playable stream URL.
///
/// Each hop probes the URL without following redirects:
///
/// 1. An HLS playlist content type on a non-redirect response means the
///    probed location is the stream.
/// 2. A `tc.html` landing page, whether answered or redirected to, unwraps
///    its `id` target and starts over without being requested.
/// 3. Any other redirect moves on to its target.
/// 4. Anything else is fetched as a page and scanned for an embedded
///    stream URL.
///
/// Every probe counts against `max_hops`.
pub struct StreamResolver<F = ReqwestFetcher> {
    fetcher: F,
    max_hops: usize,
}

impl StreamResolver<ReqwestFetcher> {
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolveError> {
        let fetcher = ReqwestFetcher::new(config)?;
        Ok(Self::new(fetcher, config.max_hops))
    }
}

impl<F: HttpFetcher> StreamResolver<F> {
    pub fn new(fetcher: F, max_hops: usize) -> Self {
        Self { fetcher, max_hops }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Resolves `url`, collapsing every failure into
    /// [`ResolutionOutcome::Failed`].
    pub async fn resolve(&self, url: &str) -> ResolutionOutcome {
        let result = self.try_resolve(url).await;
        if let Err(e) = &result {
            warn!("Failed to resolve {} ({:?}): {}", url, e.kind(), e);
        }
        result.into()
    }

    /// Resolves a path-safe token as carried in `<proxy>/resolve/<token>`.
    pub async fn resolve_token(&self, token: &str) -> ResolutionOutcome {
        let result = match codec::try_decode(token) {
            Ok(url) => self.try_resolve(&url).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            warn!("Failed to resolve token {} ({:?}): {}", token, e.kind(), e);
        }
        result.into()
    }

    /// Same algorithm as [`resolve`](Self::resolve), keeping the cause.
    pub async fn try_resolve(&self, url: &str) -> Result<String, ResolveError> {
        let mut current = url.to_string();

        for hop in 0..self.max_hops {
            Url::parse(&current).map_err(|e| ResolveError::InvalidUrl(format!("{current}: {e}")))?;

            debug!("Hop {}: probing {}", hop, current);
            let probe = self.fetcher.probe(&current).await?;

            let redirected = probe.is_redirect();
            if !redirected
                && probe
                    .content_type
                    .as_deref()
                    .is_some_and(scrape::is_hls_content_type)
            {
                debug!("HLS playlist at {}", probe.url);
                return Ok(probe.url);
            }

            if scrape::is_landing_page(&probe.url) {
                current = scrape::landing_page_target(&probe.url)
                    .ok_or_else(|| ResolveError::MissingLandingTarget(probe.url.clone()))?;
                debug!("Landing page {} wraps {}", probe.url, current);
                continue;
            }

            if redirected {
                debug!("Following redirect {} -> {}", current, probe.url);
                current = probe.url;
                continue;
            }

            let body = self.fetcher.fetch_text(&probe.url).await?;
            return match scrape::extract_stream_url(&body) {
                Some(stream_url) => {
                    debug!("Found stream url {} in {}", stream_url, probe.url);
                    Ok(stream_url)
                }
                None => Err(ResolveError::PatternNotFound(probe.url)),
            };
        }

        Err(ResolveError::TooManyHops(self.max_hops))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedFetcher;
    use super::*;
    use crate::resolver::error::FailureKind;

    const HLS: &str = "application/vnd.apple.mpegurl";

    #[inline]
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    fn scripted(fetcher: ScriptedFetcher) -> StreamResolver<ScriptedFetcher> {
        StreamResolver::new(fetcher, 10)
    }

    #[tokio::test]
    async fn test_hls_fast_path_single_request() {
        init_tracing();
        let resolver = scripted(
            ScriptedFetcher::new().serve("https://cdn.example.com/live.m3u8", HLS),
        );

        let outcome = resolver.resolve("https://cdn.example.com/live.m3u8").await;
        assert_eq!(
            outcome,
            ResolutionOutcome::Resolved("https://cdn.example.com/live.m3u8".into())
        );
        assert_eq!(
            resolver.fetcher().requests(),
            vec!["probe https://cdn.example.com/live.m3u8"]
        );
    }

    #[tokio::test]
    async fn test_redirect_target_is_fetched_as_page() {
        let resolver = scripted(
            ScriptedFetcher::new()
                .redirect("https://short.example.com/x", "https://tv.example.com/player")
                .serve("https://tv.example.com/player", "text/html")
                .page(
                    "https://tv.example.com/player",
                    r#"{"code": 0, "url": "https://cdn.example.com/x.m3u8"}"#,
                ),
        );

        let outcome = resolver.resolve("https://short.example.com/x").await;
        assert_eq!(
            outcome,
            ResolutionOutcome::Resolved("https://cdn.example.com/x.m3u8".into())
        );
        assert_eq!(
            resolver.fetcher().requests(),
            vec![
                "probe https://short.example.com/x",
                "probe https://tv.example.com/player",
                "fetch https://tv.example.com/player"
            ]
        );
    }

    #[tokio::test]
    async fn test_redirect_to_playlist_takes_fast_path() {
        let stream = "https://cdn.example.com/live.m3u8";
        let resolver = scripted(
            ScriptedFetcher::new()
                .redirect("https://short.example.com/live", stream)
                .serve(stream, HLS),
        );

        assert_eq!(
            resolver.resolve("https://short.example.com/live").await,
            ResolutionOutcome::Resolved(stream.into())
        );
        assert_eq!(
            resolver.fetcher().requests(),
            vec![
                "probe https://short.example.com/live".to_string(),
                format!("probe {stream}")
            ]
        );
    }

    #[tokio::test]
    async fn test_redirect_chain_reaches_landing_page() {
        let inner = "https://cdn.example.com/inner.m3u8";
        let resolver = scripted(
            ScriptedFetcher::new()
                .redirect("https://tv.example.com/a", "https://tv.example.com/b")
                .redirect(
                    "https://tv.example.com/b",
                    &format!("https://jump.example.com/tc.html?id={inner}"),
                )
                .serve(inner, HLS),
        );

        assert_eq!(
            resolver.resolve("https://tv.example.com/a").await,
            ResolutionOutcome::Resolved(inner.into())
        );
        assert_eq!(resolver.fetcher().requests().len(), 3);
    }

    #[tokio::test]
    async fn test_redirect_loop_is_bounded() {
        let a = "https://a.example.com/";
        let b = "https://b.example.com/";
        let resolver = StreamResolver::new(
            ScriptedFetcher::new().redirect(a, b).redirect(b, a),
            3,
        );

        let err = resolver.try_resolve(a).await.unwrap_err();
        assert!(matches!(err, ResolveError::TooManyHops(3)));
        assert_eq!(resolver.fetcher().requests().len(), 3);
    }

    #[tokio::test]
    async fn test_landing_page_delegates_to_inner_url() {
        let inner = "https://cdn.example.com/inner.m3u8";
        let resolver = scripted(
            ScriptedFetcher::new()
                .redirect(
                    "https://tv.example.com/channel/1",
                    &format!("https://jump.example.com/tc.html?id={inner}"),
                )
                .serve(inner, HLS),
        );

        let direct = resolver.resolve(inner).await;
        let via_landing = resolver.resolve("https://tv.example.com/channel/1").await;
        assert_eq!(direct, via_landing);
        assert_eq!(via_landing, ResolutionOutcome::Resolved(inner.into()));
    }

    #[tokio::test]
    async fn test_landing_page_without_id_fails() {
        let resolver = scripted(ScriptedFetcher::new().redirect(
            "https://tv.example.com/channel/2",
            "https://jump.example.com/tc.html",
        ));

        let err = resolver
            .try_resolve("https://tv.example.com/channel/2")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::MissingLandingTarget(_)));
    }

    #[tokio::test]
    async fn test_scrapes_json_url_field() {
        let resolver = scripted(
            ScriptedFetcher::new()
                .serve("https://tv.example.com/play", "text/html; charset=utf-8")
                .page(
                    "https://tv.example.com/play",
                    r#"<script>var cfg = {"url": "https://example.com/stream.m3u8"};</script>"#,
                ),
        );

        assert_eq!(
            resolver.resolve("https://tv.example.com/play").await,
            ResolutionOutcome::Resolved("https://example.com/stream.m3u8".into())
        );
    }

    #[tokio::test]
    async fn test_scrapes_source_tag() {
        let resolver = scripted(
            ScriptedFetcher::new()
                .serve("https://tv.example.com/play", "text/html")
                .page(
                    "https://tv.example.com/play",
                    r#"<video><source src="https://example.com/a.mp4" type="video/mp4"></video>"#,
                ),
        );

        assert_eq!(
            resolver.resolve("https://tv.example.com/play").await,
            ResolutionOutcome::Resolved("https://example.com/a.mp4".into())
        );
    }

    #[tokio::test]
    async fn test_page_without_stream_fails() {
        let resolver = scripted(
            ScriptedFetcher::new()
                .serve("https://tv.example.com/play", "text/html")
                .page("https://tv.example.com/play", "<p>signal lost</p>"),
        );

        let err = resolver
            .try_resolve("https://tv.example.com/play")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::PatternNotFound);
        assert_eq!(
            resolver.resolve("https://tv.example.com/play").await,
            ResolutionOutcome::Failed
        );
    }

    #[tokio::test]
    async fn test_network_failure_is_failed() {
        let resolver = scripted(ScriptedFetcher::new());
        let err = resolver
            .try_resolve("https://down.example.com/")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Network);
        assert_eq!(
            resolver.resolve("https://down.example.com/").await,
            ResolutionOutcome::Failed
        );
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_request() {
        let resolver = scripted(ScriptedFetcher::new());
        assert_eq!(resolver.resolve("not a url").await, ResolutionOutcome::Failed);
        assert!(resolver.fetcher().requests().is_empty());
    }

    #[tokio::test]
    async fn test_landing_loop_is_bounded() {
        let a = "https://a.example.com/";
        let b = "https://b.example.com/";
        let resolver = StreamResolver::new(
            ScriptedFetcher::new()
                .redirect(a, &format!("https://jump.example.com/tc.html?id={b}"))
                .redirect(b, &format!("https://jump.example.com/tc.html?id={a}")),
            4,
        );

        let err = resolver.try_resolve(a).await.unwrap_err();
        assert!(matches!(err, ResolveError::TooManyHops(4)));
        assert_eq!(resolver.fetcher().requests().len(), 4);
    }

    #[tokio::test]
    async fn test_resolve_token() {
        let url = "https://cdn.example.com/live.m3u8";
        let resolver = scripted(ScriptedFetcher::new().serve(url, HLS));

        let token = codec::encode(url);
        assert_eq!(
            resolver.resolve_token(&token).await,
            ResolutionOutcome::Resolved(url.into())
        );
        assert_eq!(resolver.resolve_token("Y").await, ResolutionOutcome::Failed);
    }

    #[test]
    fn test_outcome_serialization() {
        let resolved = ResolutionOutcome::Resolved("https://example.com/a.m3u8".into());
        assert_eq!(
            serde_json::to_value(&resolved).unwrap(),
            serde_json::json!({"status": "resolved", "url": "https://example.com/a.m3u8"})
        );
        assert_eq!(
            serde_json::to_value(ResolutionOutcome::Failed).unwrap(),
            serde_json::json!({"status": "failed"})
        );
        assert_eq!(resolved.url(), Some("https://example.com/a.m3u8"));
        assert!(!ResolutionOutcome::Failed.is_resolved());
    }
}
