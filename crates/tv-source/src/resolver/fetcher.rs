use async_trait::async_trait;
use reqwest::{
    Client, ClientBuilder,
    header::{CACHE_CONTROL, CONTENT_TYPE, HeaderValue, LOCATION},
    redirect::Policy,
};
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::error::ResolveError;
use crate::config::ResolverConfig;

/// What a single non-following request learned about a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    /// Where the response points: the redirect target for 3xx responses,
    /// otherwise the URL that answered.
    pub url: String,
    pub content_type: Option<String>,
    pub status: u16,
}

impl ProbeResponse {
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Network seam of the resolver.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// GET `url` without following redirects, bypassing caches.
    async fn probe(&self, url: &str) -> Result<ProbeResponse, ResolveError>;

    /// GET `url` following redirects and return the body as text.
    async fn fetch_text(&self, url: &str) -> Result<String, ResolveError>;
}

/// [`HttpFetcher`] backed by `reqwest`.
///
/// Holds two clients sharing the same settings: one with redirects
/// disabled for probing and one with the default redirect policy for page
/// fetches.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    probe_client: Client,
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolveError> {
        let probe_client = client_builder(config)?.redirect(Policy::none()).build()?;
        let client = client_builder(config)?.build()?;
        Ok(Self::with_clients(probe_client, client))
    }

    /// Uses caller-provided clients. `probe_client` must not follow
    /// redirects.
    pub fn with_clients(probe_client: Client, client: Client) -> Self {
        Self {
            probe_client,
            client,
        }
    }
}

/// Builds a client for non-probe requests, e.g. the catalog.
pub fn create_client(config: &ResolverConfig) -> Result<Client, ResolveError> {
    Ok(client_builder(config)?.build()?)
}

fn client_builder(config: &ResolverConfig) -> Result<ClientBuilder, ResolveError> {
    let provider = Arc::new(ring::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_platform_verifier()?
        .with_no_client_auth();

    let mut builder = Client::builder()
        .use_preconfigured_tls(tls_config)
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout);

    if let Some(proxy_config) = &config.proxy {
        match reqwest::Proxy::all(&proxy_config.url) {
            Ok(mut proxy) => {
                if let (Some(username), Some(password)) =
                    (&proxy_config.username, &proxy_config.password)
                {
                    proxy = proxy.basic_auth(username, password);
                }
                builder = builder.proxy(proxy);
            }
            Err(e) => {
                warn!("Failed to configure proxy '{}': {}", proxy_config.url, e);
            }
        }
    }

    Ok(builder)
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn probe(&self, url: &str) -> Result<ProbeResponse, ResolveError> {
        let response = self
            .probe_client
            .get(url)
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let target = if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| ResolveError::MissingLocation(url.to_string()))?;
            resolve_location(response.url(), location)?
        } else if status.is_success() {
            response.url().to_string()
        } else {
            return Err(ResolveError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        };

        debug!(
            "Probed {} -> {} ({}, content-type: {:?})",
            url, target, status, content_type
        );

        Ok(ProbeResponse {
            url: target,
            content_type,
            status: status.as_u16(),
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ResolveError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

fn resolve_location(base: &Url, location: &str) -> Result<String, ResolveError> {
    base.join(location)
        .map(|url| url.to_string())
        .map_err(|e| ResolveError::InvalidUrl(format!("{location}: {e}")))
}
