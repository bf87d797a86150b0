use std::time::Duration;

pub(crate) const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Landing-page hops followed before giving up on a source.
pub const DEFAULT_MAX_HOPS: usize = 10;

/// Upstream proxy used for every resolver request.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Options for the HTTP side of resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Overall timeout for a single request
    pub timeout: Duration,

    /// Time allowed to establish a connection
    pub connect_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Maximum number of landing-page hops per resolution
    pub max_hops: usize,

    /// Proxy configuration (optional)
    pub proxy: Option<ProxyConfig>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_UA.to_owned(),
            max_hops: DEFAULT_MAX_HOPS,
            proxy: None,
        }
    }
}

impl ResolverConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }
}
