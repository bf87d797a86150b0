use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tv_source::{ProxyConfig, ResolverConfig, config::DEFAULT_MAX_HOPS};

use crate::cli::OutputFormat;

const APP_NAME: &str = "tvsource";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default output format
    pub default_output_format: OutputFormat,

    /// Default request timeout in seconds
    pub default_timeout: u64,

    /// Default number of retries
    pub default_retries: u32,

    /// Maximum concurrent resolutions for the channel listing
    pub max_concurrent: usize,

    /// Maximum landing-page hops per resolution
    pub max_hops: usize,

    /// Channel catalog server
    pub server: Option<String>,

    /// Resolve proxy base URL; when set, `parse` sources are routed through it
    pub resolve_proxy: Option<String>,

    /// User agent string for requests
    pub user_agent: Option<String>,

    /// Enable colored output
    pub colored_output: bool,

    /// Default proxy URL (supports http, https, socks5)
    pub default_proxy: Option<String>,

    /// Default proxy username (if proxy requires authentication)
    pub default_proxy_username: Option<String>,

    /// Default proxy password (if proxy requires authentication)
    pub default_proxy_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_output_format: OutputFormat::Pretty,
            default_timeout: 30,
            default_retries: 2,
            max_concurrent: 5,
            max_hops: DEFAULT_MAX_HOPS,
            server: None,
            resolve_proxy: None,
            user_agent: None,
            colored_output: true,
            default_proxy: None,
            default_proxy_username: None,
            default_proxy_password: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if path.exists() {
                    let content = std::fs::read_to_string(path)
                        .context("Failed to read configuration file")?;
                    toml::from_str(&content).context("Failed to parse configuration file")
                } else {
                    Ok(Self::default())
                }
            }
            None => confy::load(APP_NAME, None).context("Failed to load configuration"),
        }
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, toml_string).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Reset configuration to defaults and save
    pub fn reset(config_path: Option<&Path>) -> Result<()> {
        let path = config_path
            .map(|p| p.to_path_buf())
            .or_else(Self::default_config_path)
            .context("No configuration path available")?;

        Self::default().save(&path)
    }

    /// Show current configuration as a formatted string
    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration for display")
    }

    pub fn proxy(&self) -> Option<ProxyConfig> {
        self.default_proxy.as_ref().map(|url| ProxyConfig {
            url: url.clone(),
            username: self.default_proxy_username.clone(),
            password: self.default_proxy_password.clone(),
        })
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        let mut config = ResolverConfig::default()
            .with_timeout(Duration::from_secs(self.default_timeout))
            .with_max_hops(self.max_hops)
            .with_proxy(self.proxy());
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.as_str());
        }
        config
    }
}
