//! Client for the channel catalog endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{resolver::error::ResolveError, source::SourceDescriptor};

const CHANNELS_PATH: &str = "/api/video/tv?inherit=1";

/// A channel's sources: the catalog sends either one descriptor or a list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ChannelSources {
    Single(SourceDescriptor),
    Many(Vec<SourceDescriptor>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: u64,
    pub title: String,
    pub source: ChannelSources,
}

impl Channel {
    pub fn sources(&self) -> &[SourceDescriptor] {
        match &self.source {
            ChannelSources::Single(source) => std::slice::from_ref(source),
            ChannelSources::Many(sources) => sources,
        }
    }

    pub fn source_at(&self, index: usize) -> Option<&SourceDescriptor> {
        self.sources().get(index)
    }
}

pub struct CatalogClient {
    client: Client,
    server: String,
}

impl CatalogClient {
    pub fn new<S: Into<String>>(client: Client, server: S) -> Self {
        Self {
            client,
            server: server.into(),
        }
    }

    pub fn channels_url(&self) -> String {
        format!("{}{}", self.server.trim_end_matches('/'), CHANNELS_PATH)
    }

    pub async fn fetch_channels(&self) -> Result<Vec<Channel>, ResolveError> {
        let url = self.channels_url();
        debug!("Fetching channel catalog from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let channels: Vec<Channel> = serde_json::from_str(&body)?;
        debug!("Catalog lists {} channels", channels.len());
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_many_sources() {
        let json = r#"[
            {"id": 1, "title": "News", "source": {"url": "https://cdn.example.com/news.m3u8"}},
            {"id": 2, "title": "Sports", "source": [
                {"url": "https://tv.example.com/sports", "parse": true},
                {"url": "https://backup.example.com/sports.m3u8", "cors": true}
            ]}
        ]"#;
        let channels: Vec<Channel> = serde_json::from_str(json).unwrap();

        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].sources().len(), 1);
        assert!(!channels[0].sources()[0].parse);

        let sports = &channels[1];
        assert_eq!(sports.sources().len(), 2);
        assert!(sports.source_at(0).unwrap().parse);
        assert!(sports.source_at(1).unwrap().cors);
        assert!(sports.source_at(2).is_none());
    }

    #[test]
    fn test_channels_url() {
        let catalog = CatalogClient::new(Client::new(), "https://api.example.com/");
        assert_eq!(
            catalog.channels_url(),
            "https://api.example.com/api/video/tv?inherit=1"
        );
    }
}
