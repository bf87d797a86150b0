pub mod error;
pub mod fetcher;
pub mod scrape;
mod stream_resolver;

pub use fetcher::{HttpFetcher, ProbeResponse, ReqwestFetcher, create_client};
pub use stream_resolver::{ResolutionOutcome, StreamResolver};

#[cfg(test)]
pub(crate) use stream_resolver::testing;
