//! Source URL resolution for channel-list video players.
//!
//! A channel catalog hands out [`SourceDescriptor`]s. Direct sources are
//! playable as-is; sources flagged with `parse` point at a page or redirector
//! that has to be chased until an actual stream URL turns up. This crate
//! provides:
//!
//! - [`codec`]: the path-safe token encoding used to embed arbitrary URLs in
//!   a single proxy path segment
//! - [`resolver`]: the redirect-chasing and page-scraping [`StreamResolver`]
//! - [`builder`]: construction of playback URLs for the resolve proxy
//! - [`controller`]: a stateful [`ResolutionController`] that only ever
//!   publishes the outcome of the most recent request
//! - [`catalog`]: a small client for the channel catalog endpoint

pub mod builder;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod controller;
pub mod resolver;
pub mod source;

pub use builder::build_playback_url;
pub use config::{ProxyConfig, ResolverConfig};
pub use controller::{ResolutionController, ResolutionMode, ResolutionState};
pub use resolver::{ResolutionOutcome, StreamResolver, error::ResolveError};
pub use source::{SourceDescriptor, SourceKey};
