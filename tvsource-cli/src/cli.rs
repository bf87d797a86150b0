use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "tvsource",
    about = "tvsource - CLI tool for resolving channel-list video sources into playable stream URLs",
    version,
    author
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Number of retry attempts
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Proxy URL (supports http, https, socks5)
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Proxy username (if proxy requires authentication)
    #[arg(long, global = true)]
    pub proxy_username: Option<String>,

    /// Proxy password (if proxy requires authentication)
    #[arg(long, global = true)]
    pub proxy_password: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub output: Option<OutputFormat>,

    /// Save output to file
    #[arg(short = 'O', long, global = true)]
    pub output_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a source URL into a playable stream URL
    Resolve {
        /// The source URL
        #[arg(short, long)]
        url: String,

        /// Treat the URL as a direct stream (no resolution)
        #[arg(long)]
        direct: bool,

        /// Let a resolve proxy at this base URL do the work instead
        #[arg(long, env = "TVSOURCE_RESOLVE_PROXY")]
        via_proxy: Option<String>,
    },

    /// Build the playback URL a player would open for a source
    PlaybackUrl {
        /// The source URL
        #[arg(short, long)]
        url: String,

        /// The source needs resolution
        #[arg(long)]
        parse: bool,

        /// Base URL of the resolve proxy
        #[arg(long, env = "TVSOURCE_RESOLVE_PROXY")]
        proxy_base: Option<String>,
    },

    /// Encode text into a path-safe token
    Encode {
        /// Text to encode
        text: String,
    },

    /// Decode a path-safe token
    Decode {
        /// Token to decode
        token: String,
    },

    /// List the channel catalog
    Channels {
        /// Catalog server base URL
        #[arg(short, long, env = "TVSOURCE_SERVER")]
        server: Option<String>,

        /// Resolve the first source of every channel
        #[arg(long)]
        resolve: bool,

        /// Maximum concurrent resolutions
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Pretty-printed human-readable output
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// Compact JSON output
    JsonCompact,
    /// Table format
    Table,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonCompact => write!(f, "json-compact"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}
