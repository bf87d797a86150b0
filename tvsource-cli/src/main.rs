mod cli;
mod commands;
mod config;
mod error;
mod output;

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
    error::Result,
};
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use std::process;
use tracing::{Level, debug, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("Application error: {}", e);
        #[cfg(feature = "colored-output")]
        {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        #[cfg(not(feature = "colored-output"))]
        {
            eprintln!("Error: {}", e);
        }
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let mut config = AppConfig::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    debug!("Loaded config: {:?}", config);

    let format = args
        .output
        .clone()
        .unwrap_or_else(|| config.default_output_format.clone());

    match args.command {
        Commands::Completions { shell } => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }

        Commands::Config { show, reset } => {
            if reset {
                AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults");
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }

        command => {
            let executor = CommandExecutor::new(config, format, args.output_file.clone())?;
            match command {
                Commands::Resolve {
                    url,
                    direct,
                    via_proxy,
                } => executor.resolve(&url, direct, via_proxy).await?,
                Commands::PlaybackUrl {
                    url,
                    parse,
                    proxy_base,
                } => executor.playback_url(&url, parse, proxy_base)?,
                Commands::Encode { text } => executor.encode(&text)?,
                Commands::Decode { token } => executor.decode(&token)?,
                Commands::Channels {
                    server,
                    resolve,
                    max_concurrent,
                } => executor.channels(server, resolve, max_concurrent).await?,
                Commands::Completions { .. } | Commands::Config { .. } => {}
            }
        }
    }

    Ok(())
}

/// Command-line flags take precedence over the configuration file.
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(timeout) = args.timeout {
        config.default_timeout = timeout;
    }
    if let Some(retries) = args.retries {
        config.default_retries = retries;
    }
    if args.proxy.is_some() {
        config.default_proxy = args.proxy.clone();
    }
    if args.proxy_username.is_some() {
        config.default_proxy_username = args.proxy_username.clone();
    }
    if args.proxy_password.is_some() {
        config.default_proxy_password = args.proxy_password.clone();
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
