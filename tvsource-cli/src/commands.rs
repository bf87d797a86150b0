use crate::{
    cli::OutputFormat,
    config::AppConfig,
    error::{CliError, Result},
    output::{ChannelReport, OutputManager, write_output},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::{sync::Semaphore, time::sleep};
use tracing::{debug, info};
use tv_source::{
    ResolutionController, ResolutionMode, ResolutionState, SourceDescriptor, StreamResolver,
    build_playback_url,
    catalog::CatalogClient,
    codec,
    resolver::{ResolutionOutcome, create_client},
};

pub struct CommandExecutor {
    config: AppConfig,
    resolver: Arc<StreamResolver>,
    output: OutputManager,
    format: OutputFormat,
    output_file: Option<PathBuf>,
}

/// Exponential backoff starting at one second, capped at 64 seconds.
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * (1u64 << attempt.min(6)))
}

impl CommandExecutor {
    pub fn new(
        config: AppConfig,
        format: OutputFormat,
        output_file: Option<PathBuf>,
    ) -> Result<Self> {
        let resolver = Arc::new(StreamResolver::from_config(&config.resolver_config())?);
        let output = OutputManager::new(config.colored_output);
        Ok(Self {
            config,
            resolver,
            output,
            format,
            output_file,
        })
    }

    fn write(&self, content: &str) -> Result<()> {
        write_output(content, self.output_file.as_deref())
    }

    fn mode(&self, via_proxy: Option<String>) -> ResolutionMode {
        match via_proxy.or_else(|| self.config.resolve_proxy.clone()) {
            Some(base) => ResolutionMode::Proxy { base },
            None => ResolutionMode::Local,
        }
    }

    pub async fn resolve(&self, url: &str, direct: bool, via_proxy: Option<String>) -> Result<()> {
        let source = if direct {
            SourceDescriptor::direct(url)
        } else {
            SourceDescriptor::parsed(url)
        };

        let controller = ResolutionController::new(self.resolver.clone(), self.mode(via_proxy));
        info!("Resolving {} ({:?})", source.key(), controller.mode());

        let pb = self.create_progress_bar("Resolving...");
        controller.request(&source);
        let mut state = controller.settled().await;

        let retries = self.config.default_retries;
        for attempt in 0..retries {
            if !matches!(state, ResolutionState::Failed { .. }) {
                break;
            }
            let delay = retry_delay(attempt);
            debug!("Attempt {} failed, retrying in {:?}", attempt + 1, delay);
            pb.set_message(format!("Retrying ({}/{})...", attempt + 1, retries));
            sleep(delay).await;
            controller.refresh();
            state = controller.settled().await;
        }
        pb.finish_and_clear();

        self.write(&self.output.format_state(&state, &self.format)?)?;

        match state {
            ResolutionState::Failed { key } => Err(CliError::ResolutionFailed(key.url)),
            _ => Ok(()),
        }
    }

    pub fn playback_url(&self, url: &str, parse: bool, proxy_base: Option<String>) -> Result<()> {
        let source = SourceDescriptor::new(url, false, parse);
        let proxy_base = match proxy_base.or_else(|| self.config.resolve_proxy.clone()) {
            Some(base) => base,
            None if parse => return Err(CliError::missing("resolve proxy base (--proxy-base)")),
            None => String::new(),
        };

        let playback = build_playback_url(&source, &proxy_base);
        let output = self.output.format_pairs(
            &[("source", url), ("playback_url", playback.as_str())],
            &self.format,
        )?;
        self.write(&output)?;
        Ok(())
    }

    pub fn encode(&self, text: &str) -> Result<()> {
        let token = codec::encode(text);
        let output = self
            .output
            .format_pairs(&[("text", text), ("token", token.as_str())], &self.format)?;
        self.write(&output)?;
        Ok(())
    }

    pub fn decode(&self, token: &str) -> Result<()> {
        let text = codec::try_decode(token)
            .map_err(|e| CliError::InvalidToken(format!("{token}: {e}")))?;
        let output = self
            .output
            .format_pairs(&[("token", token), ("text", text.as_str())], &self.format)?;
        self.write(&output)?;
        Ok(())
    }

    pub async fn channels(
        &self,
        server: Option<String>,
        resolve: bool,
        max_concurrent: Option<usize>,
    ) -> Result<()> {
        let server = server
            .or_else(|| self.config.server.clone())
            .ok_or_else(|| CliError::missing("catalog server (--server)"))?;

        let client = create_client(&self.config.resolver_config())?;
        let catalog = CatalogClient::new(client, server);

        let pb = self.create_progress_bar("Fetching channels...");
        let channels = catalog.fetch_channels().await;
        pb.finish_and_clear();
        let channels = channels?;

        let mut reports: Vec<ChannelReport> =
            channels.iter().map(ChannelReport::from_channel).collect();

        if resolve {
            let outcomes = self
                .resolve_all(
                    channels
                        .iter()
                        .map(|channel| channel.source_at(0).cloned())
                        .collect(),
                    max_concurrent.unwrap_or(self.config.max_concurrent),
                )
                .await?;
            for (report, outcome) in reports.iter_mut().zip(outcomes) {
                report.outcome = outcome;
            }
        }

        let output = self.output.format_channels(&reports, &self.format)?;
        self.write(&output)?;
        Ok(())
    }

    async fn resolve_all(
        &self,
        sources: Vec<Option<SourceDescriptor>>,
        concurrency: usize,
    ) -> Result<Vec<Option<ResolutionOutcome>>> {
        let pb = Arc::new(ProgressBar::new(sources.len() as u64));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );

        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let proxy_base = self.config.resolve_proxy.clone();
        let mut tasks = Vec::with_capacity(sources.len());

        for source in sources {
            let permit = semaphore.clone().acquire_owned().await?;
            let resolver = self.resolver.clone();
            let proxy_base = proxy_base.clone();
            let pb = Arc::clone(&pb);

            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome = match source {
                    None => None,
                    Some(source) if !source.parse => Some(ResolutionOutcome::Resolved(source.url)),
                    Some(source) => match &proxy_base {
                        Some(base) => Some(ResolutionOutcome::Resolved(build_playback_url(
                            &source, base,
                        ))),
                        None => {
                            pb.set_message(source.url.clone());
                            Some(resolver.resolve(&source.url).await)
                        }
                    },
                };
                pb.inc(1);
                outcome
            }));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for task in tasks {
            outcomes.push(task.await?);
        }

        pb.finish_with_message("done");
        Ok(outcomes)
    }

    fn create_progress_bar(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(500));
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        pb.set_message(message.to_string());
        pb
    }
}
