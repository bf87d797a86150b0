use crate::{cli::OutputFormat, error::Result};
#[cfg(feature = "colored-output")]
use colored::*;
use serde::Serialize;
use std::io::Write;
#[cfg(feature = "table-output")]
use tabled::{Table, Tabled, settings::Style};
use tv_source::{ResolutionState, catalog::Channel, resolver::ResolutionOutcome};

/// One row of the channel listing.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelReport {
    pub id: u64,
    pub title: String,
    pub sources: usize,
    pub url: Option<String>,
    pub parse: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ResolutionOutcome>,
}

impl ChannelReport {
    pub fn from_channel(channel: &Channel) -> Self {
        let first = channel.source_at(0);
        Self {
            id: channel.id,
            title: channel.title.clone(),
            sources: channel.sources().len(),
            url: first.map(|source| source.url.clone()),
            parse: first.is_some_and(|source| source.parse),
            outcome: None,
        }
    }
}

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_state(&self, state: &ResolutionState, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(state)? + "\n"),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(state)? + "\n"),
            OutputFormat::Pretty | OutputFormat::Table => {
                let mut output = String::new();
                match state {
                    ResolutionState::Idle => {
                        output.push_str(&self.colorize("Idle", &Color::Yellow, true));
                        output.push('\n');
                    }
                    ResolutionState::Resolving { key } => {
                        output.push_str(&self.line("Resolving", &key.url, &Color::Yellow));
                    }
                    ResolutionState::Resolved { key, url } => {
                        output.push_str(&self.colorize("Resolved:", &Color::Green, true));
                        output.push('\n');
                        output.push_str(&self.line("  Source", &key.url, &Color::Cyan));
                        output.push_str(&self.line("  Stream", url, &Color::Blue));
                    }
                    ResolutionState::Failed { key } => {
                        output.push_str(&self.colorize("Failed:", &Color::Red, true));
                        output.push('\n');
                        output.push_str(&self.line("  Source", &key.url, &Color::Cyan));
                    }
                }
                Ok(output)
            }
        }
    }

    /// Simple key/value output for the token commands.
    pub fn format_pairs(&self, pairs: &[(&str, &str)], format: &OutputFormat) -> Result<String> {
        let object: serde_json::Map<String, serde_json::Value> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), serde_json::Value::from(*value)))
            .collect();

        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&object)? + "\n"),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(&object)? + "\n"),
            OutputFormat::Pretty | OutputFormat::Table => Ok(pairs
                .iter()
                .map(|(key, value)| self.line(key, value, &Color::Cyan))
                .collect()),
        }
    }

    pub fn format_channels(&self, reports: &[ChannelReport], format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(reports)? + "\n"),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(reports)? + "\n"),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(self.format_channel_table(reports)),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => Ok(self.format_channel_list(reports)),
            OutputFormat::Pretty => Ok(self.format_channel_list(reports)),
        }
    }

    fn format_channel_list(&self, reports: &[ChannelReport]) -> String {
        let mut output = String::new();
        output.push_str(&self.colorize(
            &format!("Channels ({}):", reports.len()),
            &Color::Green,
            true,
        ));
        output.push('\n');

        for report in reports {
            output.push_str(&format!(
                "  {} {}",
                self.colorize(&format!("[{}]", report.id), &Color::Yellow, false),
                self.colorize(&report.title, &Color::Cyan, true)
            ));
            if report.sources > 1 {
                output.push_str(&format!(" ({} sources)", report.sources));
            }
            output.push('\n');

            if let Some(url) = &report.url {
                let label = if report.parse { "    page" } else { "    stream" };
                output.push_str(&self.line(label, url, &Color::Blue));
            }

            match &report.outcome {
                Some(ResolutionOutcome::Resolved(url)) => {
                    output.push_str(&self.line("    resolved", url, &Color::Green));
                }
                Some(ResolutionOutcome::Failed) => {
                    output.push_str(&format!(
                        "    {}\n",
                        self.colorize("failed", &Color::Red, false)
                    ));
                }
                None => {}
            }
        }

        output
    }

    #[cfg(feature = "table-output")]
    fn format_channel_table(&self, reports: &[ChannelReport]) -> String {
        #[derive(Tabled)]
        struct TableRow {
            id: u64,
            title: String,
            sources: usize,
            url: String,
            resolved: String,
        }

        let rows = reports.iter().map(|report| TableRow {
            id: report.id,
            title: report.title.clone(),
            sources: report.sources,
            url: report.url.clone().unwrap_or_default(),
            resolved: match &report.outcome {
                Some(ResolutionOutcome::Resolved(url)) => url.clone(),
                Some(ResolutionOutcome::Failed) => "failed".to_string(),
                None => "-".to_string(),
            },
        });

        Table::new(rows).with(Style::modern()).to_string() + "\n"
    }

    fn line(&self, label: &str, value: &str, color: &Color) -> String {
        format!(
            "{}: {}\n",
            self.colorize(label, &Color::Yellow, false),
            self.colorize(value, color, false)
        )
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Blue => text.blue(),
                    Color::Cyan => text.cyan(),
                    Color::Red => text.red(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (self.colored, color, bold);
            text.to_string()
        }
    }
}

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
    Red,
}

pub fn write_output(content: &str, output_file: Option<&std::path::Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        None => {
            print!("{content}");
            std::io::stdout().flush()?;
        }
    }
    Ok(())
}
