use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use crate::resolver::{PluginDependency, ReleaseRecord};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

pub struct OutputFormatter;

impl OutputFormatter {
    /// A resolved filesystem path with a label saying what it is.
    pub fn format_path(&self, label: &str, path: &Path, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => format!("{label}: {}", path.display()),
            OutputFormat::Json => serde_json::json!({
                "kind": label,
                "path": path.display().to_string(),
            })
            .to_string(),
        }
    }

    pub fn format_plugin(&self, dependency: &PluginDependency, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => {
                let origin = if dependency.builtin { "builtin" } else { "downloaded" };
                format!(
                    "{} {} ({origin}): {}",
                    dependency.id,
                    dependency.version,
                    dependency.artifact.display()
                )
            }
            OutputFormat::Json => serde_json::json!({
                "id": dependency.id,
                "version": dependency.version,
                "channel": dependency.channel,
                "builtin": dependency.builtin,
                "path": dependency.artifact.display().to_string(),
            })
            .to_string(),
        }
    }

    pub fn format_releases(&self, records: &[&ReleaseRecord], format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => {
                if records.is_empty() {
                    return "No releases matched".to_string();
                }
                let mut out = String::new();
                for record in records {
                    out.push_str(&format!(
                        "{:<4} {:<16} {:<20} {}\n",
                        record.product_code,
                        record.version,
                        record.build.to_string(),
                        record.channel,
                    ));
                }
                out
            }
            OutputFormat::Json => {
                let entries: Vec<serde_json::Value> = records
                    .iter()
                    .map(|record| {
                        serde_json::json!({
                            "product": record.product_code,
                            "version": record.version,
                            "build": record.build.to_string(),
                            "channel": record.channel.to_string(),
                            "releaseDate": record.release_date.map(|d| d.to_string()),
                        })
                    })
                    .collect();
                serde_json::Value::Array(entries).to_string()
            }
        }
    }
}

/// Progress bar for long downloads.
pub fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}
