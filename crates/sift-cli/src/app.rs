//! Application state management.

use anyhow::Context;
use serde_json::Value;
use sift_core::{Collection, Config, RegexSearch};
use std::fs;
use std::path::Path;
use tracing::info;

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// The search operator
    pub search: RegexSearch,
}

impl App {
    /// Create a new application instance.
    pub fn new(config: Config) -> Self {
        let search = RegexSearch::from_config(&config);
        App { config, search }
    }

    /// Load a document collection from a JSON array or JSON Lines file.
    pub fn load_collection(&self, path: &Path) -> anyhow::Result<Collection> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let collection = if contents.trim_start().starts_with('[') {
            Collection::from_json(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            parse_json_lines(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        };

        info!(
            path = %path.display(),
            documents = collection.len(),
            "Collection loaded"
        );
        Ok(collection)
    }
}

/// Parse one JSON document per non-blank line.
fn parse_json_lines(contents: &str) -> anyhow::Result<Collection> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<Value>(line).with_context(|| format!("line {}", n + 1))
        })
        .collect()
}
