//! Search command - run a regex over a document collection.

use crate::app::App;
use crate::OutputFormat;
use sift_core::{Config, SearchOutput, SearchOverrides, SearchStrategy};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Arguments of one `sift search` invocation.
pub struct SearchRequest {
    pub file: PathBuf,
    pub pattern: String,
    pub field: String,
    pub options: String,
    pub no_bloom: bool,
    pub size_bytes: Option<usize>,
    pub min_literal: Option<usize>,
    pub limit: usize,
    pub repeat: usize,
    pub stats: bool,
}

impl SearchRequest {
    fn overrides(&self) -> Option<SearchOverrides> {
        if !self.no_bloom && self.size_bytes.is_none() && self.min_literal.is_none() {
            return None;
        }
        Some(SearchOverrides {
            enable_bloom_filter: self.no_bloom.then_some(false),
            bloom_filter_size_bytes: self.size_bytes,
            min_literal_length: self.min_literal,
            max_pattern_complexity: None,
        })
    }
}

/// Run the search command.
pub fn run(config: Config, request: SearchRequest, output: OutputFormat) -> anyhow::Result<()> {
    if request.size_bytes == Some(0) {
        anyhow::bail!("--size-bytes must be positive");
    }

    let app = App::new(config);
    let collection = app.load_collection(&request.file)?;
    let overrides = request.overrides();

    let mut timings = Vec::with_capacity(request.repeat.max(1));
    let mut last: Option<SearchOutput> = None;
    for _ in 0..request.repeat.max(1) {
        let start = Instant::now();
        let out = app.search.search(
            &collection,
            &request.field,
            &request.pattern,
            &request.options,
            overrides.as_ref(),
        );
        timings.push(start.elapsed());
        last = Some(out);
    }
    let Some(out) = last else {
        return Ok(());
    };

    if let SearchStrategy::InvalidPattern { reason } = &out.strategy {
        anyhow::bail!("Invalid pattern: {}", reason);
    }

    match output {
        OutputFormat::Text => {
            for (pos, doc) in out.positions.iter().zip(&out.documents).take(request.limit) {
                let id = collection
                    .document_id(*pos, &app.config.search.id_field)
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                println!("{}\t{}", id, serde_json::to_string(doc)?);
            }

            eprintln!();
            eprintln!(
                "Found {} matches in {} documents ({}) in {:.3}ms",
                out.len(),
                collection.len(),
                describe(&out.strategy),
                average_ms(&timings)
            );
            if request.stats {
                eprintln!("{}", app.search.stats());
            }
        }
        OutputFormat::Json => {
            let matches: Vec<&serde_json::Value> =
                out.documents.iter().take(request.limit).collect();
            let mut report = serde_json::json!({
                "total": out.len(),
                "matches": matches,
                "strategy": out.strategy,
                "elapsedMs": average_ms(&timings),
            });
            if request.stats {
                report["stats"] = serde_json::to_value(app.search.stats())?;
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn describe(strategy: &SearchStrategy) -> String {
    match strategy {
        SearchStrategy::Accelerated { candidates } => {
            format!("prefiltered to {} candidates", candidates)
        }
        SearchStrategy::FullScan(reason) => format!("full scan: {:?}", reason),
        SearchStrategy::InvalidPattern { reason } => format!("invalid pattern: {}", reason),
    }
}

fn average_ms(timings: &[Duration]) -> f64 {
    if timings.is_empty() {
        return 0.0;
    }
    let total: Duration = timings.iter().sum();
    total.as_secs_f64() * 1000.0 / timings.len() as f64
}
