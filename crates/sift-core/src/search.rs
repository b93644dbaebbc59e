//! The accelerated regex search operator.
//!
//! [`RegexSearch`] owns the process-wide state of the accelerator: the
//! runtime configuration, the cache of built Bloom indexes and the
//! statistics. Each call to [`RegexSearch::search`] runs:
//!
//! 1. compile the pattern (invalid patterns end here with zero matches)
//! 2. plan: extract literals, check eligibility, build/reuse the index and
//!    probe it for candidates
//! 3. verify either the candidates or, on any fallback, the full collection
//! 4. record statistics
//!
//! The operator is `Send + Sync`; share it behind an `Arc` to serve
//! concurrent pipelines.

use crate::config::{Config, SearchConfig, SearchOverrides};
use crate::error::Result;
use crate::index::IndexBuilder;
use crate::planner::{self, Ineligibility, Plan, PrefilterPlanner};
use crate::stats::{QueryKind, QueryObservation, SearchStats, StatsRecorder};
use crate::trigram;
use crate::types::Collection;
use crate::verify::{MatchOptions, Verifier};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Why the full collection was scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FullScanReason {
    Disabled,
    Ineligible(Ineligibility),
    Ineffective { candidates: usize },
}

/// How a search was executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStrategy {
    /// Only prefilter candidates were verified
    Accelerated { candidates: usize },
    /// Every document was verified
    FullScan(FullScanReason),
    /// The pattern did not compile; nothing matched
    InvalidPattern { reason: String },
}

impl SearchStrategy {
    pub fn is_accelerated(&self) -> bool {
        matches!(self, SearchStrategy::Accelerated { .. })
    }
}

/// Result of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutput {
    /// Matching documents, in collection order
    pub documents: Vec<Value>,
    /// Positions of the matching documents
    pub positions: Vec<usize>,
    pub strategy: SearchStrategy,
}

impl SearchOutput {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Explanation of how the accelerator would treat a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternAnalysis {
    pub pattern: String,
    /// Every extracted literal, usable or not
    pub literals: Vec<String>,
    /// Trigrams that would be probed
    pub trigrams: Vec<String>,
    pub suitable: bool,
    pub complexity: usize,
    /// Why the pattern is unsuitable, when it is
    pub reason: Option<Ineligibility>,
}

/// Trigram Bloom accelerated regex search over document collections.
///
/// ## Example
///
/// ```
/// use serde_json::json;
/// use sift_core::{Collection, RegexSearch};
///
/// let search = RegexSearch::new();
/// let docs = Collection::from_documents(vec![
///     json!({"text": "hello world"}),
///     json!({"text": "goodbye"}),
///     json!({"text": "hello there"}),
/// ]);
///
/// let out = search.search(&docs, "text", "hello", "", None);
/// assert_eq!(out.positions, vec![0, 2]);
/// ```
pub struct RegexSearch {
    config: RwLock<SearchConfig>,
    indexes: IndexBuilder,
    stats: StatsRecorder,
}

impl Default for RegexSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl RegexSearch {
    /// Create an operator with default configuration.
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    /// Create an operator with explicit runtime defaults.
    pub fn with_config(config: SearchConfig) -> Self {
        RegexSearch {
            config: RwLock::new(config),
            indexes: IndexBuilder::new(),
            stats: StatsRecorder::new(),
        }
    }

    /// Create an operator from a loaded configuration file.
    pub fn from_config(config: &Config) -> Self {
        Self::with_config(config.search_config())
    }

    /// Current runtime defaults.
    pub fn config(&self) -> SearchConfig {
        self.config.read().clone()
    }

    /// Replace the runtime defaults.
    ///
    /// Built indexes are dropped when sizing, enablement or identity
    /// resolution change, since bits built under other parameters cannot be
    /// reused soundly. Invalid configurations are rejected and the current
    /// one is kept.
    pub fn configure(&self, config: SearchConfig) -> Result<()> {
        if let Err(e) = config.validate() {
            warn!(error = %e, "Rejecting search configuration");
            return Err(e);
        }

        let mut current = self.config.write();
        if current.invalidates_index(&config) {
            info!(
                size_bytes = config.bloom_filter_size_bytes,
                hashes = config.hash_functions,
                enabled = config.enable_bloom_filter,
                "Index parameters changed, clearing built indexes"
            );
            self.indexes.clear();
        }
        *current = config;
        Ok(())
    }

    /// Search `field` of every document in `collection` for `pattern`.
    ///
    /// Never fails: invalid patterns yield an empty result with
    /// [`SearchStrategy::InvalidPattern`].
    #[instrument(skip(self, collection, overrides), fields(docs = collection.len()))]
    pub fn search(
        &self,
        collection: &Collection,
        field: &str,
        pattern: &str,
        options: &str,
        overrides: Option<&SearchOverrides>,
    ) -> SearchOutput {
        let config = self.config.read().with_overrides(overrides);
        let match_options = MatchOptions::parse(options);
        let mut obs = QueryObservation::new(QueryKind::InvalidPattern, collection.len());

        let compile_start = Instant::now();
        let verifier = match Verifier::new(pattern, match_options, field) {
            Ok(v) => v,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Skipping search with invalid pattern");
                obs.verify_time = compile_start.elapsed();
                self.stats.record(&obs);
                return SearchOutput {
                    documents: Vec::new(),
                    positions: Vec::new(),
                    strategy: SearchStrategy::InvalidPattern {
                        reason: e.to_string(),
                    },
                };
            }
        };
        let compile_time = compile_start.elapsed();

        let prefilter_start = Instant::now();
        let (plan, built) =
            PrefilterPlanner::new(&config, &self.indexes).plan(collection, field, pattern, &match_options);
        obs.prefilter_time = prefilter_start.elapsed();
        if built {
            self.stats.record_index_build();
        }

        let verify_start = Instant::now();
        let (positions, strategy) = match plan {
            Plan::Candidates(candidates) => {
                obs.kind = QueryKind::Accelerated;
                obs.candidates = Some(candidates.len());
                let matched =
                    verifier.verify_candidates(collection, &candidates, config.parallel_threshold);
                (
                    matched,
                    SearchStrategy::Accelerated {
                        candidates: candidates.len(),
                    },
                )
            }
            Plan::Disabled => {
                obs.kind = QueryKind::Disabled;
                full_scan(&verifier, collection, &config, FullScanReason::Disabled)
            }
            Plan::Ineligible(why) => {
                obs.kind = if why.is_short() {
                    QueryKind::TooShort
                } else {
                    QueryKind::Unsupported
                };
                full_scan(&verifier, collection, &config, FullScanReason::Ineligible(why))
            }
            Plan::Ineffective { candidates } => {
                obs.kind = QueryKind::Ineffective;
                full_scan(
                    &verifier,
                    collection,
                    &config,
                    FullScanReason::Ineffective { candidates },
                )
            }
        };
        obs.verify_time = compile_time + verify_start.elapsed();
        obs.matches = positions.len();
        self.stats.record(&obs);

        debug!(
            strategy = ?strategy,
            matches = positions.len(),
            "Search complete"
        );

        let documents = positions
            .iter()
            .filter_map(|&pos| collection.get(pos).cloned())
            .collect();

        SearchOutput {
            documents,
            positions,
            strategy,
        }
    }

    /// Explain how `pattern` would be treated, without running a query.
    pub fn analyze(&self, pattern: &str, options: &str) -> PatternAnalysis {
        let config = self.config.read().clone();
        analyze_with(pattern, options, &config)
    }

    /// Snapshot of the statistics.
    pub fn stats(&self) -> SearchStats {
        self.stats.snapshot()
    }

    /// Reset the statistics.
    pub fn reset(&self) {
        self.stats.reset();
    }

    /// Drop every built index; the next query rebuilds.
    pub fn clear(&self) {
        self.indexes.clear();
    }

    /// Drop the indexes built for one collection instance.
    pub fn invalidate(&self, collection: &Collection) {
        self.indexes.invalidate(collection.id());
    }

    /// Number of cached indexes.
    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    /// Approximate bytes held by cached indexes.
    pub fn index_memory_bytes(&self) -> usize {
        self.indexes.memory_bytes()
    }
}

impl std::fmt::Debug for RegexSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexSearch")
            .field("config", &*self.config.read())
            .field("indexes", &self.indexes)
            .finish()
    }
}

fn full_scan(
    verifier: &Verifier,
    collection: &Collection,
    config: &SearchConfig,
    reason: FullScanReason,
) -> (Vec<usize>, SearchStrategy) {
    (
        verifier.verify_all(collection, config.parallel_threshold),
        SearchStrategy::FullScan(reason),
    )
}

/// Pattern analysis under an explicit configuration.
pub fn analyze_with(pattern: &str, options: &str, config: &SearchConfig) -> PatternAnalysis {
    let eligibility = planner::assess(pattern, &MatchOptions::parse(options), config);
    PatternAnalysis {
        pattern: pattern.to_string(),
        literals: eligibility.extracted.literals.clone(),
        trigrams: eligibility.trigrams.iter().map(trigram::to_string).collect(),
        suitable: eligibility.is_eligible() && config.enable_bloom_filter,
        complexity: eligibility.extracted.complexity,
        reason: eligibility.verdict.err(),
    }
}
