//! Prefilter effectiveness statistics.
//!
//! Counters are plain atomics so recording never blocks the query path and
//! snapshots can be taken concurrently. Floating-point accumulators are kept
//! as `f64` bit patterns inside `AtomicU64`.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// How a query was executed, from the statistics' point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryKind {
    /// Candidates from the prefilter were verified
    Accelerated,
    /// Prefilter ran but left too many candidates; full scan used
    Ineffective,
    /// Prefiltering disabled by configuration
    Disabled,
    /// No literal reached the minimum length
    TooShort,
    /// No usable literal, or complexity over the ceiling
    Unsupported,
    /// Pattern failed to compile
    InvalidPattern,
}

/// Everything recorded about one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryObservation {
    pub kind: QueryKind,
    pub collection_size: usize,
    /// Candidate count, when the prefilter produced a candidate set
    pub candidates: Option<usize>,
    pub matches: usize,
    pub prefilter_time: Duration,
    pub verify_time: Duration,
}

impl QueryObservation {
    pub fn new(kind: QueryKind, collection_size: usize) -> Self {
        QueryObservation {
            kind,
            collection_size,
            candidates: None,
            matches: 0,
            prefilter_time: Duration::ZERO,
            verify_time: Duration::ZERO,
        }
    }

    /// Estimated full-scan time over actual time, extrapolated from the
    /// per-candidate verification cost. `None` when it cannot be estimated.
    pub fn estimated_speedup(&self) -> Option<f64> {
        if self.kind != QueryKind::Accelerated {
            return None;
        }
        let candidates = self.candidates.filter(|&c| c > 0)?;
        let elapsed = (self.prefilter_time + self.verify_time).as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let per_candidate = self.verify_time.as_secs_f64() / candidates as f64;
        Some(per_candidate * self.collection_size as f64 / elapsed)
    }
}

/// Point-in-time view of the statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub total_queries: u64,
    pub prefilter_hits: u64,
    pub ineffective_prefilters: u64,
    pub disabled_scans: u64,
    pub short_patterns: u64,
    pub unsupported_patterns: u64,
    pub invalid_patterns: u64,
    pub index_builds: u64,
    /// Documents considered by accelerated queries
    pub candidates_before: u64,
    /// Candidates left after prefiltering, accelerated queries only
    pub candidates_after: u64,
    /// Candidates that verified
    pub verified_candidates: u64,
    pub total_matches: u64,
    pub prefilter_time_ms: f64,
    pub verify_time_ms: f64,
    pub average_speedup: f64,
    pub false_positive_rate: f64,
    /// Fraction of documents the prefilter removed
    pub reduction_ratio: f64,
    pub last_reset: DateTime<Utc>,
}

impl fmt::Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} queries, {} accelerated ({} ineffective, {} short, {} unsupported, {} invalid), \
             reduction {:.1}%, fpr {:.2}%, avg speedup {:.2}x",
            self.total_queries,
            self.prefilter_hits,
            self.ineffective_prefilters,
            self.short_patterns,
            self.unsupported_patterns,
            self.invalid_patterns,
            self.reduction_ratio * 100.0,
            self.false_positive_rate * 100.0,
            self.average_speedup,
        )
    }
}

/// Lock-free statistics accumulator.
#[derive(Debug)]
pub struct StatsRecorder {
    total_queries: AtomicU64,
    prefilter_hits: AtomicU64,
    ineffective_prefilters: AtomicU64,
    disabled_scans: AtomicU64,
    short_patterns: AtomicU64,
    unsupported_patterns: AtomicU64,
    invalid_patterns: AtomicU64,
    index_builds: AtomicU64,
    candidates_before: AtomicU64,
    candidates_after: AtomicU64,
    verified_candidates: AtomicU64,
    total_matches: AtomicU64,
    prefilter_nanos: AtomicU64,
    verify_nanos: AtomicU64,
    speedup_sum: AtomicU64,
    speedup_samples: AtomicU64,
    last_reset: RwLock<DateTime<Utc>>,
}

impl Default for StatsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsRecorder {
    pub fn new() -> Self {
        StatsRecorder {
            total_queries: AtomicU64::new(0),
            prefilter_hits: AtomicU64::new(0),
            ineffective_prefilters: AtomicU64::new(0),
            disabled_scans: AtomicU64::new(0),
            short_patterns: AtomicU64::new(0),
            unsupported_patterns: AtomicU64::new(0),
            invalid_patterns: AtomicU64::new(0),
            index_builds: AtomicU64::new(0),
            candidates_before: AtomicU64::new(0),
            candidates_after: AtomicU64::new(0),
            verified_candidates: AtomicU64::new(0),
            total_matches: AtomicU64::new(0),
            prefilter_nanos: AtomicU64::new(0),
            verify_nanos: AtomicU64::new(0),
            speedup_sum: AtomicU64::new(0f64.to_bits()),
            speedup_samples: AtomicU64::new(0),
            last_reset: RwLock::new(Utc::now()),
        }
    }

    /// Record one completed query.
    pub fn record(&self, obs: &QueryObservation) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        self.total_matches
            .fetch_add(obs.matches as u64, Ordering::Relaxed);
        self.prefilter_nanos
            .fetch_add(nanos(obs.prefilter_time), Ordering::Relaxed);
        self.verify_nanos
            .fetch_add(nanos(obs.verify_time), Ordering::Relaxed);

        let counter = match obs.kind {
            QueryKind::Accelerated => &self.prefilter_hits,
            QueryKind::Ineffective => &self.ineffective_prefilters,
            QueryKind::Disabled => &self.disabled_scans,
            QueryKind::TooShort => &self.short_patterns,
            QueryKind::Unsupported => &self.unsupported_patterns,
            QueryKind::InvalidPattern => &self.invalid_patterns,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if obs.kind == QueryKind::Accelerated {
            let candidates = obs.candidates.unwrap_or(0) as u64;
            self.candidates_before
                .fetch_add(obs.collection_size as u64, Ordering::Relaxed);
            self.candidates_after
                .fetch_add(candidates, Ordering::Relaxed);
            self.verified_candidates
                .fetch_add(obs.matches as u64, Ordering::Relaxed);
        }

        if let Some(speedup) = obs.estimated_speedup() {
            add_f64(&self.speedup_sum, speedup);
            self.speedup_samples.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count an index (re)build.
    pub fn record_index_build(&self) {
        self.index_builds.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of the current counters.
    pub fn snapshot(&self) -> SearchStats {
        let candidates_before = self.candidates_before.load(Ordering::Relaxed);
        let candidates_after = self.candidates_after.load(Ordering::Relaxed);
        let verified = self.verified_candidates.load(Ordering::Relaxed);
        let samples = self.speedup_samples.load(Ordering::Relaxed);
        let speedup_sum = f64::from_bits(self.speedup_sum.load(Ordering::Relaxed));

        SearchStats {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            prefilter_hits: self.prefilter_hits.load(Ordering::Relaxed),
            ineffective_prefilters: self.ineffective_prefilters.load(Ordering::Relaxed),
            disabled_scans: self.disabled_scans.load(Ordering::Relaxed),
            short_patterns: self.short_patterns.load(Ordering::Relaxed),
            unsupported_patterns: self.unsupported_patterns.load(Ordering::Relaxed),
            invalid_patterns: self.invalid_patterns.load(Ordering::Relaxed),
            index_builds: self.index_builds.load(Ordering::Relaxed),
            candidates_before,
            candidates_after,
            verified_candidates: verified,
            total_matches: self.total_matches.load(Ordering::Relaxed),
            prefilter_time_ms: self.prefilter_nanos.load(Ordering::Relaxed) as f64 / 1e6,
            verify_time_ms: self.verify_nanos.load(Ordering::Relaxed) as f64 / 1e6,
            average_speedup: ratio(speedup_sum, samples as f64),
            false_positive_rate: ratio(
                candidates_after.saturating_sub(verified) as f64,
                candidates_after as f64,
            ),
            reduction_ratio: ratio(
                candidates_before.saturating_sub(candidates_after) as f64,
                candidates_before as f64,
            ),
            last_reset: *self.last_reset.read(),
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in [
            &self.total_queries,
            &self.prefilter_hits,
            &self.ineffective_prefilters,
            &self.disabled_scans,
            &self.short_patterns,
            &self.unsupported_patterns,
            &self.invalid_patterns,
            &self.index_builds,
            &self.candidates_before,
            &self.candidates_after,
            &self.verified_candidates,
            &self.total_matches,
            &self.prefilter_nanos,
            &self.verify_nanos,
            &self.speedup_samples,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.speedup_sum.store(0f64.to_bits(), Ordering::Relaxed);
        *self.last_reset.write() = Utc::now();
    }
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

fn add_f64(cell: &AtomicU64, delta: f64) {
    // fetch_update only fails when the closure returns None
    let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
        Some((f64::from_bits(bits) + delta).to_bits())
    });
}
