//! # Sift Core Library
//!
//! This crate accelerates regular-expression search over collections of JSON
//! documents. A per-document trigram Bloom filter, built lazily on first use,
//! narrows each query to candidate documents before the exact regex runs.
//! The filter can only produce false positives, so results are identical to
//! a plain scan; any query the filter cannot help falls back to one.
//!
//! ## Architecture
//!
//! - **Types** (`types`): Collections, document identities and field paths
//! - **Trigram** (`trigram`): Case folding and trigram decomposition
//! - **Bloom** (`bloom`): Per-document filters with concurrent insertion
//! - **Literal** (`literal`): Required-literal extraction and complexity
//! - **Index** (`index`): Lazily built, generation-checked index cache
//! - **Planner** (`planner`): Eligibility, probing and the effectiveness check
//! - **Verify** (`verify`): Exact matching of candidates
//! - **Stats** (`stats`): Effectiveness counters
//! - **Search** (`search`): The operator tying the above together
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use sift_core::{Collection, RegexSearch};
//!
//! let search = RegexSearch::new();
//! let docs = Collection::from_documents(vec![
//!     json!({"text": "hello world"}),
//!     json!({"text": "goodbye"}),
//! ]);
//!
//! let out = search.search(&docs, "text", "hel+o", "", None);
//! assert_eq!(out.positions, vec![0]);
//! println!("{}", search.stats());
//! ```

pub mod bloom;
pub mod config;
pub mod error;
pub mod index;
pub mod literal;
pub mod planner;
pub mod search;
pub mod stats;
pub mod trigram;
pub mod types;
pub mod verify;

// Re-export commonly used types
pub use bloom::BloomIndex;
pub use config::{Config, SearchConfig, SearchOverrides};
pub use error::{Result, SiftError};
pub use index::IndexBuilder;
pub use planner::Ineligibility;
pub use search::{FullScanReason, PatternAnalysis, RegexSearch, SearchOutput, SearchStrategy};
pub use stats::SearchStats;
pub use types::{Collection, CollectionId, DocumentId};
pub use verify::MatchOptions;
