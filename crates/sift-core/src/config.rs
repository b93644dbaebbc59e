//! Configuration management for Sift.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.
//! At runtime the sections are flattened into a [`SearchConfig`], which is what
//! the search operator reads on every call, and individual calls may override
//! parts of it through [`SearchOverrides`].

use crate::error::{Result, SiftError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Smallest literal length that can produce a trigram.
pub const MIN_TRIGRAM_LITERAL: usize = 3;

/// Main configuration structure for Sift.
///
/// ## Example Configuration File (sift.toml)
///
/// ```toml
/// [search]
/// enable_bloom_filter = true
/// min_literal_length = 3
/// max_pattern_complexity = 200
/// effectiveness_threshold = 0.7
/// id_field = "_id"
///
/// [index]
/// bloom_filter_size_bytes = 256
/// hash_functions = 3
///
/// [performance]
/// parallel_threshold = 10000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefilter policy
    pub search: SearchSection,

    /// Bloom index sizing
    pub index: IndexSection,

    /// Performance tuning
    pub performance: PerformanceSection,
}

/// Prefilter policy options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// Use the trigram Bloom prefilter at all
    pub enable_bloom_filter: bool,

    /// Literals shorter than this are not used for probing
    pub min_literal_length: usize,

    /// Patterns scoring above this complexity skip the prefilter
    pub max_pattern_complexity: usize,

    /// Fraction of the collection above which the candidate set is
    /// considered too large to be worth verifying selectively
    pub effectiveness_threshold: f64,

    /// Document field holding an explicit identifier
    pub id_field: String,
}

impl Default for SearchSection {
    fn default() -> Self {
        SearchSection {
            enable_bloom_filter: true,
            min_literal_length: MIN_TRIGRAM_LITERAL,
            max_pattern_complexity: 200,
            effectiveness_threshold: 0.7,
            id_field: "_id".to_string(),
        }
    }
}

/// Bloom index sizing options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSection {
    /// Bit array size per document, in bytes
    pub bloom_filter_size_bytes: usize,

    /// Number of independent hash functions
    pub hash_functions: u32,
}

impl Default for IndexSection {
    fn default() -> Self {
        IndexSection {
            bloom_filter_size_bytes: 256,
            hash_functions: 3,
        }
    }
}

/// Performance configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSection {
    /// Collections at least this large are indexed and verified in parallel
    pub parallel_threshold: usize,
}

impl Default for PerformanceSection {
    fn default() -> Self {
        PerformanceSection {
            parallel_threshold: 10000,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| SiftError::config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self)
            .map_err(|e| SiftError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "sift")
            .ok_or_else(|| SiftError::config("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("sift.toml"))
    }

    /// Reject values the prefilter cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.search_config().validate()
    }

    /// Flatten the file sections into the runtime view.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            enable_bloom_filter: self.search.enable_bloom_filter,
            bloom_filter_size_bytes: self.index.bloom_filter_size_bytes,
            hash_functions: self.index.hash_functions,
            min_literal_length: self.search.min_literal_length,
            max_pattern_complexity: self.search.max_pattern_complexity,
            effectiveness_threshold: self.search.effectiveness_threshold,
            id_field: self.search.id_field.clone(),
            parallel_threshold: self.performance.parallel_threshold,
        }
    }
}

/// Runtime defaults used by the search operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    pub enable_bloom_filter: bool,
    pub bloom_filter_size_bytes: usize,
    pub hash_functions: u32,
    pub min_literal_length: usize,
    pub max_pattern_complexity: usize,
    pub effectiveness_threshold: f64,
    pub id_field: String,
    pub parallel_threshold: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Config::default().search_config()
    }
}

impl SearchConfig {
    /// Apply per-call overrides on top of these defaults.
    pub fn with_overrides(&self, overrides: Option<&SearchOverrides>) -> SearchConfig {
        let mut effective = self.clone();
        if let Some(o) = overrides {
            if let Some(enabled) = o.enable_bloom_filter {
                effective.enable_bloom_filter = enabled;
            }
            if let Some(size) = o.bloom_filter_size_bytes {
                effective.bloom_filter_size_bytes = size;
            }
            if let Some(min) = o.min_literal_length {
                effective.min_literal_length = min;
            }
            if let Some(max) = o.max_pattern_complexity {
                effective.max_pattern_complexity = max;
            }
        }
        effective
    }

    /// Reject values the prefilter cannot work with.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.effectiveness_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SiftError::config(format!(
                "effectiveness_threshold must be within 0.0..=1.0, got {}",
                threshold
            )));
        }
        if self.bloom_filter_size_bytes == 0 {
            return Err(SiftError::config("bloom_filter_size_bytes must be positive"));
        }
        if self.hash_functions == 0 {
            return Err(SiftError::config("hash_functions must be positive"));
        }
        Ok(())
    }

    /// Usable literal floor; never below what a trigram needs.
    pub fn literal_floor(&self) -> usize {
        self.min_literal_length.max(MIN_TRIGRAM_LITERAL)
    }

    /// True when switching from `self` to `other` makes built indexes unsound
    /// to reuse.
    pub fn invalidates_index(&self, other: &SearchConfig) -> bool {
        self.enable_bloom_filter != other.enable_bloom_filter
            || self.bloom_filter_size_bytes != other.bloom_filter_size_bytes
            || self.hash_functions != other.hash_functions
            || self.id_field != other.id_field
    }
}

/// Per-call overrides, in the engine's option naming.
///
/// ```
/// use sift_core::SearchOverrides;
/// let o: SearchOverrides = serde_json::from_str(r#"{"enableBloomFilter": false}"#).unwrap();
/// assert_eq!(o.enable_bloom_filter, Some(false));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOverrides {
    pub enable_bloom_filter: Option<bool>,
    pub bloom_filter_size_bytes: Option<usize>,
    pub min_literal_length: Option<usize>,
    pub max_pattern_complexity: Option<usize>,
}
