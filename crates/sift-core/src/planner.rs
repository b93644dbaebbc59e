//! Prefilter planning.
//!
//! The planner decides per query whether the Bloom prefilter is worth
//! running, and if so turns the pattern's literals into trigram probes and
//! the probes into a candidate set. Every path that is not a usable
//! candidate set resolves to a full scan; none of them is an error.

use crate::bloom::BloomIndex;
use crate::config::SearchConfig;
use crate::index::{IndexBuilder, IndexSizing};
use crate::literal::{self, PatternLiterals};
use crate::trigram::{self, Trigram};
use crate::types::{resolve_text, Collection, DocumentId};
use crate::verify::MatchOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Why a pattern cannot use the prefilter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ineligibility {
    /// Pattern or its literals are shorter than the minimum literal length
    TooShort,
    /// Complexity score above the configured ceiling
    TooComplex,
    /// No fragment is certain to appear in a match
    NoLiterals,
}

impl Ineligibility {
    /// Whether this counts as a short pattern (vs. an unsupported one).
    pub fn is_short(&self) -> bool {
        matches!(self, Ineligibility::TooShort)
    }
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligibility::TooShort => write!(f, "no literal reaches the minimum length"),
            Ineligibility::TooComplex => write!(f, "pattern complexity over ceiling"),
            Ineligibility::NoLiterals => write!(f, "no extractable literal"),
        }
    }
}

/// Static eligibility decision, made without touching any index.
#[derive(Debug, Clone, PartialEq)]
pub struct Eligibility {
    pub extracted: PatternLiterals,
    /// Literals long enough to probe
    pub usable: Vec<String>,
    /// Distinct trigrams across usable literals
    pub trigrams: Vec<Trigram>,
    pub verdict: Result<(), Ineligibility>,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        self.verdict.is_ok()
    }
}

/// Classify a pattern under `config`.
pub fn assess(pattern: &str, options: &MatchOptions, config: &SearchConfig) -> Eligibility {
    let extracted = literal::extract(pattern, options);
    let floor = config.literal_floor();
    let usable: Vec<String> = extracted.usable(floor).map(str::to_string).collect();
    let trigrams = trigram::trigrams_of_all(usable.iter().map(String::as_str));

    let verdict = if extracted.complexity > config.max_pattern_complexity {
        Err(Ineligibility::TooComplex)
    } else if !usable.is_empty() {
        Ok(())
    } else if extracted.literals.is_empty() && pattern.chars().count() >= floor {
        Err(Ineligibility::NoLiterals)
    } else {
        Err(Ineligibility::TooShort)
    };

    Eligibility {
        extracted,
        usable,
        trigrams,
        verdict,
    }
}

/// The planner's decision for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Prefilter disabled by configuration
    Disabled,
    /// Pattern not eligible for the prefilter
    Ineligible(Ineligibility),
    /// Candidate set too large to be worth using
    Ineffective { candidates: usize },
    /// Verify only these positions (collection order)
    Candidates(Vec<usize>),
}

/// Decides, per query, whether and how to prefilter.
pub struct PrefilterPlanner<'a> {
    config: &'a SearchConfig,
    builder: &'a IndexBuilder,
}

impl<'a> PrefilterPlanner<'a> {
    pub fn new(config: &'a SearchConfig, builder: &'a IndexBuilder) -> Self {
        PrefilterPlanner { config, builder }
    }

    /// Plan a query. The second value is `true` when an index was built.
    pub fn plan(
        &self,
        collection: &Collection,
        field: &str,
        pattern: &str,
        options: &MatchOptions,
    ) -> (Plan, bool) {
        if !self.config.enable_bloom_filter {
            return (Plan::Disabled, false);
        }

        let eligibility = assess(pattern, options, self.config);
        if let Err(reason) = eligibility.verdict {
            debug!(
                pattern = %pattern,
                complexity = eligibility.extracted.complexity,
                reason = %reason,
                "Pattern not eligible for prefilter"
            );
            return (Plan::Ineligible(reason), false);
        }

        let sizing = IndexSizing {
            size_bytes: self.config.bloom_filter_size_bytes,
            hash_functions: self.config.hash_functions,
        };
        let (index, built) = self.builder.ensure(
            collection,
            field,
            &self.config.id_field,
            sizing,
            self.config.parallel_threshold,
        );

        let candidates = candidates(
            &index.bloom,
            collection,
            field,
            &self.config.id_field,
            &eligibility.trigrams,
        );

        let total = collection.len();
        let limit = total as f64 * self.config.effectiveness_threshold;
        debug!(
            pattern = %pattern,
            literals = ?eligibility.usable,
            trigrams = eligibility.trigrams.len(),
            candidates = candidates.len(),
            total = total,
            "Prefilter probed"
        );

        if candidates.len() as f64 > limit {
            return (
                Plan::Ineffective {
                    candidates: candidates.len(),
                },
                built,
            );
        }
        (Plan::Candidates(candidates), built)
    }
}

/// Positions of documents that probe positive for every trigram.
///
/// Documents without string text at `field` cannot match and are skipped.
/// A document with text but no index entry means the index and collection
/// disagree about identities; that fails loudly in debug builds and is kept
/// as a candidate otherwise.
pub fn candidates(
    bloom: &BloomIndex,
    collection: &Collection,
    field: &str,
    id_field: &str,
    grams: &[Trigram],
) -> Vec<usize> {
    collection
        .iter()
        .enumerate()
        .filter(|(pos, doc)| {
            let id = DocumentId::resolve(doc, *pos, id_field);
            match bloom.probe_all(&id, grams) {
                Some(hit) => hit,
                None => {
                    let has_text = resolve_text(doc, field).is_some();
                    debug_assert!(
                        !has_text,
                        "document {} has text at '{}' but is missing from the index",
                        id,
                        field
                    );
                    has_text
                }
            }
        })
        .map(|(pos, _)| pos)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hello_collection() -> Collection {
        Collection::from_documents(vec![
            json!({"text": "hello world"}),
            json!({"text": "goodbye"}),
            json!({"text": "hello there"}),
        ])
    }

    fn plan(collection: &Collection, pattern: &str, config: &SearchConfig) -> Plan {
        let builder = IndexBuilder::new();
        PrefilterPlanner::new(config, &builder)
            .plan(collection, "text", pattern, &MatchOptions::default())
            .0
    }

    #[test]
    fn test_assess_classification() {
        let config = SearchConfig::default();
        let opts = MatchOptions::default();

        assert!(assess("hello", &opts, &config).is_eligible());
        assert_eq!(assess("a", &opts, &config).verdict, Err(Ineligibility::TooShort));
        assert_eq!(assess(".*", &opts, &config).verdict, Err(Ineligibility::TooShort));
        assert_eq!(assess("ab.cd", &opts, &config).verdict, Err(Ineligibility::TooShort));
        assert_eq!(
            assess("(a|b)c*", &opts, &config).verdict,
            Err(Ineligibility::NoLiterals)
        );

        let long = format!("hello{}", "(a|b)".repeat(40));
        assert_eq!(assess(&long, &opts, &config).verdict, Err(Ineligibility::TooComplex));
    }

    #[test]
    fn test_assess_respects_min_length() {
        let mut config = SearchConfig::default();
        config.min_literal_length = 6;
        let e = assess("hello", &MatchOptions::default(), &config);
        assert_eq!(e.verdict, Err(Ineligibility::TooShort));

        config.min_literal_length = 5;
        let e = assess("hello", &MatchOptions::default(), &config);
        assert!(e.is_eligible());
        assert_eq!(e.trigrams.len(), 3);
    }

    #[test]
    fn test_plan_candidates() {
        let collection = hello_collection();
        assert_eq!(
            plan(&collection, "hello", &SearchConfig::default()),
            Plan::Candidates(vec![0, 2])
        );
    }

    #[test]
    fn test_plan_disabled() {
        let mut config = SearchConfig::default();
        config.enable_bloom_filter = false;
        assert_eq!(plan(&hello_collection(), "hello", &config), Plan::Disabled);
    }

    #[test]
    fn test_plan_ineffective() {
        let collection = Collection::from_documents(vec![
            json!({"text": "common word"}),
            json!({"text": "common thing"}),
            json!({"text": "common stuff"}),
            json!({"text": "rare"}),
        ]);
        assert_eq!(
            plan(&collection, "common", &SearchConfig::default()),
            Plan::Ineffective { candidates: 3 }
        );
    }

    #[test]
    fn test_plan_ineligible() {
        assert_eq!(
            plan(&hello_collection(), "a", &SearchConfig::default()),
            Plan::Ineligible(Ineligibility::TooShort)
        );
    }

    #[test]
    fn test_more_trigrams_never_widen() {
        let collection = hello_collection();
        let builder = IndexBuilder::new();
        let config = SearchConfig::default();
        let sizing = IndexSizing {
            size_bytes: config.bloom_filter_size_bytes,
            hash_functions: config.hash_functions,
        };
        let (index, _) = builder.ensure(&collection, "text", "_id", sizing, usize::MAX);

        let few = trigram::trigrams("hel");
        let many = trigram::trigrams_of_all(["hello", "there"]);
        let a = candidates(&index.bloom, &collection, "text", "_id", &few);
        let b = candidates(&index.bloom, &collection, "text", "_id", &many);
        assert!(b.len() <= a.len());
        assert!(b.iter().all(|p| a.contains(p)));
        assert_eq!(b, vec![2]);
    }

    #[test]
    fn test_documents_without_text_are_not_candidates() {
        let collection = Collection::from_documents(vec![
            json!({"text": "hello"}),
            json!({"text": null}),
            json!({"other": "hello"}),
            json!({"text": "x"}),
            json!({"text": "y"}),
        ]);
        assert_eq!(
            plan(&collection, "hello", &SearchConfig::default()),
            Plan::Candidates(vec![0])
        );
    }
}
