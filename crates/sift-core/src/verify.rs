//! Exact verification of candidates.
//!
//! The verifier is the single source of truth for matches: the prefilter
//! only ever narrows the positions handed to it. The pattern is compiled
//! once per query and applied to the resolved field text of each document.
//!
//! ## Performance
//!
//! Small inputs are scanned sequentially. At or above the configured
//! parallel threshold the scan uses Rayon; results are collected in
//! collection order either way.

use crate::error::{Result, SiftError};
use crate::types::{resolve_text, Collection};
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Match options parsed from the engine's option string.
///
/// Recognized flags: `i` (case-insensitive), `m` (multi-line anchors),
/// `s` (dot matches newline), `x` (extended/whitespace-insensitive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOptions {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_matches_new_line: bool,
    pub extended: bool,
}

impl MatchOptions {
    /// Parse an option string such as `"im"`. Unknown flags are ignored.
    pub fn parse(options: &str) -> Self {
        let mut parsed = MatchOptions::default();
        for flag in options.chars() {
            match flag {
                'i' => parsed.case_insensitive = true,
                'm' => parsed.multi_line = true,
                's' => parsed.dot_matches_new_line = true,
                'x' => parsed.extended = true,
                other => debug!(flag = %other, "Ignoring unknown match option"),
            }
        }
        parsed
    }
}

/// A compiled pattern ready to verify documents.
#[derive(Debug, Clone)]
pub struct Verifier {
    regex: Regex,
    field: String,
}

impl Verifier {
    /// Compile `pattern` for matching against `field`.
    pub fn new(pattern: &str, options: MatchOptions, field: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(options.case_insensitive)
            .multi_line(options.multi_line)
            .dot_matches_new_line(options.dot_matches_new_line)
            .ignore_whitespace(options.extended)
            .build()
            .map_err(|e| SiftError::invalid_pattern(pattern, e.to_string()))?;

        Ok(Verifier {
            regex,
            field: field.to_string(),
        })
    }

    /// Check a single document. Missing or non-string values never match.
    pub fn matches(&self, document: &serde_json::Value) -> bool {
        resolve_text(document, &self.field).is_some_and(|text| self.regex.is_match(text))
    }

    /// Positions of every matching document in the collection.
    pub fn verify_all(&self, collection: &Collection, parallel_threshold: usize) -> Vec<usize> {
        let docs = collection.documents();
        if docs.len() >= parallel_threshold {
            docs.par_iter()
                .enumerate()
                .filter(|(_, doc)| self.matches(doc))
                .map(|(pos, _)| pos)
                .collect()
        } else {
            docs.iter()
                .enumerate()
                .filter(|(_, doc)| self.matches(doc))
                .map(|(pos, _)| pos)
                .collect()
        }
    }

    /// Positions among `candidates` whose documents match.
    ///
    /// `candidates` must be in collection order; the output keeps it.
    pub fn verify_candidates(
        &self,
        collection: &Collection,
        candidates: &[usize],
        parallel_threshold: usize,
    ) -> Vec<usize> {
        let check = |pos: &usize| collection.get(*pos).is_some_and(|doc| self.matches(doc));
        if candidates.len() >= parallel_threshold {
            candidates.par_iter().copied().filter(|p| check(p)).collect()
        } else {
            candidates.iter().copied().filter(|p| check(p)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection() -> Collection {
        Collection::from_documents(vec![
            json!({"text": "hello world"}),
            json!({"text": "goodbye"}),
            json!({"text": "HELLO there"}),
            json!({"text": 42}),
            json!({"other": "hello"}),
            json!({"meta": {"body": "nested hello"}}),
        ])
    }

    #[test]
    fn test_parse_options() {
        let opts = MatchOptions::parse("imsx");
        assert!(opts.case_insensitive);
        assert!(opts.multi_line);
        assert!(opts.dot_matches_new_line);
        assert!(opts.extended);

        assert_eq!(MatchOptions::parse("zq"), MatchOptions::default());
        assert_eq!(MatchOptions::parse(""), MatchOptions::default());
    }

    #[test]
    fn test_case_sensitive_by_default() {
        let verifier = Verifier::new("hello", MatchOptions::default(), "text").unwrap();
        assert_eq!(verifier.verify_all(&collection(), usize::MAX), vec![0]);
    }

    #[test]
    fn test_case_insensitive_option() {
        let verifier = Verifier::new("hello", MatchOptions::parse("i"), "text").unwrap();
        assert_eq!(verifier.verify_all(&collection(), usize::MAX), vec![0, 2]);
    }

    #[test]
    fn test_nested_field() {
        let verifier = Verifier::new("hello", MatchOptions::default(), "meta.body").unwrap();
        assert_eq!(verifier.verify_all(&collection(), usize::MAX), vec![5]);
    }

    #[test]
    fn test_non_string_never_matches() {
        let verifier = Verifier::new("42", MatchOptions::default(), "text").unwrap();
        assert!(verifier.verify_all(&collection(), usize::MAX).is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Verifier::new("(unbalanced", MatchOptions::default(), "text").unwrap_err();
        assert!(err.is_query_error());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let verifier = Verifier::new("(?i)hello", MatchOptions::default(), "text").unwrap();
        let c = collection();
        assert_eq!(verifier.verify_all(&c, 0), verifier.verify_all(&c, usize::MAX));
    }

    #[test]
    fn test_verify_candidates_keeps_order() {
        let verifier = Verifier::new("o", MatchOptions::default(), "text").unwrap();
        let c = collection();
        assert_eq!(verifier.verify_candidates(&c, &[0, 1, 3, 99], usize::MAX), vec![0, 1]);
        assert_eq!(verifier.verify_candidates(&c, &[0, 1, 3, 99], 0), vec![0, 1]);
    }

    #[test]
    fn test_multi_line_option() {
        let c = Collection::from_documents(vec![json!({"text": "first\nsecond"})]);
        let anchored = Verifier::new("^second$", MatchOptions::default(), "text").unwrap();
        assert!(anchored.verify_all(&c, usize::MAX).is_empty());

        let multi = Verifier::new("^second$", MatchOptions::parse("m"), "text").unwrap();
        assert_eq!(multi.verify_all(&c, usize::MAX), vec![0]);
    }
}
