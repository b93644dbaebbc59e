//! Literal extraction from regex patterns.
//!
//! A literal is a run of pattern characters that every match must contain
//! verbatim. Extraction is a single left-to-right scan that treats anything
//! it cannot prove mandatory as a run break:
//!
//! - a top-level `|` makes every fragment optional, so nothing is returned
//! - group bodies and character classes are skipped whole
//! - `*`, `?` and `{..}` drop the atom they quantify; `+` keeps it
//! - escape classes (`\d`, `\b`, ...) and `.`, `^`, `$` break runs
//! - inline flags and extended mode can change what a literal means, so
//!   they disable extraction
//!
//! The scan never fails. Malformed patterns come back with no literals and
//! the verifier reports the compile error.

use crate::verify::MatchOptions;

/// Characters counted towards the complexity score.
const METACHARACTERS: &[char] = &[
    '.', '*', '+', '?', '^', '$', '{', '}', '(', ')', '|', '[', ']', '\\',
];

/// Result of scanning a pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternLiterals {
    /// Distinct literals, in pattern order
    pub literals: Vec<String>,

    /// Pattern length plus metacharacter count
    pub complexity: usize,
}

impl PatternLiterals {
    /// Literals whose folded length reaches `min_len`.
    pub fn usable(&self, min_len: usize) -> impl Iterator<Item = &str> + '_ {
        self.literals
            .iter()
            .map(String::as_str)
            .filter(move |l| crate::trigram::folded_len(l) >= min_len)
    }

    /// Longest literal, if any.
    pub fn longest(&self) -> Option<&str> {
        self.literals
            .iter()
            .max_by_key(|l| l.chars().count())
            .map(String::as_str)
    }
}

/// Complexity score: character count plus metacharacter count.
pub fn complexity(pattern: &str) -> usize {
    pattern.chars().count() + pattern.chars().filter(|c| METACHARACTERS.contains(c)).count()
}

/// Extract the literals `pattern` is certain to require.
pub fn extract(pattern: &str, options: &MatchOptions) -> PatternLiterals {
    let complexity = complexity(pattern);
    let literals = if options.extended {
        Vec::new()
    } else {
        Scanner::new(pattern, options.case_insensitive)
            .run()
            .unwrap_or_default()
    };

    PatternLiterals {
        literals,
        complexity,
    }
}

/// Left-to-right literal scanner.
///
/// `run` returns `None` when the pattern is malformed or uses a construct
/// that makes every fragment uncertain.
struct Scanner {
    chars: Vec<char>,
    pos: usize,
    /// Split runs at non-ASCII characters (case-insensitive mode)
    ascii_only: bool,
    current: String,
    found: Vec<String>,
}

impl Scanner {
    fn new(pattern: &str, ascii_only: bool) -> Self {
        Scanner {
            chars: pattern.chars().collect(),
            pos: 0,
            ascii_only,
            current: String::new(),
            found: Vec::new(),
        }
    }

    fn run(mut self) -> Option<Vec<String>> {
        while let Some(c) = self.bump() {
            match c {
                '|' => return None,
                ')' => return None,
                '(' => {
                    self.flush();
                    self.skip_group()?;
                }
                '[' => {
                    self.flush();
                    self.skip_class()?;
                }
                '\\' => {
                    let next = self.bump()?;
                    // `\<` and `\>` are word-boundary assertions, not characters
                    if next.is_ascii_punctuation() && next != '<' && next != '>' {
                        self.push_literal(next);
                    } else {
                        self.flush();
                        self.skip_escape_payload(next);
                    }
                }
                '*' | '?' => self.drop_quantified(),
                '{' => {
                    self.drop_quantified();
                    self.skip_repetition();
                }
                '+' => self.flush(),
                '.' | '^' | '$' => self.flush(),
                other => self.push_literal(other),
            }
        }
        self.flush();

        let mut distinct: Vec<String> = Vec::with_capacity(self.found.len());
        for literal in self.found {
            if !distinct.contains(&literal) {
                distinct.push(literal);
            }
        }
        Some(distinct)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        Some(c)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn push_literal(&mut self, c: char) {
        if self.ascii_only && !c.is_ascii() {
            self.flush();
            return;
        }
        self.current.push(c);
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.found.push(std::mem::take(&mut self.current));
        }
    }

    /// The preceding atom may occur zero times: forget it and end the run.
    fn drop_quantified(&mut self) {
        self.current.pop();
        self.flush();
    }

    /// Skip to the matching `)`. The opening paren is already consumed.
    fn skip_group(&mut self) -> Option<()> {
        if self.peek() == Some('?') {
            // `(?:` and named groups are fine to skip; flag groups are not
            let flag = self.chars.get(self.pos + 1).copied()?;
            if flag.is_ascii_alphabetic() || flag == '-' {
                let named = flag == 'P' && self.chars.get(self.pos + 2) == Some(&'<');
                if !named {
                    return None;
                }
            }
        }

        let mut depth = 1usize;
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump()?;
                }
                '[' => self.skip_class()?,
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(());
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Skip to the closing `]`. The opening bracket is already consumed.
    ///
    /// A `]` directly after `[` or `[^` is literal, and nested classes
    /// (`[a-z&&[^x]]`) are tracked.
    fn skip_class(&mut self) -> Option<()> {
        if self.peek() == Some('^') {
            self.pos += 1;
        }
        if self.peek() == Some(']') {
            self.pos += 1;
        }
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump()?;
                }
                '[' => {
                    if self.peek() == Some(':') {
                        // POSIX class like [:alpha:]
                        while let Some(inner) = self.bump() {
                            if inner == ']' {
                                break;
                            }
                        }
                    } else {
                        self.skip_class()?;
                    }
                }
                ']' => return Some(()),
                _ => {}
            }
        }
        None
    }

    /// Consume the characters that belong to an escape like `\x41`, `\u{263A}`
    /// or `\pL`, so they are not mistaken for literal text.
    fn skip_escape_payload(&mut self, kind: char) {
        let fixed = match kind {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            'p' | 'P' => 1,
            _ => return,
        };
        if self.peek() == Some('{') {
            self.pos += 1;
            self.skip_repetition();
            return;
        }
        for _ in 0..fixed {
            if self.bump().is_none() {
                break;
            }
        }
    }

    /// Skip a `{n}`, `{n,}` or `{n,m}` body. The `{` is already consumed.
    fn skip_repetition(&mut self) {
        while let Some(c) = self.bump() {
            if c == '}' {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lits(pattern: &str) -> Vec<String> {
        extract(pattern, &MatchOptions::default()).literals
    }

    fn lits_ci(pattern: &str) -> Vec<String> {
        extract(pattern, &MatchOptions::parse("i")).literals
    }

    #[test]
    fn test_plain_literal() {
        assert_eq!(lits("hello"), vec!["hello"]);
    }

    #[test]
    fn test_metacharacters_split_runs() {
        assert_eq!(lits("foo.bar"), vec!["foo", "bar"]);
        assert_eq!(lits("^start$"), vec!["start"]);
        assert_eq!(lits(r"abc\d+def"), vec!["abc", "def"]);
    }

    #[test]
    fn test_quantifiers() {
        assert_eq!(lits("colou?r"), vec!["colo", "r"]);
        assert_eq!(lits("abc*def"), vec!["ab", "def"]);
        assert_eq!(lits("abc+def"), vec!["abc", "def"]);
        assert_eq!(lits("abc{2,3}def"), vec!["ab", "def"]);
        assert_eq!(lits("abc+?def"), vec!["abc", "def"]);
        assert_eq!(lits("abc*?def"), vec!["ab", "def"]);
    }

    #[test]
    fn test_escaped_punctuation_is_literal() {
        assert_eq!(lits(r"file\.txt"), vec!["file.txt"]);
        assert_eq!(lits(r"a\.*b"), vec!["a", "b"]);
    }

    #[test]
    fn test_escape_payloads_are_not_literal() {
        assert_eq!(lits(r"ab\x41cd"), vec!["ab", "cd"]);
        assert_eq!(lits(r"ab\x{41}cd"), vec!["ab", "cd"]);
        assert_eq!(lits(r"ab\u263Acd"), vec!["ab", "cd"]);
        assert_eq!(lits(r"ab\pLcd"), vec!["ab", "cd"]);
        assert_eq!(lits(r"ab\p{Greek}cd"), vec!["ab", "cd"]);
        assert_eq!(lits(r"ab\bcd"), vec!["ab", "cd"]);
        assert_eq!(lits(r"foo \<bar\>"), vec!["foo ", "bar"]);
        assert_eq!(lits(r"\<word\>s"), vec!["word", "s"]);
        assert_eq!(lits(r"a\.b\<c"), vec!["a.b", "c"]);
    }

    #[test]
    fn test_alternation_yields_nothing() {
        assert!(lits("cat|dog").is_empty());
        assert!(lits("prefix(a|b)|other").is_empty());
    }

    #[test]
    fn test_groups_are_skipped() {
        assert_eq!(lits("hello (big|small) world"), vec!["hello ", " world"]);
        assert_eq!(lits("(?:abc)+xyz"), vec!["xyz"]);
        assert_eq!(lits("(?P<name>abc)def"), vec!["def"]);
        assert_eq!(lits("a((b)c)d"), vec!["a", "d"]);
    }

    #[test]
    fn test_classes_are_skipped() {
        assert_eq!(lits("abc[xyz]def"), vec!["abc", "def"]);
        assert_eq!(lits("abc[]x]def"), vec!["abc", "def"]);
        assert_eq!(lits(r"abc[\]]def"), vec!["abc", "def"]);
        assert_eq!(lits("abc[[:alpha:]]def"), vec!["abc", "def"]);
        assert_eq!(lits("abc[a-z&&[^x]]def"), vec!["abc", "def"]);
    }

    #[test]
    fn test_inline_flags_disable_extraction() {
        assert!(lits("(?i)hello").is_empty());
        assert!(lits("abc(?x: d e f)").is_empty());
    }

    #[test]
    fn test_extended_mode_disables_extraction() {
        let out = extract("hello world", &MatchOptions::parse("x"));
        assert!(out.literals.is_empty());
    }

    #[test]
    fn test_malformed_patterns_degrade() {
        assert!(lits("(unclosed").is_empty());
        assert!(lits("unopened)").is_empty());
        assert!(lits("[unclosed").is_empty());
        assert!(lits("trailing\\").is_empty());
    }

    #[test]
    fn test_case_insensitive_splits_non_ascii() {
        assert_eq!(lits_ci("caféteria"), vec!["caf", "teria"]);
        assert_eq!(lits("caféteria"), vec!["caféteria"]);
    }

    #[test]
    fn test_duplicates_removed() {
        assert_eq!(lits("abc.abc.def"), vec!["abc", "def"]);
    }

    #[test]
    fn test_complexity() {
        assert_eq!(complexity("hello"), 5);
        assert_eq!(complexity(".*"), 4);
        assert_eq!(complexity(r"a\.b"), 6);
    }

    #[test]
    fn test_usable_and_longest() {
        let out = extract("ab.hello.xyz", &MatchOptions::default());
        let usable: Vec<&str> = out.usable(3).collect();
        assert_eq!(usable, vec!["hello", "xyz"]);
        assert_eq!(out.longest(), Some("hello"));
    }
}
