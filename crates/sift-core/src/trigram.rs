//! Trigram generation.
//!
//! Text and literals are folded character by character before windows are
//! taken, and the same fold is applied on both the index side and the query
//! side. Per-character folding maps substrings to substrings, so a literal
//! present in the original text is still present in the folded text.

use rustc_hash::FxHashSet;

/// A 3-character window of folded text.
pub type Trigram = [char; 3];

/// Fold one character into `out`.
///
/// Lowercases, and maps the long s to `s` because case-insensitive regex
/// matching treats them as equal while `to_lowercase` does not.
fn fold_char(c: char, out: &mut Vec<char>) {
    if c == 'ſ' {
        out.push('s');
        return;
    }
    out.extend(c.to_lowercase());
}

/// Fold a string into the character sequence trigrams are taken from.
pub fn fold(text: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        fold_char(c, &mut out);
    }
    out
}

/// Distinct trigrams of `text`, in first-seen order.
///
/// Text shorter than 3 folded characters yields nothing.
///
/// # Example
///
/// ```
/// use sift_core::trigram::trigrams;
///
/// let grams = trigrams("Hello");
/// assert_eq!(grams, vec![['h', 'e', 'l'], ['e', 'l', 'l'], ['l', 'l', 'o']]);
/// ```
pub fn trigrams(text: &str) -> Vec<Trigram> {
    let folded = fold(text);
    if folded.len() < 3 {
        return Vec::new();
    }

    let mut seen = FxHashSet::default();
    let mut out = Vec::with_capacity(folded.len() - 2);
    for window in folded.windows(3) {
        let gram = [window[0], window[1], window[2]];
        if seen.insert(gram) {
            out.push(gram);
        }
    }
    out
}

/// Iterate every trigram of `text` without deduplication.
///
/// Used on the indexing path where insertion is idempotent anyway and the
/// extra set would only cost allocations.
pub fn for_each_trigram(text: &str, mut f: impl FnMut(&Trigram)) {
    let folded = fold(text);
    for window in folded.windows(3) {
        f(&[window[0], window[1], window[2]]);
    }
}

/// Distinct trigrams across several literals, in first-seen order.
pub fn trigrams_of_all<'a, I>(literals: I) -> Vec<Trigram>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for literal in literals {
        for gram in trigrams(literal) {
            if seen.insert(gram) {
                out.push(gram);
            }
        }
    }
    out
}

/// Length of a literal after folding, the unit trigram eligibility is
/// measured in.
pub fn folded_len(text: &str) -> usize {
    fold(text).len()
}

/// Render a trigram back to a string for reports.
pub fn to_string(gram: &Trigram) -> String {
    gram.iter().collect()
}
