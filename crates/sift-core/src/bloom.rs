//! Per-document Bloom filters over trigrams.
//!
//! Every indexed document owns one fixed-size bit array. Bits are set with
//! `fetch_or` on 64-bit words, so concurrent builders inserting into the same
//! document commute and never lose bits. A probe that returns `false` proves
//! the trigram never occurred in the document's text.

use crate::trigram::{for_each_trigram, Trigram};
use crate::types::DocumentId;
use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Bloom bit array for a single document.
#[derive(Debug)]
pub struct DocumentFilter {
    words: Box<[AtomicU64]>,
    num_bits: usize,
    num_hashes: u32,
}

impl DocumentFilter {
    /// Create an empty filter of `size_bytes` bytes with `num_hashes` hash
    /// functions. Zero values are clamped to 1.
    pub fn new(size_bytes: usize, num_hashes: u32) -> Self {
        let num_bits = size_bytes.max(1) * 8;
        let num_words = num_bits.div_ceil(64);
        DocumentFilter {
            words: (0..num_words).map(|_| AtomicU64::new(0)).collect(),
            num_bits,
            num_hashes: num_hashes.max(1),
        }
    }

    /// Set the bits for one trigram.
    pub fn insert(&self, gram: &Trigram) {
        for seed in 0..self.num_hashes {
            let (word, mask) = self.position(gram, seed);
            self.words[word].fetch_or(mask, Ordering::Relaxed);
        }
    }

    /// Insert every trigram of `text`.
    pub fn insert_text(&self, text: &str) {
        for_each_trigram(text, |gram| self.insert(gram));
    }

    /// Check if a trigram might be present.
    ///
    /// Returns `false` only if the trigram is definitely absent.
    pub fn contains(&self, gram: &Trigram) -> bool {
        (0..self.num_hashes).all(|seed| {
            let (word, mask) = self.position(gram, seed);
            self.words[word].load(Ordering::Relaxed) & mask != 0
        })
    }

    /// Fraction of bits currently set.
    pub fn fill_ratio(&self) -> f64 {
        let set: u64 = self
            .words
            .iter()
            .map(|w| u64::from(w.load(Ordering::Relaxed).count_ones()))
            .sum();
        set as f64 / self.num_bits as f64
    }

    /// Standard approximation: probability all `k` probed bits are set.
    pub fn estimated_fpr(&self) -> f64 {
        self.fill_ratio().powi(self.num_hashes as i32)
    }

    /// Bytes held by the bit array.
    pub fn memory_bytes(&self) -> usize {
        self.words.len() * std::mem::size_of::<AtomicU64>()
    }

    fn position(&self, gram: &Trigram, seed: u32) -> (usize, u64) {
        let bit = (hash_with_seed(gram, seed) % self.num_bits as u64) as usize;
        (bit / 64, 1u64 << (bit % 64))
    }
}

/// Hash with seed for multiple hash functions.
fn hash_with_seed(gram: &Trigram, seed: u32) -> u64 {
    let mut hasher = FxHasher::default();
    seed.hash(&mut hasher);
    gram.hash(&mut hasher);
    hasher.finish()
}

/// Bloom filters for every indexed document of one (collection, field).
///
/// Documents with no text at the field are never inserted and therefore
/// absent; the planner treats absence as "cannot match".
#[derive(Debug)]
pub struct BloomIndex {
    filters: DashMap<DocumentId, Arc<DocumentFilter>>,
    size_bytes: usize,
    num_hashes: u32,
}

impl BloomIndex {
    /// Create an empty index whose filters use the given sizing.
    pub fn new(size_bytes: usize, num_hashes: u32) -> Self {
        BloomIndex {
            filters: DashMap::new(),
            size_bytes: size_bytes.max(1),
            num_hashes: num_hashes.max(1),
        }
    }

    /// Create an index with room for `capacity` documents.
    pub fn with_capacity(size_bytes: usize, num_hashes: u32, capacity: usize) -> Self {
        BloomIndex {
            filters: DashMap::with_capacity(capacity),
            size_bytes: size_bytes.max(1),
            num_hashes: num_hashes.max(1),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Record every trigram of `text` for `id`. Idempotent.
    pub fn insert(&self, id: DocumentId, text: &str) {
        let filter = self.filter_for(id);
        filter.insert_text(text);
    }

    /// Check whether `id` might contain `gram`. Unknown documents return
    /// `false`.
    pub fn probe(&self, id: &DocumentId, gram: &Trigram) -> bool {
        self.filters
            .get(id)
            .is_some_and(|filter| filter.contains(gram))
    }

    /// AND of [`probe`](Self::probe) across `grams`, or `None` if the
    /// document was never indexed.
    pub fn probe_all(&self, id: &DocumentId, grams: &[Trigram]) -> Option<bool> {
        let filter = self.filters.get(id)?;
        Some(grams.iter().all(|g| filter.contains(g)))
    }

    /// Whether `id` has an entry.
    pub fn contains_document(&self, id: &DocumentId) -> bool {
        self.filters.contains_key(id)
    }

    /// Mean estimated false-positive rate across documents.
    ///
    /// Diagnostics only; never consulted for correctness.
    pub fn estimate_false_positive_rate(&self) -> f64 {
        let count = self.filters.len();
        if count == 0 {
            return 0.0;
        }
        let total: f64 = self.filters.iter().map(|e| e.value().estimated_fpr()).sum();
        total / count as f64
    }

    /// Mean fill ratio across documents.
    pub fn fill_ratio(&self) -> f64 {
        let count = self.filters.len();
        if count == 0 {
            return 0.0;
        }
        let total: f64 = self.filters.iter().map(|e| e.value().fill_ratio()).sum();
        total / count as f64
    }

    /// Approximate bytes held by the bit arrays.
    pub fn memory_bytes(&self) -> usize {
        self.filters.iter().map(|e| e.value().memory_bytes()).sum()
    }

    /// Drop all per-document state.
    pub fn clear(&self) {
        self.filters.clear();
    }

    fn filter_for(&self, id: DocumentId) -> Arc<DocumentFilter> {
        if let Some(existing) = self.filters.get(&id) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .filters
            .entry(id)
            .or_insert_with(|| Arc::new(DocumentFilter::new(self.size_bytes, self.num_hashes)));
        Arc::clone(entry.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigram::trigrams;

    fn pos(i: usize) -> DocumentId {
        DocumentId::Position(i)
    }

    #[test]
    fn test_insert_and_probe() {
        let index = BloomIndex::new(256, 3);
        index.insert(pos(0), "hello world");

        for gram in trigrams("hello") {
            assert!(index.probe(&pos(0), &gram));
        }
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_unknown_document_probes_false() {
        let index = BloomIndex::new(256, 3);
        index.insert(pos(0), "hello");

        let gram = trigrams("hel")[0];
        assert!(!index.probe(&pos(1), &gram));
        assert_eq!(index.probe_all(&pos(1), &[gram]), None);
    }

    #[test]
    fn test_absent_trigram_probes_false() {
        let index = BloomIndex::new(1024, 3);
        index.insert(pos(0), "hello");

        let absent = trigrams("xyz")[0];
        assert!(!index.probe(&pos(0), &absent));
    }

    #[test]
    fn test_no_false_negatives() {
        let index = BloomIndex::new(16, 4);
        let text = "the quick brown fox jumps over the lazy dog 0123456789";
        index.insert(pos(0), text);

        let grams = trigrams(text);
        assert_eq!(index.probe_all(&pos(0), &grams), Some(true));
    }

    #[test]
    fn test_insert_idempotent() {
        let once = BloomIndex::new(64, 3);
        let twice = BloomIndex::new(64, 3);
        once.insert(pos(0), "abcdefgh");
        twice.insert(pos(0), "abcdefgh");
        twice.insert(pos(0), "abcdefgh");

        let a = once.filters.get(&pos(0)).unwrap();
        let b = twice.filters.get(&pos(0)).unwrap();
        let bits_a: Vec<u64> = a.words.iter().map(|w| w.load(Ordering::Relaxed)).collect();
        let bits_b: Vec<u64> = b.words.iter().map(|w| w.load(Ordering::Relaxed)).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn test_empty_text_registers_document() {
        let index = BloomIndex::new(32, 2);
        index.insert(pos(3), "");
        assert!(index.contains_document(&pos(3)));
        assert_eq!(index.fill_ratio(), 0.0);
    }

    #[test]
    fn test_false_positive_estimate_grows_with_fill() {
        let index = BloomIndex::new(8, 2);
        assert_eq!(index.estimate_false_positive_rate(), 0.0);

        index.insert(pos(0), "ab");
        let empty_fpr = index.estimate_false_positive_rate();
        index.insert(pos(0), "a fairly long sentence that sets many bits in a tiny filter");
        let full_fpr = index.estimate_false_positive_rate();

        assert_eq!(empty_fpr, 0.0);
        assert!(full_fpr > empty_fpr);
        assert!(full_fpr <= 1.0);
    }

    #[test]
    fn test_zero_sizing_is_clamped() {
        let filter = DocumentFilter::new(0, 0);
        let gram = trigrams("abc")[0];
        filter.insert(&gram);
        assert!(filter.contains(&gram));
        assert_eq!(filter.memory_bytes(), 8);
    }

    #[test]
    fn test_concurrent_inserts_commute() {
        let index = Arc::new(BloomIndex::new(128, 3));
        let texts = ["alpha beta", "gamma delta", "epsilon zeta", "eta theta"];

        std::thread::scope(|scope| {
            for text in texts {
                let index = Arc::clone(&index);
                scope.spawn(move || index.insert(pos(0), text));
            }
        });

        for text in texts {
            assert_eq!(index.probe_all(&pos(0), &trigrams(text)), Some(true));
        }
    }

    #[test]
    fn test_clear() {
        let index = BloomIndex::new(64, 3);
        index.insert(pos(0), "hello");
        index.clear();
        assert!(index.is_empty());
        assert!(!index.probe(&pos(0), &trigrams("hello")[0]));
    }
}
