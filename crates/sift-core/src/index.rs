//! Lazily built Bloom indexes.
//!
//! The `IndexBuilder` owns every [`BloomIndex`] the operator has built, keyed
//! by collection instance, field path and sizing. Each entry remembers the
//! collection generation it was built from; a query against a newer
//! generation rebuilds the entry instead of serving stale bits.
//!
//! ## Architecture
//!
//! - A `DashMap<IndexKey, Arc<BuiltIndex>>` holds the cached indexes so
//!   concurrent queries on different collections never contend
//! - Builds run outside the map lock; two racing builders produce identical
//!   bit arrays, and the later one simply replaces the earlier entry
//! - Large collections are indexed in parallel with Rayon
//! - Entries hold a `Weak` liveness token of their collection; entries whose
//!   collection has been dropped are pruned before every build

use crate::bloom::BloomIndex;
use crate::types::{resolve_text, Collection, CollectionId, DocumentId};
use dashmap::DashMap;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument};

/// Bit-array sizing an index was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexSizing {
    pub size_bytes: usize,
    pub hash_functions: u32,
}

/// Cache key: one index per (collection instance, field, sizing).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey {
    pub collection: CollectionId,
    pub field: String,
    pub sizing: IndexSizing,
}

/// A built index plus the state it was built from.
#[derive(Debug)]
pub struct BuiltIndex {
    pub bloom: BloomIndex,
    /// Collection generation at build time
    pub generation: u64,
    /// Field the index covers
    pub field: String,
    /// Identifier field used to resolve document identities
    pub id_field: String,
    /// Documents whose field resolved to a string
    pub indexed_documents: usize,
    /// Dead once the source collection is dropped
    owner: Weak<()>,
}

impl BuiltIndex {
    /// Whether the collection this index was built from still exists.
    pub fn is_live(&self) -> bool {
        self.owner.strong_count() > 0
    }
}

/// Builds and caches Bloom indexes for (collection, field) pairs.
pub struct IndexBuilder {
    indexes: DashMap<IndexKey, Arc<BuiltIndex>>,

    /// Number of builds performed since creation
    builds: AtomicU64,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        IndexBuilder {
            indexes: DashMap::new(),
            builds: AtomicU64::new(0),
        }
    }

    /// Number of cached indexes.
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Number of builds performed since creation.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    /// Return an index for `field` that reflects the collection's current
    /// generation, building one if needed.
    ///
    /// The boolean is `true` when a build happened on this call.
    pub fn ensure(
        &self,
        collection: &Collection,
        field: &str,
        id_field: &str,
        sizing: IndexSizing,
        parallel_threshold: usize,
    ) -> (Arc<BuiltIndex>, bool) {
        let key = IndexKey {
            collection: collection.id(),
            field: field.to_string(),
            sizing,
        };
        let generation = collection.generation();

        if let Some(existing) = self.indexes.get(&key) {
            if existing.generation == generation && existing.id_field == id_field {
                return (Arc::clone(existing.value()), false);
            }
            debug!(
                collection = %key.collection,
                field = %field,
                built = existing.generation,
                current = generation,
                "Cached index is stale"
            );
        }

        let built = Arc::new(self.build(collection, field, id_field, sizing, parallel_threshold));
        self.prune_dropped();
        self.indexes.insert(key, Arc::clone(&built));
        (built, true)
    }

    /// Build a fresh index without caching it.
    #[instrument(skip(self, collection), fields(collection = %collection.id(), docs = collection.len()))]
    pub fn build(
        &self,
        collection: &Collection,
        field: &str,
        id_field: &str,
        sizing: IndexSizing,
        parallel_threshold: usize,
    ) -> BuiltIndex {
        let generation = collection.generation();
        let docs = collection.documents();
        let bloom = BloomIndex::with_capacity(sizing.size_bytes, sizing.hash_functions, docs.len());

        let index_one = |(pos, doc): (usize, &serde_json::Value)| -> usize {
            match resolve_text(doc, field) {
                Some(text) => {
                    bloom.insert(DocumentId::resolve(doc, pos, id_field), text);
                    1
                }
                None => 0,
            }
        };

        let indexed_documents: usize = if docs.len() >= parallel_threshold {
            docs.par_iter().enumerate().map(index_one).sum()
        } else {
            docs.iter().enumerate().map(index_one).sum()
        };

        self.builds.fetch_add(1, Ordering::Relaxed);

        info!(
            field = %field,
            indexed = indexed_documents,
            size_bytes = sizing.size_bytes,
            hashes = sizing.hash_functions,
            memory_bytes = bloom.memory_bytes(),
            "Bloom index built"
        );

        BuiltIndex {
            bloom,
            generation,
            field: field.to_string(),
            id_field: id_field.to_string(),
            indexed_documents,
            owner: collection.liveness(),
        }
    }

    /// Drop every index whose collection no longer exists.
    ///
    /// Returns the number of entries removed.
    pub fn prune_dropped(&self) -> usize {
        let before = self.indexes.len();
        self.indexes.retain(|_, index| index.is_live());
        let dropped = before.saturating_sub(self.indexes.len());
        if dropped > 0 {
            debug!(dropped = dropped, "Pruned indexes of dropped collections");
        }
        dropped
    }

    /// Get a cached index without building.
    pub fn get(&self, key: &IndexKey) -> Option<Arc<BuiltIndex>> {
        self.indexes.get(key).map(|e| Arc::clone(e.value()))
    }

    /// Drop every index built for `collection`.
    pub fn invalidate(&self, collection: CollectionId) {
        let before = self.indexes.len();
        self.indexes.retain(|key, _| key.collection != collection);
        debug!(
            collection = %collection,
            dropped = before.saturating_sub(self.indexes.len()),
            "Invalidated collection indexes"
        );
    }

    /// Drop every cached index.
    pub fn clear(&self) {
        self.indexes.clear();
    }

    /// Approximate bytes held by all cached bit arrays.
    pub fn memory_bytes(&self) -> usize {
        self.indexes.iter().map(|e| e.value().bloom.memory_bytes()).sum()
    }
}

impl std::fmt::Debug for IndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("indexes", &self.len())
            .field("builds", &self.builds())
            .finish()
    }
}
