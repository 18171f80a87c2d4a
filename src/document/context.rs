/*!
 * Per-run document context.
 *
 * Built once per run, discarded at run end. Holds the resolved metadata, one
 * slide synopsis per slide (disambiguation context for semantic questions,
 * never a fact source), and the two memoization caches shared by all check
 * modules. Cache invariant: a given term or slide number is resolved by at
 * most one external semantic call per run; concurrent misses on the same key
 * are coalesced.
 */

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;

use crate::document::model::{Document, DocumentMetadata, MetadataOverrides};
use crate::errors::EngineError;
use crate::text_utils::truncate_text;

/// Maximum synopsis length per slide
const SUMMARY_CHARS: usize = 200;

/// Category of a mentioned term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermType {
    /// A tradable security
    Security,
    /// A service provider (custodian, auditor, index sponsor)
    ServiceProvider,
    /// A general financial concept
    Concept,
    /// Excluded from classification (fund family, common word, month name)
    Excluded,
    /// Classification failed; treated conservatively
    Unknown,
}

/// Cached classification of a term
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermClassification {
    /// Category
    pub term_type: TermType,
    /// Whether the term is treated as a security
    pub is_security: bool,
    /// Confidence 0-100
    pub confidence: u8,
}

/// What a slide's performance statements are about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideSubject {
    /// The fund itself
    Fund,
    /// The broader market
    Market,
    /// No performance-like content
    None,
}

/// Cached subject resolution for a slide
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectResolution {
    /// Resolved subject
    pub subject: SlideSubject,
    /// Confidence 0-100
    pub confidence: u8,
}

/// Hit/miss statistics for one cache
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: usize,
    /// Lookups that triggered a computation
    pub misses: usize,
}

/// Aggregated statistics for the run, surfaced in the report
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ContextStats {
    /// Classification cache statistics
    pub classification: CacheStats,
    /// Subject cache statistics
    pub subject: CacheStats,
    /// Total semantic analyzer calls made during the run
    pub semantic_calls: usize,
}

/// Concurrent insert-if-absent map with in-flight coalescing.
///
/// A cache miss creates one `OnceCell` per key; concurrent misses on the same
/// key await the first caller's in-flight computation, preserving the
/// at-most-one-computation-per-key invariant under concurrency.
pub struct SingleFlightCache<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Get the cached value, or compute and insert it.
    ///
    /// The computation runs at most once per key; concurrent callers on the
    /// same key wait for the first one's result.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut cells = self.cells.lock();
            Arc::clone(cells.entry(key).or_insert_with(|| Arc::new(OnceCell::new())))
        };

        if cell.initialized() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        cell.get_or_init(compute).await.clone()
    }

    /// Peek at a resolved value without computing
    pub fn get(&self, key: &K) -> Option<V> {
        let cells = self.cells.lock();
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Number of resolved entries
    pub fn len(&self) -> usize {
        let cells = self.cells.lock();
        cells.values().filter(|cell| cell.initialized()).count()
    }

    /// Whether no entries are resolved
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit/miss statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<K, V> Default for SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// One-line synopsis of a slide
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideSummary {
    /// Slide number
    pub slide_number: u32,
    /// First ~200 characters of normalized slide text
    pub synopsis: String,
}

/// Per-run mutable state shared by all check modules.
///
/// Mutated only by the entity classifier and the performance checks; read by
/// every module. Passed by reference into every module and classifier call.
pub struct DocumentContext {
    /// Resolved metadata (document values merged with overrides)
    pub metadata: DocumentMetadata,

    /// One synopsis per slide, built before any check runs
    pub slide_summaries: Vec<SlideSummary>,

    /// Hex sha256 of the canonicalized document
    pub fingerprint: String,

    /// term (normalized) -> classification
    pub classification_cache: SingleFlightCache<String, TermClassification>,

    /// slide number -> performance subject
    pub subject_cache: SingleFlightCache<u32, SubjectResolution>,

    semantic_calls: AtomicUsize,
}

impl DocumentContext {
    /// Build the context for a run.
    ///
    /// Validates the document's minimal shape first; a failure here aborts the
    /// run before any module starts. Override values fill metadata fields the
    /// document left blank.
    pub fn build(
        document: &Document,
        overrides: Option<&MetadataOverrides>,
    ) -> Result<Self, EngineError> {
        document.validate()?;

        let mut metadata = document.document_metadata.clone();
        if let Some(overrides) = overrides {
            overrides.apply(&mut metadata);
        }

        let slide_summaries = document
            .body_slides
            .iter()
            .map(|slide| {
                let text = slide.all_text().split_whitespace().collect::<Vec<_>>().join(" ");
                SlideSummary {
                    slide_number: slide.slide_number,
                    synopsis: truncate_text(&text, SUMMARY_CHARS),
                }
            })
            .collect();

        Ok(Self {
            metadata,
            slide_summaries,
            fingerprint: document.fingerprint(),
            classification_cache: SingleFlightCache::new(),
            subject_cache: SingleFlightCache::new(),
            semantic_calls: AtomicUsize::new(0),
        })
    }

    /// Synopsis for a slide, if any
    pub fn summary(&self, slide_number: u32) -> Option<&str> {
        self.slide_summaries
            .iter()
            .find(|s| s.slide_number == slide_number)
            .map(|s| s.synopsis.as_str())
    }

    /// Record one semantic analyzer call
    pub fn record_semantic_call(&self) {
        self.semantic_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Run statistics for the report
    pub fn stats(&self) -> ContextStats {
        ContextStats {
            classification: self.classification_cache.stats(),
            subject: self.subject_cache.stats(),
            semantic_calls: self.semantic_calls.load(Ordering::Relaxed),
        }
    }
}
