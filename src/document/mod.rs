/*!
 * Document model and per-run context.
 *
 * - `model`: the immutable marketing document as loaded from JSON
 * - `context`: per-run mutable state (slide summaries, semantic caches)
 */

pub mod context;
pub mod model;

pub use context::{
    CacheStats, ContextStats, DocumentContext, SingleFlightCache, SlideSubject, SlideSummary,
    SubjectResolution, TermClassification, TermType,
};
pub use model::{
    ClientType, Document, DocumentMetadata, EsgTier, MetadataOverrides, PageContent, Slide,
    SlideTable,
};
