//! Annotation summary search and its composable expansion pipeline.
//!
//! A [`SearchPipeline`] layers [`SearchStage`]s (results cache, ontology
//! fallback, string expansion) in front of a base [`AnnotationSummarySearch`].
//! Every stage keeps the same request contract so stages can be reordered
//! from configuration.

#[cfg(feature = "cache_inmem")]
pub mod cache;
pub mod expansion;
pub mod fallback;
pub mod pipeline;
pub mod processors;
pub mod service;
pub mod summary;

#[cfg(feature = "cache_inmem")]
pub use cache::CachingStage;
pub use expansion::{
    merge_results, merged_score, StringExpansionStage, DEFAULT_MERGE_LIMIT,
    DEFAULT_PARTIAL_STRING_BOOST,
};
pub use fallback::OntologyFallbackStage;
pub use pipeline::{Next, SearchHandle, SearchPipeline, SearchStage, StageKind};
pub use processors::{
    CompositeProcessor, ConjunctionProcessor, ParenthesesProcessor, ProcessorKind,
    SearchStringProcessor, StopwordProcessor,
};
pub use service::{
    AnnotationSummarySearch, InMemorySummaryIndex, OntologyFilter, SearchError, SearchRequest,
    SearchTarget,
};
pub use summary::{summary_id, AnnotationSummary, ScoredSummaries};
