//! Ordered chain of search stages in front of a base lookup.
//!
//! Each stage receives the request together with a [`Next`] cursor over the
//! stages behind it and decides whether, how often and with which request to
//! call further down. The first configured stage is the outermost one.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{
    expansion::StringExpansionStage,
    fallback::OntologyFallbackStage,
    processors::CompositeProcessor,
    service::{AnnotationSummarySearch, SearchError, SearchRequest},
    summary::AnnotationSummary,
};
use crate::config::{ConfigError, SearchSettings};

/// Type alias simplifying search trait object usage inside the pipeline.
pub type SearchHandle = dyn AnnotationSummarySearch + 'static;

/// One capability layered over the searches behind it.
#[async_trait]
pub trait SearchStage: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    async fn search(
        &self,
        request: &SearchRequest,
        next: Next<'_>,
    ) -> Result<Vec<AnnotationSummary>, SearchError>;
}

/// Cursor over the remaining stages and the base lookup.
#[derive(Copy, Clone)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn SearchStage>],
    base: &'a SearchHandle,
}

impl<'a> Next<'a> {
    /// Runs `request` through the remaining stages.
    pub async fn run(self, request: &SearchRequest) -> Result<Vec<AnnotationSummary>, SearchError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    base: self.base,
                };
                stage.search(request, next).await
            }
            None => self.base.search(request).await,
        }
    }
}

/// Configurable stage kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Results cache keyed by the normalised request.
    Cache,
    /// Secondary ontology search when nothing was found.
    OntologyFallback,
    /// Processed re-queries when nothing was found.
    StringExpansion,
}

/// Search pipeline, itself usable wherever a search is expected.
#[derive(Clone)]
pub struct SearchPipeline {
    stages: Vec<Arc<dyn SearchStage>>,
    base: Arc<SearchHandle>,
}

impl SearchPipeline {
    pub fn new(base: Arc<SearchHandle>) -> Self {
        Self {
            stages: Vec::new(),
            base,
        }
    }

    /// Appends a stage behind the ones already added.
    #[must_use]
    pub fn with_stage(mut self, stage: Arc<dyn SearchStage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Builds the pipeline declared by `settings`.
    ///
    /// `secondary` backs the ontology fallback stage and must be present when
    /// that stage is configured.
    pub fn from_config(
        settings: &SearchSettings,
        base: Arc<SearchHandle>,
        secondary: Option<Arc<SearchHandle>>,
    ) -> Result<Self, ConfigError> {
        let mut pipeline = Self::new(base);
        for kind in &settings.stages {
            let stage: Arc<dyn SearchStage> = match kind {
                StageKind::Cache => cache_stage(settings)?,
                StageKind::OntologyFallback => {
                    let secondary = secondary.clone().ok_or_else(|| {
                        ConfigError::invalid("search.stages", "ontology_fallback requires a secondary search")
                    })?;
                    Arc::new(OntologyFallbackStage::new(secondary))
                }
                StageKind::StringExpansion => Arc::new(StringExpansionStage::new(
                    Arc::new(CompositeProcessor::from_kinds(&settings.processors)),
                    settings.partial_string_boost,
                    settings.merge_limit,
                )),
            };
            pipeline = pipeline.with_stage(stage);
        }
        debug!(
            stages = ?pipeline.stage_names(),
            "search_pipeline_built"
        );
        Ok(pipeline)
    }

    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    fn head(&self) -> Next<'_> {
        Next {
            stages: &self.stages,
            base: self.base.as_ref(),
        }
    }
}

#[cfg(feature = "cache_inmem")]
fn cache_stage(settings: &SearchSettings) -> Result<Arc<dyn SearchStage>, ConfigError> {
    Ok(Arc::new(super::cache::CachingStage::new(&settings.cache)))
}

#[cfg(not(feature = "cache_inmem"))]
fn cache_stage(_settings: &SearchSettings) -> Result<Arc<dyn SearchStage>, ConfigError> {
    Err(ConfigError::invalid(
        "search.stages",
        "the cache stage needs the `cache_inmem` feature",
    ))
}

#[async_trait]
impl AnnotationSummarySearch for SearchPipeline {
    #[instrument(name = "search_pipeline", skip_all, fields(target = ?request.target))]
    async fn search(&self, request: &SearchRequest) -> Result<Vec<AnnotationSummary>, SearchError> {
        self.head().run(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;

    use super::{Next, SearchPipeline, SearchStage, StageKind};
    use crate::{
        config::SearchSettings,
        search::{
            service::{AnnotationSummarySearch, InMemorySummaryIndex, SearchError, SearchRequest},
            summary::AnnotationSummary,
        },
    };

    /// Records the order in which it was entered.
    struct Tracing {
        name: &'static str,
        entered: Arc<AtomicUsize>,
        seen_at: AtomicUsize,
    }

    #[async_trait]
    impl SearchStage for Tracing {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn search(
            &self,
            request: &SearchRequest,
            next: Next<'_>,
        ) -> Result<Vec<AnnotationSummary>, SearchError> {
            let position = self.entered.fetch_add(1, Ordering::SeqCst);
            self.seen_at.store(position, Ordering::SeqCst);
            next.run(request).await
        }
    }

    #[tokio::test]
    async fn stages_run_outermost_first() {
        let entered = Arc::new(AtomicUsize::new(0));
        let outer = Arc::new(Tracing {
            name: "outer",
            entered: Arc::clone(&entered),
            seen_at: AtomicUsize::new(usize::MAX),
        });
        let inner = Arc::new(Tracing {
            name: "inner",
            entered: Arc::clone(&entered),
            seen_at: AtomicUsize::new(usize::MAX),
        });
        let base = Arc::new(InMemorySummaryIndex::new([
            AnnotationSummary::new(None, "liver").with_score(50.0)
        ]));
        let pipeline = SearchPipeline::new(base)
            .with_stage(outer.clone())
            .with_stage(inner.clone());

        let found = pipeline
            .search(&SearchRequest::value("liver"))
            .await
            .expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(pipeline.stage_names(), vec!["outer", "inner"]);
        assert_eq!(outer.seen_at.load(Ordering::SeqCst), 0);
        assert_eq!(inner.seen_at.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fallback_stage_requires_secondary_search() {
        let settings = SearchSettings {
            stages: vec![StageKind::OntologyFallback],
            ..SearchSettings::default()
        };
        let base = Arc::new(InMemorySummaryIndex::default());
        let err = SearchPipeline::from_config(&settings, base, None)
            .err()
            .expect("missing secondary");
        assert!(err.to_string().contains("secondary"));
    }
}
