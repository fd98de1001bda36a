use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{
    pipeline::{Next, SearchHandle, SearchStage},
    service::{SearchError, SearchRequest, SearchTarget},
    summary::AnnotationSummary,
};

/// Consults a secondary, ontology backed search when the primary finds nothing.
///
/// Applies to value searches only and is skipped when the request disables
/// ontology lookups.
pub struct OntologyFallbackStage {
    secondary: Arc<SearchHandle>,
}

impl OntologyFallbackStage {
    pub fn new(secondary: Arc<SearchHandle>) -> Self {
        Self { secondary }
    }
}

#[async_trait]
impl SearchStage for OntologyFallbackStage {
    fn name(&self) -> &'static str {
        "ontology_fallback"
    }

    async fn search(
        &self,
        request: &SearchRequest,
        next: Next<'_>,
    ) -> Result<Vec<AnnotationSummary>, SearchError> {
        let primary = next.run(request).await?;
        let is_value_search = matches!(request.target, SearchTarget::Value { .. });
        if !primary.is_empty() || !is_value_search || !request.ontology_filter.allows_lookup() {
            return Ok(primary);
        }
        debug!(
            pattern = request.pattern().unwrap_or_default(),
            ontologies = ?request.ontology_filter,
            "ontology_fallback_search"
        );
        self.secondary.search(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::OntologyFallbackStage;
    use crate::{
        annotation::Iri,
        search::{
            pipeline::SearchPipeline,
            service::{AnnotationSummarySearch, InMemorySummaryIndex, OntologyFilter, SearchRequest},
            summary::AnnotationSummary,
        },
    };

    fn pipeline() -> SearchPipeline {
        let primary = Arc::new(InMemorySummaryIndex::new([AnnotationSummary::new(
            Some("disease"),
            "asthma",
        )
        .with_score(80.0)]));
        let ontology = Arc::new(InMemorySummaryIndex::new([AnnotationSummary::new(
            None, "bronchitis",
        )
        .with_semantic_tag(Iri::new("http://www.ebi.ac.uk/efo/EFO_0000684").expect("valid iri"))
        .with_score(60.0)]));
        SearchPipeline::new(primary).with_stage(Arc::new(OntologyFallbackStage::new(ontology)))
    }

    #[tokio::test]
    async fn primary_results_are_returned_as_is() {
        let found = pipeline()
            .search(&SearchRequest::value("asthma"))
            .await
            .expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].quality_score(), 80.0);
    }

    #[tokio::test]
    async fn empty_primary_falls_back_unless_disabled() {
        let pipeline = pipeline();
        let found = pipeline
            .search(&SearchRequest::value("bronchitis"))
            .await
            .expect("search");
        assert_eq!(found.len(), 1);

        let restricted = SearchRequest::value("bronchitis")
            .with_ontology_filter(OntologyFilter::from_names(["efo"]));
        assert_eq!(pipeline.search(&restricted).await.expect("search").len(), 1);

        let disabled = SearchRequest::value("bronchitis")
            .with_ontology_filter(OntologyFilter::from_names(["none"]));
        assert!(pipeline.search(&disabled).await.expect("search").is_empty());
    }
}
