use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use zooma::{
    annotation::Iri,
    config::{Config, SearchSettings},
    search::{
        AnnotationSummary, AnnotationSummarySearch, InMemorySummaryIndex, ProcessorKind,
        SearchError, SearchPipeline, SearchRequest, StageKind,
    },
};

fn iri(text: &str) -> Iri {
    Iri::new(text).expect("valid iri")
}

fn efo(accession: &str) -> Iri {
    iri(&format!("http://www.ebi.ac.uk/efo/{accession}"))
}

/// Index of a few disease summaries that counts how often it is consulted.
struct CountingIndex {
    index: InMemorySummaryIndex,
    calls: AtomicUsize,
}

impl CountingIndex {
    fn diseases() -> Self {
        Self {
            index: InMemorySummaryIndex::new([
                AnnotationSummary::new(Some("disease"), "diabetes")
                    .with_semantic_tag(efo("EFO_0000400"))
                    .with_score(40.0),
                AnnotationSummary::new(Some("disease"), "type 2")
                    .with_semantic_tag(efo("EFO_0001360"))
                    .with_score(30.0),
                AnnotationSummary::new(Some("disease"), "leukemia")
                    .with_semantic_tag(efo("EFO_0000565"))
                    .with_score(75.0),
            ]),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnnotationSummarySearch for CountingIndex {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<AnnotationSummary>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.index.search(request).await
    }
}

struct FailingSearch;

#[async_trait]
impl AnnotationSummarySearch for FailingSearch {
    async fn search(&self, _request: &SearchRequest) -> Result<Vec<AnnotationSummary>, SearchError> {
        Err(SearchError::query_failure("solr unavailable"))
    }
}

fn expansion_only(processors: Vec<ProcessorKind>) -> SearchSettings {
    SearchSettings {
        stages: vec![StageKind::StringExpansion],
        processors,
        ..SearchSettings::default()
    }
}

#[tokio::test]
async fn two_part_queries_are_merged_with_length_weighted_scores() {
    let pipeline = SearchPipeline::from_config(
        &expansion_only(vec![ProcessorKind::Conjunction]),
        Arc::new(CountingIndex::diseases()),
        None,
    )
    .expect("pipeline");

    let found = pipeline
        .search(&SearchRequest::value("diabetes and type 2"))
        .await
        .expect("search");

    assert_eq!(found.len(), 1);
    let merged = &found[0];
    assert_eq!(merged.property_value(), "diabetes and type 2");
    assert_eq!(merged.property_type(), Some("disease"));
    assert_eq!(merged.semantic_tags().len(), 2);
    assert!((merged.quality_score() - 25.0).abs() < 1e-3, "got {}", merged.quality_score());
}

#[tokio::test]
async fn three_part_queries_degrade_to_no_results() {
    let index = Arc::new(CountingIndex::diseases());
    let pipeline = SearchPipeline::from_config(
        &expansion_only(vec![ProcessorKind::Conjunction]),
        index.clone(),
        None,
    )
    .expect("pipeline");

    let found = pipeline
        .search(&SearchRequest::value("a, b, c"))
        .await
        .expect("no error");
    assert!(found.is_empty());
    assert_eq!(index.calls(), 1);
}

#[tokio::test]
async fn single_part_queries_are_searched_directly() {
    let pipeline = SearchPipeline::from_config(
        &SearchSettings {
            stages: vec![StageKind::StringExpansion],
            ..SearchSettings::default()
        },
        Arc::new(CountingIndex::diseases()),
        None,
    )
    .expect("pipeline");

    let found = pipeline
        .search(&SearchRequest::typed_value("disease", "leukemia (chronic)"))
        .await
        .expect("search");
    assert_eq!(
        found.iter().map(AnnotationSummary::property_value).collect::<Vec<_>>(),
        vec!["leukemia"]
    );
    let score = found[0].quality_score();
    assert!((score - 75.0 * 0.95).abs() < 1e-3, "got {score}");
}

#[tokio::test]
async fn configured_pipeline_caches_and_falls_back() {
    let config = Config::from_yaml_str(
        "search:\n  stages: [cache, ontology_fallback, string_expansion]\n",
    )
    .expect("config");
    let primary = Arc::new(CountingIndex::diseases());
    let ontology = Arc::new(InMemorySummaryIndex::new([AnnotationSummary::new(
        None,
        "bronchitis",
    )
    .with_semantic_tag(efo("EFO_0000684"))
    .with_score(60.0)]));

    let pipeline = SearchPipeline::from_config(&config.search, primary.clone(), Some(ontology))
        .expect("pipeline");
    assert_eq!(
        pipeline.stage_names(),
        vec!["cache", "ontology_fallback", "string_expansion"]
    );

    let scored = pipeline
        .search_and_score(&SearchRequest::value("Bronchitis"))
        .await
        .expect("search");
    assert_eq!(scored.len(), 1);
    assert_eq!(scored.values().copied().collect::<Vec<_>>(), vec![60.0]);
    let calls = primary.calls();

    pipeline
        .search(&SearchRequest::value("bronchitis "))
        .await
        .expect("cached search");
    assert_eq!(primary.calls(), calls);
}

#[tokio::test]
async fn query_failures_propagate_through_every_stage() {
    let config = Config::default();
    let pipeline = SearchPipeline::from_config(&config.search, Arc::new(FailingSearch), None)
        .expect("pipeline");

    let err = pipeline
        .search(&SearchRequest::value("asthma and obesity"))
        .await
        .expect_err("failure");
    assert!(matches!(err, SearchError::QueryFailure { .. }));
}
