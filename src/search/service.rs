use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::summary::{AnnotationSummary, ScoredSummaries};
use crate::annotation::Iri;

/// Ontology source name disabling ontology based lookups altogether.
const NO_ONTOLOGIES: &str = "none";

/// What a search looks for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTarget {
    /// Property values matching `pattern`, optionally restricted to a type.
    Value {
        property_type: Option<String>,
        pattern: String,
    },
    /// Property values starting with `prefix`, optionally restricted to a type.
    Prefix {
        property_type: Option<String>,
        prefix: String,
    },
    /// Summaries mapping onto every listed semantic tag.
    SemanticTags(BTreeSet<Iri>),
}

/// Ontologies a fallback search may consult.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OntologyFilter {
    /// No restriction was supplied.
    #[default]
    Any,
    /// Only the named ontologies.
    Only(BTreeSet<String>),
    /// Ontology lookups were explicitly switched off.
    Disabled,
}

impl OntologyFilter {
    /// Interprets caller supplied ontology names; `none` disables lookups.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names
            .into_iter()
            .map(Into::into)
            .filter(|name| !name.trim().is_empty())
            .collect();
        if names.iter().any(|name| name.eq_ignore_ascii_case(NO_ONTOLOGIES)) {
            Self::Disabled
        } else if names.is_empty() {
            Self::Any
        } else {
            Self::Only(names)
        }
    }

    /// Returns true unless ontology lookups were switched off.
    #[must_use]
    pub fn allows_lookup(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// A search for annotation summaries, shared by every pipeline stage.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchRequest {
    pub target: SearchTarget,
    /// Datasources results must originate from; empty means any.
    pub sources: Vec<Iri>,
    /// Datasources whose results rank first.
    pub preferred_sources: Vec<Iri>,
    pub ontology_filter: OntologyFilter,
}

impl SearchRequest {
    fn with_target(target: SearchTarget) -> Self {
        Self {
            target,
            sources: Vec::new(),
            preferred_sources: Vec::new(),
            ontology_filter: OntologyFilter::Any,
        }
    }

    #[must_use]
    pub fn value(pattern: impl Into<String>) -> Self {
        Self::with_target(SearchTarget::Value {
            property_type: None,
            pattern: pattern.into(),
        })
    }

    #[must_use]
    pub fn typed_value(property_type: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::with_target(SearchTarget::Value {
            property_type: Some(property_type.into()),
            pattern: pattern.into(),
        })
    }

    #[must_use]
    pub fn prefix(property_type: Option<&str>, prefix: impl Into<String>) -> Self {
        Self::with_target(SearchTarget::Prefix {
            property_type: property_type.map(str::to_owned),
            prefix: prefix.into(),
        })
    }

    #[must_use]
    pub fn semantic_tags(tags: impl IntoIterator<Item = Iri>) -> Self {
        Self::with_target(SearchTarget::SemanticTags(tags.into_iter().collect()))
    }

    #[must_use]
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = Iri>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_preferred_sources(mut self, sources: impl IntoIterator<Item = Iri>) -> Self {
        self.preferred_sources = sources.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_ontology_filter(mut self, filter: OntologyFilter) -> Self {
        self.ontology_filter = filter;
        self
    }

    /// The value pattern of a value search.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        match &self.target {
            SearchTarget::Value { pattern, .. } => Some(pattern.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn property_type(&self) -> Option<&str> {
        match &self.target {
            SearchTarget::Value { property_type, .. } | SearchTarget::Prefix { property_type, .. } => {
                property_type.as_deref()
            }
            SearchTarget::SemanticTags(_) => None,
        }
    }

    /// Copy of a value search looking for `pattern` instead.
    ///
    /// Any other target is returned unchanged.
    #[must_use]
    pub fn with_pattern(&self, pattern: &str) -> Self {
        let mut request = self.clone();
        if let SearchTarget::Value { pattern: current, .. } = &mut request.target {
            *current = pattern.to_owned();
        }
        request
    }

    /// Normalised form used to key cached results.
    #[must_use]
    pub fn cache_key(&self) -> String {
        fn normalise(text: &str) -> String {
            text.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        }
        fn join(iris: &[Iri]) -> String {
            iris.iter().map(Iri::as_str).collect::<Vec<_>>().join(",")
        }

        let target = match &self.target {
            SearchTarget::Value {
                property_type,
                pattern,
            } => format!(
                "value:{}:{}",
                property_type.as_deref().map(normalise).unwrap_or_default(),
                normalise(pattern)
            ),
            SearchTarget::Prefix {
                property_type,
                prefix,
            } => format!(
                "prefix:{}:{}",
                property_type.as_deref().map(normalise).unwrap_or_default(),
                normalise(prefix)
            ),
            SearchTarget::SemanticTags(tags) => format!(
                "tags:{}",
                tags.iter().map(Iri::as_str).collect::<Vec<_>>().join(",")
            ),
        };
        let ontologies = match &self.ontology_filter {
            OntologyFilter::Any => String::new(),
            OntologyFilter::Only(names) => names.iter().cloned().collect::<Vec<_>>().join(","),
            OntologyFilter::Disabled => NO_ONTOLOGIES.to_string(),
        };
        format!(
            "{target}|{}|{}|{ontologies}",
            join(&self.sources),
            join(&self.preferred_sources)
        )
    }
}

/// Errors raised by search stages and base lookups.
#[derive(Clone, Debug, thiserror::Error)]
pub enum SearchError {
    /// The lookup could not be completed.
    #[error("search failed: {message}")]
    QueryFailure { message: String },
    /// The results cache could not serve the request.
    #[error("search cache failure: {message}")]
    Cache { message: String },
}

impl SearchError {
    pub fn query_failure(message: impl Into<String>) -> Self {
        Self::QueryFailure {
            message: message.into(),
        }
    }
}

/// Contract implemented by every search stage and base lookup.
#[async_trait]
pub trait AnnotationSummarySearch: Send + Sync {
    /// Returns the summaries matching `request`, each carrying its quality score.
    ///
    /// An empty result means nothing matched. Lookups that cannot complete
    /// must fail instead.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<AnnotationSummary>, SearchError>;

    /// Same as [`AnnotationSummarySearch::search`], keyed by summary.
    async fn search_and_score(&self, request: &SearchRequest) -> Result<ScoredSummaries, SearchError> {
        let mut scored = ScoredSummaries::new();
        for summary in self.search(request).await? {
            let score = summary.quality_score();
            let entry = scored.entry(summary).or_insert(score);
            if score > *entry {
                *entry = score;
            }
        }
        Ok(scored)
    }
}

/// Base lookup over a fixed set of summaries.
///
/// Value searches compare case-insensitively, prefix searches match the start
/// of the value and tag searches require every requested tag.
#[derive(Clone, Debug, Default)]
pub struct InMemorySummaryIndex {
    summaries: Vec<AnnotationSummary>,
}

impl InMemorySummaryIndex {
    #[must_use]
    pub fn new(summaries: impl IntoIterator<Item = AnnotationSummary>) -> Self {
        Self {
            summaries: summaries.into_iter().collect(),
        }
    }

    fn matches(summary: &AnnotationSummary, request: &SearchRequest) -> bool {
        let same_type = |wanted: &Option<String>| match wanted {
            Some(wanted) => summary
                .property_type()
                .is_some_and(|actual| actual.eq_ignore_ascii_case(wanted)),
            None => true,
        };
        let target = match &request.target {
            SearchTarget::Value {
                property_type,
                pattern,
            } => {
                same_type(property_type)
                    && summary.property_value().to_lowercase() == pattern.trim().to_lowercase()
            }
            SearchTarget::Prefix {
                property_type,
                prefix,
            } => {
                same_type(property_type)
                    && summary
                        .property_value()
                        .to_lowercase()
                        .starts_with(&prefix.trim().to_lowercase())
            }
            SearchTarget::SemanticTags(tags) => {
                !tags.is_empty() && tags.is_subset(summary.semantic_tags())
            }
        };
        target
            && (request.sources.is_empty()
                || request
                    .sources
                    .iter()
                    .any(|source| summary.source_uris().contains(source)))
    }
}

#[async_trait]
impl AnnotationSummarySearch for InMemorySummaryIndex {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<AnnotationSummary>, SearchError> {
        let mut found: Vec<AnnotationSummary> = self
            .summaries
            .iter()
            .filter(|summary| Self::matches(summary, request))
            .cloned()
            .collect();
        if !request.preferred_sources.is_empty() {
            let rank = |summary: &AnnotationSummary| {
                request
                    .preferred_sources
                    .iter()
                    .position(|source| summary.source_uris().contains(source))
                    .unwrap_or(request.preferred_sources.len())
            };
            found.sort_by_key(rank);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        AnnotationSummarySearch, InMemorySummaryIndex, OntologyFilter, SearchRequest,
    };
    use crate::{annotation::Iri, search::summary::AnnotationSummary};

    fn iri(text: &str) -> Iri {
        Iri::new(text).expect("valid iri")
    }

    fn index() -> InMemorySummaryIndex {
        InMemorySummaryIndex::new([
            AnnotationSummary::new(Some("disease"), "Asthma")
                .with_semantic_tag(iri("http://www.ebi.ac.uk/efo/EFO_0000270"))
                .with_source(iri("http://www.ebi.ac.uk/gwas"))
                .with_score(90.0),
            AnnotationSummary::new(Some("disease"), "asthma")
                .with_semantic_tag(iri("http://www.ebi.ac.uk/efo/EFO_0000270"))
                .with_annotation(iri("http://example.org/annotation/2"))
                .with_source(iri("http://www.ebi.ac.uk/gxa"))
                .with_score(70.0),
            AnnotationSummary::new(Some("cell type"), "asthmatic epithelium")
                .with_source(iri("http://www.ebi.ac.uk/gxa"))
                .with_score(40.0),
        ])
    }

    #[rstest]
    #[case(Vec::<&str>::new(), OntologyFilter::Any)]
    #[case(vec!["efo", "None"], OntologyFilter::Disabled)]
    #[case(vec![" "], OntologyFilter::Any)]
    fn ontology_filter_from_names(#[case] names: Vec<&str>, #[case] expected: OntologyFilter) {
        assert_eq!(OntologyFilter::from_names(names), expected);
    }

    #[tokio::test]
    async fn value_search_is_case_insensitive_and_source_restricted() {
        let index = index();
        let all = index.search(&SearchRequest::value("ASTHMA")).await.expect("search");
        assert_eq!(all.len(), 2);

        let gxa = index
            .search(&SearchRequest::value("asthma").with_sources([iri("http://www.ebi.ac.uk/gxa")]))
            .await
            .expect("search");
        assert_eq!(gxa.len(), 1);
        assert_eq!(gxa[0].quality_score(), 70.0);
    }

    #[tokio::test]
    async fn preferred_sources_rank_first() {
        let found = index()
            .search(
                &SearchRequest::typed_value("disease", "asthma")
                    .with_preferred_sources([iri("http://www.ebi.ac.uk/gxa")]),
            )
            .await
            .expect("search");
        assert_eq!(found[0].quality_score(), 70.0);
    }

    #[tokio::test]
    async fn prefix_and_tag_searches() {
        let index = index();
        let prefixed = index
            .search(&SearchRequest::prefix(Some("cell type"), "asthm"))
            .await
            .expect("prefix");
        assert_eq!(prefixed.len(), 1);

        let tagged = index
            .search_and_score(&SearchRequest::semantic_tags([iri(
                "http://www.ebi.ac.uk/efo/EFO_0000270",
            )]))
            .await
            .expect("tags");
        assert_eq!(tagged.len(), 2);
    }

    #[test]
    fn cache_key_normalises_whitespace_and_case() {
        let left = SearchRequest::value("  Type 2   Diabetes ");
        let right = SearchRequest::value("type 2 diabetes");
        assert_eq!(left.cache_key(), right.cache_key());
        assert_ne!(
            left.cache_key(),
            right.with_ontology_filter(OntologyFilter::Disabled).cache_key()
        );
    }
}
