use std::{
    collections::{BTreeSet, HashMap},
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::annotation::Iri;

/// Summaries mapped to the score assigned by the search that produced them.
pub type ScoredSummaries = HashMap<AnnotationSummary, f32>;

/// Aggregated view over annotations resolving one property to one set of tags.
///
/// Equality and hashing consider the property and the tag and annotation sets
/// only, so the same summary scored by two searches collapses into one key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnnotationSummary {
    id: Option<String>,
    property_type: Option<String>,
    property_value: String,
    semantic_tags: BTreeSet<Iri>,
    annotation_uris: BTreeSet<Iri>,
    quality_score: f32,
    source_uris: BTreeSet<Iri>,
}

impl AnnotationSummary {
    /// Creates an empty, unidentified summary of a property.
    #[must_use]
    pub fn new(property_type: Option<&str>, property_value: impl Into<String>) -> Self {
        Self {
            id: None,
            property_type: property_type.map(str::to_owned),
            property_value: property_value.into(),
            semantic_tags: BTreeSet::new(),
            annotation_uris: BTreeSet::new(),
            quality_score: 0.0,
            source_uris: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_semantic_tag(mut self, tag: Iri) -> Self {
        self.semantic_tags.insert(tag);
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: Iri) -> Self {
        self.annotation_uris.insert(annotation);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Iri) -> Self {
        self.source_uris.insert(source);
        self
    }

    #[must_use]
    pub fn with_score(mut self, quality_score: f32) -> Self {
        self.quality_score = quality_score;
        self
    }

    /// Assigns the content hash of `property_uri`, the tags and the sources.
    #[must_use]
    pub fn identified_by(mut self, property_uri: &Iri) -> Self {
        self.id = Some(summary_id(
            property_uri,
            &self.semantic_tags,
            &self.source_uris,
        ));
        self
    }

    /// Builds the unidentified union of two summaries scored `quality_score`.
    ///
    /// Tag, annotation and source sets are unioned. The property type survives
    /// only when both sides agree on it.
    #[must_use]
    pub fn union(
        property_value: impl Into<String>,
        left: &AnnotationSummary,
        right: &AnnotationSummary,
        quality_score: f32,
    ) -> Self {
        let property_type = match (&left.property_type, &right.property_type) {
            (Some(own), Some(theirs)) if own == theirs => Some(own.clone()),
            _ => None,
        };
        Self {
            id: None,
            property_type,
            property_value: property_value.into(),
            semantic_tags: left.semantic_tags.union(&right.semantic_tags).cloned().collect(),
            annotation_uris: left
                .annotation_uris
                .union(&right.annotation_uris)
                .cloned()
                .collect(),
            quality_score,
            source_uris: left.source_uris.union(&right.source_uris).cloned().collect(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn property_type(&self) -> Option<&str> {
        self.property_type.as_deref()
    }

    #[must_use]
    pub fn property_value(&self) -> &str {
        &self.property_value
    }

    #[must_use]
    pub fn semantic_tags(&self) -> &BTreeSet<Iri> {
        &self.semantic_tags
    }

    #[must_use]
    pub fn annotation_uris(&self) -> &BTreeSet<Iri> {
        &self.annotation_uris
    }

    #[must_use]
    pub fn quality_score(&self) -> f32 {
        self.quality_score
    }

    #[must_use]
    pub fn source_uris(&self) -> &BTreeSet<Iri> {
        &self.source_uris
    }
}

impl PartialEq for AnnotationSummary {
    fn eq(&self, other: &Self) -> bool {
        self.property_type == other.property_type
            && self.property_value == other.property_value
            && self.semantic_tags == other.semantic_tags
            && self.annotation_uris == other.annotation_uris
    }
}

impl Eq for AnnotationSummary {}

impl Hash for AnnotationSummary {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.property_type.hash(state);
        self.property_value.hash(state);
        self.semantic_tags.hash(state);
        self.annotation_uris.hash(state);
    }
}

/// Upper-case hex SHA-256 of the sorted, concatenated identifiers.
#[must_use]
pub fn summary_id(property_uri: &Iri, semantic_tags: &BTreeSet<Iri>, sources: &BTreeSet<Iri>) -> String {
    let mut parts: Vec<&str> = std::iter::once(property_uri.as_str())
        .chain(semantic_tags.iter().map(Iri::as_str))
        .chain(sources.iter().map(Iri::as_str))
        .collect();
    parts.sort_unstable();

    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    format!("{:X}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::AnnotationSummary;
    use crate::annotation::Iri;

    fn iri(text: &str) -> Iri {
        Iri::new(text).expect("valid iri")
    }

    fn liver() -> AnnotationSummary {
        AnnotationSummary::new(Some("organism part"), "liver")
            .with_semantic_tag(iri("http://purl.obolibrary.org/obo/UBERON_0002107"))
            .with_annotation(iri("http://example.org/annotation/1"))
            .with_source(iri("http://www.ebi.ac.uk/gxa"))
    }

    #[test]
    fn id_is_a_stable_uppercase_digest() {
        let property = iri("http://example.org/property/liver");
        let first = liver().identified_by(&property);
        let second = liver()
            .with_annotation(iri("http://example.org/annotation/2"))
            .identified_by(&property);

        let id = first.id().expect("identified");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn equality_ignores_score_and_identity() {
        let scored = liver().with_score(87.5);
        let unscored = liver().identified_by(&iri("http://example.org/property/liver"));
        assert_eq!(scored, unscored);

        let mut map = HashMap::new();
        map.insert(scored, 87.5_f32);
        map.insert(unscored, 12.0_f32);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn union_keeps_agreeing_type_only() {
        let left = liver();
        let right = AnnotationSummary::new(Some("organism part"), "hepatic")
            .with_semantic_tag(iri("http://purl.obolibrary.org/obo/UBERON_0001280"));
        let merged = AnnotationSummary::union("liver hepatic", &left, &right, 10.0);
        assert_eq!(merged.property_type(), Some("organism part"));
        assert_eq!(merged.semantic_tags().len(), 2);
        assert!(merged.id().is_none());

        let untyped = AnnotationSummary::new(None, "hepatic");
        let merged = AnnotationSummary::union("liver hepatic", &left, &untyped, 10.0);
        assert_eq!(merged.property_type(), None);
    }
}
