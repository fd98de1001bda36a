//! Facet-by-facet comparison of two annotation versions.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::trace;

use super::entities::{Annotation, BiologicalEntity, Property};
use super::value_objects::Iri;

/// First facet found to differ between two annotation versions.
///
/// Variants are listed in evaluation priority order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modification {
    None,
    PropertyType,
    PropertyValue,
    BiologicalEntity,
    SemanticTag,
    Provenance,
}

/// Per-facet outcome of comparing an annotation against a reference version.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FacetReport {
    pub property_unchanged: bool,
    pub biological_entities_unchanged: bool,
    pub semantic_tags_unchanged: bool,
    pub provenance_unchanged: bool,
}

impl FacetReport {
    /// Compares every facet of `annotation` with `reference`.
    #[must_use]
    pub fn compare(annotation: &Annotation, reference: &Annotation) -> Self {
        Self {
            property_unchanged: same_property(annotation.property(), reference.property()),
            biological_entities_unchanged: same_biological_entities(
                annotation.biological_entities(),
                reference.biological_entities(),
            ),
            semantic_tags_unchanged: same_semantic_tags(
                annotation.semantic_tags(),
                reference.semantic_tags(),
            ),
            provenance_unchanged: annotation.provenance() == reference.provenance(),
        }
    }

    #[must_use]
    pub fn all_unchanged(&self) -> bool {
        self.property_unchanged
            && self.biological_entities_unchanged
            && self.semantic_tags_unchanged
            && self.provenance_unchanged
    }
}

/// Returns true if any facet of `annotation` differs from `reference`.
#[must_use]
pub fn is_updated(annotation: &Annotation, reference: &Annotation) -> bool {
    let report = FacetReport::compare(annotation, reference);
    trace!(
        annotation = %annotation.uri(),
        property_unchanged = report.property_unchanged,
        biological_entities_unchanged = report.biological_entities_unchanged,
        semantic_tags_unchanged = report.semantic_tags_unchanged,
        provenance_unchanged = report.provenance_unchanged,
        "update_check"
    );
    !report.all_unchanged()
}

/// Classifies the first differing facet between `annotation` and `reference`.
#[must_use]
pub fn get_modification(annotation: &Annotation, reference: &Annotation) -> Modification {
    let property = annotation.property();
    let reference_property = reference.property();
    if !same_property(property, reference_property) {
        if let (Some(own), Some(theirs)) =
            (property.property_type(), reference_property.property_type())
        {
            if !own.eq_ignore_ascii_case(theirs) {
                return Modification::PropertyType;
            }
        }
        return Modification::PropertyValue;
    }

    if !same_biological_entities(
        annotation.biological_entities(),
        reference.biological_entities(),
    ) {
        return Modification::BiologicalEntity;
    }

    if !same_semantic_tags(annotation.semantic_tags(), reference.semantic_tags()) {
        return Modification::SemanticTag;
    }

    if annotation.provenance() != reference.provenance() {
        return Modification::Provenance;
    }

    Modification::None
}

fn same_property(property: &Property, reference: &Property) -> bool {
    property.matches_both_ways(reference)
}

/// Builds the `(study accession, entity name)` pairs of a set of entities.
fn study_entity_pairs(entities: &BTreeSet<BiologicalEntity>) -> BTreeSet<(&str, &str)> {
    entities
        .iter()
        .flat_map(|entity| {
            entity
                .studies()
                .iter()
                .map(move |study| (study.accession(), entity.name()))
        })
        .collect()
}

/// An empty side on either end counts as unchanged.
fn same_biological_entities(
    entities: &BTreeSet<BiologicalEntity>,
    reference: &BTreeSet<BiologicalEntity>,
) -> bool {
    let pairs = study_entity_pairs(entities);
    let reference_pairs = study_entity_pairs(reference);
    same_non_empty_sets(&pairs, &reference_pairs)
}

/// An empty side on either end counts as unchanged.
fn same_semantic_tags(tags: &BTreeSet<Iri>, reference: &BTreeSet<Iri>) -> bool {
    same_non_empty_sets(tags, reference)
}

fn same_non_empty_sets<T: Ord>(left: &BTreeSet<T>, right: &BTreeSet<T>) -> bool {
    if left.is_empty() || right.is_empty() {
        return true;
    }
    left.len() == right.len() && left.iter().all(|item| right.contains(item))
}
