use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::Iri;

/// Namespace of evidence codes minted by ZOOMA itself.
const ZOOMA_TERMS: &str = "http://rdf.ebi.ac.uk/terms/zooma/";

/// Normalised type used when an annotation carries an untyped property.
pub const UNTYPED: &str = "[UNTYPED]";

/// A property type/value pair describing a study or biological entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Property {
    uri: Option<Iri>,
    property_type: Option<String>,
    value: String,
}

impl Property {
    /// Creates a typed property, e.g. `organism part` / `liver`.
    #[must_use]
    pub fn typed(property_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            uri: None,
            property_type: Some(property_type.into()),
            value: value.into(),
        }
    }

    /// Creates a property that only carries a value.
    #[must_use]
    pub fn untyped(value: impl Into<String>) -> Self {
        Self {
            uri: None,
            property_type: None,
            value: value.into(),
        }
    }

    /// Attaches the identifier under which the store knows this property.
    #[must_use]
    pub fn with_uri(mut self, uri: Iri) -> Self {
        self.uri = Some(uri);
        self
    }

    #[must_use]
    pub fn uri(&self) -> Option<&Iri> {
        self.uri.as_ref()
    }

    #[must_use]
    pub fn property_type(&self) -> Option<&str> {
        self.property_type.as_deref()
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Property type normalised for comparisons, or [`UNTYPED`].
    #[must_use]
    pub fn normalised_type(&self) -> String {
        self.property_type
            .as_deref()
            .map_or_else(|| UNTYPED.to_string(), crate::curation::text::normalise_type)
    }

    /// One-directional match test.
    ///
    /// A typed property only matches another typed property with identical type
    /// and value. An untyped property matches anything carrying the same value,
    /// so `untyped.matches(typed)` can hold while `typed.matches(untyped)` does
    /// not. Facet comparisons go through [`Property::matches_both_ways`].
    #[must_use]
    pub fn matches(&self, other: &Property) -> bool {
        match (&self.property_type, &other.property_type) {
            (Some(own), Some(theirs)) => own == theirs && self.value == other.value,
            (Some(_), None) => false,
            (None, _) => self.value == other.value,
        }
    }

    /// Symmetric wrapper over [`Property::matches`].
    #[must_use]
    pub fn matches_both_ways(&self, other: &Property) -> bool {
        self.matches(other) && other.matches(self)
    }
}

/// A study grouping biological entities, identified by its accession.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Study {
    uri: Iri,
    accession: String,
    types: BTreeSet<Iri>,
}

impl Study {
    #[must_use]
    pub fn new(uri: Iri, accession: impl Into<String>) -> Self {
        Self {
            uri,
            accession: accession.into(),
            types: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_type(mut self, study_type: Iri) -> Self {
        self.types.insert(study_type);
        self
    }

    #[must_use]
    pub fn uri(&self) -> &Iri {
        &self.uri
    }

    /// Returns the study label, conventionally its accession (e.g. `E-GEOD-1234`).
    #[must_use]
    pub fn accession(&self) -> &str {
        &self.accession
    }

    #[must_use]
    pub fn types(&self) -> &BTreeSet<Iri> {
        &self.types
    }
}

/// A sample, assay or other biological entity that annotations describe.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BiologicalEntity {
    uri: Iri,
    name: String,
    studies: BTreeSet<Study>,
    types: BTreeSet<Iri>,
}

impl BiologicalEntity {
    #[must_use]
    pub fn new(uri: Iri, name: impl Into<String>) -> Self {
        Self {
            uri,
            name: name.into(),
            studies: BTreeSet::new(),
            types: BTreeSet::new(),
        }
    }

    /// Declares that the entity was observed in the given study.
    #[must_use]
    pub fn in_study(mut self, study: Study) -> Self {
        self.studies.insert(study);
        self
    }

    #[must_use]
    pub fn with_type(mut self, entity_type: Iri) -> Self {
        self.types.insert(entity_type);
        self
    }

    #[must_use]
    pub fn uri(&self) -> &Iri {
        &self.uri
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn studies(&self) -> &BTreeSet<Study> {
        &self.studies
    }

    #[must_use]
    pub fn types(&self) -> &BTreeSet<Iri> {
        &self.types
    }
}

/// Kind of datasource an annotation was harvested from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Database,
    Ontology,
    Unknown,
}

/// Datasource an annotation originates from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationSource {
    pub uri: Iri,
    pub name: String,
    pub kind: SourceKind,
}

impl AnnotationSource {
    #[must_use]
    pub fn new(uri: Iri, name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            uri,
            name: name.into(),
            kind,
        }
    }

    /// Two sources are the same datasource when both identifier and kind agree.
    #[must_use]
    pub fn same_datasource(&self, other: &AnnotationSource) -> bool {
        self.uri == other.uri && self.kind == other.kind
    }
}

/// Strength of the evidence backing an annotation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Evidence {
    ManualCurated,
    ZoomaInferredFromCurated,
    Automatic,
    ComputedFromOntology,
    ComputedFromTextMatch,
    SubmitterProvided,
    NonTraceable,
    NoEvidence,
    Unknown,
}

impl Evidence {
    const ALL: [Evidence; 9] = [
        Self::ManualCurated,
        Self::ZoomaInferredFromCurated,
        Self::Automatic,
        Self::ComputedFromOntology,
        Self::ComputedFromTextMatch,
        Self::SubmitterProvided,
        Self::NonTraceable,
        Self::NoEvidence,
        Self::Unknown,
    ];

    /// Returns the identifier of the evidence code.
    #[must_use]
    pub fn id(self) -> String {
        match self {
            Self::ManualCurated => "http://purl.obolibrary.org/obo/ECO_0000305".to_string(),
            Self::Automatic => "http://purl.obolibrary.org/obo/ECO_0000203".to_string(),
            Self::ZoomaInferredFromCurated => format!("{ZOOMA_TERMS}ZOOMA_0000101"),
            Self::ComputedFromOntology => format!("{ZOOMA_TERMS}ZOOMA_0000102"),
            Self::ComputedFromTextMatch => format!("{ZOOMA_TERMS}ZOOMA_0000103"),
            Self::SubmitterProvided => format!("{ZOOMA_TERMS}ZOOMA_0000104"),
            Self::NonTraceable => format!("{ZOOMA_TERMS}ZOOMA_0000105"),
            Self::NoEvidence => format!("{ZOOMA_TERMS}ZOOMA_0000106"),
            Self::Unknown => format!("{ZOOMA_TERMS}ZOOMA_0000107"),
        }
    }

    /// Resolves an evidence code identifier, falling back to [`Evidence::Unknown`].
    #[must_use]
    pub fn lookup(id: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|evidence| evidence.id() == id)
            .unwrap_or(Self::Unknown)
    }
}

/// Who or what produced an annotation, when, and on what evidence.
///
/// Provenance takes part in update detection through full structural equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationProvenance {
    pub source: AnnotationSource,
    pub evidence: Evidence,
    pub generator: String,
    pub generated_at: DateTime<Utc>,
    pub annotator: String,
    pub annotated_at: DateTime<Utc>,
}

/// One version of an annotation mapping a property onto semantic tags.
///
/// The URI identifies exactly this version. Successive versions of the same
/// logical annotation are chained through `replaces` / `replaced_by`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    uri: Iri,
    property: Property,
    biological_entities: BTreeSet<BiologicalEntity>,
    semantic_tags: BTreeSet<Iri>,
    provenance: AnnotationProvenance,
    replaces: BTreeSet<Iri>,
    replaced_by: BTreeSet<Iri>,
}

impl Annotation {
    #[must_use]
    pub fn new(uri: Iri, property: Property, provenance: AnnotationProvenance) -> Self {
        Self {
            uri,
            property,
            biological_entities: BTreeSet::new(),
            semantic_tags: BTreeSet::new(),
            provenance,
            replaces: BTreeSet::new(),
            replaced_by: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_biological_entity(mut self, entity: BiologicalEntity) -> Self {
        self.biological_entities.insert(entity);
        self
    }

    #[must_use]
    pub fn with_semantic_tag(mut self, tag: Iri) -> Self {
        self.semantic_tags.insert(tag);
        self
    }

    #[must_use]
    pub fn uri(&self) -> &Iri {
        &self.uri
    }

    #[must_use]
    pub fn property(&self) -> &Property {
        &self.property
    }

    #[must_use]
    pub fn biological_entities(&self) -> &BTreeSet<BiologicalEntity> {
        &self.biological_entities
    }

    #[must_use]
    pub fn semantic_tags(&self) -> &BTreeSet<Iri> {
        &self.semantic_tags
    }

    #[must_use]
    pub fn provenance(&self) -> &AnnotationProvenance {
        &self.provenance
    }

    #[must_use]
    pub fn replaces(&self) -> &BTreeSet<Iri> {
        &self.replaces
    }

    #[must_use]
    pub fn replaced_by(&self) -> &BTreeSet<Iri> {
        &self.replaced_by
    }

    /// Returns true when the annotation is linked to no semantic tag.
    #[must_use]
    pub fn is_untagged(&self) -> bool {
        self.semantic_tags.is_empty()
    }

    /// Builds the successor of this annotation under `new_uri`.
    ///
    /// The successor carries the same facets and replaces exactly this version.
    #[must_use]
    pub fn successor(&self, new_uri: Iri) -> Self {
        Self {
            uri: new_uri,
            property: self.property.clone(),
            biological_entities: self.biological_entities.clone(),
            semantic_tags: self.semantic_tags.clone(),
            provenance: self.provenance.clone(),
            replaces: BTreeSet::from([self.uri.clone()]),
            replaced_by: BTreeSet::new(),
        }
    }

    /// Marks this version as replacing `previous`.
    #[must_use]
    pub fn replacing(mut self, previous: &Iri) -> Self {
        self.replaces = BTreeSet::from([previous.clone()]);
        self
    }

    /// Records `next` as a successor of this version, keeping earlier successors.
    #[must_use]
    pub fn replaced_with(mut self, next: &Iri) -> Self {
        self.replaced_by.insert(next.clone());
        self
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{Evidence, Property};

    #[rstest]
    #[case(Property::typed("organism", "homo sapiens"), Property::typed("organism", "homo sapiens"), true)]
    #[case(Property::typed("organism", "homo sapiens"), Property::typed("species", "homo sapiens"), false)]
    #[case(Property::typed("organism", "homo sapiens"), Property::untyped("homo sapiens"), false)]
    #[case(Property::untyped("homo sapiens"), Property::typed("organism", "homo sapiens"), true)]
    #[case(Property::untyped("homo sapiens"), Property::untyped("mus musculus"), false)]
    fn one_directional_matching(#[case] own: Property, #[case] other: Property, #[case] expected: bool) {
        assert_eq!(own.matches(&other), expected);
    }

    #[test]
    fn symmetric_matching_rejects_typed_against_untyped() {
        let typed = Property::typed("organism", "homo sapiens");
        let untyped = Property::untyped("homo sapiens");
        assert!(!typed.matches_both_ways(&untyped));
        assert!(!untyped.matches_both_ways(&typed));
        assert!(untyped.matches_both_ways(&Property::untyped("homo sapiens")));
    }

    #[test]
    fn normalised_type_handles_untyped_and_underscores() {
        assert_eq!(Property::typed("Organism_Part", "liver").normalised_type(), "organism part");
        assert_eq!(Property::typed("OrganismPart", "liver").normalised_type(), "organism part");
        assert_eq!(Property::untyped("liver").normalised_type(), super::UNTYPED);
    }

    #[test]
    fn evidence_lookup_round_trips_known_codes() {
        assert_eq!(Evidence::lookup(&Evidence::ManualCurated.id()), Evidence::ManualCurated);
        assert_eq!(Evidence::lookup("http://example.org/nothing"), Evidence::Unknown);
    }
}
