//! Ontology mapping curation for submitted attributes.
//!
//! Attributes are screened against exclusion profiles, searched through a
//! search pipeline and classified by a [`ResultsProfile`] into automatic
//! mappings and candidates for manual curation.

pub mod curator;
pub mod exclusion;
pub mod fuzzy;
pub mod profile;
pub mod text;

pub use curator::{Curation, Curator};
pub use exclusion::{
    CurationAttribute, ExclusionBasis, ExclusionError, ExclusionProfile, ExclusionRules,
};
pub use fuzzy::{distance, is_fuzzy_match, percent_difference};
pub use profile::{percentile_filter, MappingCategory, ProfileThresholds, ResultsProfile};
pub use text::{normalise_type, refs_and_accessions, RefsAndAccessions};
