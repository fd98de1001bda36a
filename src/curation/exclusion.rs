//! Attributes that must never be curated automatically.
//!
//! Exclusion profiles are delimited lines with seven positional fields:
//! original type, original value, zoomified value, ontology label, term
//! source reference, ontology accession and study accession. A blank field
//! matches anything.

use std::{fs, path::Path};

use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{fuzzy::is_fuzzy_match, text::normalise_type};
use crate::config::{CurationSettings, FuzzySettings};

const FIELD_COUNT: usize = 7;

/// Errors raised while loading exclusion profiles.
#[derive(Debug, thiserror::Error)]
pub enum ExclusionError {
    #[error("invalid exclusion profile: {message}")]
    InvalidProfile { message: String },

    #[error("malformed exclusion profile on line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("could not read exclusion profiles from {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExclusionError {
    fn invalid_profile(message: impl Into<String>) -> Self {
        Self::InvalidProfile {
            message: message.into(),
        }
    }
}

/// An attribute offered for curation, plus whatever curation filled in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurationAttribute {
    pub property_type: Option<String>,
    pub value: String,
    pub zoomified_value: Option<String>,
    pub ontology_label: Option<String>,
    pub term_source_ref: Option<String>,
    pub ontology_accession: Option<String>,
    pub study_accession: Option<String>,
}

impl CurationAttribute {
    #[must_use]
    pub fn new(property_type: Option<&str>, value: impl Into<String>) -> Self {
        Self {
            property_type: property_type
                .map(str::trim)
                .filter(|kind| !kind.is_empty())
                .map(str::to_owned),
            value: value.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn in_study(mut self, accession: impl Into<String>) -> Self {
        self.study_accession = Some(accession.into());
        self
    }

    /// Normalised type, empty for untyped attributes.
    #[must_use]
    pub fn normalised_type(&self) -> String {
        self.property_type
            .as_deref()
            .map(normalise_type)
            .unwrap_or_default()
    }

    fn fields(&self) -> [&str; FIELD_COUNT] {
        [
            self.property_type.as_deref().unwrap_or_default(),
            self.value.as_str(),
            self.zoomified_value.as_deref().unwrap_or_default(),
            self.ontology_label.as_deref().unwrap_or_default(),
            self.term_source_ref.as_deref().unwrap_or_default(),
            self.ontology_accession.as_deref().unwrap_or_default(),
            self.study_accession.as_deref().unwrap_or_default(),
        ]
    }

    fn decision_key(&self) -> String {
        self.fields().join("\u{1f}")
    }
}

/// One exclusion line. `None` fields are wildcards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionProfile {
    pub original_type: Option<String>,
    pub original_value: Option<String>,
    pub zoomified_value: Option<String>,
    pub ontology_label: Option<String>,
    pub term_source_ref: Option<String>,
    pub ontology_accession: Option<String>,
    pub study_accession: Option<String>,
}

impl ExclusionProfile {
    /// Parses one delimited profile line.
    ///
    /// # Errors
    ///
    /// Fails when the delimiter is absent or the line has more than seven fields.
    pub fn parse(line: &str, delimiter: &str) -> Result<Self, ExclusionError> {
        if delimiter.is_empty() || !line.contains(delimiter) {
            return Err(ExclusionError::invalid_profile(format!(
                "delimiter {delimiter:?} not found"
            )));
        }
        let mut fields: Vec<Option<String>> = line
            .split(delimiter)
            .map(|field| Some(field.trim()).filter(|f| !f.is_empty()).map(str::to_owned))
            .collect();
        if fields.len() > FIELD_COUNT {
            return Err(ExclusionError::invalid_profile(format!(
                "expected at most {FIELD_COUNT} fields, found {}",
                fields.len()
            )));
        }
        fields.resize(FIELD_COUNT, None);

        let mut fields = fields.into_iter();
        let mut next = || fields.next().flatten();
        Ok(Self {
            original_type: next().map(|kind| normalise_type(&kind)),
            original_value: next(),
            zoomified_value: next(),
            ontology_label: next(),
            term_source_ref: next(),
            ontology_accession: next(),
            study_accession: next(),
        })
    }

    /// Whether every non-blank field of this profile agrees with `attribute`.
    #[must_use]
    pub fn matches(&self, attribute: &CurationAttribute, fuzzy: &FuzzySettings) -> bool {
        let fuzzy_eq = |wanted: &Option<String>, actual: Option<&str>| match wanted {
            None => true,
            Some(wanted) => actual.is_some_and(|actual| {
                is_fuzzy_match(wanted, actual, fuzzy.max_diffs, fuzzy.max_pct_diffs)
            }),
        };
        let exact_eq = |wanted: &Option<String>, actual: Option<&str>| match wanted {
            None => true,
            Some(wanted) => actual.is_some_and(|actual| wanted.eq_ignore_ascii_case(actual.trim())),
        };
        let type_eq = match &self.original_type {
            None => true,
            Some(wanted) => {
                attribute.property_type.is_some() && *wanted == attribute.normalised_type()
            }
        };

        type_eq
            && fuzzy_eq(&self.original_value, Some(attribute.value.as_str()))
            && fuzzy_eq(&self.zoomified_value, attribute.zoomified_value.as_deref())
            && fuzzy_eq(&self.ontology_label, attribute.ontology_label.as_deref())
            && exact_eq(&self.term_source_ref, attribute.term_source_ref.as_deref())
            && exact_eq(&self.ontology_accession, attribute.ontology_accession.as_deref())
            && exact_eq(&self.study_accession, attribute.study_accession.as_deref())
    }
}

/// Why an attribute was excluded from curation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionBasis {
    /// The value is too short to search for.
    MinStringLength,
    /// The attribute matched the profile at this position.
    Profile(usize),
}

/// Exclusion profiles with a memo of the decisions taken so far.
#[derive(Debug, Default)]
pub struct ExclusionRules {
    profiles: Vec<ExclusionProfile>,
    min_string_length: usize,
    fuzzy: FuzzySettings,
    decisions: DashMap<String, Option<ExclusionBasis>>,
}

impl ExclusionRules {
    pub fn new(profiles: Vec<ExclusionProfile>, settings: &CurationSettings) -> Self {
        Self {
            profiles,
            min_string_length: settings.min_string_length,
            fuzzy: settings.fuzzy,
            decisions: DashMap::new(),
        }
    }

    /// Parses every profile in `text`, skipping blank and `#` comment lines.
    ///
    /// # Errors
    ///
    /// Returns [`ExclusionError::Malformed`] naming the first bad line.
    pub fn from_lines(text: &str, settings: &CurationSettings) -> Result<Self, ExclusionError> {
        let mut profiles = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let profile =
                ExclusionProfile::parse(line, &settings.exclusion_delimiter).map_err(|err| {
                    ExclusionError::Malformed {
                        line: index + 1,
                        message: err.to_string(),
                    }
                })?;
            profiles.push(profile);
        }
        debug!(profiles = profiles.len(), "exclusion_profiles_loaded");
        Ok(Self::new(profiles, settings))
    }

    /// Loads profiles from a file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or holds a malformed line.
    pub fn from_file(path: &Path, settings: &CurationSettings) -> Result<Self, ExclusionError> {
        let text = fs::read_to_string(path).map_err(|source| ExclusionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_lines(&text, settings)
    }

    #[must_use]
    pub fn profiles(&self) -> &[ExclusionProfile] {
        &self.profiles
    }

    /// Returns why `attribute` is excluded, or `None` when it may be curated.
    ///
    /// Decisions are remembered per attribute. Concurrent callers deciding
    /// the same attribute agree on the first decision stored.
    pub fn exclusion_basis(&self, attribute: &CurationAttribute) -> Option<ExclusionBasis> {
        let key = attribute.decision_key();
        if let Some(decision) = self.decisions.get(&key) {
            return *decision;
        }

        let decision = if attribute.value.trim().chars().count() < self.min_string_length {
            Some(ExclusionBasis::MinStringLength)
        } else {
            self.profiles
                .iter()
                .position(|profile| profile.matches(attribute, &self.fuzzy))
                .map(ExclusionBasis::Profile)
        };

        match self.decisions.entry(key) {
            Entry::Occupied(stored) => {
                warn!(
                    value = %attribute.value,
                    "exclusion_decision_already_cached"
                );
                *stored.get()
            }
            Entry::Vacant(slot) => {
                if let Some(basis) = decision {
                    debug!(value = %attribute.value, ?basis, "attribute_excluded");
                }
                *slot.insert(decision)
            }
        }
    }

    /// Number of memoised decisions.
    #[must_use]
    pub fn cached_decisions(&self) -> usize {
        self.decisions.len()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{CurationAttribute, ExclusionBasis, ExclusionError, ExclusionProfile, ExclusionRules};
    use crate::config::CurationSettings;

    const PROFILES: &str = "\
# ORIGINAL TYPE\tORIGINAL VALUE\tZOOMA VALUE\tONT LABEL\tTERM SOURCE REF\tTERM ACCESSION\tSTUDY
OrganismPart\tcontrol\t\t\t\t\t
\tnormal\t\t\t\t\tE-MTAB-513

disease_state\t\t\t\t\t\t
";

    fn rules() -> ExclusionRules {
        ExclusionRules::from_lines(PROFILES, &CurationSettings::default()).expect("profiles parse")
    }

    #[test]
    fn parse_normalises_type_and_blanks_wildcards() {
        let profile = ExclusionProfile::parse("OrganismPart\tcontrol", "\t").expect("parse");
        assert_eq!(profile.original_type.as_deref(), Some("organism part"));
        assert_eq!(profile.original_value.as_deref(), Some("control"));
        assert!(profile.study_accession.is_none());
    }

    #[test]
    fn parse_rejects_lines_without_delimiter() {
        assert!(ExclusionProfile::parse("organism part", "\t").is_err());
        let err = ExclusionRules::from_lines("a\tb\tc\td\te\tf\tg\th", &CurationSettings::default())
            .expect_err("too many fields");
        assert!(matches!(err, ExclusionError::Malformed { line: 1, .. }));
    }

    #[rstest]
    #[case(CurationAttribute::new(Some("organism part"), "Control"), Some(ExclusionBasis::Profile(0)))]
    #[case(CurationAttribute::new(Some("organism_part"), "contrl"), Some(ExclusionBasis::Profile(0)))]
    #[case(CurationAttribute::new(Some("cell type"), "control"), None)]
    #[case(CurationAttribute::new(None, "normal").in_study("E-MTAB-513"), Some(ExclusionBasis::Profile(1)))]
    #[case(CurationAttribute::new(None, "normal").in_study("E-GEOD-1"), None)]
    #[case(CurationAttribute::new(Some("DiseaseState"), "asthma"), Some(ExclusionBasis::Profile(2)))]
    #[case(CurationAttribute::new(Some("organism part"), "x"), Some(ExclusionBasis::MinStringLength))]
    fn exclusion_decisions(
        #[case] attribute: CurationAttribute,
        #[case] expected: Option<ExclusionBasis>,
    ) {
        assert_eq!(rules().exclusion_basis(&attribute), expected);
    }

    #[test]
    fn decisions_are_memoised() {
        let rules = rules();
        let attribute = CurationAttribute::new(Some("organism part"), "liver");
        assert_eq!(rules.exclusion_basis(&attribute), None);
        assert_eq!(rules.exclusion_basis(&attribute), None);
        assert_eq!(rules.cached_decisions(), 1);
    }
}
