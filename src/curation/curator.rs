use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use tracing::{debug, info, warn};

use super::{
    exclusion::{CurationAttribute, ExclusionBasis, ExclusionRules},
    profile::{MappingCategory, ResultsProfile},
    text::{refs_and_accessions, RefsAndAccessions},
};
use crate::{
    config::CurationSettings,
    search::{AnnotationSummary, AnnotationSummarySearch, SearchHandle, SearchRequest},
};

/// Outcome of curating one attribute.
#[derive(Clone, Debug)]
pub struct Curation {
    attribute: CurationAttribute,
    exclusion: Option<ExclusionBasis>,
    profile: Option<Arc<ResultsProfile>>,
    refs_and_accessions: Option<RefsAndAccessions>,
}

impl Curation {
    /// The attribute as submitted, with mapped fields filled in on automatic outcomes.
    #[must_use]
    pub fn attribute(&self) -> &CurationAttribute {
        &self.attribute
    }

    #[must_use]
    pub fn exclusion(&self) -> Option<ExclusionBasis> {
        self.exclusion
    }

    #[must_use]
    pub fn profile(&self) -> Option<&ResultsProfile> {
        self.profile.as_deref()
    }

    /// Mapping category, absent for excluded attributes.
    #[must_use]
    pub fn category(&self) -> Option<MappingCategory> {
        self.profile.as_ref().map(|profile| profile.mapping_category())
    }

    /// Summary applied automatically, if any.
    #[must_use]
    pub fn chosen(&self) -> Option<&AnnotationSummary> {
        self.profile
            .as_ref()
            .and_then(|profile| profile.automatic_annotation())
    }

    #[must_use]
    pub fn refs_and_accessions(&self) -> Option<&RefsAndAccessions> {
        self.refs_and_accessions.as_ref()
    }
}

/// Maps attributes to ontology terms through a search pipeline.
///
/// Profiles are memoised per normalised type and value, so repeated
/// attributes across studies cost one search. Failed searches are retried.
pub struct Curator {
    search: Arc<SearchHandle>,
    rules: ExclusionRules,
    settings: CurationSettings,
    profiles: DashMap<String, Arc<ResultsProfile>>,
}

impl Curator {
    pub fn new(search: Arc<SearchHandle>, rules: ExclusionRules, settings: CurationSettings) -> Self {
        Self {
            search,
            rules,
            settings,
            profiles: DashMap::new(),
        }
    }

    #[must_use]
    pub fn rules(&self) -> &ExclusionRules {
        &self.rules
    }

    /// Number of memoised profiles.
    #[must_use]
    pub fn cached_profiles(&self) -> usize {
        self.profiles.len()
    }

    /// Curates `attribute`.
    ///
    /// Search failures do not fail curation; they surface as an
    /// [`MappingCategory::Error`] profile carrying the failure message.
    pub async fn curate(&self, attribute: &CurationAttribute) -> Curation {
        if let Some(basis) = self.rules.exclusion_basis(attribute) {
            debug!(value = %attribute.value, ?basis, "curation_skipped");
            return Curation {
                attribute: attribute.clone(),
                exclusion: Some(basis),
                profile: None,
                refs_and_accessions: None,
            };
        }

        let profile = self.profile_for(attribute).await;
        let mut curated = attribute.clone();
        let refs_and_accessions = profile.automatic_annotation().and_then(|summary| {
            let refs = refs_and_accessions(
                summary,
                self.settings.ols_short_ids,
                self.settings.long_form_accessions,
                &self.settings.compound_delimiter,
            )?;
            curated.zoomified_value = Some(summary.property_value().to_owned());
            curated.term_source_ref = Some(refs.refs.clone());
            curated.ontology_accession = Some(refs.accessions.clone());
            Some(refs)
        });
        if refs_and_accessions.is_some() {
            info!(
                value = %attribute.value,
                accession = curated.ontology_accession.as_deref().unwrap_or_default(),
                "attribute_curated_automatically"
            );
        }

        Curation {
            attribute: curated,
            exclusion: None,
            profile: Some(profile),
            refs_and_accessions,
        }
    }

    async fn profile_for(&self, attribute: &CurationAttribute) -> Arc<ResultsProfile> {
        let key = format!("{}:{}", attribute.normalised_type(), attribute.value);
        if let Some(profile) = self.profiles.get(&key) {
            return Arc::clone(profile.value());
        }

        let request = match attribute.property_type {
            Some(_) => SearchRequest::typed_value(attribute.normalised_type(), attribute.value.as_str()),
            None => SearchRequest::value(attribute.value.as_str()),
        };
        let results = self.search.search_and_score(&request).await;
        let profile = Arc::new(ResultsProfile::evaluate(
            attribute.value.as_str(),
            results,
            &self.settings.thresholds(),
        ));
        if profile.mapping_category() == MappingCategory::Error {
            return profile;
        }

        match self.profiles.entry(key) {
            Entry::Occupied(stored) => {
                warn!(key = %stored.key(), "results_profile_already_cached");
                Arc::clone(stored.get())
            }
            Entry::Vacant(slot) => Arc::clone(slot.insert(profile).value()),
        }
    }
}
