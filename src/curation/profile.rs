//! Classification of scored search results into curation outcomes.
//!
//! A [`ResultsProfile`] narrows the summaries found for one query to the band
//! scoring close to the best one, then decides whether the mapping can be
//! applied automatically or needs a curator.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::search::{AnnotationSummary, ScoredSummaries, SearchError};

/// Curation outcome of one query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingCategory {
    Automatic,
    RequiresCuration,
    NoResults,
    Error,
}

/// Score thresholds applied when profiling results.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileThresholds {
    /// Minimum score of a sole result for it to be applied automatically.
    pub cutoff_score: f32,
    /// Fraction of the best score a result needs to stay in the filtered band.
    /// Higher values narrow the band.
    pub cutoff_percent: f32,
}

impl Default for ProfileThresholds {
    fn default() -> Self {
        Self {
            cutoff_score: 80.0,
            cutoff_percent: 0.8,
        }
    }
}

/// Immutable evaluation of the results found for one query.
#[derive(Clone, Debug, Serialize)]
pub struct ResultsProfile {
    query: String,
    #[serde(skip)]
    unfiltered: ScoredSummaries,
    percentile_filtered: Vec<AnnotationSummary>,
    automatic_annotation: Option<AnnotationSummary>,
    runner_up: Option<AnnotationSummary>,
    mapping_category: MappingCategory,
    error_message: Option<String>,
}

impl ResultsProfile {
    /// Profiles `results`, the outcome of searching for `query`.
    #[must_use]
    pub fn evaluate(
        query: impl Into<String>,
        results: Result<ScoredSummaries, SearchError>,
        thresholds: &ProfileThresholds,
    ) -> Self {
        let query = query.into();
        let unfiltered = match results {
            Ok(unfiltered) => unfiltered,
            Err(err) => {
                warn!(query = %query, err.msg = %err, err.detail = ?err, "results_profile_error");
                return Self {
                    query,
                    unfiltered: ScoredSummaries::new(),
                    percentile_filtered: Vec::new(),
                    automatic_annotation: None,
                    runner_up: None,
                    mapping_category: MappingCategory::Error,
                    error_message: Some(sanitise_message(&err.to_string())),
                };
            }
        };

        let percentile_filtered = percentile_filter(&unfiltered, thresholds.cutoff_percent);
        let mut automatic_annotation = None;
        let mut runner_up = None;
        let mapping_category = match percentile_filtered.as_slice() {
            [] => MappingCategory::NoResults,
            [sole] => {
                if score_of(&unfiltered, sole) >= thresholds.cutoff_score {
                    automatic_annotation = Some(sole.clone());
                    MappingCategory::Automatic
                } else {
                    runner_up = Some(sole.clone());
                    MappingCategory::RequiresCuration
                }
            }
            several => {
                runner_up = best_of(&unfiltered, several).cloned();
                MappingCategory::RequiresCuration
            }
        };

        if let Some(runner_up) = &runner_up {
            if runner_up.semantic_tags().len() > 1 {
                warn!(
                    query = %query,
                    tags = runner_up.semantic_tags().len(),
                    "compound_runner_up_detected"
                );
            }
        }
        debug!(
            query = %query,
            unfiltered = unfiltered.len(),
            filtered = percentile_filtered.len(),
            category = ?mapping_category,
            "results_profiled"
        );

        Self {
            query,
            unfiltered,
            percentile_filtered,
            automatic_annotation,
            runner_up,
            mapping_category,
            error_message: None,
        }
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn unfiltered(&self) -> &ScoredSummaries {
        &self.unfiltered
    }

    /// Summaries inside the filtered band, best first.
    #[must_use]
    pub fn percentile_filtered(&self) -> &[AnnotationSummary] {
        &self.percentile_filtered
    }

    #[must_use]
    pub fn automatic_annotation(&self) -> Option<&AnnotationSummary> {
        self.automatic_annotation.as_ref()
    }

    #[must_use]
    pub fn runner_up(&self) -> Option<&AnnotationSummary> {
        self.runner_up.as_ref()
    }

    #[must_use]
    pub fn mapping_category(&self) -> MappingCategory {
        self.mapping_category
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    #[must_use]
    pub fn number_of_unfiltered_results(&self) -> usize {
        self.unfiltered.len()
    }

    #[must_use]
    pub fn number_of_filtered_results(&self) -> usize {
        self.percentile_filtered.len()
    }
}

fn score_of(scored: &ScoredSummaries, summary: &AnnotationSummary) -> f32 {
    scored.get(summary).copied().unwrap_or_default()
}

/// Highest scoring candidate, the first one seen on ties.
fn best_of<'a>(
    scored: &ScoredSummaries,
    candidates: &'a [AnnotationSummary],
) -> Option<&'a AnnotationSummary> {
    let mut best: Option<(&AnnotationSummary, f32)> = None;
    for candidate in candidates {
        let score = score_of(scored, candidate);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best.map(|(summary, _)| summary)
}

/// Summaries scoring at least `cutoff_percent` of the best score, best first.
#[must_use]
pub fn percentile_filter(scored: &ScoredSummaries, cutoff_percent: f32) -> Vec<AnnotationSummary> {
    let Some(best) = scored.values().copied().reduce(f32::max) else {
        return Vec::new();
    };
    let threshold = best * cutoff_percent;
    let mut kept: Vec<(&AnnotationSummary, f32)> = scored
        .iter()
        .filter(|(_, score)| **score >= threshold)
        .map(|(summary, score)| (summary, *score))
        .collect();
    kept.sort_by(|left, right| right.1.total_cmp(&left.1));
    kept.into_iter().map(|(summary, _)| summary.clone()).collect()
}

static NON_LETTERS: OnceLock<Regex> = OnceLock::new();

/// Keeps letters and spaces only so messages survive tabular reports.
fn sanitise_message(message: &str) -> String {
    NON_LETTERS
        .get_or_init(|| Regex::new("[^a-zA-Z ]").expect("static pattern compiles"))
        .replace_all(message, " ")
        .into_owned()
}
