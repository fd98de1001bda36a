use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    pipeline::{Next, SearchStage},
    processors::SearchStringProcessor,
    service::{SearchError, SearchRequest},
    summary::AnnotationSummary,
};

/// Dampening applied to scores of summaries merged from two partial matches.
pub const DEFAULT_PARTIAL_STRING_BOOST: f32 = 0.7;

/// Summaries considered per part when merging.
pub const DEFAULT_MERGE_LIMIT: usize = 20;

/// Re-queries processed forms of a value search that found nothing.
pub struct StringExpansionStage {
    processor: Arc<dyn SearchStringProcessor>,
    partial_string_boost: f32,
    merge_limit: usize,
}

impl StringExpansionStage {
    pub fn new(
        processor: Arc<dyn SearchStringProcessor>,
        partial_string_boost: f32,
        merge_limit: usize,
    ) -> Self {
        Self {
            processor,
            partial_string_boost,
            merge_limit,
        }
    }
}

#[async_trait]
impl SearchStage for StringExpansionStage {
    fn name(&self) -> &'static str {
        "string_expansion"
    }

    async fn search(
        &self,
        request: &SearchRequest,
        next: Next<'_>,
    ) -> Result<Vec<AnnotationSummary>, SearchError> {
        let results = next.run(request).await?;
        if !results.is_empty() {
            return Ok(results);
        }
        let Some(pattern) = request.pattern() else {
            return Ok(results);
        };
        if !self.processor.can_process(pattern) {
            return Ok(results);
        }

        let parts = self.processor.process_search_string(pattern);
        let boost = self.processor.boost_factor(pattern);
        debug!(
            pattern,
            processor = self.processor.name(),
            boost,
            parts = parts.len(),
            "search_string_expanded"
        );
        match parts.as_slice() {
            [] => Ok(Vec::new()),
            [part] => Ok(next
                .run(&request.with_pattern(part))
                .await?
                .into_iter()
                .map(|summary| {
                    let score = summary.quality_score() * boost;
                    summary.with_score(score)
                })
                .collect()),
            [first, second] => {
                let first_results = next.run(&request.with_pattern(first)).await?;
                let second_results = next.run(&request.with_pattern(second)).await?;
                Ok(merge_results(
                    pattern,
                    (first.as_str(), first_results.as_slice()),
                    (second.as_str(), second_results.as_slice()),
                    self.partial_string_boost,
                    self.merge_limit,
                ))
            }
            _ => {
                warn!(
                    pattern,
                    parts = parts.len(),
                    "search_string_expansion_unsupported"
                );
                Ok(Vec::new())
            }
        }
    }
}

/// Highest scoring `limit` summaries.
fn best(summaries: &[AnnotationSummary], limit: usize) -> Vec<&AnnotationSummary> {
    let mut ranked: Vec<&AnnotationSummary> = summaries.iter().collect();
    ranked.sort_by(|left, right| right.quality_score().total_cmp(&left.quality_score()));
    ranked.truncate(limit);
    ranked
}

/// Length-weighted average of two part scores, dampened by `boost`.
#[must_use]
pub fn merged_score(first: (&str, f32), second: (&str, f32), boost: f32) -> f32 {
    let first_len = first.0.chars().count() as f32;
    let second_len = second.0.chars().count() as f32;
    let total = first_len + second_len;
    if total == 0.0 {
        return 0.0;
    }
    ((first_len * first.1 + second_len * second.1) / total) * boost
}

/// Combines every pairing of results found for two parts of `pattern`.
///
/// At most `limit` summaries per part take part in the merge. Merged summaries
/// carry `pattern` as their value and no identifier.
#[must_use]
pub fn merge_results(
    pattern: &str,
    first: (&str, &[AnnotationSummary]),
    second: (&str, &[AnnotationSummary]),
    boost: f32,
    limit: usize,
) -> Vec<AnnotationSummary> {
    let (first_part, first_results) = first;
    let (second_part, second_results) = second;
    let second_best = best(second_results, limit);

    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for left in best(first_results, limit) {
        for right in &second_best {
            let score = merged_score(
                (first_part, left.quality_score()),
                (second_part, right.quality_score()),
                boost,
            );
            let summary = AnnotationSummary::union(pattern, left, right, score);
            if seen.insert(summary.clone()) {
                merged.push(summary);
            }
        }
    }
    merged
}
