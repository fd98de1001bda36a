//! Text normalisation shared by curation and annotation comparisons.

use serde::Serialize;
use tracing::warn;

use crate::search::AnnotationSummary;

/// Normalises a free-form attribute or property type such as `OrganismPart`.
///
/// Underscores become spaces and camel-cased words are split apart
/// (`DNAExtract` becomes `dna extract`), then the result is lower-cased with
/// runs of whitespace collapsed. Every type comparison goes through here.
#[must_use]
pub fn normalise_type(attribute_type: &str) -> String {
    let chars: Vec<char> = attribute_type.replace('_', " ").chars().collect();
    let mut split = String::with_capacity(attribute_type.len() + 4);
    for (index, &current) in chars.iter().enumerate() {
        if index > 0 && current.is_uppercase() {
            let previous = chars[index - 1];
            let next_is_lower = chars.get(index + 1).is_some_and(|next| next.is_lowercase());
            if !previous.is_uppercase() || next_is_lower {
                split.push(' ');
            }
        }
        split.push(current);
    }
    collapse_whitespace(&split.to_lowercase())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Term source references and accessions of a summary's semantic tags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RefsAndAccessions {
    pub refs: String,
    pub accessions: String,
}

/// Concatenates the namespaces and accessions of every semantic tag of `summary`.
///
/// Compound mappings (`heart and lung`) carry several tags; their parts are
/// joined by `delimiter` in tag order. Accessions are the full IRI with
/// `long_form`, the local name otherwise, rewritten to `EFO:0000270` style
/// with `short_ids`. Returns `None` for untagged summaries.
#[must_use]
pub fn refs_and_accessions(
    summary: &AnnotationSummary,
    short_ids: bool,
    long_form: bool,
    delimiter: &str,
) -> Option<RefsAndAccessions> {
    let tags = summary.semantic_tags();
    if tags.is_empty() {
        warn!(
            value = summary.property_value(),
            "summary_without_semantic_tags"
        );
        return None;
    }

    let mut refs = Vec::with_capacity(tags.len());
    let mut accessions = Vec::with_capacity(tags.len());
    for tag in tags {
        refs.push(tag.namespace().to_owned());
        accessions.push(if long_form {
            tag.as_str().to_owned()
        } else if short_ids {
            tag.short_form()
        } else {
            tag.fragment().to_owned()
        });
    }
    let joined = RefsAndAccessions {
        refs: refs.join(delimiter),
        accessions: accessions.join(delimiter),
    };
    if tags.len() > 1 {
        warn!(
            refs = %joined.refs,
            accessions = %joined.accessions,
            "compound_semantic_tags_concatenated"
        );
    }
    Some(joined)
}
