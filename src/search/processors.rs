//! Rewrites of search strings that found nothing as typed.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Splits or simplifies a search string into candidate sub-strings.
///
/// The number of parts returned drives the expansion stage: one part is
/// searched as is, two parts are searched and merged, more are dropped.
pub trait SearchStringProcessor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Relative confidence in results found through this processor for `search`.
    ///
    /// Scales the scores of results found for a single processed part.
    fn boost_factor(&self, _search: &str) -> f32 {
        1.0
    }

    fn can_process(&self, search: &str) -> bool;

    fn process_search_string(&self, search: &str) -> Vec<String>;
}

/// Configurable processor kinds, applied in the listed order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    Parentheses,
    Stopwords,
    Conjunction,
}

impl ProcessorKind {
    #[must_use]
    pub fn build(self) -> Arc<dyn SearchStringProcessor> {
        match self {
            Self::Parentheses => Arc::new(ParenthesesProcessor),
            Self::Stopwords => Arc::new(StopwordProcessor::default()),
            Self::Conjunction => Arc::new(ConjunctionProcessor),
        }
    }
}

static BRACKETED: OnceLock<Regex> = OnceLock::new();
static COMPOUND_SUFFIX: OnceLock<Regex> = OnceLock::new();
static COMPOUND_PREFIX: OnceLock<Regex> = OnceLock::new();
static CONJUNCTION: OnceLock<Regex> = OnceLock::new();

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern compiles"))
}

/// Brackets glued to surrounding text belong to a chemical name, e.g.
/// `4-(N-nitrosomethylamino)-1-(3-pyridyl)butan-1-one`.
fn is_compound(search: &str) -> bool {
    regex(&COMPOUND_SUFFIX, r"\(.+\)\S").is_match(search)
        || regex(&COMPOUND_PREFIX, r"\S\(.+\)").is_match(search)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops bracketed qualifiers, e.g. `leukemia (chronic)` becomes `leukemia`.
#[derive(Copy, Clone, Debug, Default)]
pub struct ParenthesesProcessor;

impl SearchStringProcessor for ParenthesesProcessor {
    fn name(&self) -> &'static str {
        "parentheses"
    }

    fn boost_factor(&self, _search: &str) -> f32 {
        0.95
    }

    fn can_process(&self, search: &str) -> bool {
        search.contains('(') && search.contains(')') && !is_compound(search)
    }

    fn process_search_string(&self, search: &str) -> Vec<String> {
        let stripped = regex(&BRACKETED, r"\([^)]*\)").replace_all(search, " ");
        let processed = collapse_whitespace(&stripped);
        if processed == search || processed.is_empty() {
            Vec::new()
        } else {
            vec![processed]
        }
    }
}

const STOPWORDS: [&str; 30] = [
    "a", "an", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it", "of",
    "on", "such", "that", "the", "their", "then", "there", "these", "they", "this", "to", "was",
    "will", "with", "nos",
];

/// Lower-cases the search string and removes common English stopwords.
#[derive(Clone, Debug)]
pub struct StopwordProcessor {
    stopwords: Vec<String>,
}

impl Default for StopwordProcessor {
    fn default() -> Self {
        Self::new(STOPWORDS)
    }
}

impl StopwordProcessor {
    pub fn new<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stopwords: stopwords.into_iter().map(Into::into).collect(),
        }
    }

    fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.iter().any(|stopword| stopword == word)
    }

    fn without_separators(&self, text: &str, original: &str) -> String {
        let mut output = text
            .replace(", ", " ")
            .replace(" _ ", " ")
            .replace(" - ", " ");
        if !is_compound(original) {
            output = output.replace(" (", " ").replace(") ", " ");
            if let Some(trimmed) = output.strip_suffix(')') {
                output = trimmed.to_string();
            }
        }
        collapse_whitespace(&output)
    }
}

impl SearchStringProcessor for StopwordProcessor {
    fn name(&self) -> &'static str {
        "stopwords"
    }

    fn can_process(&self, search: &str) -> bool {
        search
            .to_lowercase()
            .split_whitespace()
            .any(|word| self.is_stopword(word))
    }

    fn process_search_string(&self, search: &str) -> Vec<String> {
        let lowered = search.to_lowercase();
        let kept = lowered
            .split(' ')
            .filter(|word| !word.is_empty() && !self.is_stopword(word))
            .collect::<Vec<_>>()
            .join(" ");
        vec![self.without_separators(&kept, search)]
    }
}

/// Splits composite descriptions such as `asthma and obesity` into their parts.
#[derive(Copy, Clone, Debug, Default)]
pub struct ConjunctionProcessor;

impl ConjunctionProcessor {
    fn parts(search: &str) -> Vec<String> {
        regex(&CONJUNCTION, r"(?i)\s+(?:and|&)\s+|[,;|]")
            .split(search)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl SearchStringProcessor for ConjunctionProcessor {
    fn name(&self) -> &'static str {
        "conjunction"
    }

    fn boost_factor(&self, _search: &str) -> f32 {
        0.7
    }

    fn can_process(&self, search: &str) -> bool {
        Self::parts(search).len() > 1
    }

    fn process_search_string(&self, search: &str) -> Vec<String> {
        Self::parts(search)
    }
}

/// Delegates to the first wrapped processor able to handle the input.
#[derive(Clone, Default)]
pub struct CompositeProcessor {
    processors: Vec<Arc<dyn SearchStringProcessor>>,
}

impl CompositeProcessor {
    pub fn new(processors: Vec<Arc<dyn SearchStringProcessor>>) -> Self {
        Self { processors }
    }

    pub fn from_kinds(kinds: &[ProcessorKind]) -> Self {
        Self::new(kinds.iter().map(|kind| kind.build()).collect())
    }

    fn select(&self, search: &str) -> Option<&Arc<dyn SearchStringProcessor>> {
        self.processors
            .iter()
            .find(|processor| processor.can_process(search))
    }
}

impl SearchStringProcessor for CompositeProcessor {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn boost_factor(&self, search: &str) -> f32 {
        self.select(search)
            .map_or(1.0, |processor| processor.boost_factor(search))
    }

    fn can_process(&self, search: &str) -> bool {
        self.select(search).is_some()
    }

    fn process_search_string(&self, search: &str) -> Vec<String> {
        self.select(search)
            .map(|processor| processor.process_search_string(search))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        CompositeProcessor, ConjunctionProcessor, ParenthesesProcessor, ProcessorKind,
        SearchStringProcessor, StopwordProcessor,
    };

    #[rstest]
    #[case("leukemia (chronic)", true)]
    #[case("4-(N-nitrosomethylamino)-1-(3-pyridyl)butan-1-one", false)]
    #[case("leukemia", false)]
    fn parentheses_skip_compounds(#[case] search: &str, #[case] expected: bool) {
        assert_eq!(ParenthesesProcessor.can_process(search), expected);
    }

    #[test]
    fn parentheses_are_stripped() {
        assert_eq!(
            ParenthesesProcessor.process_search_string("diabetes (type 2) mellitus"),
            vec!["diabetes mellitus".to_string()]
        );
        assert!(ParenthesesProcessor
            .process_search_string("(unknown)")
            .is_empty());
    }

    #[test]
    fn stopwords_are_removed() {
        let processor = StopwordProcessor::default();
        assert!(processor.can_process("Carcinoma of the Lung"));
        assert!(!processor.can_process("lung carcinoma"));
        assert_eq!(
            processor.process_search_string("Carcinoma of the Lung"),
            vec!["carcinoma lung".to_string()]
        );
    }

    #[rstest]
    #[case("asthma and obesity", vec!["asthma", "obesity"])]
    #[case("a, b, c", vec!["a", "b", "c"])]
    #[case("smoker; Obese", vec!["smoker", "Obese"])]
    fn conjunctions_split(#[case] search: &str, #[case] expected: Vec<&str>) {
        assert!(ConjunctionProcessor.can_process(search));
        assert_eq!(ConjunctionProcessor.process_search_string(search), expected);
    }

    #[test]
    fn composite_uses_first_capable_processor() {
        let composite = CompositeProcessor::from_kinds(&[
            ProcessorKind::Parentheses,
            ProcessorKind::Conjunction,
        ]);
        assert_eq!(
            composite.process_search_string("asthma (severe)"),
            vec!["asthma".to_string()]
        );
        assert_eq!(composite.process_search_string("asthma and copd").len(), 2);
        assert!(!composite.can_process("asthma"));
        assert!(composite.process_search_string("asthma").is_empty());

        assert!((composite.boost_factor("asthma (severe)") - 0.95).abs() < f32::EPSILON);
        assert!((composite.boost_factor("asthma and copd") - 0.7).abs() < f32::EPSILON);
        assert!((composite.boost_factor("asthma") - 1.0).abs() < f32::EPSILON);
    }
}
