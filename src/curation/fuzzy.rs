//! Damerau-Levenshtein edit distance and the fuzzy match built on it.

/// Single-character insertions, deletions, substitutions and adjacent
/// transpositions needed to turn `a` into `b`.
#[must_use]
pub fn distance(a: &str, b: &str) -> usize {
    strsim::osa_distance(a, b)
}

/// Edit distance relative to the shorter input, in characters.
///
/// Returns infinity when only one side is empty.
#[must_use]
pub fn percent_difference(a: &str, b: &str) -> f64 {
    let diffs = distance(a, b);
    let shortest = a.chars().count().min(b.chars().count());
    if diffs == 0 {
        0.0
    } else if shortest == 0 {
        f64::INFINITY
    } else {
        diffs as f64 / shortest as f64
    }
}

/// Case-insensitive near-equality used by curation exclusions.
///
/// Both sides must be non-blank and start with the same character. Beyond
/// that, fewer than `max_diffs` edits are tolerated as long as they stay
/// within `max_pct_diffs` of the shorter value.
#[must_use]
pub fn is_fuzzy_match(a: &str, b: &str, max_diffs: usize, max_pct_diffs: f64) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    match (a.chars().next(), b.chars().next()) {
        (Some(first), Some(other)) if first == other => {}
        _ => return false,
    }

    let diffs = distance(&a, &b);
    if diffs == 0 {
        return true;
    }
    diffs < max_diffs && percent_difference(&a, &b) <= max_pct_diffs
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{distance, is_fuzzy_match, percent_difference};

    #[rstest]
    #[case("", "", 0)]
    #[case("abc", "", 3)]
    #[case("kitten", "sitting", 3)]
    #[case("ca", "ac", 1)]
    #[case("ca", "abc", 3)]
    #[case("diabetes mellitus", "diabetes melitus", 1)]
    #[case("héart", "heart", 1)]
    fn edit_distances(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(distance(a, b), expected);
        assert_eq!(distance(b, a), expected);
    }

    #[test]
    fn percent_difference_uses_shorter_value() {
        assert!((percent_difference("lung", "lungs") - 0.25).abs() < f64::EPSILON);
        assert_eq!(percent_difference("same", "same"), 0.0);
        assert!(percent_difference("", "x").is_infinite());
    }

    #[rstest]
    #[case("diabetes mellitus", "diabetes melitus", 3, 0.2, true)]
    #[case("cat", "dog", 3, 0.5, false)]
    #[case("Liver ", "liver", 1, 0.0, true)]
    #[case("", "liver", 3, 1.0, false)]
    #[case("lung", "lungs", 1, 1.0, false)]
    #[case("lung", "lungs", 2, 0.2, false)]
    #[case("lung", "lungs", 2, 0.25, true)]
    fn fuzzy_matches(
        #[case] a: &str,
        #[case] b: &str,
        #[case] max_diffs: usize,
        #[case] max_pct: f64,
        #[case] expected: bool,
    ) {
        assert_eq!(is_fuzzy_match(a, b, max_diffs, max_pct), expected);
    }
}
