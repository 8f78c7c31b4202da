//! Answer checking
//!
//! Responses are compared against a question's lowercase answers. Questions
//! flagged as requiring a perfect match only accept an exact answer; every
//! other question accepts a response whose similarity ratio with any
//! answer strictly exceeds the session's threshold.

use std::collections::HashMap;

use itertools::Itertools;

use crate::question::Question;

/// Decides whether a chat response answers a question
pub trait AnswerChecker: Send + Sync {
    /// Returns `true` if `response` is a correct answer to `question`
    ///
    /// `threshold` is the similarity a fuzzy answer must strictly exceed;
    /// it comes from the session's options.
    fn is_correct(&self, response: &str, question: &Question, threshold: f64) -> bool;
}

/// Checker that tolerates typos up to the session's threshold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForgivingChecker;

impl AnswerChecker for ForgivingChecker {
    fn is_correct(&self, response: &str, question: &Question, threshold: f64) -> bool {
        is_correct(response, question, threshold)
    }
}

/// Checks `response` against `question` with the given fuzzy threshold
///
/// The response is lowercased first. With a perfect match required the
/// threshold is ignored.
pub fn is_correct(response: &str, question: &Question, threshold: f64) -> bool {
    let response = response.to_lowercase();
    let answers = question.lowercase_answers();

    if question.perfect_match_required() {
        return answers.contains(&response);
    }

    answers
        .iter()
        .any(|answer| quick_ratio(&response, answer) > threshold)
}

/// Order-insensitive similarity of two strings in `[0, 1]`
///
/// Computes `2 * M / T`, where `M` is the number of characters the two
/// strings have in common (counted with multiplicity) and `T` is their
/// combined length. Two empty strings are identical.
pub fn quick_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }

    let mut available: HashMap<char, usize> = b.chars().counts();
    let matches = a
        .chars()
        .filter(|c| match available.get_mut(c) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        })
        .count();

    2.0 * matches as f64 / total as f64
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn paris(perfect: bool) -> Question {
        Question::new("Capital of France?", 10, vec!["Paris".to_string()], perfect)
    }

    #[test]
    fn test_quick_ratio_identical() {
        assert!((quick_ratio("paris", "paris") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quick_ratio_disjoint() {
        assert!(quick_ratio("london", "paris").abs() < f64::EPSILON);
    }

    #[test]
    fn test_quick_ratio_counts_multiplicity() {
        // "parris" shares p, a, r, i, s with "paris": 2 * 5 / 11
        assert!((quick_ratio("parris", "paris") - 10.0 / 11.0).abs() < 1e-12);
        assert!((quick_ratio("paris", "parris") - 10.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_quick_ratio_empty() {
        assert!((quick_ratio("", "") - 1.0).abs() < f64::EPSILON);
        assert!(quick_ratio("", "paris").abs() < f64::EPSILON);
    }

    #[test]
    fn test_quick_ratio_ignores_order() {
        assert!((quick_ratio("sirap", "paris") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_perfect_match_is_case_insensitive() {
        assert!(is_correct("PARIS", &paris(true), 0.8));
        assert!(is_correct("PARIS", &paris(true), 1.0));
        assert!(is_correct("PARIS", &paris(true), 0.0));
    }

    #[test]
    fn test_perfect_match_rejects_typos() {
        assert!(!is_correct("Pariss", &paris(true), 0.0));
        assert!(!is_correct("Parris", &paris(true), 0.8));
    }

    #[test]
    fn test_fuzzy_accepts_typo_above_threshold() {
        assert!(is_correct("Parris", &paris(false), 0.8));
        assert!(is_correct("Pariss", &paris(false), 0.8));
    }

    #[test]
    fn test_fuzzy_rejects_near_miss_below_threshold() {
        // 2 * 5 / 13 is about 0.77
        assert!(!is_correct("Parisian", &paris(false), 0.8));
        assert!(!is_correct("Pa", &paris(false), 0.8));
    }

    #[test]
    fn test_fuzzy_threshold_is_strict() {
        let threshold = quick_ratio("pari", "paris");
        assert!(!is_correct("Pari", &paris(false), threshold));
        assert!(is_correct("Pari", &paris(false), threshold - 0.01));
    }

    #[test]
    fn test_fuzzy_matches_any_answer() {
        let question = Question::new(
            "Largest planet?",
            5,
            vec!["Jupiter".to_string(), "Zeus' planet".to_string()],
            false,
        );
        assert!(is_correct("jupyter", &question, 0.8));
        assert!(is_correct("zeus planet", &question, 0.8));
        assert!(!is_correct("saturn", &question, 0.8));
    }

    #[test]
    fn test_forgiving_checker_uses_given_threshold() {
        let checker = ForgivingChecker;

        assert!(checker.is_correct("Parris", &paris(false), 0.8));
        assert!(!checker.is_correct("Parris", &paris(false), 0.95));
        assert!(checker.is_correct("paris", &paris(false), 0.95));
    }
}
