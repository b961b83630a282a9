//! Deterministic ATS keyword analysis.
//!
//! Keywords come from the job text only; the model's self-assessment is kept
//! for reference but never feeds the matched/missing sets or the score.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::package::AtsReport;

/// Suggestions generated when the model offers none.
const MAX_SUGGESTIONS: usize = 5;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "all", "also", "am", "an", "and", "any", "are",
    "as", "at", "be", "been", "being", "both", "but", "by", "can", "could", "did", "do", "does",
    "doing", "each", "either", "etc", "every", "few", "for", "from", "further", "had", "has",
    "have", "having", "he", "her", "here", "him", "his", "how", "i", "if", "in", "into", "is",
    "it", "its", "just", "least", "like", "may", "me", "might", "more", "most", "must", "my",
    "no", "nor", "not", "of", "off", "on", "once", "one", "only", "or", "other", "our", "ours",
    "out", "over", "own", "per", "plus", "same", "she", "should", "so", "some", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those", "through",
    "to", "too", "under", "until", "up", "us", "very", "via", "was", "we", "well", "were",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "within",
    "would", "you", "your", "yours",
    // Posting boilerplate.
    "ability", "candidate", "candidates", "experience", "including", "job", "looking", "join",
    "new", "opportunity", "preferred", "required", "requirements", "responsibilities", "role",
    "strong", "team", "work", "working", "years",
];

/// Lower-cased tokens. `+` and `#` stay attached so "c++" and "c#" survive;
/// tokens without a letter are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .map(|t| t.trim_start_matches(['+', '#']).to_lowercase())
        .filter(|t| t.chars().any(char::is_alphabetic))
        .collect()
}

fn is_keyword(token: &str) -> bool {
    (token.chars().count() >= 2 || token.contains(['+', '#'])) && !STOP_WORDS.contains(&token)
}

/// Keyword counts in the job text, stop-words removed.
fn keyword_counts(job_text: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for token in tokenize(job_text).into_iter().filter(|t| is_keyword(t)) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
pub fn extract_keywords(job_text: &str) -> BTreeSet<String> {
    keyword_counts(job_text).into_keys().collect()
}

/// Builds the report. `score = |matched| / |keywords|`, 0 when the job text
/// yields no keywords.
pub fn analyze(
    job_text: &str,
    resume_text: &str,
    model_suggestions: Vec<String>,
    model_reported_score: Option<f64>,
) -> AtsReport {
    let counts = keyword_counts(job_text);
    let present: BTreeSet<String> = tokenize(resume_text).into_iter().collect();

    let (matched, missing): (BTreeSet<String>, BTreeSet<String>) = counts
        .keys()
        .cloned()
        .partition(|keyword| present.contains(keyword));

    let score = if counts.is_empty() {
        0.0
    } else {
        matched.len() as f64 / counts.len() as f64
    };

    let suggestions: Vec<String> = model_suggestions
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let suggestions = if suggestions.is_empty() {
        suggest(&counts, &missing)
    } else {
        suggestions
    };

    AtsReport {
        score,
        matched,
        missing,
        suggestions,
        model_reported_score,
    }
}

/// Most frequent missing keywords first, ties alphabetical.
fn suggest(counts: &BTreeMap<String, usize>, missing: &BTreeSet<String>) -> Vec<String> {
    let mut ranked: Vec<(&String, usize)> = missing
        .iter()
        .map(|k| (k, counts.get(k).copied().unwrap_or(0)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(k, _)| format!("Mention \"{k}\" where your experience supports it"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = "Senior Product Manager to own our ML platform roadmap. \
        Experience with SQL, experimentation and C++ services required. \
        You will partner with engineering on the platform.";

    #[test]
    fn test_keywords_drop_stop_words_and_keep_symbols() {
        let keywords = extract_keywords(JOB);

        assert!(keywords.contains("platform"));
        assert!(keywords.contains("c++"));
        assert!(keywords.contains("sql"));
        assert!(!keywords.contains("the"));
        assert!(!keywords.contains("with"));
        assert!(!keywords.contains("experience"));
    }

    #[test]
    fn test_report_is_deterministic() {
        let resume = "Led ML platform roadmap; shipped SQL experimentation tooling.";

        let first = analyze(JOB, resume, vec![], Some(0.99));
        let second = analyze(JOB, resume, vec![], Some(0.10));

        assert_eq!(first.matched, second.matched);
        assert_eq!(first.missing, second.missing);
        assert_eq!(first.score, second.score);
        assert_eq!(first.suggestions, second.suggestions);
    }

    #[test]
    fn test_matched_and_missing_partition_keywords() {
        let resume = "Platform roadmap owner. SQL.";
        let report = analyze(JOB, resume, vec![], None);
        let keywords = extract_keywords(JOB);

        assert!(report.matched.contains("platform"));
        assert!(report.missing.contains("c++"));
        assert!(report.matched.is_disjoint(&report.missing));
        assert_eq!(
            report.matched.union(&report.missing).cloned().collect::<BTreeSet<_>>(),
            keywords
        );
        let expected = report.matched.len() as f64 / keywords.len() as f64;
        assert!((report.score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_model_score_does_not_affect_computed_score() {
        let report = analyze(JOB, "", vec![], Some(0.97));
        assert_eq!(report.score, 0.0);
        assert_eq!(report.model_reported_score, Some(0.97));
    }

    #[test]
    fn test_model_suggestions_take_precedence() {
        let report = analyze(JOB, "", vec!["Quantify platform impact".into()], None);
        assert_eq!(report.suggestions, vec!["Quantify platform impact".to_string()]);
    }

    #[test]
    fn test_fallback_suggestions_rank_frequent_missing_keywords() {
        let report = analyze(JOB, "", vec![], None);
        assert_eq!(report.suggestions.len(), MAX_SUGGESTIONS);
        assert!(report.suggestions[0].contains("platform"));
    }

    #[test]
    fn test_empty_job_text_scores_zero() {
        let report = analyze("the and of", "anything", vec![], None);
        assert_eq!(report.score, 0.0);
        assert!(report.matched.is_empty());
    }
}
