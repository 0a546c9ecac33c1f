use crate::index::DocumentIndex;
use crate::tokenizer::analyze;
use std::collections::HashSet;

/// A parsed query: stemmed terms for BM25 and the verbatim lowercase words
/// used for exact-name matching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryTerms {
    /// Deduplicated stemmed terms, first occurrence order.
    pub terms: Vec<String>,
    /// Whitespace-split lowercase words, punctuation kept.
    pub raw_words: Vec<String>,
}

impl QueryTerms {
    /// `expansions` are appended after the query's own terms. They are not
    /// filtered here; see [`filter_specific_terms`].
    pub fn parse(query: &str, expansions: &[String]) -> Self {
        let mut seen = HashSet::new();
        let terms = std::iter::once(query)
            .chain(expansions.iter().map(String::as_str))
            .flat_map(|text| analyze(text))
            .filter(|t| seen.insert(t.clone()))
            .collect();
        let raw_words = query.to_lowercase().split_whitespace().map(str::to_string).collect();
        Self { terms, raw_words }
    }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() && self.raw_words.is_empty() }

    /// True when some query word is `name` (already lowercased), either
    /// verbatim or with surrounding punctuation removed. Interior separators
    /// are kept, so `data.table` only matches `data.table`.
    pub fn mentions_name(&self, name: &str) -> bool {
        !name.is_empty()
            && self.raw_words.iter().any(|w| w == name || w.trim_matches(|c: char| !is_word_char(c)) == name)
    }
}

fn is_word_char(c: char) -> bool { c.is_alphanumeric() || c == '_' }

/// Mean IDF of the stemmed tokens of `term`, or `None` if it has no tokens.
pub fn specificity(term: &str, index: &DocumentIndex) -> Option<f64> {
    let tokens = analyze(term);
    if tokens.is_empty() { return None; }
    Some(tokens.iter().map(|t| index.idf(t)).sum::<f64>() / tokens.len() as f64)
}

/// Keep the most catalog-specific expansion terms.
///
/// Terms are ordered by descending mean IDF (stable for ties), anything under
/// `min_specificity` is discarded and at most `max_terms` survive. Generic
/// phrases from an expander would otherwise flood the ranking.
pub fn filter_specific_terms(
    terms: &[String],
    index: &DocumentIndex,
    min_specificity: f64,
    max_terms: usize,
) -> Vec<String> {
    let mut scored: Vec<(&String, f64)> = terms
        .iter()
        .filter_map(|t| specificity(t, index).map(|s| (t, s)))
        .filter(|(_, s)| *s >= min_specificity)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(max_terms);
    tracing::debug!(offered = terms.len(), kept = scored.len(), "filtered expansion terms");
    scored.into_iter().map(|(t, _)| t.clone()).collect()
}
