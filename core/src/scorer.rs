//! Field-weighted BM25 plus the exact-name and quality boosts.

use crate::catalog::Record;
use crate::config::RankConfig;
use crate::index::{AnalyzedRecord, DocumentIndex, Field};
use crate::query::QueryTerms;
use serde::Serialize;

/// One query term's share of a record's score within a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermContribution {
    pub term: String,
    pub field: Field,
    pub tf: u32,
    pub idf: f64,
    /// Saturated term score multiplied by the field weight.
    pub weighted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub id: String,
    pub bm25: f64,
    pub exact_boost: f64,
    pub quality_boost: f64,
    pub score: f64,
    pub contributions: Vec<TermContribution>,
}

pub struct Scorer<'a> {
    index: &'a DocumentIndex,
    config: &'a RankConfig,
}

impl<'a> Scorer<'a> {
    pub fn new(index: &'a DocumentIndex, config: &'a RankConfig) -> Self { Self { index, config } }

    /// Saturated BM25 term score for `tf` occurrences in a field of `field_len` tokens.
    fn saturate(&self, idf: f64, tf: u32, field_len: usize, field: Field) -> f64 {
        let (k1, b) = (self.config.k1, self.config.b);
        let tf = tf as f64;
        let norm = 1.0 - b + b * (field_len as f64 / self.index.avg_len(field));
        idf * (tf * (k1 + 1.0)) / (tf + k1 * norm)
    }

    fn contributions(&self, terms: &[String], analyzed: &AnalyzedRecord, out: &mut Vec<TermContribution>) {
        for field in Field::ALL {
            let tokens = analyzed.tokens(field);
            let weight = self.config.field_weights.get(field);
            for term in terms {
                let tf = tokens.iter().filter(|t| *t == term).count() as u32;
                if tf == 0 { continue; }
                let idf = self.index.idf(term);
                let weighted = weight * self.saturate(idf, tf, tokens.len(), field);
                out.push(TermContribution { term: term.clone(), field, tf, idf, weighted });
            }
        }
    }

    /// Unweighted BM25 sum of `terms` over one field of `record`.
    pub fn field_score(&self, terms: &[String], record: &Record, field: Field) -> f64 {
        let analyzed = AnalyzedRecord::new(record);
        let tokens = analyzed.tokens(field);
        terms
            .iter()
            .map(|term| {
                let tf = tokens.iter().filter(|t| *t == term).count() as u32;
                if tf == 0 { 0.0 } else { self.saturate(self.index.idf(term), tf, tokens.len(), field) }
            })
            .sum()
    }

    pub fn score(&self, query: &QueryTerms, record: &Record) -> ScoreBreakdown {
        let mut contributions = Vec::new();
        if !query.terms.is_empty() {
            self.contributions(&query.terms, &AnalyzedRecord::new(record), &mut contributions);
        }
        let bm25: f64 = contributions.iter().map(|c| c.weighted).sum();

        let exact_boost = if query.mentions_name(&record.name.to_lowercase()) {
            self.config.exact_name_boost
        } else {
            0.0
        };
        let quality = if record.quality.is_finite() { record.quality.clamp(0.0, 1.0) } else { 0.0 };
        let quality_boost = quality * self.config.quality_weight;

        ScoreBreakdown {
            id: record.id.clone(),
            bm25,
            exact_boost,
            quality_boost,
            score: bm25 + exact_boost + quality_boost,
            contributions,
        }
    }
}

/// Unweighted BM25 score of one field with the default parameters.
pub fn field_score(index: &DocumentIndex, terms: &[String], record: &Record, field: Field) -> f64 {
    let config = RankConfig::default();
    Scorer::new(index, &config).field_score(terms, record, field)
}
