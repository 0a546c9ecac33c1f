//! Relevance ranking for small catalogs of structured text records.
//!
//! Records are scored with a field-weighted BM25 (name, title, topics,
//! description), boosted for exact name hits and catalog quality, and merged
//! with externally suggested candidates. [`Ranker`] keeps the corpus
//! statistics cached between calls.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod index;
pub mod query;
pub mod ranker;
pub mod scorer;
pub mod tokenizer;

pub use cache::IndexCache;
pub use catalog::{Catalog, CatalogSource, Record};
pub use config::{FieldWeights, RankConfig};
pub use index::{build_index, idf, DocumentIndex, Field};
pub use query::{filter_specific_terms, QueryTerms};
pub use ranker::{merge_candidates, Expansion, QueryExpander, RankOutcome, RankRequest, Ranker};
pub use scorer::{field_score, ScoreBreakdown, Scorer, TermContribution};
pub use tokenizer::{analyze, stem, tokenize};

/// Rank `catalog` for `query` through `ranker`, reusing its cached index.
///
/// Keep one [`Ranker`] per catalog for the life of the process; the index is
/// only rebuilt when the catalog grows or the cache is invalidated.
pub fn rank(
    ranker: &Ranker,
    catalog: &Catalog,
    query: &str,
    candidates: Option<&[String]>,
    limit: Option<usize>,
    threshold: Option<f64>,
) -> Vec<String> {
    ranker.rank(catalog, query, candidates, limit, threshold)
}
