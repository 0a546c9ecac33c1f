//! Ties the pipeline together: index lookup, query parsing, scoring,
//! thresholding and merging with externally suggested candidates.

use crate::cache::IndexCache;
use crate::catalog::{same_name, Catalog, CatalogSource};
use crate::config::RankConfig;
use crate::query::{filter_specific_terms, QueryTerms};
use crate::scorer::{ScoreBreakdown, Scorer};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What a query expander (typically a language model) suggests for a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Expansion {
    /// Record identifiers to place ahead of the BM25 results.
    pub candidates: Vec<String>,
    /// Extra free-text terms; only the most specific ones are used.
    pub terms: Vec<String>,
}

pub trait QueryExpander {
    fn expand(&self, query: &str) -> Result<Expansion>;
}

/// All inputs of one ranking call.
#[derive(Debug, Clone, Default)]
pub struct RankRequest<'a> {
    pub query: &'a str,
    pub candidates: &'a [String],
    pub expansion_terms: &'a [String],
    pub limit: Option<usize>,
    pub threshold: Option<f64>,
}

impl<'a> RankRequest<'a> {
    pub fn new(query: &'a str) -> Self { Self { query, ..Self::default() } }
}

/// The full result of a ranking pass, for callers that want to see why.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RankOutcome {
    pub ids: Vec<String>,
    /// Set when the query matched a record name verbatim and scoring was skipped.
    pub exact_match: Option<String>,
    /// Stemmed terms actually scored, expansions included.
    pub terms: Vec<String>,
    /// Every record's breakdown, in catalog order.
    pub scored: Vec<ScoreBreakdown>,
}

#[derive(Default)]
pub struct Ranker {
    config: RankConfig,
    cache: IndexCache,
}

impl Ranker {
    pub fn new(config: RankConfig) -> Self { Self { config, cache: IndexCache::new() } }

    pub fn config(&self) -> &RankConfig { &self.config }
    pub fn cache(&self) -> &IndexCache { &self.cache }

    /// Rank `catalog` for `query`, placing known `candidates` first.
    pub fn rank(
        &self,
        catalog: &Catalog,
        query: &str,
        candidates: Option<&[String]>,
        limit: Option<usize>,
        threshold: Option<f64>,
    ) -> Vec<String> {
        let request = RankRequest { query, candidates: candidates.unwrap_or_default(), expansion_terms: &[], limit, threshold };
        self.explain(catalog, &request).ids
    }

    pub fn rank_request(&self, catalog: &Catalog, request: &RankRequest<'_>) -> Vec<String> {
        self.explain(catalog, request).ids
    }

    pub fn explain(&self, catalog: &Catalog, request: &RankRequest<'_>) -> RankOutcome {
        let limit = request.limit.unwrap_or(self.config.limit);
        let threshold = request.threshold.unwrap_or(self.config.threshold);

        let trimmed = request.query.trim();
        if !trimmed.is_empty() {
            if let Some(hit) = catalog.records().iter().find(|r| same_name(&r.name, trimmed)) {
                tracing::debug!(id = %hit.id, "exact name match");
                return RankOutcome { ids: vec![hit.id.clone()], exact_match: Some(hit.id.clone()), ..Default::default() };
            }
        }

        let index = self.cache.get_or_build(catalog);
        let expansions = filter_specific_terms(
            request.expansion_terms,
            &index,
            self.config.min_specificity,
            self.config.max_expansion_terms,
        );
        let query = QueryTerms::parse(request.query, &expansions);

        let scorer = Scorer::new(&index, &self.config);
        let scored: Vec<ScoreBreakdown> = catalog.records().iter().map(|r| scorer.score(&query, r)).collect();

        // No terms means no local matches, whatever the threshold.
        let mut hits: Vec<&ScoreBreakdown> = if query.terms.is_empty() {
            Vec::new()
        } else {
            scored.iter().filter(|s| s.score >= threshold).collect()
        };
        // Vec::sort_by is stable, so equal scores keep catalog order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        let ranked: Vec<String> = hits.iter().map(|s| s.id.clone()).collect();

        let known: Vec<String> = request
            .candidates
            .iter()
            .filter_map(|c| catalog.resolve(c).map(|r| r.id.clone()))
            .collect();
        let ids = merge_candidates(&known, &ranked, limit);

        tracing::debug!(
            query = request.query,
            terms = query.terms.len(),
            matched = ranked.len(),
            candidates = known.len(),
            returned = ids.len(),
            "ranked catalog"
        );
        RankOutcome { ids, exact_match: None, terms: query.terms, scored }
    }

    /// Load the catalog from `source`, consult `expander` if given, and rank.
    ///
    /// Catalog load failures propagate. A failing expander only costs the
    /// expansion: ranking continues with the plain query.
    pub fn rank_from(
        &self,
        source: &dyn CatalogSource,
        expander: Option<&dyn QueryExpander>,
        query: &str,
        limit: Option<usize>,
        threshold: Option<f64>,
    ) -> Result<Vec<String>> {
        let catalog = source.load()?;
        let expansion = match expander {
            Some(e) => e.expand(query).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "query expansion failed, ranking without it");
                Expansion::default()
            }),
            None => Expansion::default(),
        };
        let request = RankRequest {
            query,
            candidates: &expansion.candidates,
            expansion_terms: &expansion.terms,
            limit,
            threshold,
        };
        Ok(self.rank_request(&catalog, &request))
    }
}

/// External candidates first (given order, no repeats), then ranked ids not
/// already present, capped at `limit`.
pub fn merge_candidates(candidates: &[String], ranked: &[String], limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .chain(ranked)
        .filter(|id| seen.insert(*id))
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Record;

    fn ids(words: &[&str]) -> Vec<String> { words.iter().map(|w| w.to_string()).collect() }

    #[test]
    fn merge_preserves_both_orders() {
        let merged = merge_candidates(&ids(&["pkgA", "pkgB"]), &ids(&["pkgB", "pkgC"]), 100);
        assert_eq!(merged, ids(&["pkgA", "pkgB", "pkgC"]));
    }

    #[test]
    fn merge_dedups_candidates_and_truncates() {
        let merged = merge_candidates(&ids(&["a", "a", "b"]), &ids(&["c", "b", "d"]), 3);
        assert_eq!(merged, ids(&["a", "b", "c"]));
        assert!(merge_candidates(&ids(&["a"]), &ids(&["b"]), 0).is_empty());
    }

    #[test]
    fn empty_catalog_ranks_nothing() {
        let ranker = Ranker::default();
        assert!(ranker.rank(&Catalog::default(), "anything", None, None, None).is_empty());
        assert_eq!(ranker.cache().current().map(|i| i.total_documents), Some(0));
    }

    #[test]
    fn unknown_candidates_are_ignored() {
        let catalog: Catalog = vec![Record::new("dplyr", "dplyr"), Record::new("tidyr", "tidyr")].into();
        let ranker = Ranker::default();
        let got = ranker.rank(&catalog, "zzz", Some(ids(&["nope", "TIDYR", "dplyr"]).as_slice()), None, None);
        assert_eq!(got, ids(&["tidyr", "dplyr"]));
    }

    struct Failing;
    impl QueryExpander for Failing {
        fn expand(&self, _query: &str) -> Result<Expansion> { anyhow::bail!("model unavailable") }
    }

    struct BrokenSource;
    impl CatalogSource for BrokenSource {
        fn load(&self) -> Result<Catalog> { anyhow::bail!("store offline") }
    }

    #[test]
    fn expander_failure_is_tolerated_but_load_failure_is_not() {
        let catalog: Catalog = vec![
            Record::new("sf", "sf").with_title("Simple features for spatial vector data"),
            Record::new("dplyr", "dplyr"),
            Record::new("tidyr", "tidyr"),
        ]
        .into();
        let ranker = Ranker::default();
        let got = ranker.rank_from(&catalog, Some(&Failing as &dyn QueryExpander), "spatial vector", None, None).unwrap();
        assert_eq!(got, ids(&["sf"]));
        assert!(ranker.rank_from(&BrokenSource, None, "spatial", None, None).is_err());
    }
}
