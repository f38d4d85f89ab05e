use crate::rank::{rank_candidates, RankingParams};
use crate::tokenizer::normalize;
use crate::{IndexBundle, ProductId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
    pub pid: ProductId,
    pub score: f64,
}

/// Products containing every query term, in ascending id order.
/// Empty when there are no terms, any term is unknown, or the intersection is empty.
pub fn candidates(terms: &[String], bundle: &IndexBundle) -> Vec<ProductId> {
    let Some((first, rest)) = terms.split_first() else { return Vec::new() };
    let Some(postings) = bundle.postings(first) else { return Vec::new() };
    let mut docs: BTreeSet<&str> = postings.iter().map(|p| p.pid.as_str()).collect();
    for term in rest {
        let Some(postings) = bundle.postings(term) else { return Vec::new() };
        let term_docs: BTreeSet<&str> = postings.iter().map(|p| p.pid.as_str()).collect();
        docs.retain(|pid| term_docs.contains(pid));
        if docs.is_empty() {
            break;
        }
    }
    docs.into_iter().map(str::to_string).collect()
}

/// Full ranking of an already-normalized query, untruncated.
pub fn rank_terms(terms: &[String], bundle: &IndexBundle, params: &RankingParams) -> Vec<ScoredProduct> {
    let docs = candidates(terms, bundle);
    rank_candidates(terms, bundle, &docs, params)
        .into_iter()
        .map(|(pid, score)| ScoredProduct { pid, score })
        .collect()
}

/// Normalize `query` and rank every matching product. Ties come out in
/// ascending product id order.
pub fn rank_query(query: &str, bundle: &IndexBundle, params: &RankingParams) -> Vec<ScoredProduct> {
    let terms = normalize(query);
    if terms.is_empty() {
        tracing::debug!(query, "query has no index terms");
        return Vec::new();
    }
    rank_terms(&terms, bundle, params)
}

/// Top `limit` products for `query` under the default ranking weights.
pub fn search(query: &str, bundle: &IndexBundle, limit: usize) -> Vec<ScoredProduct> {
    let mut ranked = rank_query(query, bundle, &RankingParams::default());
    ranked.truncate(limit);
    ranked
}
