//! Composite relevance: TF-IDF text match blended with rating, review volume,
//! price, discount and stock status. Every product is scored on its own; there
//! is no normalization across the candidate set.

use crate::{IndexBundle, ProductId, ProductMeta};
use serde::{Deserialize, Serialize};

/// Hand-tuned weights of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingParams {
    /// Multiplier for a query term that also appears in the product title.
    pub title_boost: f64,
    pub rating_weight: f64,
    pub review_base: f64,
    pub review_damping: f64,
    pub discount_weight: f64,
}

impl Default for RankingParams {
    fn default() -> Self {
        Self { title_boost: 2.0, rating_weight: 0.4, review_base: 0.3, review_damping: 3.0, discount_weight: 0.2 }
    }
}

/// The factors of one product's final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub social_proof: f64,
    pub discount_boost: f64,
    pub price_penalty: f64,
    pub stock_gate: f64,
    pub total: f64,
}

/// Sum of `tf * idf` over the query terms the product contains; a term that is a
/// substring of the lowercased title counts `title_boost` times.
pub fn text_score(terms: &[String], bundle: &IndexBundle, product: &ProductMeta, params: &RankingParams) -> f64 {
    let title = product.title.to_lowercase();
    terms
        .iter()
        .filter_map(|term| {
            let tf = bundle.tf.get(term)?.get(&product.pid)?;
            let contrib = tf * bundle.idf_weight(term);
            Some(if title.contains(term.as_str()) { contrib * params.title_boost } else { contrib })
        })
        .sum()
}

/// `1 + (w * rating/5) * (base + ln(1 + reviews) / damping)`. Missing rating
/// counts as 0, missing review count as 1.
pub fn social_proof(rating: Option<f64>, reviews: Option<f64>, params: &RankingParams) -> f64 {
    let rating_norm = rating.unwrap_or(0.0) / 5.0;
    let review_boost = reviews.unwrap_or(1.0).max(0.0).ln_1p() / params.review_damping;
    1.0 + (params.rating_weight * rating_norm) * (params.review_base + review_boost)
}

/// Strictly decreasing in price and always in (0, 1]. Non-positive prices count as 1.0.
pub fn price_penalty(price: f64) -> f64 {
    let price = if price > 0.0 { price } else { 1.0 };
    1.0 / (1.0 + price.ln_1p())
}

pub fn discount_boost(discount_percent: f64, params: &RankingParams) -> f64 {
    1.0 + params.discount_weight * (discount_percent / 100.0)
}

pub fn stock_gate(out_of_stock: bool) -> f64 {
    if out_of_stock { 0.0 } else { 1.0 }
}

pub fn score_product(terms: &[String], bundle: &IndexBundle, product: &ProductMeta, params: &RankingParams) -> ScoreBreakdown {
    let base = text_score(terms, bundle, product, params);
    let social_proof = social_proof(product.average_rating, product.rating_count, params);
    let discount_boost = discount_boost(product.discount, params);
    let price_penalty = price_penalty(product.selling_price);
    let stock_gate = stock_gate(product.out_of_stock);
    ScoreBreakdown {
        base,
        social_proof,
        discount_boost,
        price_penalty,
        stock_gate,
        total: base * social_proof * discount_boost * price_penalty * stock_gate,
    }
}

/// Score every candidate and order by descending score. The sort is stable, so
/// equal scores keep the order the candidates were given in. Candidates unknown
/// to the bundle are skipped.
pub fn rank_candidates(
    terms: &[String],
    bundle: &IndexBundle,
    candidates: &[ProductId],
    params: &RankingParams,
) -> Vec<(ProductId, f64)> {
    let mut ranked: Vec<(ProductId, f64)> = candidates
        .iter()
        .filter_map(|pid| {
            let product = bundle.product(pid)?;
            Some((pid.clone(), score_product(terms, bundle, product, params).total))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}
