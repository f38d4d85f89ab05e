use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

pub mod corpus;
pub mod index;
pub mod lemma;
pub mod numeric;
pub mod rank;
pub mod search;
pub mod tokenizer;

pub use index::build_index;
pub use rank::{RankingParams, ScoreBreakdown};
pub use search::{search, ScoredProduct, DEFAULT_LIMIT};

pub type ProductId = String;

/// A catalog entry as it arrives from the data file. Numeric fields are kept as
/// loosely formatted text ("1,299", "35% off") and coerced when indexed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default, deserialize_with = "loose_text")]
    pub pid: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub title: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub description: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub brand: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub category: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub sub_category: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub product_details: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub seller: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub out_of_stock: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub selling_price: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub actual_price: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub discount: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub average_rating: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub rating_count: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub url: String,
}

/// Accepts strings, numbers, booleans or null and keeps their textual form.
/// Nested values (some catalogs ship `product_details` as a list) are kept as JSON text.
fn loose_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// Cleaned, typed product metadata keyed by product id in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMeta {
    pub pid: ProductId,
    pub title: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub sub_category: String,
    pub product_details: String,
    pub seller: String,
    pub out_of_stock: bool,
    pub selling_price: f64,
    pub actual_price: f64,
    /// Discount in percent, e.g. 35.0 for "35% off".
    pub discount: f64,
    pub average_rating: Option<f64>,
    pub rating_count: Option<f64>,
    pub url: String,
}

/// Where one term occurs inside one product's normalized title + description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub pid: ProductId,
    pub positions: Vec<u32>,
}

/// Everything a query needs, built once from an immutable corpus snapshot.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct IndexBundle {
    pub index: HashMap<String, Vec<Posting>>,
    pub products: HashMap<ProductId, ProductMeta>,
    /// term -> product -> `1 + ln(count)`, rounded to 4 decimals
    pub tf: HashMap<String, HashMap<ProductId, f64>>,
    pub df: HashMap<String, u32>,
    pub idf: HashMap<String, f64>,
    pub num_docs: u32,
}
