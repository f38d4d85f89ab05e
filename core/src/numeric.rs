//! Defensive coercion of the loosely formatted numeric fields found in catalog dumps.
//! Nothing here fails: unparsable input becomes the field's default.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"-?\d+(?:\.\d+)?").expect("valid regex");
}

/// First decimal number in `raw`, ignoring thousands separators and any units around it.
fn first_number(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    let value: f64 = NUMBER.find(&cleaned)?.as_str().parse().ok()?;
    value.is_finite().then_some(value)
}

/// "1,299" -> 1299.0, "" -> 0.0, "n/a" -> 0.0
pub fn parse_price(raw: &str) -> f64 {
    first_number(raw).unwrap_or(0.0)
}

/// "35% off" -> 35.0
pub fn parse_discount(raw: &str) -> f64 {
    first_number(raw).unwrap_or(0.0)
}

/// Ratings stay absent when missing or garbled so they can score as 0 later.
pub fn parse_rating(raw: &str) -> Option<f64> {
    first_number(raw)
}

/// "1,024 ratings" -> Some(1024.0)
pub fn parse_count(raw: &str) -> Option<f64> {
    first_number(raw).filter(|v| *v >= 0.0)
}

pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1" | "out of stock"
    )
}
