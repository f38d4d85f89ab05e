use shopsearch_core::ProductMeta;
use std::collections::HashSet;

const WOMEN: &[&str] = &["women", "woman", "womens", "ladies", "girls"];
const MEN: &[&str] = &["men", "man", "mens", "boys"];
const COLORS: &[&str] = &["grey", "gray", "blue", "black", "white", "red", "yellow", "green", "pink"];

fn words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn mentions(words: &HashSet<String>, vocabulary: &[&str]) -> bool {
    vocabulary.iter().any(|w| words.contains(*w))
}

/// Narrow the ranked products before they are shown to the model.
///
/// A query naming an audience drops products whose title and description do not
/// name the same audience. A query naming colours keeps only products in one of
/// those colours, unless none are. If nothing survives, the ranked list is used
/// as is. At most `top_n` products are returned, in ranked order.
pub fn prefilter<'a>(query: &str, ranked: &'a [ProductMeta], top_n: usize) -> Vec<&'a ProductMeta> {
    let query_words = words(query);
    let audience: Option<&[&str]> = if mentions(&query_words, WOMEN) {
        Some(WOMEN)
    } else if mentions(&query_words, MEN) {
        Some(MEN)
    } else {
        None
    };

    let mut filtered: Vec<(&ProductMeta, HashSet<String>)> = ranked
        .iter()
        .map(|p| (p, words(&format!("{} {}", p.title, p.description))))
        .filter(|(_, text)| audience.map_or(true, |vocab| mentions(text, vocab)))
        .collect();

    let colors: Vec<&str> = COLORS.iter().copied().filter(|c| query_words.contains(*c)).collect();
    if !colors.is_empty() {
        let colored: Vec<_> = filtered.iter().filter(|(_, text)| mentions(text, &colors)).cloned().collect();
        if !colored.is_empty() {
            filtered = colored;
        }
    }

    if filtered.is_empty() {
        ranked.iter().take(top_n).collect()
    } else {
        filtered.into_iter().map(|(p, _)| p).take(top_n).collect()
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() { "N/A" } else { value }
}

/// One line per product: id, name, price, rating, brand, category and the start
/// of the description.
pub fn format_shortlist(products: &[&ProductMeta]) -> String {
    products
        .iter()
        .map(|p| {
            let rating = p.average_rating.map_or_else(|| "N/A".to_string(), |r| format!("{r:.1}"));
            format!(
                "- PID: {} | Name: {} | Price: {:.2} | Rating: {} | Brand: {} | Category: {} | Info: {}",
                p.pid,
                or_na(&p.title),
                p.selling_price,
                rating,
                or_na(&p.brand),
                or_na(&p.category),
                truncate_chars(&p.description, 120),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(shortlist: &str, query: &str) -> String {
    format!(
        "You advise shoppers on an online store. Pick the one product below that best fits the \
         shopper's request.\n\n\
         Requirements, in order:\n\
         - the product type must match the request (a t-shirt request is never answered with shorts)\n\
         - the intended audience (men, women, kids) must match when the request names one\n\
         - the colour must match when the request names one\n\
         - prefer closer material, fit and style matches, then better ratings, then better value\n\n\
         If no listed product satisfies the requirements, answer exactly:\n\
         \"{no_match}\"\n\n\
         Products:\n{shortlist}\n\n\
         Request: {query}\n\n\
         Answer format:\n\
         - Best Product: [PID] [Product Name]\n\
         - Why: [attribute-by-attribute justification]\n\
         - Alternative: [optional, only when clearly relevant]\n",
        no_match = crate::NO_MATCH,
    )
}
