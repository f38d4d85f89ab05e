use shopsearch_core::tokenizer::normalize;
use shopsearch_core::{build_index, ProductRecord};
use std::collections::HashSet;

fn product(pid: &str, title: &str, description: &str) -> ProductRecord {
    ProductRecord { pid: pid.into(), title: title.into(), description: description.into(), ..Default::default() }
}

fn catalog() -> Vec<ProductRecord> {
    vec![
        product("p1", "Blue Men T-Shirt", "Soft cotton t-shirt for everyday wear"),
        product("p2", "Red Women T-Shirt", "Slim fit cotton top"),
        product("p3", "Blue Men Shorts", "Denim shorts with pockets"),
        product("p4", "Leather Wallet", "Brown wallet with coin pocket"),
    ]
}

#[test]
fn document_frequency_counts_distinct_documents() {
    let corpus = catalog();
    let bundle = build_index(&corpus);
    let doc_terms: Vec<HashSet<String>> = corpus
        .iter()
        .map(|r| normalize(&format!("{} {}", r.title, r.description)).into_iter().collect())
        .collect();

    for (term, df) in &bundle.df {
        let expected = doc_terms.iter().filter(|terms| terms.contains(term)).count() as u32;
        assert_eq!(*df, expected, "df mismatch for {term}");
        assert_eq!(bundle.postings(term).unwrap().len() as u32, expected);
    }
    // every term of every document is indexed
    for terms in &doc_terms {
        for term in terms {
            assert!(bundle.df.contains_key(term));
        }
    }
}

#[test]
fn idf_matches_log_ratio_and_df_is_never_zero() {
    let bundle = build_index(&catalog());
    assert_eq!(bundle.num_docs, 4);
    assert_eq!(bundle.df.len(), bundle.idf.len());
    for (term, df) in &bundle.df {
        assert!(*df > 0);
        let expected = ((4.0 / *df as f64).ln() * 10_000.0).round() / 10_000.0;
        assert_eq!(bundle.idf[term], expected);
    }
}

#[test]
fn tf_weights_are_log_dampened() {
    let bundle = build_index(&catalog());
    // "t-shirt" twice in p1: title and description
    let expected = ((1.0 + 2f64.ln()) * 10_000.0).round() / 10_000.0;
    assert_eq!(bundle.tf_weight("shirt", "p1"), expected);
    assert_eq!(bundle.tf_weight("shirt", "p2"), 1.0);
    assert_eq!(bundle.tf_weight("shirt", "p4"), 0.0);
}

#[test]
fn metadata_is_coerced() {
    let mut record = product("p9", "Kettle", "Steel kettle");
    record.selling_price = "1,299".into();
    record.actual_price = "₹2,000".into();
    record.discount = "35% off".into();
    record.average_rating = "".into();
    record.out_of_stock = "true".into();
    let bundle = build_index(&[record]);
    let meta = bundle.product("p9").unwrap();
    assert_eq!(meta.selling_price, 1299.0);
    assert_eq!(meta.actual_price, 2000.0);
    assert_eq!(meta.discount, 35.0);
    assert_eq!(meta.average_rating, None);
    assert!(meta.out_of_stock);
}
