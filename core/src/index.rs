use crate::numeric::{parse_count, parse_discount, parse_flag, parse_price, parse_rating};
use crate::tokenizer::tokenize;
use crate::{IndexBundle, Posting, ProductMeta, ProductRecord};
use std::collections::HashMap;

impl ProductMeta {
    pub fn from_record(record: &ProductRecord) -> Self {
        Self {
            pid: record.pid.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            brand: record.brand.clone(),
            category: record.category.clone(),
            sub_category: record.sub_category.clone(),
            product_details: record.product_details.clone(),
            seller: record.seller.clone(),
            out_of_stock: parse_flag(&record.out_of_stock),
            selling_price: parse_price(&record.selling_price),
            actual_price: parse_price(&record.actual_price),
            discount: parse_discount(&record.discount),
            average_rating: parse_rating(&record.average_rating),
            rating_count: parse_count(&record.rating_count),
            url: record.url.clone(),
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Build the inverted index, product metadata and TF/DF/IDF tables in one pass
/// over the corpus. IDF is computed only after every product has been seen.
pub fn build_index(corpus: &[ProductRecord]) -> IndexBundle {
    let mut bundle = IndexBundle::default();

    for record in corpus {
        if bundle.products.contains_key(&record.pid) {
            tracing::warn!(pid = %record.pid, "duplicate product id, keeping first occurrence");
            continue;
        }
        let meta = ProductMeta::from_record(record);
        let text = format!("{} {}", record.title, record.description);

        // term -> positions within this product
        let mut page: HashMap<String, Vec<u32>> = HashMap::new();
        for (term, pos) in tokenize(&text) {
            page.entry(term).or_default().push(pos as u32);
        }

        for (term, positions) in page {
            let weight = round4(1.0 + (positions.len() as f64).ln());
            *bundle.df.entry(term.clone()).or_insert(0) += 1;
            bundle.tf.entry(term.clone()).or_default().insert(record.pid.clone(), weight);
            bundle.index.entry(term).or_default().push(Posting { pid: record.pid.clone(), positions });
        }
        bundle.products.insert(record.pid.clone(), meta);
    }

    bundle.num_docs = bundle.products.len() as u32;
    let n = bundle.num_docs as f64;
    bundle.idf = bundle
        .df
        .iter()
        .map(|(term, df_t)| (term.clone(), round4((n / *df_t as f64).ln())))
        .collect();

    tracing::info!(num_docs = bundle.num_docs, num_terms = bundle.index.len(), "index built");
    bundle
}

impl IndexBundle {
    pub fn build(corpus: &[ProductRecord]) -> Self { build_index(corpus) }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.index.get(term).map(Vec::as_slice)
    }

    /// 0.0 when the product does not contain the term.
    pub fn tf_weight(&self, term: &str, pid: &str) -> f64 {
        self.tf.get(term).and_then(|docs| docs.get(pid)).copied().unwrap_or(0.0)
    }

    pub fn idf_weight(&self, term: &str) -> f64 {
        self.idf.get(term).copied().unwrap_or(0.0)
    }

    pub fn product(&self, pid: &str) -> Option<&ProductMeta> { self.products.get(pid) }

    pub fn num_terms(&self) -> usize { self.index.len() }

    pub fn is_empty(&self) -> bool { self.num_docs == 0 }
}
