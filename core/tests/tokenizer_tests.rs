use shopsearch_core::tokenizer::{normalize, tokenize};

#[test]
fn it_normalizes_and_stems() {
    let words = normalize("Running Runners RUN! The cotton shirts.");
    assert!(words.contains(&"run".to_string()));
    assert!(words.contains(&"shirt".to_string()));
    assert!(!words.iter().any(|w| w.chars().any(char::is_uppercase)));
}

#[test]
fn it_filters_stopwords() {
    let words = normalize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
}

#[test]
fn it_ignores_punctuation_and_case() {
    let reference = normalize("cotton shirt shirt");
    assert_eq!(normalize("Cotton, SHIRT!!  shirt"), reference);
    assert_eq!(normalize("  cotton...shirt/Shirt "), reference);
}

#[test]
fn it_strips_symbols_and_contraction_fragments() {
    // "T-Shirt" splits into the stop word "t" and "shirt"
    assert_eq!(normalize("Blue T-Shirt™ ₹499"), vec!["blue", "shirt", "499"]);
}

#[test]
fn empty_and_stopword_only_text_yield_nothing() {
    assert!(normalize("").is_empty());
    assert!(normalize("   !!! ").is_empty());
    assert!(normalize("the a of").is_empty());
}

#[test]
fn positions_follow_surviving_terms() {
    let toks = tokenize("a red shirt for the red carpet");
    let red: Vec<usize> = toks.iter().filter(|(w, _)| w == "red").map(|(_, p)| *p).collect();
    assert_eq!(red, vec![0, 2]);
}
