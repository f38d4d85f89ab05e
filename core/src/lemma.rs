//! Dictionary-free noun lemmatizer: irregular plurals from a fixed table,
//! regular plurals by suffix rules. Tokens are expected lowercase.

use lazy_static::lazy_static;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref IRREGULAR: HashMap<&'static str, &'static str> = [
        ("children", "child"),
        ("feet", "foot"),
        ("teeth", "tooth"),
        ("geese", "goose"),
        ("mice", "mouse"),
        ("knives", "knife"),
        ("wives", "wife"),
        ("lives", "life"),
        ("leaves", "leaf"),
        ("halves", "half"),
        ("shelves", "shelf"),
        ("wolves", "wolf"),
        ("scarves", "scarf"),
        ("calves", "calf"),
        ("loaves", "loaf"),
        ("thieves", "thief"),
    ]
    .into_iter()
    .collect();
    static ref INVARIANT: HashSet<&'static str> =
        ["series", "species", "news", "always", "lens", "canvas"]
            .into_iter()
            .collect();
}

pub fn lemmatize(token: &str) -> Cow<'_, str> {
    if let Some(base) = IRREGULAR.get(token) {
        return Cow::Borrowed(*base);
    }
    if token.len() <= 3
        || INVARIANT.contains(token)
        || token.chars().any(|c| c.is_ascii_digit())
        || !token.ends_with('s')
        || token.ends_with("ss")
        || token.ends_with("us")
        || token.ends_with("is")
    {
        return Cow::Borrowed(token);
    }
    if let Some(stem) = token.strip_suffix("ies") {
        if stem.len() >= 2 {
            return Cow::Owned(format!("{stem}y"));
        }
    }
    for suffix in ["sses", "xes", "zes", "ches", "shes"] {
        if token.ends_with(suffix) {
            return Cow::Borrowed(&token[..token.len() - 2]);
        }
    }
    Cow::Borrowed(&token[..token.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_plurals() {
        assert_eq!(lemmatize("shirts"), "shirt");
        assert_eq!(lemmatize("batteries"), "battery");
        assert_eq!(lemmatize("watches"), "watch");
        assert_eq!(lemmatize("boxes"), "box");
        assert_eq!(lemmatize("dresses"), "dress");
        assert_eq!(lemmatize("sleeves"), "sleeve");
    }

    #[test]
    fn irregular_and_untouched() {
        assert_eq!(lemmatize("knives"), "knife");
        assert_eq!(lemmatize("children"), "child");
        assert_eq!(lemmatize("dress"), "dress");
        assert_eq!(lemmatize("cotton"), "cotton");
        assert_eq!(lemmatize("bus"), "bus");
        assert_eq!(lemmatize("series"), "series");
        assert_eq!(lemmatize("100s"), "100s");
        assert_eq!(lemmatize("lens"), "lens");
        assert_eq!(lemmatize("canvas"), "canvas");
    }

    #[test]
    fn invariant_words_reach_the_lemmatizer() {
        // stop words are dropped before lemmatizing, so listing one here is dead weight
        for word in INVARIANT.iter() {
            assert!(!crate::tokenizer::is_stopword(word), "{word}");
        }
    }
}
