use pkgrank_core::{analyze, stem, tokenize};

#[test]
fn it_normalizes_and_splits() {
    let words = tokenize("Tools for Spatial-Data! (sf, terra)  Ｒ");
    assert_eq!(words, vec!["tools", "for", "spatial", "data", "sf", "terra", "r"]);
}

#[test]
fn tokens_never_carry_whitespace_or_punctuation() {
    let samples = [
        "Hello, world!",
        "data.table::fread()  --verbose",
        "tabs\tand\nnewlines",
        "R/shiny's \"reactive\" API; v2.0",
        "",
    ];
    for text in samples {
        for token in tokenize(text) {
            assert!(!token.is_empty());
            assert!(token.chars().all(|c| c.is_alphanumeric() || c == '_'), "bad token {token:?} from {text:?}");
        }
    }
    assert_eq!(tokenize(None), Vec::<String>::new());
}

#[test]
fn stemming_is_pure() {
    for word in ["epidemics", "curves", "libraries", "plotting", "warning", "string", "mapped"] {
        assert_eq!(stem(word), stem(word));
    }
    assert_eq!(stem("string"), "string");
    assert_eq!(stem("warning"), "warning");
}

#[test]
fn analyze_stems_each_token() {
    assert_eq!(analyze("Epidemic curves of outbreaks"), vec!["epidemic", "curv", "of", "outbreak"]);
}
