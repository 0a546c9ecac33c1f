use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref SEPARATORS: Regex = Regex::new(r"[^\p{L}\p{N}_\s]+").expect("valid regex");
    /// Nouns ending in "ing" that the suffix rules would otherwise mangle.
    static ref ING_NOUNS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "string","ring","spring","thing","king","wing",
            "warning","nothing","something","anything","everything",
            "ceiling","morning","evening","offspring","earring","sibling","darling",
        ];
        words.iter().copied().collect()
    };
}

/// Split text into lowercase word tokens.
///
/// The text is NFKC-normalized and lowercased, every run of characters that is
/// not a letter, digit, `_` or whitespace becomes a space, and the result is
/// split on whitespace. Absent text yields no tokens.
pub fn tokenize<'a>(text: impl Into<Option<&'a str>>) -> Vec<String> {
    let Some(text) = text.into() else { return Vec::new() };
    if text.is_empty() { return Vec::new(); }
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    SEPARATORS
        .replace_all(&normalized, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Reduce a lowercase token to a rough root form.
///
/// Only the first matching suffix rule applies. Known "-ing" nouns are
/// returned untouched.
pub fn stem(token: &str) -> String {
    if ING_NOUNS.contains(token) { return token.to_string(); }
    let len = token.chars().count();
    if let Some(root) = token.strip_suffix("ies") {
        return format!("{root}y");
    }
    if len > 3 {
        if let Some(root) = token.strip_suffix("es") { return root.to_string(); }
    }
    if len > 2 {
        if let Some(root) = token.strip_suffix('s') { return root.to_string(); }
    }
    if len > 5 {
        if let Some(root) = token.strip_suffix("ing") { return root.to_string(); }
    }
    if len > 4 {
        if let Some(root) = token.strip_suffix("ed") { return root.to_string(); }
    }
    token.to_string()
}

/// Tokenize and stem in one pass.
pub fn analyze<'a>(text: impl Into<Option<&'a str>>) -> Vec<String> {
    tokenize(text).iter().map(|t| stem(t)).collect()
}
