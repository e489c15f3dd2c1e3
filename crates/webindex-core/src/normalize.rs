//! Text cleanup shared by document extraction and query parsing.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PUNCTUATION: Regex = Regex::new(r"\p{P}").expect("valid regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// Remove punctuation, collapse whitespace runs to one space, and trim.
///
/// Case is preserved; lowercasing happens in [`tokenize`].
pub fn clean_text(input: &str) -> String {
    let without_punct = PUNCTUATION.replace_all(input, "");
    let collapsed = WHITESPACE.replace_all(&without_punct, " ");
    collapsed.trim().to_string()
}

/// Clean `input` and split it into lowercase terms, repeats preserved.
pub fn tokenize(input: &str) -> Vec<String> {
    clean_text(input)
        .split(' ')
        .filter(|segment| !segment.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_punctuation() {
        assert_eq!(clean_text("Hello, world!"), "Hello world");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(clean_text("Hello     world"), "Hello world");
        assert_eq!(clean_text("a\t\tb\n\nc"), "a b c");
    }

    #[test]
    fn trims_edges() {
        assert_eq!(clean_text(" Hello world "), "Hello world");
        assert_eq!(clean_text("Hello,   world!  "), "Hello world");
    }

    #[test]
    fn punctuation_only_becomes_empty() {
        assert_eq!(clean_text(" ... !? -- "), "");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn keeps_case_and_symbols() {
        // `$` and `+` are symbols, not punctuation
        assert_eq!(clean_text("Rust $5 + C++"), "Rust $5 + C++");
    }

    #[test]
    fn output_has_no_punctuation_or_double_spaces() {
        let samples = [
            "  «Quoted»  text; with (parens) and  [brackets]…  ",
            "line\r\nbreaks\u{00A0}and\ttabs",
            "¿Qué tal?  ¡Bien!",
        ];
        for sample in samples {
            let out = clean_text(sample);
            assert!(!PUNCTUATION.is_match(&out), "punctuation left in {:?}", out);
            assert!(!out.contains("  "), "double space in {:?}", out);
            assert_eq!(out, out.trim());
        }
    }

    #[test]
    fn tokenize_lowercases_and_keeps_repeats() {
        assert_eq!(
            tokenize("Rust, rust; RUST!"),
            vec!["rust".to_string(), "rust".to_string(), "rust".to_string()]
        );
    }

    #[test]
    fn tokenize_empty() {
        assert!(tokenize("  ,. ").is_empty());
    }
}
