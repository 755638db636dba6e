//! Text normalization for the constraint parser.
//!
//! - Lowercase conversion
//! - `ё` folding
//! - Whitespace normalization
//! - Trailing punctuation removal

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Multiple whitespace pattern
    static ref MULTI_SPACE: Regex = Regex::new(r"\s+").unwrap();

    /// Thousands separators inside numbers ("1 500", "1,500")
    static ref THOUSANDS: Regex = Regex::new(r"(\d)[\s,](\d{3})\b").unwrap();
}

/// Normalize text for extraction
pub fn normalize(text: &str) -> String {
    let mut result = text.to_lowercase().replace('ё', "е");

    result = MULTI_SPACE.replace_all(result.trim(), " ").to_string();
    result = THOUSANDS.replace_all(&result, "$1$2").to_string();

    while result.ends_with(['.', '?', '!']) {
        result.pop();
    }

    result
}

/// Check if text carries nothing to parse
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_normalization() {
        assert_eq!(normalize("  Ужин   на ДВОИХ!  "), "ужин на двоих");
        assert_eq!(normalize("Ёжики"), "ежики");
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(normalize("за 1 500 руб"), "за 1500 руб");
        assert_eq!(normalize("under 2,000"), "under 2000");
    }

    #[test]
    fn test_blank() {
        assert!(is_blank("   "));
        assert!(!is_blank(" x "));
    }
}
