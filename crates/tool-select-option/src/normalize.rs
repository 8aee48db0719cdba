//! Text normalization for label matching.

use unicode_normalization::UnicodeNormalization;

/// NFKC, non-breaking and ideographic spaces folded to ASCII space,
/// whitespace runs collapsed, trimmed, lowercased.
///
/// Full-width digits and letters therefore compare equal to their ASCII
/// forms: `"Ｓ席　２枚"` becomes `"s席 2枚"`.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfkc()
        .map(|ch| match ch {
            '\u{00a0}' | '\u{3000}' => ' ',
            other => other,
        })
        .collect();
    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether normalized `haystack` contains normalized `needle`.
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    let needle = normalize(needle);
    !needle.is_empty() && normalize(haystack).contains(&needle)
}
