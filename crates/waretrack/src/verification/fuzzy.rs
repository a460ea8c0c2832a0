//! Tolerant string comparison for OCR-read tag fields.
//!
//! The similarity ratio is a character-membership count: for each character of
//! the shorter normalized string, check whether it occurs anywhere in the
//! longer one, then divide by the longer length. Order and multiplicity are
//! ignored, so permutations of the same characters score 1.0.

/// Uppercases and strips all whitespace.
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Membership ratio of two already-normalized strings, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    // Ties pick `b` as the longer string.
    let (longer, shorter, longer_len) = if a_len > b_len {
        (a, b, a_len)
    } else {
        (b, a, b_len)
    };

    if longer_len == 0 {
        return 1.0;
    }

    let matches = shorter.chars().filter(|c| longer.contains(*c)).count();
    matches as f64 / longer_len as f64
}

/// Decides whether an extracted value matches a recorded one.
///
/// Missing or empty input never matches. Otherwise: exact equality, then
/// equality after [`normalize`], then `similarity >= threshold`.
pub fn fuzzy_match(extracted: Option<&str>, expected: Option<&str>, threshold: f64) -> bool {
    let (a, b) = match (extracted, expected) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => (a, b),
        _ => return false,
    };

    if a == b {
        return true;
    }

    let clean_a = normalize(a);
    let clean_b = normalize(b);
    if clean_a == clean_b {
        return true;
    }

    similarity(&clean_a, &clean_b) >= threshold
}
