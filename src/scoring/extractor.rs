use crate::constants::SCORE_TOKEN_PREFIX;

/// Returns the integer of the first `SCORE_<digits>` token in `text`.
///
/// Matching is case-sensitive. Occurrences of the prefix not followed by a
/// digit are skipped, as are digit runs too large for `u32`.
pub fn extract_score(text: &str) -> Option<u32> {
    text.match_indices(SCORE_TOKEN_PREFIX).find_map(|(start, prefix)| {
        let rest = &text[start + prefix.len()..];
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return None;
        }
        rest[..digits_end].parse().ok()
    })
}

#[inline]
pub fn contains_score(text: &str) -> bool {
    extract_score(text).is_some()
}
