//! Style identifier canonicalization.

/// Canonical form of a raw style id, or `None` when nothing is left.
///
/// Trims, collapses whole-number numeric text (`"1234.0"` → `"1234"`, as
/// spreadsheets store numeric ids as floats) and lowercases. Idempotent:
/// normalizing a normalized id returns it unchanged.
pub fn normalize_style_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(collapse_whole_number(trimmed).to_lowercase())
}

fn collapse_whole_number(value: &str) -> &str {
    match value.split_once('.') {
        Some((whole, frac))
            if !whole.is_empty()
                && !frac.is_empty()
                && whole.bytes().all(|b| b.is_ascii_digit())
                && frac.bytes().all(|b| b == b'0') =>
        {
            whole
        }
        _ => value,
    }
}
