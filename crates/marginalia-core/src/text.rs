//! Whitespace normalization and char-indexed string helpers.
//!
//! All anchor offsets are counted in `char`s of normalized text, never bytes,
//! so the helpers here convert between the two.

/// Collapse every whitespace run to a single ASCII space and trim both ends.
///
/// ```
/// use marginalia_core::text::normalize_whitespace;
///
/// assert_eq!(normalize_whitespace("  the\n\tquick   fox "), "the quick fox");
/// ```
pub fn normalize_whitespace(input: &str) -> String {
    let mut buf = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space && !buf.is_empty() {
                buf.push(' ');
            }
            last_space = true;
        } else {
            buf.push(ch);
            last_space = false;
        }
    }
    if buf.ends_with(' ') {
        buf.pop();
    }
    buf
}

/// True for empty or whitespace-only text.
pub fn is_blank(s: &str) -> bool {
    s.chars().all(char::is_whitespace)
}

/// Length in chars.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the char at `char_idx`; `s.len()` when `char_idx` is the end.
pub fn byte_offset(s: &str, char_idx: usize) -> Option<usize> {
    if char_idx == 0 {
        return Some(0);
    }
    let mut count = 0;
    for (byte_idx, _) in s.char_indices() {
        if count == char_idx {
            return Some(byte_idx);
        }
        count += 1;
    }
    (count == char_idx).then_some(s.len())
}

/// Substring by char indices, clamped to the string.
pub fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let len = char_len(s);
    let end = end.min(len);
    let start = start.min(end);
    match (byte_offset(s, start), byte_offset(s, end)) {
        (Some(a), Some(b)) => &s[a..b],
        _ => "",
    }
}

/// Char index of every occurrence of `needle` in `haystack` (overlapping).
pub fn find_all(haystack: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    let mut hits = Vec::new();
    let mut chars_before = 0usize;
    let mut scanned_to = 0usize;
    let mut from = 0usize;
    while let Some(rel) = haystack[from..].find(needle) {
        let at = from + rel;
        chars_before += haystack[scanned_to..at].chars().count();
        scanned_to = at;
        hits.push(chars_before);
        // advance by one char to allow overlapping matches
        let step = haystack[at..].chars().next().map(char::len_utf8).unwrap_or(1);
        from = at + step;
    }
    hits
}

/// Char index of the occurrence of `needle` closest to `hint`.
pub fn find_nearest(haystack: &str, needle: &str, hint: Option<usize>) -> Option<usize> {
    let hits = find_all(haystack, needle);
    match hint {
        Some(hint) => hits.into_iter().min_by_key(|at| at.abs_diff(hint)),
        None => hits.into_iter().next(),
    }
}

/// Convert a byte offset into a char offset.
pub fn char_index_of_byte(s: &str, byte_idx: usize) -> usize {
    s[..byte_idx.min(s.len())].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_and_trims() {
        assert_eq!(normalize_whitespace("\n  a  b\u{00a0}\u{00a0}c \t"), "a b c");
        assert_eq!(normalize_whitespace("   "), "");
        assert_eq!(normalize_whitespace("single"), "single");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank(" \n\t"));
        assert!(!is_blank(" x "));
    }

    #[test]
    fn test_char_slice_multibyte() {
        let s = "héllo wörld";
        assert_eq!(char_slice(s, 1, 5), "éllo");
        assert_eq!(char_slice(s, 6, 100), "wörld");
        assert_eq!(char_slice(s, 9, 3), "");
    }

    #[test]
    fn test_byte_offset_bounds() {
        let s = "日本語";
        assert_eq!(byte_offset(s, 0), Some(0));
        assert_eq!(byte_offset(s, 1), Some(3));
        assert_eq!(byte_offset(s, 3), Some(9));
        assert_eq!(byte_offset(s, 4), None);
    }

    #[test]
    fn test_find_all_counts_chars() {
        assert_eq!(find_all("aé aé aé", "aé"), vec![0, 3, 6]);
        assert_eq!(find_all("aaa", "aa"), vec![0, 1]);
        assert!(find_all("abc", "").is_empty());
    }

    #[test]
    fn test_find_nearest_prefers_hint() {
        let hay = "fox one fox two fox";
        assert_eq!(find_nearest(hay, "fox", None), Some(0));
        assert_eq!(find_nearest(hay, "fox", Some(9)), Some(8));
        assert_eq!(find_nearest(hay, "fox", Some(100)), Some(16));
        assert_eq!(find_nearest(hay, "cat", Some(3)), None);
    }

    #[test]
    fn test_char_index_of_byte() {
        assert_eq!(char_index_of_byte("日本語", 6), 2);
        assert_eq!(char_index_of_byte("abc", 10), 3);
    }
}
