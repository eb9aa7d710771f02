//! UTF-8 validation, codepoint iteration/width, and case/diacritic-insensitive
//! comparison and search. Grounded on spec §4.1 and `original_source/uchar.c`
//! for the width-of-invalid-sequence convention.

use std::borrow::Cow;

/// Width, in terminal columns, placeholder sequences render invalid bytes with.
pub const INVALID_WIDTH: usize = 4;

/// Validate that `bytes` is well-formed UTF-8.
pub fn validate_utf8(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok()
}

/// Forward codepoint iteration.
pub fn codepoints_forward(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars()
}

/// Backward codepoint iteration.
pub fn codepoints_backward(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().rev()
}

/// Display width of one codepoint. Combining marks are zero-width, a handful
/// of East Asian blocks are double-width, everything else is single-width.
pub fn char_width(c: char) -> usize {
    let cp = c as u32;
    if cp == 0 {
        return 0;
    }
    if is_combining(cp) {
        return 0;
    }
    if is_wide(cp) {
        return 2;
    }
    1
}

fn is_combining(cp: u32) -> bool {
    matches!(cp,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F)
}

fn is_wide(cp: u32) -> bool {
    matches!(cp,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD)
}

/// Total display width of valid UTF-8 text.
pub fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Total display width of a possibly-invalid byte sequence. Each run of
/// bytes that can't decode as a codepoint renders as a `<XX>` placeholder of
/// [`INVALID_WIDTH`] columns.
pub fn display_width_bytes(bytes: &[u8]) -> usize {
    let mut width = 0;
    let mut rest = bytes;
    loop {
        if rest.is_empty() {
            break;
        }
        match std::str::from_utf8(rest) {
            Ok(s) => {
                width += display_width(s);
                break;
            }
            Err(e) => {
                let valid_len = e.valid_up_to();
                if valid_len > 0 {
                    width += display_width(std::str::from_utf8(&rest[..valid_len]).unwrap());
                    rest = &rest[valid_len..];
                }
                let bad_len = e.error_len().unwrap_or(rest.len() - valid_len).max(1);
                width += INVALID_WIDTH;
                rest = &rest[bad_len..];
            }
        }
    }
    width
}

/// ASCII-fast-path, locale-independent case fold. Non-ASCII codepoints fold
/// via `char::to_lowercase`, which is locale-tolerant for the common case.
pub fn fold_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii() {
            out.push(c.to_ascii_lowercase());
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Case-insensitive equality.
pub fn eq_fold(a: &str, b: &str) -> bool {
    fold_case(a) == fold_case(b)
}

/// Case-insensitive prefix match.
pub fn starts_with_fold(s: &str, prefix: &str) -> bool {
    fold_case(s).starts_with(&fold_case(prefix))
}

/// Case-insensitive substring search.
pub fn contains_fold(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    fold_case(haystack).contains(&fold_case(needle))
}

/// Strip a diacritic from one base character, if known. Covers the common
/// Latin-1 Supplement / Latin Extended-A accented letters.
pub fn strip_diacritic(c: char) -> char {
    match c {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => 'C',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'Ð' | 'Ď' | 'Đ' => 'D',
        'ð' | 'ď' | 'đ' => 'd',
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => 'E',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => 'G',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => 'I',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' => 'N',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => 'O',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'Ŕ' | 'Ŗ' | 'Ř' => 'R',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'Ś' | 'Ŝ' | 'Ş' | 'Š' => 'S',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'Ţ' | 'Ť' | 'Ŧ' => 'T',
        'ţ' | 'ť' | 'ŧ' => 't',
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => 'U',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'Ý' | 'Ÿ' => 'Y',
        'ý' | 'ÿ' => 'y',
        'Ź' | 'Ż' | 'Ž' => 'Z',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}

/// Strip diacritics from every character in `s`, leaving ASCII-equivalent base characters.
pub fn strip_diacritics(s: &str) -> String {
    s.chars().map(strip_diacritic).collect()
}

/// Case- and diacritic-insensitive equality ("base character" compare).
pub fn eq_fold_base(a: &str, b: &str) -> bool {
    eq_fold(&strip_diacritics(a), &strip_diacritics(b))
}

/// Case- and diacritic-insensitive substring search.
pub fn contains_fold_base(haystack: &str, needle: &str) -> bool {
    contains_fold(&strip_diacritics(haystack), &strip_diacritics(needle))
}

/// Collation key: case-folded, diacritic-stripped. Used for sort/equality
/// comparisons throughout the tree and editable list.
pub fn collate_key(s: &str) -> String {
    fold_case(&strip_diacritics(s))
}

/// Whether the current process is running with a UTF-8 locale. Approximated
/// from `LANG`/`LC_ALL` since no charset-conversion crate is in scope.
pub fn process_is_utf8() -> bool {
    for var in ["LC_ALL", "LC_CTYPE", "LANG"] {
        if let Ok(val) = std::env::var(var) {
            let upper = val.to_ascii_uppercase();
            if !upper.is_empty() {
                return upper.contains("UTF-8") || upper.contains("UTF8");
            }
        }
    }
    true
}

/// Transcode a filename-ish byte sequence to UTF-8 for filter/search use.
/// When the process is not known to be in UTF-8 mode, this still only has
/// lossy conversion available (no iconv/charset crate in scope), which is
/// an accepted approximation - see DESIGN.md.
pub fn locator_to_utf8(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate() {
        assert!(validate_utf8("hello".as_bytes()));
        assert!(!validate_utf8(&[0xff, 0xfe]));
    }

    #[test]
    fn width_ascii() {
        assert_eq!(display_width("abc"), 3);
    }

    #[test]
    fn width_wide() {
        assert_eq!(display_width("\u{4e2d}"), 2); // CJK 中
    }

    #[test]
    fn width_invalid_placeholder() {
        assert_eq!(display_width_bytes(&[0xff]), INVALID_WIDTH);
        assert_eq!(display_width_bytes(b"ab"), 2);
    }

    #[test]
    fn fold_equality() {
        assert!(eq_fold("MILES", "miles"));
        assert!(!eq_fold("miles", "davis"));
    }

    #[test]
    fn fold_substring() {
        assert!(contains_fold("Kind of Blue (Legacy Edition)", "blue"));
        assert!(!contains_fold("Kind of Blue", "xyz"));
    }

    #[test]
    fn base_character_strip() {
        assert!(eq_fold_base("Café", "cafe"));
        assert!(contains_fold_base("Amélie", "amelie"));
    }

    #[test]
    fn collation_key_stable() {
        assert_eq!(collate_key("Café"), collate_key("CAFE"));
    }
}
