//! Decoding of MediaWiki "dot-encoded" section anchors.
//!
//! MediaWiki writes the anchor of `== Пример ==` as `.D0.9F.D1.80...`: each
//! UTF-8 byte as `.` plus two hex digits, spaces as `_`. Dotted numbers such as
//! `2.6.16` look the same, so a dot sitting between two plain digits is kept.

use percent_encoding::percent_decode_str;

use crate::wikitext::errors::{FixError, Result};

/// Stand-in for a literal dot while the rest is percent-decoded.
const KEPT_DOT: char = '\u{E000}';

fn is_hex(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

/// Rewrite `.XX` escapes into `%XX`, leaving dotted numbers alone.
fn dots_to_percent(fragment: &str) -> String {
    let bytes = fragment.as_bytes();
    let mut out = String::with_capacity(fragment.len());
    // end of the last escape written, so "9F.D1" style runs are not mistaken for numbers
    let mut escape_end = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'.' && i + 2 < bytes.len() && is_hex(bytes[i + 1]) && is_hex(bytes[i + 2]) {
            let plain_digit_before = i > 0 && bytes[i - 1].is_ascii_digit() && i != escape_end;
            if plain_digit_before && bytes[i + 1].is_ascii_digit() {
                out.push(KEPT_DOT);
                i += 1;
                continue;
            }
            out.push('%');
            out.push_str(&fragment[i + 1..i + 3]);
            i += 3;
            escape_end = i;
            continue;
        }
        let ch_len = fragment[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&fragment[i..i + ch_len]);
        i += ch_len;
    }
    out
}

/// Whether every `%` starts a two-hex-digit escape.
pub(crate) fn escapes_well_formed(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'%')
        .all(|(i, _)| bytes.len() > i + 2 && is_hex(bytes[i + 1]) && is_hex(bytes[i + 2]))
}

/// Decode a dot-encoded fragment, failing on malformed escapes or bytes that
/// are not UTF-8.
pub fn try_decode_fragment(fragment: &str) -> Result<String> {
    let spaced = fragment.replace('_', " ");
    let escaped = dots_to_percent(&spaced);
    if !escapes_well_formed(&escaped) {
        return Err(FixError::decode(format!("malformed escape in fragment {:?}", fragment)));
    }
    let decoded = percent_decode_str(&escaped)
        .decode_utf8()
        .map_err(|e| FixError::decode(format!("fragment {:?} is not UTF-8: {}", fragment, e)))?;
    Ok(decoded.replace(KEPT_DOT, "."))
}

/// Decode a dot-encoded fragment. On any failure the input comes back as is.
pub fn decode_fragment(fragment: &str) -> String {
    match try_decode_fragment(fragment) {
        Ok(decoded) => decoded,
        Err(e) => {
            log::debug!("{}", e);
            fragment.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyrillic_heading() {
        assert_eq!(decode_fragment(".D0.9F.D1.80.D0.B8.D0.BC.D0.B5.D1.80"), "Пример");
    }

    #[test]
    fn underscores_become_spaces() {
        assert_eq!(decode_fragment("See_also"), "See also");
        assert_eq!(decode_fragment(".D0.9F.D1.80.D0.B8_1"), "При 1");
    }

    #[test]
    fn dotted_numbers_survive() {
        assert_eq!(decode_fragment("2.6.16"), "2.6.16");
        assert_eq!(decode_fragment("Version_1.20"), "Version 1.20");
    }

    #[test]
    fn escape_followed_by_digits() {
        assert_eq!(decode_fragment(".E2.84.9617"), "№17");
    }

    #[test]
    fn plain_dots_kept() {
        assert_eq!(decode_fragment("a.b"), "a.b");
        assert_eq!(decode_fragment("end."), "end.");
    }

    #[test]
    fn malformed_input_is_returned_unchanged() {
        assert_eq!(decode_fragment("100%_sure"), "100%_sure");
        assert_eq!(decode_fragment(".FF.FE"), ".FF.FE");
        assert!(try_decode_fragment(".FF").is_err());
    }
}
