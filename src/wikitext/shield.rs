//! Content shielding.
//!
//! A [`ShieldTable`] hides substrings of a document behind placeholder tokens so
//! that later rewrite passes cannot touch them, then puts them back verbatim.
//!
//! Tokens are `open` + index written in private-use digits + `close`. The default
//! delimiters are U+0001/U+0002; digits live in U+E010..=U+E019, so numeric rules
//! never see a placeholder as a number. Input is assumed to carry none of these
//! code points; the assumption is checked and logged, not enforced.

use regex::{Captures, Regex};

/// Default opening delimiter of a placeholder token.
pub const SHIELD_OPEN: char = '\u{1}';
/// Default closing delimiter of a placeholder token.
pub const SHIELD_CLOSE: char = '\u{2}';
/// First private-use code point used to spell placeholder indices.
pub const DIGIT_BASE: u32 = 0xE010;

/// Write `n` using the private-use digit range.
fn private_digits(n: usize) -> String {
    n.to_string()
        .bytes()
        .filter_map(|b| char::from_u32(DIGIT_BASE + u32::from(b - b'0')))
        .collect()
}

/// Whether `c` belongs to the reserved placeholder range.
pub fn is_private_digit(c: char) -> bool {
    (DIGIT_BASE..DIGIT_BASE + 10).contains(&(c as u32))
}

/// Whether `text` contains any code point reserved for placeholders.
pub fn contains_reserved(text: &str) -> bool {
    text.chars()
        .any(|c| c == SHIELD_OPEN || c == SHIELD_CLOSE || is_private_digit(c))
}

/// Ordered record of every substring hidden during one pipeline run.
#[derive(Debug, Clone)]
pub struct ShieldTable {
    open: char,
    close: char,
    hidden: Vec<String>,
}

impl Default for ShieldTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ShieldTable {
    /// Empty table using the default delimiters.
    pub fn new() -> Self {
        Self::with_delimiters(SHIELD_OPEN, SHIELD_CLOSE)
    }

    /// Empty table with its own delimiters, for a second table living in the
    /// same document as the first.
    pub fn with_delimiters(open: char, close: char) -> Self {
        Self {
            open,
            close,
            hidden: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.hidden.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty()
    }

    fn token(&self, idx: usize) -> String {
        format!("{}{}{}", self.open, private_digits(idx), self.close)
    }

    /// Store `original` and return the placeholder standing in for it.
    pub fn push(&mut self, original: impl Into<String>) -> String {
        self.hidden.push(original.into());
        self.token(self.hidden.len() - 1)
    }

    /// Replace every match of `pattern` with a fresh placeholder.
    pub fn shield(&mut self, text: &str, pattern: &Regex) -> String {
        pattern
            .replace_all(text, |caps: &Captures| self.push(&caps[0]))
            .into_owned()
    }

    /// Like [`ShieldTable::shield`], but hide the rewritten form `f(match)`
    /// instead of the match itself.
    pub fn shield_as<F>(&mut self, text: &str, pattern: &Regex, f: F) -> String
    where
        F: Fn(&Captures) -> String,
    {
        pattern
            .replace_all(text, |caps: &Captures| self.push(f(caps)))
            .into_owned()
    }

    /// Put every hidden substring back, newest first, by literal substitution.
    /// The table is empty afterwards.
    pub fn restore_all(&mut self, text: &str) -> String {
        let mut out = text.to_string();
        while let Some(original) = self.hidden.pop() {
            let token = self.token(self.hidden.len());
            out = out.replacen(&token, &original, 1);
        }
        self.warn_if_leaked(&out);
        out
    }

    /// Put every hidden substring back in insertion order. Only valid when no
    /// entry contains another entry's placeholder.
    pub fn restore_in_order(&mut self, text: &str) -> String {
        let mut out = text.to_string();
        for (idx, original) in self.hidden.iter().enumerate() {
            out = out.replacen(&self.token(idx), original, 1);
        }
        self.hidden.clear();
        self.warn_if_leaked(&out);
        out
    }

    /// Whether a token spelled with this table's delimiters is still present.
    pub fn leaked(&self, text: &str) -> bool {
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c != self.open {
                continue;
            }
            let mut digits = 0;
            while chars.peek().is_some_and(|&d| is_private_digit(d)) {
                chars.next();
                digits += 1;
            }
            if digits > 0 && chars.peek() == Some(&self.close) {
                return true;
            }
        }
        false
    }

    fn warn_if_leaked(&self, text: &str) {
        if self.leaked(text) {
            log::warn!("placeholder survived restoration; input collided with reserved code points");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_regex::regex;
    use proptest::prelude::*;

    #[test]
    fn tokens_carry_no_ascii_digits() {
        let mut table = ShieldTable::new();
        for i in 0..12 {
            let token = table.push(format!("entry {i}"));
            assert!(!token.chars().any(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn shield_then_restore() {
        let mut table = ShieldTable::new();
        let text = "keep {{a}} and {{b}} safe";
        let hidden = table.shield(text, regex!(r"\{\{[^}]*\}\}"));
        assert!(!hidden.contains("{{"));
        assert_eq!(table.len(), 2);
        assert_eq!(table.restore_all(&hidden), text);
        assert!(table.is_empty());
    }

    #[test]
    fn nested_shields_unwind() {
        let mut table = ShieldTable::new();
        let once = table.shield("a [[b]] c", regex!(r"\[\[b\]\]"));
        // hide a span that already contains a placeholder
        let twice = table.shield(&once, regex!(r"a .* c"));
        assert_eq!(table.restore_all(&twice), "a [[b]] c");
    }

    #[test]
    fn shield_as_stores_rewritten_text() {
        let mut table = ShieldTable::new();
        let hidden = table.shield_as("x `code` y", regex!(r"`([^`]+)`"), |c| format!("<tt>{}</tt>", &c[1]));
        assert_eq!(table.restore_all(&hidden), "x <tt>code</tt> y");
    }

    #[test]
    fn restore_in_order_with_custom_delimiters() {
        let mut table = ShieldTable::with_delimiters('\u{4}', '\u{5}');
        let a = table.push("<table>1</table>");
        let b = table.push("<table>2</table>");
        let doc = format!("{a}\n{b}");
        assert!(table.leaked(&doc));
        let out = table.restore_in_order(&doc);
        assert_eq!(out, "<table>1</table>\n<table>2</table>");
        assert!(!table.leaked(&out));
    }

    #[test]
    fn reserved_detection() {
        assert!(!contains_reserved("plain «text» 123"));
        assert!(contains_reserved("bad \u{1} byte"));
        assert!(contains_reserved("pua \u{E013}"));
    }

    proptest! {
        #[test]
        fn round_trip_for_any_pattern(text in "[a-z0-9 {}\\[\\]<>|=\n]{0,80}") {
            let mut table = ShieldTable::new();
            let patterns = [r"\{\{[^}]*\}\}", r"[0-9]+", r"<[^>]*>", r"\[\[[^\]|]+", r"(?m)^ .*$"];
            let mut doc = text.clone();
            for p in patterns {
                let re = Regex::new(p).unwrap();
                doc = table.shield(&doc, &re);
            }
            let out = table.restore_all(&doc);
            prop_assert!(!table.leaked(&out));
            prop_assert_eq!(out, text);
        }
    }
}
