//! Ordered rewrite passes.
//!
//! Every transformation in this crate is a list of named [`RewritePass`]es run
//! in a fixed order by a [`Pipeline`]. A pass is a pattern plus what to do with
//! each match. The `regex` crate has no look-around and no back-references, so
//! two helpers stand in for them:
//!
//! - [`replace_with_context`]: the callback sees the text on both sides of a
//!   match and may reject it (look-ahead/behind) or swallow part of what follows.
//! - [`rewrite_tag_pairs`]: pairs `<name ...>` with the first `</name>` after it,
//!   which is what `<(\w+)>...</\1>` would match.

use regex::{Captures, Regex};

use crate::wikitext::shield::ShieldTable;

/// Upper bound for fixed-point passes.
pub const MAX_FIXED_POINT_ITERATIONS: usize = 64;

/// Callback deciding a contextual match. Receives the captures, the text
/// before the match and the text after it. Returns the replacement and how many
/// bytes of the following text it consumed, or `None` to reject the match.
pub type ContextFn = fn(&Captures, &str, &str) -> Option<(String, usize)>;

/// What a pass does with the document.
pub enum Rule {
    /// `Regex::replace_all` with an expansion template (`$1`, `${name}`).
    Replace(&'static Regex, &'static str),
    /// `Regex::replace_all` with a computed replacement.
    Map(&'static Regex, fn(&Captures) -> String),
    /// Hide every match in the shield table.
    Shield(&'static Regex),
    /// Hide the computed form of every match.
    ShieldAs(&'static Regex, fn(&Captures) -> String),
    /// Apply `rewrite` while `probe` still matches, at most
    /// [`MAX_FIXED_POINT_ITERATIONS`] times.
    Until {
        probe: &'static Regex,
        rewrite: &'static Regex,
        with: &'static str,
    },
    /// Replace matches accepted by a [`ContextFn`].
    Context(&'static Regex, ContextFn),
    /// Same as `Context`, but the accepted matches are hidden in the table.
    ShieldContext(&'static Regex, ContextFn),
    /// Anything else.
    Custom(fn(&str, &mut ShieldTable) -> String),
}

/// A named, independently testable step of a pipeline.
pub struct RewritePass {
    pub name: &'static str,
    pub rule: Rule,
}

impl RewritePass {
    pub const fn new(name: &'static str, rule: Rule) -> Self {
        Self { name, rule }
    }

    /// Run this pass over `text`.
    pub fn apply(&self, text: &str, table: &mut ShieldTable) -> String {
        match &self.rule {
            Rule::Replace(re, with) => re.replace_all(text, *with).into_owned(),
            Rule::Map(re, f) => re.replace_all(text, |c: &Captures| f(c)).into_owned(),
            Rule::Shield(re) => table.shield(text, re),
            Rule::ShieldAs(re, f) => table.shield_as(text, re, f),
            Rule::Until {
                probe,
                rewrite,
                with,
            } => {
                let mut out = text.to_string();
                for _ in 0..MAX_FIXED_POINT_ITERATIONS {
                    if !probe.is_match(&out) {
                        break;
                    }
                    let next = rewrite.replace_all(&out, *with).into_owned();
                    if next == out {
                        break;
                    }
                    out = next;
                }
                out
            }
            Rule::Context(re, f) => replace_with_context(re, text, |c, before, after| f(c, before, after)),
            Rule::ShieldContext(re, f) => replace_with_context(re, text, |c, before, after| {
                f(c, before, after).map(|(rep, used)| (table.push(rep), used))
            }),
            Rule::Custom(f) => f(text, table),
        }
    }
}

/// A fixed sequence of passes.
pub struct Pipeline {
    name: &'static str,
    passes: Vec<RewritePass>,
}

impl Pipeline {
    pub fn new(name: &'static str, passes: Vec<RewritePass>) -> Self {
        Self { name, passes }
    }

    pub fn passes(&self) -> &[RewritePass] {
        &self.passes
    }

    /// Find a pass by name, mostly for tests.
    pub fn pass(&self, name: &str) -> Option<&RewritePass> {
        self.passes.iter().find(|p| p.name == name)
    }

    /// Run every pass in order.
    pub fn run(&self, text: &str, table: &mut ShieldTable) -> String {
        let mut doc = text.to_string();
        for pass in &self.passes {
            log::trace!("[{}] {}", self.name, pass.name);
            let next = pass.apply(&doc, table);
            if next != doc {
                log::debug!("[{}] {} changed the document", self.name, pass.name);
            }
            doc = next;
        }
        doc
    }
}

/// Replace matches of `re` that `f` accepts.
///
/// A rejected match does not consume input: the search resumes one character
/// after where the rejected match started, the way a failed look-around lets a
/// backtracking engine move on.
pub fn replace_with_context<F>(re: &Regex, text: &str, mut f: F) -> String
where
    F: FnMut(&Captures, &str, &str) -> Option<(String, usize)>,
{
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut pos = 0;
    while pos <= text.len() {
        let Some(caps) = re.captures_at(text, pos) else {
            break;
        };
        let Some(m) = caps.get(0) else {
            break;
        };
        let after = &text[m.end()..];
        match f(&caps, &text[..m.start()], after) {
            Some((replacement, used)) => {
                let used = used.min(after.len());
                out.push_str(&text[copied..m.start()]);
                out.push_str(&replacement);
                copied = m.end() + used;
                pos = if copied > m.start() { copied } else { next_char(text, m.start()) };
            }
            None => pos = next_char(text, m.start()),
        }
    }
    out.push_str(&text[copied..]);
    out
}

/// Byte offset of the character after the one at `at`.
fn next_char(text: &str, at: usize) -> usize {
    text[at..].chars().next().map_or(text.len() + 1, |c| at + c.len_utf8())
}

/// ASCII case-insensitive search for `needle` in `hay`, starting at `from`.
pub fn find_ascii_ci(hay: &str, needle: &str, from: usize) -> Option<usize> {
    let hay_bytes = hay.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || from > hay_bytes.len() {
        return None;
    }
    hay_bytes[from..]
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|p| p + from)
}

/// One `<name ...>body</name>` span found by [`rewrite_tag_pairs`].
pub struct TagPair<'a> {
    pub name: &'a str,
    pub open: &'a str,
    pub body: &'a str,
    pub close: &'a str,
}

impl TagPair<'_> {
    pub fn whole(&self) -> String {
        format!("{}{}{}", self.open, self.body, self.close)
    }
}

/// Rewrite each element opened by a match of `open` (group 1 = tag name) and
/// closed by the first matching `</name>` (ASCII case-insensitive) after it.
/// Openers without a closer are left alone.
pub fn rewrite_tag_pairs<F>(text: &str, open: &Regex, mut f: F) -> String
where
    F: FnMut(&TagPair<'_>) -> String,
{
    replace_with_context(open, text, |caps, _, after| {
        let name = caps.get(1)?.as_str();
        let closer = format!("</{}>", name);
        let end = find_ascii_ci(after, &closer, 0)?;
        let pair = TagPair {
            name,
            open: caps.get(0)?.as_str(),
            body: &after[..end],
            close: &after[end..end + closer.len()],
        };
        Some((f(&pair), end + closer.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_regex::regex;

    #[test]
    fn context_rejection_retries_one_char_later() {
        // "\d+x" where the next char must not be 'y' (a look-ahead).
        let out = replace_with_context(regex!(r"\d+x"), "12xy 3x!", |c, _, after| {
            (!after.starts_with('y')).then(|| (format!("<{}>", &c[0]), 0))
        });
        assert_eq!(out, "12xy <3x>!");
    }

    #[test]
    fn context_may_swallow_following_text() {
        let out = replace_with_context(regex!(r"ab"), "abcd", |_, _, after| {
            after.starts_with('c').then(|| ("X".to_string(), 1))
        });
        assert_eq!(out, "Xd");
    }

    #[test]
    fn tag_pairs_emulate_back_reference() {
        let open = regex!(r"(?i)<([a-z][a-z0-9]*)(?: [^>]+)?>");
        let out = rewrite_tag_pairs("<b>x</B> <i>y</b> <u>z</u>", open, |p| format!("[{}:{}]", p.name, p.body));
        assert_eq!(out, "[b:x] <i>y</b> [u:z]");
    }

    #[test]
    fn find_ascii_ci_works_on_utf8() {
        assert_eq!(find_ascii_ci("щ</PRE>", "</pre>", 0), Some(2));
        assert_eq!(find_ascii_ci("abc", "d", 0), None);
    }

    #[test]
    fn until_rule_is_bounded() {
        let pass = RewritePass::new(
            "grow",
            Rule::Until {
                probe: regex!(r"^a"),
                rewrite: regex!(r"^a"),
                with: "ab",
            },
        );
        // never reaches a fixed point, so the cap decides
        let out = pass.apply("a", &mut ShieldTable::new());
        assert_eq!(out.len(), 1 + MAX_FIXED_POINT_ITERATIONS);
    }

    #[test]
    fn pipeline_runs_in_order() {
        let pipeline = Pipeline::new(
            "test",
            vec![
                RewritePass::new("a-to-b", Rule::Replace(regex!("a"), "b")),
                RewritePass::new("b-to-c", Rule::Replace(regex!("b"), "c")),
            ],
        );
        assert_eq!(pipeline.run("ab", &mut ShieldTable::new()), "cc");
        assert!(pipeline.pass("b-to-c").is_some());
        assert_eq!(pipeline.passes().len(), 2);
    }
}
