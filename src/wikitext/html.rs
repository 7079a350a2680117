//! HTML to wikitext conversion.
//!
//! Pasted HTML (from a browser, an office suite, another wiki) becomes
//! wikitext: inline formatting turns into quote markup, headings into `== ==`,
//! lists into `#`/`*`/`:` prefixes, anchors into external links. Tables are
//! cleaned up and pretty-printed but stay HTML; they are lifted out of the
//! document first so nothing else touches their content.
//!
//! Internally a few control characters carry structure between steps:
//! `\x00` is a paragraph break, `\x01`/`\x02` stand for `<`/`>` inside
//! verbatim blocks and `\x03` for a space inside preformatted blocks.

use itertools::Itertools;
use lazy_regex::{regex, regex_is_match};
use regex::{Captures, Regex};

use crate::wikitext::enums::ListType;
use crate::wikitext::passes::{MAX_FIXED_POINT_ITERATIONS, find_ascii_ci, replace_with_context, rewrite_tag_pairs};
use crate::wikitext::shield::ShieldTable;
use crate::wikitext::tables::{HTML_ENTITIES, NBSP, VOID_TAGS, attribute_allowed};
use crate::wikitext::types::links::Link;

const TABLE_OPEN: char = '\u{4}';
const TABLE_CLOSE: char = '\u{5}';

/// Convert an HTML fragment to wikitext.
pub fn convert_html(html: &str) -> String {
    let mut tables = ShieldTable::with_delimiters(TABLE_OPEN, TABLE_CLOSE);
    let text = hide_tables(html, &mut tables);
    log::debug!("lifted {} table(s) out of the HTML", tables.len());

    let text = protect_verbatim(&text);
    let text = rewrite_tag_pairs(&text, regex!(r"(?i)<(style|script)\b[^>]*>"), |_| String::new());
    let text = regex!(r"(?s)<!--.*?-->").replace_all(&text, "").into_owned();
    let text = sanitize_attributes(&text);
    let text = remove_bare_tags(&text, regex!(r"<(/?)(span|font)\b([^>]*)>"), "", "");
    let text = remove_bare_tags(&text, regex!(r"<(/?)(p)\b([^>]*)>"), "\x00\x00", "\x00\x00");
    let text = escape_ampersands(&text);
    let text = regex!(r"(?i)(?:\s|<br\b[^>]*>|\x00)*<hr\b[^>]*>(?:\s|<br\b[^>]*>|\x00)*")
        .replace_all(&text, "\x00\x00----\x00\x00")
        .into_owned();
    let text = inline_formatting(&text);
    let text = headings(&text);
    let text = lists(&text);
    let text = anchors(&text);
    let text = regex!(r"(?i)<br\s*/?>[\n ]*").replace_all(&text, "\x00").into_owned();
    let text = regex!(r"<[^>]*>").replace_all(&text, "").into_owned();
    let text = collapse_breaks(&text);

    let text = text.replace('\x01', "<").replace('\x02', ">").replace('\x03', NBSP);
    let text = HTML_ENTITIES
        .iter()
        .fold(text, |acc, (entity, plain)| acc.replace(entity, plain));
    tables.restore_in_order(&text).trim().to_string()
}

/// Lift every `<table>...</table>` out of the document, cleaned and
/// pretty-printed, leaving a placeholder behind.
fn hide_tables(html: &str, tables: &mut ShieldTable) -> String {
    regex!(r"(?i)<table\b[\s\S]*?</table>")
        .replace_all(html, |c: &Captures| tables.push(clean_table(&c[0])))
        .into_owned()
}

fn clean_table(table: &str) -> String {
    let mut t = regex!(r"(?i)<colgroup\b[\s\S]*?</colgroup>").replace_all(table, "").into_owned();
    t = regex!(r"(?i)</?tbody[^>]*>").replace_all(&t, "").into_owned();
    t = regex!(r#"(?i)\s+class\s*=\s*(?:"[^"\n]*"|'[^'\n]*')"#).replace_all(&t, "").into_owned();

    // attribute-less wrappers carry nothing
    for _ in 0..MAX_FIXED_POINT_ITERATIONS {
        let next = regex!(r"(?i)<span\s*>([\s\S]*?)</span>").replace_all(&t, "$1");
        let next = regex!(r"(?i)<div\s*>([\s\S]*?)</div>").replace_all(&next, "$1").into_owned();
        if next == t {
            break;
        }
        t = next;
    }

    let t = regex!(r"(?i)<table\b[^>]*>")
        .replace(&t, |c: &Captures| drop_zero_width(&c[0]))
        .into_owned();
    pretty_print_table(&t)
}

/// Remove `width:0px` from the style of a `<table ...>` tag, dropping the
/// attribute when nothing else is left.
fn drop_zero_width(tag: &str) -> String {
    let tag = regex!(r#"(?i)style=(?:"([^"\n]*)"|'([^'\n]*)')"#).replace(tag, |c: &Captures| {
        let (quote, style) = match c.get(1) {
            Some(m) => ('"', m.as_str()),
            None => ('\'', c.get(2).map_or("", |m| m.as_str())),
        };
        let mut style_out = style
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty() && !regex_is_match!(r"(?i)^width\s*:\s*0px$", s))
            .join("; ");
        if style_out.is_empty() {
            return String::new();
        }
        if style.trim().ends_with(';') {
            style_out.push(';');
        }
        format!("style={quote}{style_out}{quote}")
    });
    let tag = regex!(r"\s\s+").replace_all(&tag, " ");
    regex!(r"\s+>").replace(&tag, ">").into_owned()
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches(['<', '/'])
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase()
}

/// One tag per line, indented by depth. Everything inside a cell stays on the
/// line of the cell's opening tag.
fn pretty_print_table(html: &str) -> String {
    let one_line = regex!(r">\s+<").replace_all(html, "><");
    let one_line = one_line.replace(['\r', '\n'], " ");
    let one_line = regex!(r"\s{2,}").replace_all(&one_line, " ");
    let one_line = one_line.trim();

    let mut parts = Vec::new();
    let mut last = 0;
    for m in regex!(r"<[^>]+>").find_iter(one_line) {
        parts.push(&one_line[last..m.start()]);
        parts.push(m.as_str());
        last = m.end();
    }
    parts.push(&one_line[last..]);

    let mut lines: Vec<String> = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut indent = 0usize;
    let mut cell_opened = false;

    for part in parts.into_iter().filter(|p| !p.is_empty()) {
        let in_cell = stack.iter().any(|t| t == "td" || t == "th");
        if !in_cell && part.trim().is_empty() {
            continue;
        }
        let current = lines.last_mut().filter(|_| in_cell);

        if part.starts_with("</") {
            indent = indent.saturating_sub(1);
            let name = tag_name(part);
            match current {
                Some(line) if name == "td" || name == "th" => {
                    line.truncate(line.trim_end().len());
                    line.push_str(part);
                }
                Some(line) => line.push_str(part),
                None => lines.push(format!("{}{}", "  ".repeat(indent), part)),
            }
            stack.pop();
        } else if part.starts_with('<') {
            match current {
                Some(line) => line.push_str(part),
                None => lines.push(format!("{}{}", "  ".repeat(indent), part)),
            }
            let name = tag_name(part);
            if !name.is_empty() && !part.ends_with("/>") && !VOID_TAGS.contains(&name.as_str()) {
                indent += 1;
                cell_opened = name == "td" || name == "th";
                stack.push(name);
                continue;
            }
        } else {
            match current {
                Some(line) if cell_opened => line.push_str(part.trim_start()),
                Some(line) => line.push_str(part),
                None => lines.push(format!("{}{}", "  ".repeat(indent), part.trim())),
            }
        }
        cell_opened = false;
    }
    lines.join("\n")
}

/// Inside `<pre>`-like and `<nowiki>` blocks, angle brackets (and for the
/// preformatted ones, spaces) are swapped for sentinels so that no later
/// step sees markup there.
fn protect_verbatim(text: &str) -> String {
    let open = regex!(r"(?i)<(syntaxhighlight|source|pre|nowiki)\b[^/>]*>");
    rewrite_tag_pairs(text, open, |pair| {
        let mut body = pair.body.replace('<', "\x01").replace('>', "\x02");
        if !pair.name.eq_ignore_ascii_case("nowiki") {
            body = body.replace([' ', '\u{A0}'], "\x03");
        }
        format!("{}{}{}", pair.open, body, pair.close)
    })
}

/// Keep only allow-listed attributes with a value on `span`/`div`/`p`/`font`.
fn sanitize_attributes(text: &str) -> String {
    regex!(r"(?i)<(span|div|p|font)\s+([^>]*?)\s*(/?)>")
        .replace_all(text, |c: &Captures| {
            let mut kept = String::new();
            let attr = regex!(r#"\s*([A-Za-z0-9_]+)(?:\s*=\s*(?:"([^"\n]*)"|'([^'\n]*)'|([A-Za-z0-9_]+)))?\s*"#);
            for a in attr.captures_iter(&c[2]) {
                let name = a[1].to_ascii_lowercase();
                let value = a.get(2).or(a.get(3)).or(a.get(4)).map_or("", |m| m.as_str());
                if attribute_allowed(&name) && !value.is_empty() {
                    kept.push_str(&format!(" {}=\"{}\"", name, value));
                }
            }
            format!("<{}{}{}>", &c[1], kept, &c[3])
        })
        .into_owned()
}

/// Replace attribute-less opening tags matched by `pattern` (groups: closing
/// slash, name, attributes) and their matching closing tags. Tags that still
/// carry attributes stay, and so do their closers.
fn remove_bare_tags(text: &str, pattern: &Regex, open_with: &str, close_with: &str) -> String {
    let mut removed: Vec<bool> = Vec::new();
    pattern
        .replace_all(text, |c: &Captures| {
            if c[1].is_empty() {
                let bare = c[3].trim().is_empty();
                removed.push(bare);
                if bare { open_with.to_string() } else { c[0].to_string() }
            } else if removed.pop() == Some(true) {
                close_with.to_string()
            } else {
                c[0].to_string()
            }
        })
        .into_owned()
}

/// Escape every `&` that does not already start an entity.
fn escape_ampersands(text: &str) -> String {
    replace_with_context(regex!("&"), text, |_, _, after| {
        let entity = regex_is_match!(r"^(?:amp;|lt;|gt;|nbsp;|quot;|apos;|#[0-9]+;|#x[0-9a-fA-F]+;)", after);
        (!entity).then(|| ("&amp;".to_string(), 0))
    })
}

fn inline_formatting(text: &str) -> String {
    let t = regex!(r"(?i)</?(?:i|em|dfn|var|cite)\b[^>]*?>").replace_all(text, "''");
    regex!(r"(?i)</?(?:b|strong)\b[^>]*?>").replace_all(&t, "'''").into_owned()
}

/// `<hN>` at the start of a line or paragraph becomes a wikitext heading.
/// Deeper levels are converted first.
fn headings(text: &str) -> String {
    let open = regex!(r"(?i)(?:\s|<br\b[^>]*>|\x00)*(?:^|\n|<br\b[^>]*>|\x00)(?:\s|<br\b[^>]*>|\x00)*<h([1-6])\b[^>]*>");
    (1..=6).rev().fold(text.to_string(), |acc, level| {
        let marks = "=".repeat(level);
        replace_with_context(open, &acc, |c, _, after| {
            if c[1].parse::<usize>() != Ok(level) {
                return None;
            }
            let closer = format!("</h{}>", level);
            let end = find_ascii_ci(after, &closer, 0)?;
            let rest = &after[end + closer.len()..];
            let trailing = regex!(r"(?i)^(?:\s|<br\b[^>]*>|\x00)*").find(rest).map_or(0, |m| m.end());
            Some((
                format!("\x00\x00{marks} {} {marks}\x00\x00", &after[..end]),
                end + closer.len() + trailing,
            ))
        })
    })
}

/// List tags become line prefixes; nesting depth is tracked as a stack of
/// list kinds.
fn lists(text: &str) -> String {
    let mut open: Vec<ListType> = Vec::new();
    let prefix = |open: &[ListType]| open.iter().map(|l| l.marker()).collect::<String>();
    let text = regex!(r"(?i)[\s\x00]*<(/?(?:ol|ul|li|dl|dd|dt))\b[^>]*>[\s\x00]*")
        .replace_all(text, |c: &Captures| match c[1].to_ascii_lowercase().as_str() {
            "ol" | "ul" | "dl" => {
                if let Ok(kind) = c[1].to_ascii_lowercase().parse::<ListType>() {
                    open.push(kind);
                }
                "\x00".to_string()
            }
            "/ol" | "/ul" | "/dl" => {
                open.pop();
                "\x00\x00".to_string()
            }
            "li" | "dd" => format!("\x00{} ", prefix(&open)),
            "dt" => {
                let mut p = prefix(&open);
                if p.ends_with(':') {
                    p.pop();
                    p.push(';');
                }
                format!("\x00{} ", p)
            }
            _ => String::new(),
        })
        .into_owned();
    // markers left without an item
    replace_with_context(regex!(r"[\n\x00]+[#*:;]+\s"), &text, |_, _, after| {
        after.starts_with(['\n', '\x00']).then(|| (String::new(), 0))
    })
}

fn anchors(text: &str) -> String {
    regex!(r#"(?i)<a\s+href=(?:"([^"]*)"|'([^']*)'|([^\s>]+))[^>]*>((?s:.)*?)</a>"#)
        .replace_all(text, |c: &Captures| {
            let href = [c.get(1), c.get(2), c.get(3)]
                .into_iter()
                .flatten()
                .map(|m| m.as_str())
                .find(|h| !h.is_empty());
            let Some(href) = href else {
                return c[4].to_string();
            };
            let label = regex!(r"<[^>]+>").replace_all(&c[4], "").trim().to_string();
            Link::new_external(href.to_string(), (label != href).then_some(label)).to_wikitext()
        })
        .into_owned()
}

/// Paragraph sentinels become blank lines, single ones plain newlines.
fn collapse_breaks(text: &str) -> String {
    let t = regex!(r"\x00+\n").replace_all(text, "\n\n");
    let t = regex!(r"\n\x00+").replace_all(&t, "\n\n");
    let t = regex!(r"\n*\x00(?:\x00|\n)+").replace_all(&t, "\n\n");
    t.replace('\x00', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_and_italic() {
        assert_eq!(convert_html("<b>Hello</b> <i>world</i>"), "'''Hello''' ''world''");
        assert_eq!(convert_html("<strong>a</strong><em>b</em>"), "'''a'''''b''");
    }

    #[test]
    fn paragraphs_become_blank_lines() {
        assert_eq!(convert_html("<p>One</p><p>Two</p>"), "One\n\nTwo");
        assert_eq!(convert_html("a<br>b<br/>c"), "a\nb\nc");
    }

    #[test]
    fn unordered_list() {
        assert_eq!(convert_html("<ul><li>a</li><li>b</li></ul>"), "* a\n* b");
    }

    #[test]
    fn nested_lists() {
        let html = "<ol><li>one<ul><li>inner</li></ul></li><li>two</li></ol>";
        assert_eq!(convert_html(html), "# one\n\n#* inner\n\n# two");
    }

    #[test]
    fn empty_list_items_leave_no_marker() {
        assert_eq!(convert_html("a<ul><li></li></ul>b"), "a\n\nb");
        assert_eq!(convert_html("<ul><li>x</li><li></li></ul>"), "* x");
    }

    #[test]
    fn definition_list() {
        assert_eq!(convert_html("<dl><dt>term</dt><dd>meaning</dd></dl>"), "; term\n: meaning");
    }

    #[test]
    fn headings_and_rules() {
        assert_eq!(convert_html("<h2>Title</h2><p>Text</p>"), "== Title ==\n\nText");
        assert_eq!(convert_html("<h3 id=\"x\">Sub</h3>"), "=== Sub ===");
        assert_eq!(convert_html("a<hr>b"), "a\n\n----\n\nb");
    }

    #[test]
    fn heading_closer_must_match_level() {
        assert_eq!(convert_html("<h4>B</h4><h1>A</h1>"), "==== B ====\n\n= A =");
        assert_eq!(convert_html("<H2>T</h2>"), "== T ==");
        // no closer, no heading
        assert_eq!(convert_html("<h2>T</h3>"), "T");
    }

    #[test]
    fn anchors_become_external_links() {
        assert_eq!(convert_html("<a href=\"https://x.org\">site</a>"), "[https://x.org site]");
        assert_eq!(convert_html("<a href='https://x.org'>https://x.org</a>"), "[https://x.org]");
        assert_eq!(convert_html("<a name=\"top\">text</a>"), "text");
    }

    #[test]
    fn anchor_without_text_keeps_bare_href() {
        assert_eq!(convert_html("<a href=\"https://x.org\"></a>"), "[https://x.org]");
        assert_eq!(convert_html("<a href=\"https://x.org\"><span></span></a>"), "[https://x.org]");
    }

    #[test]
    fn spans_and_fonts_are_unwrapped() {
        assert_eq!(convert_html("<span>plain</span> <font face=\"x\">f</font>"), "plain f");
        assert_eq!(
            sanitize_attributes("<span onclick=\"x()\" style=\"color:red\">"),
            "<span style=\"color:red\">"
        );
    }

    #[test]
    fn remove_bare_tags_keeps_attributed_pairs() {
        let out = remove_bare_tags(
            "<span>a</span><span style=\"x\">b</span>",
            regex!(r"<(/?)(span|font)\b([^>]*)>"),
            "",
            "",
        );
        assert_eq!(out, "a<span style=\"x\">b</span>");
    }

    #[test]
    fn preformatted_content_is_literal() {
        assert_eq!(convert_html("<pre>x <b>y</b></pre>"), "x\u{A0}<b>y</b>");
        assert_eq!(convert_html("<nowiki><i>z</i> w</nowiki>"), "<i>z</i> w");
    }

    #[test]
    fn scripts_styles_comments_dropped() {
        assert_eq!(
            convert_html("<style>p{}</style>a<script>x()</script><!-- note -->b"),
            "ab"
        );
    }

    #[test]
    fn entities() {
        assert_eq!(convert_html("AT&T &amp;lt; &lt;b&gt;"), "AT&T &lt; <b>");
        assert_eq!(convert_html("a&nbsp;b"), "a\u{A0}b");
    }

    #[test]
    fn table_is_cleaned_and_indented() {
        let html = "<p>x</p><table class=\"wikitable\"><tbody><tr><td class=\"c\"># item</td></tr></tbody></table>";
        assert_eq!(
            convert_html(html),
            "x\n\n<table>\n  <tr>\n    <td># item</td>\n  </tr>\n</table>"
        );
    }

    #[test]
    fn table_cell_keeps_inline_markup() {
        let html = "<table><tr><th>a <b>b</b> c</th></tr></table>";
        assert_eq!(
            convert_html(html),
            "<table>\n  <tr>\n    <th>a <b>b</b> c</th>\n  </tr>\n</table>"
        );
    }

    #[test]
    fn zero_width_style_is_dropped() {
        assert_eq!(drop_zero_width("<table style=\"width:0px\">"), "<table>");
        assert_eq!(
            drop_zero_width("<table style=\"width:0px; color:red;\" border=\"1\">"),
            "<table style=\"color:red;\" border=\"1\">"
        );
    }

    #[test]
    fn colgroup_and_wrappers_removed() {
        let html = "<table><colgroup><col></colgroup><tr><td><div><span>v</span></div></td></tr></table>";
        assert_eq!(
            convert_html(html),
            "<table>\n  <tr>\n    <td>v</td>\n  </tr>\n</table>"
        );
    }
}
