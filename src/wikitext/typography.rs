//! Typographic normalizer.
//!
//! Takes freely typed or pasted wikitext and applies house style: dashes,
//! quotes, non-breaking spaces around units and abbreviations, heading layout,
//! entity decoding. Markup that must not change (code, templates, raw links,
//! link targets, tables) is shielded first and restored at the very end.
//!
//! The work is one [`Pipeline`]; pass order matters, most passes assume the
//! earlier ones already hid or normalised something.

use lazy_regex::{Lazy, regex};
use regex::Captures;

use crate::wikitext::passes::{Pipeline, RewritePass, Rule, rewrite_tag_pairs};
use crate::wikitext::shield::{ShieldTable, contains_reserved};
use crate::wikitext::tables::{NBSP, named_entity, power_suffix};

static PIPELINE: Lazy<Pipeline> = Lazy::new(|| Pipeline::new("typography", passes()));

/// The normalizer pipeline, exposed for inspection and pass-level tests.
pub fn pipeline() -> &'static Pipeline {
    &PIPELINE
}

/// Apply house typographic style to `text`.
pub fn normalize(text: &str) -> String {
    if contains_reserved(text) {
        log::warn!("input contains reserved placeholder code points; output may be corrupted");
    }
    let mut table = ShieldTable::new();
    PIPELINE.run(text, &mut table)
}

fn is_cyrillic_letter(c: char) -> bool {
    matches!(c, 'А'..='Я' | 'а'..='я' | 'Ё' | 'ё')
}

fn is_ascii_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `[[1990 год|1990]] год` and friends: the piped text must repeat the number.
fn same_unit_link(c: &Captures, unit: &str) -> String {
    if c[1] == c[2] {
        format!("[[{}{}{}]]{}", &c[1], NBSP, unit, c.get(3).map_or("", |m| m.as_str()))
    } else {
        c[0].to_string()
    }
}

/// `[[Foo|Foos]]` → `[[Foo]]s` when the label is the target plus a lowercase ending.
fn collapse_duplicate_label(c: &Captures) -> String {
    let label = c[2].trim_matches(' ');
    let mut target = &c[1];
    loop {
        if let Some(rest) = label.strip_prefix(target)
            && rest.chars().all(|ch| ch.is_ascii_lowercase() || matches!(ch, 'а'..='я' | 'ё'))
        {
            return format!("[[{}]]{}", target, rest);
        }
        match target.strip_suffix(' ') {
            Some(shorter) if !shorter.is_empty() => target = shorter,
            _ => return c[0].to_string(),
        }
    }
}

/// `[[AB|A]]B` → `[[AB]]`.
fn absorb_repeated_tail(c: &Captures, _: &str, after: &str) -> Option<(String, usize)> {
    let target = c[1].trim_end_matches(' ');
    let label = c[2].trim_matches(' ');
    if label.is_empty() {
        return None;
    }
    let tail = target.strip_prefix(label)?;
    if tail.is_empty() || tail.contains(['(', ')']) || !after.starts_with(tail) {
        return None;
    }
    Some((format!("[[{}]]", target), tail.len()))
}

/// `[[Target|text]]s` → `[[Target|texts]]`, except for file and category links.
fn absorb_suffix_into_label(c: &Captures) -> String {
    const SKIP: [&str; 5] = ["Файл:", "Категория:", "File:", "Image:", "Category:"];
    if SKIP.iter().any(|p| c[1].starts_with(p)) {
        return c[0].to_string();
    }
    format!("[[{}|{}{}]]", &c[1], &c[2], &c[3])
}

fn hide_paired_tags(text: &str, table: &mut ShieldTable) -> String {
    rewrite_tag_pairs(text, regex!(r"(?i)<([a-z][a-z0-9]*)(?: [^>]+)?>"), |pair| table.push(pair.whole()))
}

/// Bold markup wrapping a whole heading is dropped, unless the heading holds
/// more bold runs than the wrapper.
fn unbold_heading(c: &Captures) -> String {
    let rest_of_line = format!("{}''' ==", &c[1]);
    if rest_of_line.matches("'''").count() >= 2 {
        c[0].to_string()
    } else {
        format!("== {} ==", &c[1])
    }
}

fn decode_hex_entity(c: &Captures) -> String {
    u32::from_str_radix(&c[1], 16)
        .ok()
        .and_then(char::from_u32)
        .map_or_else(|| c[0].to_string(), String::from)
}

fn decode_named_entity(c: &Captures) -> String {
    named_entity(&c[1]).map_or_else(|| c[0].to_string(), str::to_string)
}

fn plus_minus(c: &Captures, _: &str, after: &str) -> Option<(String, usize)> {
    if after.starts_with(['+', '-']) {
        return None;
    }
    Some((format!("{}±", &c[1]), 0))
}

fn power_unit(c: &Captures) -> String {
    match power_suffix(&c[2]) {
        Some(sup) => format!("{}{}{}{}{}", &c[1], NBSP, &c[3], sup, &c[4]),
        None => c[0].to_string(),
    }
}

/// Whatever follows a year range must not continue the word or the number,
/// but "1941—1945-е" style endings are allowed.
fn year_range(c: &Captures, _: &str, after: &str) -> Option<(String, usize)> {
    let mut chars = after.chars();
    let ok = match chars.next() {
        None => true,
        Some(ch) if is_ascii_word(ch) || is_cyrillic_letter(ch) => false,
        Some('-') => match chars.next() {
            None => true,
            Some('е' | 'х') => !chars.next().is_some_and(|n| is_ascii_word(n) || is_cyrillic_letter(n)),
            Some(_) => false,
        },
        Some(_) => true,
    };
    ok.then(|| (format!("{}{}—{}", &c[1], &c[2], &c[4]), 0))
}

fn century_range(c: &Captures, _: &str, after: &str) -> Option<(String, usize)> {
    if after.starts_with(|ch: char| is_ascii_word(ch) || ch == '-') {
        return None;
    }
    Some((format!("{}{}—{}", &c[1], &c[2], &c[4]), 0))
}

fn era(c: &Captures) -> String {
    let tail = if &c[1] == "." { "" } else { &c[1] };
    format!("н.{NBSP}э.{tail}")
}

/// A unit after a number is followed by punctuation or by a lowercase word.
fn unit_tail_ok(s: &str) -> bool {
    if s.starts_with([',', ';', '.']) {
        return true;
    }
    let Some(rest) = s.strip_prefix(' ') else {
        return false;
    };
    let rest = rest.strip_prefix('"').unwrap_or(rest);
    rest.starts_with(|ch: char| matches!(ch, 'а'..='я' | 'ё' | '-'))
}

fn number_unit(c: &Captures, _: &str, after: &str) -> Option<(String, usize)> {
    let spaced = format!("{}{}{}", &c[1], NBSP, &c[2]);
    if let Some(rest) = after.strip_prefix('.')
        && unit_tail_ok(rest)
    {
        return Some((spaced, 1));
    }
    unit_tail_ok(after).then_some((spaced, 0))
}

/// Only the first `ISBN:` followed by an ISBN-looking run is touched.
fn isbn(text: &str, _: &mut ShieldTable) -> String {
    for m in regex!(r"ISBN:\s?").find_iter(text) {
        let run = text[m.end()..]
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '-')
            .count();
        if run >= 8 {
            return format!("{}ISBN {}", &text[..m.start()], &text[m.end()..]);
        }
    }
    text.to_string()
}

fn list_marker_space(c: &Captures, _: &str, after: &str) -> Option<(String, usize)> {
    if &c[2] == "{" && after.starts_with('|') {
        return None;
    }
    Some((format!("{} {}", &c[1], &c[2]), 0))
}

fn followed_by_cyrillic_suffix(after: &str) -> bool {
    let mut chars = after.chars();
    chars.next() == Some('-') && chars.next().is_some_and(is_cyrillic_letter)
}

fn percent_space(c: &Captures, _: &str, after: &str) -> Option<(String, usize)> {
    (!followed_by_cyrillic_suffix(after)).then(|| (format!("{}{}{}", &c[1], NBSP, &c[2]), 0))
}

fn percent_adjective(c: &Captures, _: &str, after: &str) -> Option<(String, usize)> {
    followed_by_cyrillic_suffix(after).then(|| (format!("{}{}", &c[1], &c[2]), 0))
}

fn temperature(c: &Captures, _: &str, after: &str) -> Option<(String, usize)> {
    let boundary = after
        .chars()
        .next()
        .is_some_and(|ch| ch.is_whitespace() || "\"').,;!?|\u{1}".contains(ch));
    boundary.then(|| (format!("{}{}{}°{}", &c[1], &c[2], NBSP, &c[3]), 0))
}

fn passes() -> Vec<RewritePass> {
    use Rule::*;
    vec![
        // Shield protected regions
        RewritePass::new("hide html blocks", Shield(regex!(r"(?i)<html( [^>]+)?>[\s\S]+?</html>"))),
        RewritePass::new("hide m blocks", Shield(regex!(r"(?i)<m( [^>]+)?>[\s\S]+?</m>"))),
        RewritePass::new("hide preformatted lines", Shield(regex!(r"(?m)^ .*$"))),
        RewritePass::new(
            "hide urls",
            Shield(regex!(r"(?i)(http|https|ftp|tftp|news|nntp|telnet|irc|gopher)://[^ \n\r\x{A0}]* ?")),
        ),
        RewritePass::new("hide nowiki", Shield(regex!(r"(?i)<nowiki( [^>]+)?>[\s\S]+?</nowiki>"))),
        RewritePass::new("hide pre", Shield(regex!(r"(?i)<pre( [^>]+)?>[\s\S]+?</pre>"))),
        RewritePass::new("hide source", Shield(regex!(r"(?i)<source( [^>]+)?>[\s\S]+?</source>"))),
        RewritePass::new(
            "hide syntaxhighlight",
            Shield(regex!(r"(?i)<syntaxhighlight( [^>]+)?>[\s\S]+?</syntaxhighlight>")),
        ),
        RewritePass::new(
            "hide code",
            Shield(regex!(r"(?i)<code[\-0-9A-Za-z_]*( [^>]+)?>[\s\S]+?</code[\-0-9A-Za-z_]*>")),
        ),
        RewritePass::new("hide tt", Shield(regex!(r"(?i)<tt( [^>]+)?>[\s\S]+?</tt>"))),
        RewritePass::new("hide math", Shield(regex!(r"(?i)<math( [^>]+)?>[\s\S]+?</math>"))),
        RewritePass::new("hide timeline", Shield(regex!(r"(?i)<timeline( [^>]+)?>[\s\S]+?</timeline>"))),
        RewritePass::new("hide hyphenated compounds", Shield(regex!(r"[0-9A-Za-z_]+-[0-9A-Za-z_]+"))),
        // Canonicalize & shield templates
        RewritePass::new("separator templates", Replace(regex!(r"( |\n|\r)+\{\{(·|•|\*)\}\}"), "{{$2}}")),
        RewritePass::new(
            "strip template prefix",
            Replace(regex!(r"\{\{\s*([Шш]аблон|[tT]emplate):([\s\S]+?)\}\}"), "{{$2}}"),
        ),
        RewritePass::new("rename reflist", Replace(regex!(r"(?i)(\{\{\s*)reflist(\s*[|}])"), "${1}примечания$2")),
        RewritePass::new("hide templates", Shield(regex!(r"\{\{[\s\S]+?\}\}"))),
        // Second-pass regions
        RewritePass::new("hide preformatted lines again", Shield(regex!(r"(?m)^ .*"))),
        RewritePass::new(
            "hide raw links",
            Shield(regex!(r#"(?i)(https?|ftp|news|nntp|telnet|irc|gopher)://[^\s\[\]<>"]+ ?"#)),
        ),
        RewritePass::new("hide redirect", Shield(regex!(r"(?i)^#(redirect|перенапр(авление)?)"))),
        RewritePass::new("hide gallery", Shield(regex!(r"(?i)<gallery( [^>]+)?>[\s\S]+?</gallery>"))),
        // Whitespace
        RewritePass::new("trailing spaces", Replace(regex!(r" +(\n|\r)"), "$1")),
        RewritePass::new("add sentinel lines", Custom(|text, _| format!("\n{}\n", text))),
        // Linked years and centuries
        RewritePass::new(
            "linked year range",
            Replace(
                regex!(r"(\(|\s)(\[\[[12]?[0-9]{3}\]\])[\x{A0} ]?(-{1,3}|–|—) ?(\[\[[12]?[0-9]{3}\]\])([^0-9A-Za-z_])"),
                "$1$2—$4$5",
            ),
        ),
        RewritePass::new("linked years unit", Replace(regex!(r"(\[\[[12]?[0-9]{3}\]\]) ?(гг?\.)"), "$1\u{A0}$2")),
        RewritePass::new(
            "linked century range",
            Replace(
                regex!(r"(\(|\s)(\[\[[IVX]{1,5}\]\])[\x{A0} ]?(-{1,3}|–|—) ?(\[\[[IVX]{1,5}\]\])([^0-9A-Za-z_])"),
                "$1$2—$4$5",
            ),
        ),
        RewritePass::new("linked centuries unit", Replace(regex!(r"(\[\[[IVX]{1,5}\]\]) ?(вв?\.)"), "$1\u{A0}$2")),
        RewritePass::new("year link word", Replace(regex!(r"\[\[([0-9]+)\]\]\sгод"), "[[$1\u{A0}год]]")),
        RewritePass::new(
            "year piped link word",
            Map(regex!(r"\[\[([0-9]+)\sгод\|([0-9]+)\]\]\sгод"), |c| same_unit_link(c, "год")),
        ),
        RewritePass::new(
            "year piped link ending",
            Map(regex!(r"\[\[([0-9]+)\sгод\|([0-9]+)\sгод([а-я]{0,3})\]\]"), |c| same_unit_link(c, "год")),
        ),
        RewritePass::new(
            "year link declension",
            Map(
                regex!(r"\[\[(([0-9]+)(?: (?:год )?в [0-9A-Za-z_а-яёА-ЯЁ ]+\|([0-9]+))?)\]\][\x{A0} ](год[а-яё]*)"),
                |c| match c.get(3) {
                    Some(repeat) if repeat.as_str() != &c[2] => c[0].to_string(),
                    _ => format!("[[{}{}{}]]", &c[1], NBSP, &c[4]),
                },
            ),
        ),
        RewritePass::new("century link word", Replace(regex!(r"\[\[([XVI]+)\]\]\sвек"), "[[$1\u{A0}век]]")),
        RewritePass::new(
            "century piped link word",
            Map(regex!(r"\[\[([XVI]+)\sвек\|([XVI]+)\]\]\sвек"), |c| same_unit_link(c, "век")),
        ),
        RewritePass::new(
            "century piped link ending",
            Map(regex!(r"\[\[([XVI]+)\sвек\|([XVI]+)\sвек([а-я]{0,3})\]\]"), |c| same_unit_link(c, "век")),
        ),
        RewritePass::new(
            "century piped link after",
            Map(regex!(r"\[\[(([XVI]+) век\|([XVI]+))\]\][\x{A0} ]век"), |c| {
                if c[2] == c[3] {
                    format!("[[{}{}век]]", &c[2], NBSP)
                } else {
                    c[0].to_string()
                }
            }),
        ),
        // Link text simplification
        RewritePass::new(
            "strip invisible marks",
            Replace(regex!(r"(\[\[[^|\[\]]*)[\x{AD}\x{200E}\x{200F}]+([^\[\]]*\]\])"), "$1$2"),
        ),
        RewritePass::new(
            "collapse duplicate label",
            Map(regex!(r"\[\[ *([^|\[\]]+)\|([^|\[\]]*)\]\]"), collapse_duplicate_label),
        ),
        RewritePass::new(
            "absorb repeated tail",
            Context(regex!(r"\[\[ *([^|\[\]]+)\|([^|\[\]]+)\]\]"), absorb_repeated_tail),
        ),
        RewritePass::new(
            "absorb suffix into label",
            Map(
                regex!(r#"\[\[ *([a-zA-Zа-яёА-ЯЁ\x{A0}-\x{FF} %!"$&'()*,\-—./0-9:;=?\\@^_`’~]+) *\| *([^|\[\]]+) *\]\]([a-zа-яё]+)"#),
                absorb_suffix_into_label,
            ),
        ),
        RewritePass::new("hide link targets", Shield(regex!(r"\[\[[^\]|]+"))),
        // Inline markup
        RewritePass::new(
            "inline math",
            ShieldAs(regex!(r"\$([^$\n]*\\[^$\n]*)\$"), |c| format!("<math>{}</math>", &c[1])),
        ),
        RewritePass::new("backtick code", ShieldAs(regex!(r"`([^`\n]+)`"), |c| format!("<tt>{}</tt>", &c[1]))),
        RewritePass::new("double angle quotes", Replace(regex!(r"<<(\S.+\S)>>"), "\"$1\"")),
        RewritePass::new("sub/sup minus", Replace(regex!(r"(su[pb]>)-([0-9])"), "$1−$2")),
        RewritePass::new("sup2 entity", Replace(regex!(r"(?i)&sup2;"), "²")),
        RewritePass::new("sup3 entity", Replace(regex!(r"(?i)&sup3;"), "³")),
        RewritePass::new("bold tags", Replace(regex!(r"(?i)<(b|strong)>(.*?)</(b|strong)>"), "'''$2'''")),
        RewritePass::new("italic tags", Replace(regex!(r"(?i)<(i|em)>(.*?)</(i|em)>"), "''$2''")),
        RewritePass::new("hr line", Replace(regex!(r"(?im)^<hr ?/?>"), "----")),
        RewritePass::new(
            "self-closing br/hr",
            Replace(regex!(r"(?i)<[/\\]?(hr|br)( [^/\\>]+?)? ?[/\\]?>"), "<$1$2 />"),
        ),
        RewritePass::new(
            "ref spacing",
            Replace(regex!(r#"(?i)[\x{A0} \t]*<ref(?:\s+name="")?(\s|>)"#), "<ref$1"),
        ),
        RewritePass::new(
            "notes template",
            Replace(
                regex!(r"(?i)(\n== *[a-zа-я\s.:]+ *==\n+)<references */>"),
                "${1}{{примечания}}",
            ),
        ),
        // Remaining raw tags
        RewritePass::new("hide paired tags", Custom(hide_paired_tags)),
        RewritePass::new("hide bare tags", Shield(regex!(r"(?i)<[a-z][^>]*?>"))),
        // Table syntax
        RewritePass::new("hide table rows", Shield(regex!(r"(?m)^(\{\||\|-).*"))),
        RewritePass::new(
            "hide cell styles",
            ShieldContext(regex!(r"(?im)(^\||^!|!!|\|\|) *[a-z]+=[^|]+\|"), |c, _, after| {
                (!after.starts_with('|')).then(|| (c[0].to_string(), 0))
            }),
        ),
        RewritePass::new("hide formatted cell pipes", Shield(regex!(r"\| +"))),
        RewritePass::new("tabs", Replace(regex!(r"[ \t\x{A0}]*\t[ \t\x{A0}]*"), "\t")),
        // Headings
        RewritePass::new("heading padding", Replace(regex!(r"(?m)^(=+)[ \t\f\v]*(.*?)[ \t\f\v]*=+$"), "$1 $2 $1")),
        RewritePass::new("blank line before heading", Replace(regex!(r"([^\r\n])(\r?\n==.*==\r?\n)"), "$1\n$2")),
        RewritePass::new(
            "heading see also",
            Replace(regex!(r"(?im)^== см(\.?|отри|отрите) ?также ==$"), "== См. также =="),
        ),
        RewritePass::new("heading footnotes", Replace(regex!(r"(?im)^== сноски ==$"), "== Примечания ==")),
        RewritePass::new("heading external links", Replace(regex!(r"(?im)^== внешние\sссылки ==$"), "== Ссылки ==")),
        RewritePass::new("heading punctuation", Replace(regex!(r"(?m)^== (.+)[.:] ==$"), "== $1 ==")),
        RewritePass::new("heading bold", Map(regex!(r"(?m)^== '''(.+)''' ==$"), unbold_heading)),
        // Quotes and dashes
        RewritePass::new("fold quotes", Replace(regex!(r"«|»|“|”|„"), "\"")),
        RewritePass::new("en dash", Replace(regex!(r"–"), "-")),
        RewritePass::new("dash entities", Replace(regex!(r"&(#151|[nm]dash);"), "—")),
        RewritePass::new("minus", Replace(regex!(r"(\s)-([0-9])"), "$1−$2")),
        RewritePass::new("double hyphen", Replace(regex!(r"([0-9])--([0-9])"), "$1—$2")),
        RewritePass::new("spaced hyphen", Replace(regex!(r"\s+-{1,3}\s+"), " — ")),
        // Entities and symbols
        RewritePass::new("hex entities", Map(regex!(r"(?i)&#x([0-9a-f]{1,4});"), decode_hex_entity)),
        RewritePass::new("named entities", Map(regex!(r"&([A-Za-z]+);"), decode_named_entity)),
        RewritePass::new("trademark", Replace(regex!(r"(?i)\(tm\)"), "™")),
        RewritePass::new("ellipsis", Replace(regex!(r"\.\.\."), "…")),
        RewritePass::new("plus-minus", Context(regex!(r"(^|[^+])\+-"), plus_minus)),
        RewritePass::new("approximately", Replace(regex!(r"~="), "≈")),
        RewritePass::new("square", Replace(regex!(r"\^2([^0-9])"), "²$1")),
        RewritePass::new("cube", Replace(regex!(r"\^3([^0-9])"), "³$1")),
        RewritePass::new(
            "square/cubic units",
            Map(regex!(r"(\s)(кв|куб)\.\s*(дм|см|мм|мкм|нм|км|м)(\s)"), power_unit),
        ),
        RewritePass::new(
            "dimensions",
            Replace(
                regex!(r#"((?:^|[\s"])[0-9]+(?:[.,][0-9]+)?)\s*[xх]\s*([0-9]+(?:[.,][0-9]+)?)\s*([мm]{1,2}(?:[\s".,;?!]|$))"#),
                "$1×$2\u{A0}$3",
            ),
        ),
        RewritePass::new("quote entities", Replace(regex!(r"&((la|ra|bd|ld)quo|quot);"), "\"")),
        RewritePass::new("apostrophe", Replace(regex!(r"([0-9A-Za-z_а-яА-ЯёЁ])'([0-9A-Za-z_а-яА-ЯёЁ])"), "$1’$2")),
        RewritePass::new("double numero", Replace(regex!(r"№№"), "№")),
        // Plain year and century ranges
        RewritePass::new(
            "year range",
            Context(regex!(r"(\(|\s)([12]?[0-9]{3})[\x{A0} ]?(-{1,3}|—) ?([12]?[0-9]{3})"), year_range),
        ),
        RewritePass::new("years unit", Replace(regex!(r"([12]?[0-9]{3}) ?(гг?\.)"), "$1\u{A0}$2")),
        RewritePass::new(
            "century range",
            Context(regex!(r"(\(|\s)([IVX]{1,5})[\x{A0} ]?(-{1,3}|—) ?([IVX]{1,5})"), century_range),
        ),
        RewritePass::new("centuries unit", Replace(regex!(r"([IVX]{1,5}) ?(вв?\.)"), "$1\u{A0}$2")),
        // Abbreviations
        RewritePass::new("that is", Replace(regex!(r"(Т|т)\.\s?е\."), "${1}о есть")),
        RewritePass::new("because", Replace(regex!(r"(Т|т)\.\s?к\."), "${1}ак как")),
        RewritePass::new("including", Replace(regex!(r"(В|в)\sт\. ?ч\."), "$1 том числе")),
        RewritePass::new("and so on", Replace(regex!(r"(И|и)\sт\.\s?д\."), "$1\u{A0}т.\u{A0}д.")),
        RewritePass::new("and the like", Replace(regex!(r"(И|и)\sт\.\s?п\."), "$1\u{A0}т.\u{A0}п.")),
        RewritePass::new("so-called", Replace(regex!(r"(Т|т)\.\s?н\."), "$1.\u{A0}н.")),
        RewritePass::new("acting", Replace(regex!(r"(И|и)\.\s?о\."), "$1.\u{A0}о.")),
        RewritePass::new("common era", Map(regex!(r"н\.\s?э(\.|\s)"), era)),
        RewritePass::new("before common era", Replace(regex!(r"(Д|д)(о|\.)\sн\.\s?э\."), "${1}о\u{A0}н.\u{A0}э.")),
        RewritePass::new(
            "number units",
            Context(regex!(r"([0-9])[\x{A0} ]?(млн|млрд|трлн|[км]г|(?:м|с|д|к)?м)"), number_unit),
        ),
        RewritePass::new("thousands", Replace(regex!(r"([0-9])[\x{A0} ](тыс)([^.А-Яа-яЁё])"), "$1\u{A0}$2.$3")),
        RewritePass::new("isbn", Custom(isbn)),
        // Spacing
        RewritePass::new(
            "list marker spacing",
            Context(regex!(r"(?m)^([#*:]+)[ \t\f\v]*([^ \t\f\v*#:;])"), list_marker_space),
        ),
        RewritePass::new(
            "initials before surname",
            Replace(regex!(r"([А-ЯЁ]\.) ?([А-ЯЁ]\.) ?([А-ЯЁ][а-яё])"), "$1\u{202F}$2\u{202F}$3"),
        ),
        RewritePass::new("chained initials", Replace(regex!(r"([А-ЯЁ]\.)([А-ЯЁ]\.)"), "$1\u{202F}$2")),
        RewritePass::new("city prefix", Replace(regex!(r"(г\.) ?([А-Я][а-я])"), "$1\u{A0}$2")),
        RewritePass::new(
            "space after sentence",
            Replace(
                regex!(r#"([а-яё]"?\)?[.?!:])((?:\x01[\x{E010}-\x{E019}]+\x02\|)?[A-ZА-ЯЁ])"#),
                "$1 $2",
            ),
        ),
        RewritePass::new(
            "space after comma",
            Replace(regex!(r#"([)"a-zа-яё\]])\s*([,:])([\[("a-zа-яё])"#), "$1$2 $3"),
        ),
        RewritePass::new(
            "space before comma",
            Replace(regex!(r#"([)"a-zа-яё\]])\s([,;])\s([\[("a-zа-яё])"#), "$1$2 $3"),
        ),
        RewritePass::new(
            "percent",
            Context(regex!(r"([^%/0-9A-Za-z_А-Яа-яЁё][0-9]+?(?:[.,][0-9]+?)?) ?([%‰])"), percent_space),
        ),
        RewritePass::new("percent adjective", Context(regex!(r"([0-9]) ([%‰])"), percent_adjective)),
        RewritePass::new("numero and section", Replace(regex!(r"([№§])(\s*)([0-9])"), "$1\u{A0}$3")),
        RewritePass::new("open parenthesis", Replace(regex!(r"\( +"), "(")),
        RewritePass::new("close parenthesis", Replace(regex!(r" +\)"), ")")),
        // Temperature and decimals
        RewritePass::new(
            "temperature",
            Context(
                regex!(r#"([\s0-9=≈≠≤≥<>—("'|])([+±−-]?[0-9]+?(?:[.,][0-9]+?)?)(?:[ °^*]| [°^*])([CF])"#),
                temperature,
            ),
        ),
        RewritePass::new(
            "decimal comma",
            Replace(regex!(r"(?i)(\s[0-9]+)\.([0-9]+[\x{A0} ]*[%‰°×])"), "$1,$2"),
        ),
        // Quote styling
        RewritePass::new("guillemets", Replace(regex!(r#"(^|[^0-9A-Za-z_])"([^"]+)""#), "$1«$2»")),
        RewritePass::new(
            "nested guillemets",
            Until {
                probe: regex!(r"«[^»]*«"),
                rewrite: regex!(r"«([^»]*)«([^»]*)»"),
                with: "«$1„$2“",
            },
        ),
        // Unshield
        RewritePass::new("restore shields", Custom(|text, table| table.restore_all(text))),
        RewritePass::new(
            "drop sentinel lines",
            Custom(|text, _| {
                // The framing newlines may have been absorbed by a spacing rule;
                // the first and last positions are theirs either way.
                let mut chars = text.chars();
                chars.next();
                chars.next_back();
                chars.as_str().to_string()
            }),
        ),
    ]
}
