/*!
URL canonicalizer.

Rewrites absolute links that point back into the wiki itself as internal
wikitext: `[[Page title|label]]` for page links and `{{fullurl:...}}` for
links carrying query parameters. Links to any other origin are never touched.

Also home of [`resolve_origin`], which turns an API endpoint into the
`origin`/`base_dir` pair the canonicalizer works with.
*/

use derive_builder::Builder;
use itertools::Itertools;
use lazy_regex::{regex, regex_is_match};
use percent_encoding::percent_decode_str;
use regex::Captures;
use url::Url;

use crate::wikitext::enums::Namespace;
use crate::wikitext::errors::{FixError, Result};
use crate::wikitext::fragment::{decode_fragment, escapes_well_formed};
use crate::wikitext::passes::replace_with_context;
use crate::wikitext::typography::normalize;
use crate::wikitext::types::links::{Link, split_external_content};

/// Closes the metadata comment some sync tools put at the top of a page.
pub const METADATA_END_MARKER: &str = "END_MWS_METADATA -->";

/// Options for [`canonicalize_links`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonicalizeOptions {
    /// Also run the typographic normalizer over the rewritten content.
    pub also_normalize: bool,
}

/// The wiki the links are canonicalized against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(setter(into))]
pub struct WikiSite {
    /// `scheme://host[:port]`, no trailing slash.
    pub origin: String,
    /// Path prefix under which the wiki serves pages, with a trailing slash.
    #[builder(default = "String::from(\"/\")")]
    pub base_dir: String,
}

impl WikiSite {
    /// Derive the site from an API endpoint such as `https://host/w/api.php`.
    pub fn from_endpoint(endpoint: &str) -> Result<Self> {
        let (origin, base_dir) = try_resolve_origin(endpoint)?;
        Ok(Self { origin, base_dir })
    }

    pub fn canonicalize(&self, text: &str, options: CanonicalizeOptions) -> String {
        canonicalize_links(text, &self.origin, &self.base_dir, options)
    }
}

/// Split `(origin, base_dir)` out of an endpoint URL. Fails on anything that
/// does not parse as a URL with a host.
pub fn try_resolve_origin(endpoint: &str) -> Result<(String, String)> {
    let trimmed = endpoint.trim_end_matches('/');
    let with_scheme = if regex_is_match!(r"^https?://", trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let url = Url::parse(&with_scheme)?;
    let host = url
        .host_str()
        .ok_or_else(|| FixError::invalid_arg(format!("endpoint {:?} has no host", endpoint)))?;

    let path = url.path();
    let base_dir = if path.to_ascii_lowercase().ends_with("api.php") {
        path[..path.rfind('/').map_or(0, |i| i + 1)].to_string()
    } else if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    };
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };
    Ok((origin, base_dir))
}

/// `(origin, base_dir)` for an endpoint; `("", "/")` when it is malformed.
pub fn resolve_origin(endpoint: &str) -> (String, String) {
    try_resolve_origin(endpoint).unwrap_or_else(|e| {
        log::debug!("cannot resolve origin: {}", e);
        (String::new(), "/".to_string())
    })
}

/// Split off a leading metadata comment, returning `(metadata, content)`.
fn split_metadata(text: &str) -> (&str, &str) {
    if !text.trim_start().starts_with("<!--") {
        return ("", text);
    }
    match text.find(METADATA_END_MARKER) {
        Some(at) => text.split_at(at + METADATA_END_MARKER.len()),
        None => ("", text),
    }
}

/// Punycode hosts → Unicode. The host is left alone when it does not decode.
fn decode_idn_hosts(text: &str) -> String {
    regex!(r"(https?://)([^/?#\s]+)")
        .replace_all(text, |c: &Captures| {
            let authority = &c[2];
            let (host, port) = match authority.rsplit_once(':') {
                Some((h, p)) if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) => (h, Some(p)),
                _ => (authority, None),
            };
            let unicode = url::quirks::domain_to_unicode(host);
            if unicode.is_empty() {
                return c[0].to_string();
            }
            match port {
                Some(port) => format!("{}{}:{}", &c[1], unicode, port),
                None => format!("{}{}", &c[1], unicode),
            }
        })
        .into_owned()
}

/// Where a same-origin URL should point once it is expressed in wikitext.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WikiTarget {
    /// `{{fullurl:...}}` arguments, already joined with `|`.
    FullUrl(String),
    /// Page title, colon prefix and fragment included.
    Page(String),
}

/// `"value"` → `value`; one quote is stripped from each end.
fn unquote(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

fn is_pdf_page_link(title: &str, fragment: &str) -> bool {
    Namespace::of_title(title) == Namespace::File
        && title.to_lowercase().ends_with(".pdf")
        && regex_is_match!(r"^page=[0-9]+$", fragment)
}

/// Decide what `raw` (an absolute URL found in the text) turns into. `None`
/// leaves the link as it was.
fn wiki_target(raw: &str, origin: &str, base_dir: &str) -> Option<WikiTarget> {
    if origin.is_empty() || !raw.starts_with(origin) {
        return None;
    }
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            log::debug!("skipping unparsable link {}: {}", raw, e);
            return None;
        }
    };
    if url.origin().ascii_serialization() != origin {
        log::debug!("skipping {}: different origin", raw);
        return None;
    }

    if url.query().is_some_and(|q| !q.is_empty()) {
        let title = url.query_pairs().find(|(k, _)| k == "title").map(|(_, v)| v.into_owned());
        let Some(title) = title.filter(|t| !t.is_empty()) else {
            log::debug!("skipping {}: query without title", raw);
            return None;
        };
        let params = url
            .query_pairs()
            .filter(|(k, _)| k != "title")
            .map(|(k, v)| format!("{}={}", k, unquote(&v)));
        let args = std::iter::once(title).chain(params).join("|");
        return Some(WikiTarget::FullUrl(args));
    }

    let path = url.path();
    let relative = if base_dir != "/" && path.starts_with(base_dir) {
        &path[base_dir.len()..]
    } else {
        path.strip_prefix('/').unwrap_or(path)
    };
    let file = relative.rsplit('/').next().filter(|f| !f.is_empty());
    let page_path = match file {
        Some(file) if relative.contains("img_auth.php") => format!("File:{}", file),
        _ => relative.to_string(),
    };

    if !escapes_well_formed(&page_path) {
        log::debug!("skipping {}: malformed escape in path", raw);
        return None;
    }
    let mut title = match percent_decode_str(&page_path).decode_utf8() {
        Ok(decoded) => decoded.replace('_', " "),
        Err(e) => {
            log::debug!("skipping {}: {}", raw, e);
            return None;
        }
    };

    if let Some(fragment) = url.fragment().and_then(|f| f.split('#').next()).filter(|f| !f.is_empty()) {
        if is_pdf_page_link(&title, fragment) {
            title = format!("{}|{}", title, fragment);
        } else {
            title = format!("{}#{}", title, decode_fragment(fragment));
        }
    }

    if Namespace::of_title(&title).needs_colon() {
        title.insert(0, ':');
    }
    Some(WikiTarget::Page(title))
}

fn rewrite_bracketed(text: &str, origin: &str, base_dir: &str) -> String {
    regex!(r"\[(.+?)\]")
        .replace_all(text, |c: &Captures| {
            // `[[...]` is the start of an internal link
            if c[1].starts_with('[') {
                return c[0].to_string();
            }
            let Some((raw, label)) = split_external_content(&c[1]) else {
                return c[0].to_string();
            };
            let label = Some(label).filter(|l| !l.is_empty());
            match wiki_target(raw, origin, base_dir) {
                Some(WikiTarget::FullUrl(args)) => match label {
                    Some(label) => format!("[{{{{fullurl:{}}}}} {}]", args, label),
                    None => format!("[{{{{fullurl:{}}}}}]", args),
                },
                Some(WikiTarget::Page(title)) => Link::new_internal(title, label).to_wikitext(),
                None => c[0].to_string(),
            }
        })
        .into_owned()
}

/// `before` ends inside an unclosed `[[...]]`.
fn inside_wikilink(before: &str) -> bool {
    match (before.rfind("[["), before.rfind("]]")) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}

fn rewrite_bare(text: &str, origin: &str, base_dir: &str) -> String {
    replace_with_context(regex!(r"https?://[^\s|\]}]+"), text, |c, before, _| {
        if before.ends_with(['[', '=', '|']) || inside_wikilink(before) {
            return None;
        }
        match wiki_target(&c[0], origin, base_dir)? {
            WikiTarget::FullUrl(args) => Some((format!("{{{{fullurl:{}}}}}", args), 0)),
            WikiTarget::Page(title) => Some((Link::new_internal(title, None).to_wikitext(), 0)),
        }
    })
}

/// Rewrite same-origin absolute links in `text` as internal wikitext.
///
/// A leading metadata comment ending in [`METADATA_END_MARKER`] is excluded
/// from every rewrite, normalization included, and reattached unchanged.
pub fn canonicalize_links(text: &str, origin: &str, base_dir: &str, options: CanonicalizeOptions) -> String {
    let (metadata, content) = split_metadata(text);
    let content = decode_idn_hosts(content);
    let content = rewrite_bracketed(&content, origin, base_dir);
    let mut content = rewrite_bare(&content, origin, base_dir);
    if options.also_normalize {
        content = normalize(&content);
    }
    format!("{}{}", metadata, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://wiki.example.org";

    fn fix(text: &str) -> String {
        canonicalize_links(text, ORIGIN, "/", CanonicalizeOptions::default())
    }

    #[test]
    fn bracketed_page_link() {
        assert_eq!(fix("[https://wiki.example.org/Foo_bar see foo]"), "[[Foo bar|see foo]]");
        assert_eq!(fix("[see foo https://wiki.example.org/Foo_bar]"), "[[Foo bar|see foo]]");
        assert_eq!(fix("[https://wiki.example.org/Foo_bar]"), "[[Foo bar]]");
    }

    #[test]
    fn bare_query_link() {
        assert_eq!(
            fix("https://wiki.example.org/index.php?title=Foo&action=history"),
            "{{fullurl:Foo|action=history}}"
        );
    }

    #[test]
    fn bracketed_query_link_keeps_label() {
        assert_eq!(
            fix("[https://wiki.example.org/index.php?title=Foo&oldid=%2212%22 old]"),
            "[{{fullurl:Foo|oldid=12}} old]"
        );
    }

    #[test]
    fn query_without_title_is_left_alone() {
        let text = "[https://wiki.example.org/index.php?action=raw raw]";
        assert_eq!(fix(text), text);
    }

    #[test]
    fn foreign_origin_unchanged() {
        let text = "see [https://other.example.org/Foo_bar foo] and https://other.example.org/Baz";
        assert_eq!(fix(text), text);
        let lookalike = "https://wiki.example.org.evil.com/Foo";
        assert_eq!(fix(lookalike), lookalike);
    }

    #[test]
    fn base_dir_is_stripped() {
        let out = canonicalize_links(
            "https://wiki.example.org/wiki/Main_Page",
            ORIGIN,
            "/wiki/",
            CanonicalizeOptions::default(),
        );
        assert_eq!(out, "[[Main Page]]");
    }

    #[test]
    fn percent_encoded_title() {
        assert_eq!(fix("https://wiki.example.org/%D0%9F%D1%80%D0%B8%D0%BC%D0%B5%D1%80"), "[[Пример]]");
    }

    #[test]
    fn fragments() {
        assert_eq!(
            fix("https://wiki.example.org/Page#.D0.9F.D1.80.D0.B8.D0.BC.D0.B5.D1.80"),
            "[[Page#Пример]]"
        );
        assert_eq!(fix("https://wiki.example.org/File:Doc.PDF#page=3"), "[[File:Doc.PDF|page=3]]");
    }

    #[test]
    fn img_auth_becomes_file() {
        assert_eq!(fix("https://wiki.example.org/img_auth.php/a/ab/Pic.png"), "[[File:Pic.png]]");
    }

    #[test]
    fn category_and_template_get_colon() {
        assert_eq!(fix("https://wiki.example.org/Category:Things"), "[[:Category:Things]]");
        assert_eq!(fix("https://wiki.example.org/Шаблон:Карточка"), "[[:Шаблон:Карточка]]");
        assert_eq!(fix("https://wiki.example.org/File:Pic.png"), "[[File:Pic.png]]");
    }

    #[test]
    fn urls_in_parameters_and_links_are_skipped() {
        let text = "{{cite|url=https://wiki.example.org/Foo}} [[x|https://wiki.example.org/Foo]]";
        assert_eq!(fix(text), text);
    }

    #[test]
    fn urls_in_wikilink_labels_are_skipped() {
        let text = "[[Foo|see https://wiki.example.org/Bar]]";
        assert_eq!(fix(text), text);
        assert_eq!(
            fix("[[Foo|a]] then https://wiki.example.org/Bar"),
            "[[Foo|a]] then [[Bar]]"
        );
    }

    #[test]
    fn punycode_hosts_are_decoded() {
        assert_eq!(fix("see http://xn--d1acpjx3f.xn--p1ai/page"), "see http://яндекс.рф/page");
        assert_eq!(fix("http://xn--d1acpjx3f.xn--p1ai:8080/"), "http://яндекс.рф:8080/");
    }

    #[test]
    fn metadata_block_is_preserved() {
        let meta = "<!-- page: \"x\" - https://wiki.example.org/Foo\nEND_MWS_METADATA -->";
        let text = format!("{}\n\"q\" https://wiki.example.org/Foo", meta);
        let out = canonicalize_links(&text, ORIGIN, "/", CanonicalizeOptions { also_normalize: true });
        assert_eq!(out, format!("{}\n«q» [[Foo]]", meta));
    }

    #[test]
    fn empty_origin_never_matches() {
        let text = "https://wiki.example.org/Foo";
        assert_eq!(canonicalize_links(text, "", "/", CanonicalizeOptions::default()), text);
    }

    #[test]
    fn resolve_api_endpoint() {
        assert_eq!(
            resolve_origin("https://wiki.example.org/w/api.php"),
            ("https://wiki.example.org".to_string(), "/w/".to_string())
        );
        assert_eq!(
            resolve_origin("wiki.example.org:8080/wiki/"),
            ("https://wiki.example.org:8080".to_string(), "/wiki/".to_string())
        );
        assert_eq!(
            resolve_origin("http://wiki.example.org"),
            ("http://wiki.example.org".to_string(), "/".to_string())
        );
    }

    #[test]
    fn resolve_malformed_endpoint() {
        assert_eq!(resolve_origin(""), (String::new(), "/".to_string()));
        assert_eq!(resolve_origin("http://[::1"), (String::new(), "/".to_string()));
        assert!(try_resolve_origin("http://[::1").is_err());
    }

    #[test]
    fn site_builder_defaults_base_dir() {
        let site = WikiSiteBuilder::default().origin(ORIGIN).build().unwrap();
        assert_eq!(site.base_dir, "/");
        assert_eq!(
            site.canonicalize("[https://wiki.example.org/A_b]", CanonicalizeOptions::default()),
            "[[A b]]"
        );
        let from_api = WikiSite::from_endpoint("https://wiki.example.org/api.php").unwrap();
        assert_eq!(from_api, site);
    }
}
