/*!
Link node and helpers for MediaWiki-style links.

This module implements:
- `Link` data type with constructors and `to_wikitext`.
- `split_external_content(content)` for the inside of a `[...]` external link,
  where the URL may sit before or after its label.
*/

use lazy_regex::regex_find;

use crate::wikitext::enums::LinkType;

/// Link node representing either an internal `[[target|label]]` or an external
/// `[http://... label]` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub link_type: LinkType,
    pub target: String,
    pub label: Option<String>,
}

impl Link {
    /// Construct an internal link.
    pub fn new_internal<S: Into<String>>(target: S, label: Option<S>) -> Self {
        Self {
            link_type: LinkType::Internal,
            target: target.into(),
            label: label.map(Into::into),
        }
    }

    /// Construct an external link.
    pub fn new_external<S: Into<String>>(target: S, label: Option<S>) -> Self {
        Self {
            link_type: LinkType::External,
            target: target.into(),
            label: label.map(Into::into),
        }
    }

    /// Reconstruct the link as wikitext. An empty label is treated as no label.
    pub fn to_wikitext(&self) -> String {
        let label = self.label.as_deref().filter(|l| !l.is_empty());
        match (self.link_type, label) {
            (LinkType::Internal, Some(label)) => format!("[[{}|{}]]", self.target, label),
            (LinkType::Internal, None) => format!("[[{}]]", self.target),
            // MediaWiki external link uses a space between target and label
            (LinkType::External, Some(label)) => format!("[{} {}]", self.target, label),
            (LinkType::External, None) => format!("[{}]", self.target),
        }
    }
}

/// Split the inside of a bracketed external link into its first absolute URL
/// and the label formed by the text around it.
///
/// Handles `url label`, `label url` and a lone `url`. Returns `None` when the
/// content carries no `http(s)` URL at all.
pub fn split_external_content(content: &str) -> Option<(&str, String)> {
    let url = regex_find!(r"https?://[^\]\s]+", content)?;
    let at = content.find(url)?;
    let label = format!("{}{}", &content[..at], &content[at + url.len()..]);
    Some((url, label.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_with_and_without_label() {
        assert_eq!(Link::new_internal("Page", Some("Label")).to_wikitext(), "[[Page|Label]]");
        assert_eq!(Link::new_internal("Page", None).to_wikitext(), "[[Page]]");
        assert_eq!(Link::new_internal("Page", Some("")).to_wikitext(), "[[Page]]");
    }

    #[test]
    fn external_with_and_without_label() {
        assert_eq!(Link::new_external("http://x", Some("X")).to_wikitext(), "[http://x X]");
        assert_eq!(Link::new_external("http://x", None).to_wikitext(), "[http://x]");
    }

    #[test]
    fn split_url_first() {
        let (url, label) = split_external_content("https://a.org/Page see it").unwrap();
        assert_eq!(url, "https://a.org/Page");
        assert_eq!(label, "see it");
    }

    #[test]
    fn split_label_first() {
        let (url, label) = split_external_content("see it https://a.org/Page").unwrap();
        assert_eq!(url, "https://a.org/Page");
        assert_eq!(label, "see it");
    }

    #[test]
    fn split_without_url() {
        assert!(split_external_content("[Page").is_none());
        let (_, label) = split_external_content("http://a.org").unwrap();
        assert!(label.is_empty());
    }
}
