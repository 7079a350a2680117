//! Enums used by the wikitext module.
//!
//! - `LinkType`: distinguishes internal vs external links.
//! - `ListType`: the three list kinds an HTML fragment can carry into wikitext.
//! - `Namespace`: the page-title prefixes that change how a wikilink is written.
//!
//! `ListType` parses from an HTML tag name and `Namespace` from a title prefix.

use std::str::FromStr;

/// The kind of link produced by the rewriters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// Internal wiki link using `[[...]]`.
    Internal,
    /// External link using `[http://... label]`.
    External,
}

/// HTML list containers and the wikitext marker each one pushes onto the
/// nesting prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    /// `<ol>`: `#`
    Ordered,
    /// `<ul>`: `*`
    Unordered,
    /// `<dl>`: `:` (`;` for a term line)
    Definition,
}

impl ListType {
    /// The marker character this list contributes to the line prefix.
    pub fn marker(self) -> char {
        match self {
            ListType::Ordered => '#',
            ListType::Unordered => '*',
            ListType::Definition => ':',
        }
    }
}

impl FromStr for ListType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ol" | "#" | "ordered" => Ok(ListType::Ordered),
            "ul" | "*" | "unordered" => Ok(ListType::Unordered),
            "dl" | ":" | "definition" => Ok(ListType::Definition),
            other => Err(format!("unknown ListType '{}'", other)),
        }
    }
}

/// Namespaces the link canonicalizer treats specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Main,
    /// `File:` / `Файл:`: PDF page anchors are written as `|page=N`.
    File,
    /// `Category:` / `Категория:`: needs a leading colon to link instead of categorise.
    Category,
    /// `Template:` / `Шаблон:`: needs a leading colon to link instead of transclude.
    Template,
}

impl Namespace {
    /// Classify a page title by its (case-insensitive) namespace prefix.
    pub fn of_title(title: &str) -> Self {
        let Some((prefix, _)) = title.split_once(':') else {
            return Namespace::Main;
        };
        prefix.parse().unwrap_or(Namespace::Main)
    }

    /// Whether a wikilink to this namespace must start with `:`.
    pub fn needs_colon(self) -> bool {
        matches!(self, Namespace::Category | Namespace::Template)
    }
}

impl FromStr for Namespace {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" | "файл" => Ok(Namespace::File),
            "category" | "категория" => Ok(Namespace::Category),
            "template" | "шаблон" => Ok(Namespace::Template),
            "" | "main" => Ok(Namespace::Main),
            other => Err(format!("unknown Namespace '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listtype_from_tag_name() {
        assert_eq!(ListType::from_str("OL").unwrap(), ListType::Ordered);
        assert_eq!(ListType::from_str("ul").unwrap().marker(), '*');
        assert_eq!(ListType::from_str("dl").unwrap().marker(), ':');
        assert!(ListType::from_str("li").is_err());
    }

    #[test]
    fn namespace_of_title() {
        assert_eq!(Namespace::of_title("Категория:Птицы"), Namespace::Category);
        assert_eq!(Namespace::of_title("template:Cite"), Namespace::Template);
        assert_eq!(Namespace::of_title("Файл:Doc.pdf"), Namespace::File);
        assert_eq!(Namespace::of_title("Ratio 1:2"), Namespace::Main);
        assert_eq!(Namespace::of_title("Plain"), Namespace::Main);
        assert!(Namespace::Category.needs_colon());
        assert!(!Namespace::File.needs_colon());
    }
}
