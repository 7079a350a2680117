//! Static lookup tables shared by the rewriters.

/// Non-breaking space.
pub const NBSP: &str = "\u{00A0}";

/// A named HTML entity the normalizer decodes to its character.
pub struct EntityRule {
    pub name: &'static str,
    pub text: &'static str,
    /// `&COPY;` is accepted as well as `&copy;`.
    pub ignore_case: bool,
}

/// Named entities decoded by the normalizer.
pub const NAMED_ENTITIES: &[EntityRule] = &[
    EntityRule { name: "copy", text: "©", ignore_case: true },
    EntityRule { name: "reg", text: "®", ignore_case: true },
    EntityRule { name: "sect", text: "§", ignore_case: true },
    EntityRule { name: "euro", text: "€", ignore_case: true },
    EntityRule { name: "yen", text: "¥", ignore_case: true },
    EntityRule { name: "pound", text: "£", ignore_case: true },
    EntityRule { name: "deg", text: "°", ignore_case: false },
    EntityRule { name: "trade", text: "™", ignore_case: true },
    EntityRule { name: "hellip", text: "…", ignore_case: false },
    EntityRule { name: "plusmn", text: "±", ignore_case: false },
];

/// Look up a named entity (without `&` and `;`).
pub fn named_entity(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES
        .iter()
        .find(|e| e.name == name || (e.ignore_case && e.name.eq_ignore_ascii_case(name)))
        .map(|e| e.text)
}

/// "кв. м" / "куб. см" prefixes and the superscript they turn into.
pub const POWER_PREFIXES: &[(&str, &str)] = &[("кв", "²"), ("куб", "³")];

pub fn power_suffix(prefix: &str) -> Option<&'static str> {
    POWER_PREFIXES.iter().find(|(p, _)| *p == prefix).map(|(_, s)| *s)
}

/// Entities decoded at the end of HTML conversion, in order. `&amp;` must be
/// last so that `&amp;lt;` decodes to `&lt;` and not to `<`.
pub const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&nbsp;", NBSP),
    ("&amp;", "&"),
];

/// Attributes kept on `span`/`div`/`p`/`font` during HTML conversion.
pub const ALLOWED_ATTRIBUTES: &[&str] = &[
    "href", "src", "class", "id", "style", "align", "valign", "rowspan", "colspan", "border",
    "cellspacing", "cellpadding", "width", "height", "title", "alt", "name", "clear", "type",
    "start", "value", "summary", "char", "charoff", "abbr", "axis", "headers", "scope", "nowrap",
    "bgcolor", "face", "size", "color", "datetime", "lang", "dir",
];

pub fn attribute_allowed(name: &str) -> bool {
    ALLOWED_ATTRIBUTES.iter().any(|a| a.eq_ignore_ascii_case(name))
}

/// Elements that never get a closing tag, so they do not open an indent level.
pub const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "col"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_case_rules() {
        assert_eq!(named_entity("copy"), Some("©"));
        assert_eq!(named_entity("COPY"), Some("©"));
        assert_eq!(named_entity("deg"), Some("°"));
        assert_eq!(named_entity("DEG"), None);
        assert_eq!(named_entity("nbsp"), None);
    }

    #[test]
    fn amp_is_decoded_last() {
        assert_eq!(HTML_ENTITIES.last().map(|e| e.0), Some("&amp;"));
    }

    #[test]
    fn attribute_allow_list() {
        assert!(attribute_allowed("STYLE"));
        assert!(!attribute_allowed("onclick"));
    }
}
