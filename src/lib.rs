//! Wikitext rewriting: typographic normalization, HTML conversion and
//! same-wiki link canonicalization.

pub mod config;
pub mod wikitext;

pub use config::MwsConfig;
pub use wikitext::{
    CanonicalizeOptions, FixError, WikiSite, canonicalize_links, convert_html, decode_fragment, normalize,
    resolve_origin,
};
