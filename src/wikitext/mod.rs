//! Wikitext module root
//!
//! Declares and re-exports the submodules that rewrite wikitext. Each entry
//! point is a pure text-to-text function:
//!
//! - [`normalize`]: typographic house style.
//! - [`convert_html`]: pasted HTML to wikitext.
//! - [`canonicalize_links`]: same-wiki absolute URLs to internal links.
//! - [`decode_fragment`]: MediaWiki dot-encoded anchors to text.
//! - [`resolve_origin`]: API endpoint to `(origin, base_dir)`.

pub mod enums;
pub mod errors;
pub mod fragment;
pub mod html;
pub mod passes;
pub mod shield;
pub mod tables;
pub mod types;
pub mod typography;
pub mod urls;

pub use enums::{LinkType, ListType, Namespace};
pub use errors::{FixError, Result};
pub use fragment::{decode_fragment, try_decode_fragment};
pub use html::convert_html;
pub use shield::ShieldTable;
pub use types::links::Link;
pub use typography::normalize;
pub use urls::{
    CanonicalizeOptions, WikiSite, WikiSiteBuilder, canonicalize_links, resolve_origin, try_resolve_origin,
};
