//! Parsing, querying, mutating and serializing XHTML chapter documents.
//!
//! Input is parsed with html5ever into an arena ([`ArenaDom`]) so that sloppy
//! exports still produce a tree. Regions are located with CSS selectors
//! ([`CompiledSelector`]) and the result is written back out as XHTML
//! ([`serialize_document`]).

mod arena;
mod element_ref;
mod serialize;
mod tree_sink;

pub use arena::{ArenaDom, ArenaNode, ArenaNodeData, ArenaNodeId, Attribute};
pub use element_ref::{CompiledSelector, DomSelectors, ElementRef};
pub use serialize::{serialize_children, serialize_document, serialize_node};

use html5ever::driver::ParseOpts;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::QuirksMode;

use tree_sink::ArenaSink;

/// What the HTML parser had to repair in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseSummary {
    /// Recoverable parse errors.
    pub errors: usize,
    /// The doctype was missing or legacy, so the page parsed in quirks mode.
    pub quirks: bool,
}

/// Parse a complete (X)HTML document.
pub fn parse_document(html: &str) -> ArenaDom {
    parse_document_with_summary(html).0
}

/// Parse a complete document, also reporting what the parser repaired.
pub fn parse_document_with_summary(html: &str) -> (ArenaDom, ParseSummary) {
    let sink = html5ever::parse_document(ArenaSink::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes());
    let summary = ParseSummary {
        errors: sink.parse_errors(),
        quirks: sink.quirks_mode() == QuirksMode::Quirks,
    };
    (sink.into_dom(), summary)
}

/// Parse a piece of markup that is not a whole document.
///
/// The markup is wrapped in a minimal document so unbalanced tags are
/// repaired the same way a browser would; the parsed nodes end up as the
/// children of the returned `<body>`.
pub fn parse_fragment(html: &str) -> (ArenaDom, ArenaNodeId) {
    let wrapped = format!("<html><head></head><body>{html}</body></html>");
    let dom = parse_document(&wrapped);
    let body = dom.find_by_tag("body").unwrap_or(dom.document());
    (dom, body)
}
