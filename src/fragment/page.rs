//! Whole-document fragmentation.
//!
//! A page is processed in two passes. The counting pass locates every region
//! and field without touching the tree, which fixes the total and therefore
//! the id width. The rewriting pass then hands out ids in a fixed order:
//! header fields, chapter title, paragraph fragments, notes.

use std::fmt;

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::header::{HeaderAssignment, HeaderField, HeaderPlan, plan_header, rewrite_header};
use super::ids::{FragmentId, IdAllocator};
use super::paragraph::{ParagraphPlan, rewrite_paragraphs};
use crate::config::{HeaderFieldSet, NonParagraphPolicy, PageSelectors};
use crate::dom::{ArenaDom, ArenaNodeId, parse_document_with_summary, serialize_document};
use crate::error::{Error, Result};
use crate::util::decode_text;

/// Where every stylesheet link points after processing.
pub const STYLESHEET_HREF: &str = "../styles/style.css";

/// One parsed chapter file.
pub struct Document {
    name: String,
    dom: ArenaDom,
}

impl Document {
    /// Parse markup. `name` identifies the document in errors and logs.
    pub fn parse(name: impl Into<String>, html: &str) -> Self {
        let name = name.into();
        let (dom, summary) = parse_document_with_summary(html);
        if summary.errors > 0 || summary.quirks {
            debug!(
                document = %name,
                parse_errors = summary.errors,
                quirks = summary.quirks,
                "repaired markup"
            );
        }
        Self { name, dom }
    }

    /// Decode and parse raw file contents.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self::parse(name, &decode_text(bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dom(&self) -> &ArenaDom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut ArenaDom {
        &mut self.dom
    }

    /// Serialize as an XHTML document.
    pub fn to_xhtml(&self) -> String {
        serialize_document(&self.dom)
    }
}

/// Per-page settings, resolved from the work configuration.
#[derive(Debug, Clone, Copy)]
pub struct PageOptions<'a> {
    pub selectors: &'a PageSelectors,
    pub header: HeaderFieldSet,
    pub chapter_title: bool,
    pub non_paragraph: NonParagraphPolicy,
    pub relabel: bool,
    /// Wrap the chapter notes block, when the page has one.
    pub notes: bool,
}

impl<'a> PageOptions<'a> {
    /// Paragraphs only: no header fields and no chapter title.
    pub fn paragraphs_only(selectors: &'a PageSelectors) -> Self {
        Self {
            selectors,
            header: HeaderFieldSet::NONE,
            chapter_title: false,
            non_paragraph: NonParagraphPolicy::default(),
            relabel: true,
            notes: false,
        }
    }
}

/// Processing stages of one page, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Counting,
    RewritingHeader,
    RewritingTitle,
    RewritingParagraphs,
    RewritingNotes,
    Done,
}

impl Stage {
    fn advance(&mut self, next: Stage, document: &str) {
        debug_assert!(next > *self, "stage {self} cannot move to {next}");
        trace!(document, from = %self, to = %next, "stage transition");
        *self = next;
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Counting => "counting",
            Stage::RewritingHeader => "rewriting-header",
            Stage::RewritingTitle => "rewriting-title",
            Stage::RewritingParagraphs => "rewriting-paragraphs",
            Stage::RewritingNotes => "rewriting-notes",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What processing did to one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentReport {
    pub document: String,
    /// Ids assigned in this document.
    pub total: usize,
    /// Zero-padding width of every id.
    pub width: usize,
    pub header_ids: Vec<HeaderAssignment>,
    pub chapter_title_id: Option<FragmentId>,
    pub paragraphs: usize,
    pub paragraph_fragments: usize,
    /// Enabled header fields that were not found.
    pub skipped_fields: Vec<HeaderField>,
    /// Content-region children dropped by [`NonParagraphPolicy::Discard`].
    pub discarded_nodes: usize,
    pub notes_id: Option<FragmentId>,
}

/// Fragment one page in place.
pub fn process_document(doc: &mut Document, options: &PageOptions<'_>) -> Result<FragmentReport> {
    let name = doc.name.clone();
    let dom = &mut doc.dom;
    let root = dom.document();
    let selectors = options.selectors;
    let mut stage = Stage::Counting;

    let content = selectors
        .content
        .select_first(dom, root)
        .ok_or_else(|| Error::MissingContentRegion {
            document: name.clone(),
            selector: selectors.content.as_str().to_string(),
        })?;

    let header = if options.header.any() {
        let region = selectors
            .metadata
            .select_first(dom, root)
            .ok_or_else(|| Error::MissingMetadataRegion {
                document: name.clone(),
                selector: selectors.metadata.as_str().to_string(),
            })?;
        plan_header(dom, region, &options.header, &name)
    } else {
        HeaderPlan::default()
    };

    let title = if options.chapter_title {
        let heading = selectors
            .chapter_title
            .select_first(dom, root)
            .ok_or_else(|| Error::MissingElement {
                document: name.clone(),
                what: format!("chapter title `{}`", selectors.chapter_title.as_str()),
            })?;
        Some(heading)
    } else {
        None
    };

    let notes = if options.notes {
        locate_notes(dom, content, options, &name)
    } else {
        None
    };

    let paragraphs = ParagraphPlan::capture(dom, content);
    let total = header.len()
        + usize::from(title.is_some())
        + paragraphs.fragment_count()
        + usize::from(notes.is_some());
    let mut ids = IdAllocator::new(total);
    debug!(
        document = %name,
        total,
        width = ids.width(),
        header = header.len(),
        paragraphs = paragraphs.len(),
        "counted fragments"
    );

    rewrite_stylesheet_links(dom, &name);

    stage.advance(Stage::RewritingHeader, &name);
    let header_ids = rewrite_header(dom, &header, &mut ids, options.relabel)?;

    stage.advance(Stage::RewritingTitle, &name);
    let chapter_title_id = title
        .map(|heading| wrap_with_id(dom, heading, "div", &mut ids))
        .transpose()?;

    stage.advance(Stage::RewritingParagraphs, &name);
    let discarded_nodes = rewrite_paragraphs(
        dom,
        content,
        &paragraphs,
        &mut ids,
        options.non_paragraph,
        &name,
    )?;

    stage.advance(Stage::RewritingNotes, &name);
    let notes_id = notes
        .map(|block| wrap_with_id(dom, block, "span", &mut ids))
        .transpose()?;

    stage.advance(Stage::Done, &name);
    debug_assert_eq!(ids.remaining(), 0);

    Ok(FragmentReport {
        document: name,
        total,
        width: ids.width(),
        header_ids,
        chapter_title_id,
        paragraphs: paragraphs.len(),
        paragraph_fragments: paragraphs.fragment_count(),
        skipped_fields: header.skipped,
        discarded_nodes,
        notes_id,
    })
}

/// The notes block that will still be in the tree once paragraphs are
/// rewritten. Notes are optional, so a page without them is not an error.
fn locate_notes(
    dom: &ArenaDom,
    content: ArenaNodeId,
    options: &PageOptions<'_>,
    document: &str,
) -> Option<ArenaNodeId> {
    let notes = &options.selectors.notes;
    let Some(block) = notes.select_first(dom, dom.document()) else {
        debug!(document, selector = notes.as_str(), "no chapter notes");
        return None;
    };
    if options.non_paragraph == NonParagraphPolicy::Discard && dom.is_descendant_of(block, content)
    {
        warn!(document, "chapter notes sit inside the content region and will be dropped");
        return None;
    }
    Some(block)
}

/// Wrap `node` in a fresh `tag` element carrying the next id.
fn wrap_with_id(
    dom: &mut ArenaDom,
    node: ArenaNodeId,
    tag: &str,
    ids: &mut IdAllocator,
) -> Result<FragmentId> {
    let id = ids.next_id()?;
    let wrapper = dom.create_html_element(tag, &[("id", id.to_string().as_str())]);
    dom.wrap_range(node, node, wrapper);
    Ok(id)
}

/// Point every `<link rel="stylesheet">` at [`STYLESHEET_HREF`].
/// Returns how many links were rewritten.
pub fn rewrite_stylesheet_links(dom: &mut ArenaDom, document: &str) -> usize {
    let links: Vec<_> = dom
        .descendants(dom.document())
        .into_iter()
        .filter(|&id| {
            dom.is_element_named(id, "link")
                && dom.get_attr(id, "rel").is_some_and(|rel| {
                    rel.split_ascii_whitespace()
                        .any(|token| token.eq_ignore_ascii_case("stylesheet"))
                })
        })
        .collect();

    if links.is_empty() {
        warn!(document, "no stylesheet link to rewrite");
    }
    for &link in &links {
        dom.set_attr(link, "href", STYLESHEET_HREF);
    }
    links.len()
}
