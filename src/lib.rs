//! # fragment-ids
//!
//! Sentence-level fragment ids for narrative XHTML chapter exports.
//!
//! Every paragraph of a chapter is split into sentence-like fragments and
//! each fragment is wrapped in `<span id="fN">`, so an audio-sync player can
//! highlight text in time with narration. Title-page fields and chapter
//! titles share the same numbering, which is contiguous and zero-padded to a
//! fixed width per document.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fragment_ids::{FragmentConfig, fragment_dir};
//!
//! let reports = fragment_dir("export/", "annotated/", &FragmentConfig::default()).unwrap();
//! for report in &reports {
//!     println!("{}: {} fragments", report.document, report.total);
//! }
//! ```
//!
//! ## Single pages
//!
//! ```
//! use fragment_ids::{Document, PageOptions, PageSelectors, process_document};
//!
//! let mut doc = Document::parse(
//!     "ch1.xhtml",
//!     r#"<div class="userstuff module"><p>Hi. Bye.</p></div>"#,
//! );
//! let selectors = PageSelectors::default();
//! let report = process_document(&mut doc, &PageOptions::paragraphs_only(&selectors)).unwrap();
//!
//! assert_eq!(report.total, 2);
//! assert!(doc.to_xhtml().contains(r#"<span id="f1">Hi. </span><span id="f2">Bye.</span>"#));
//! ```

pub mod config;
pub mod dom;
pub mod error;
pub mod fragment;
pub(crate) mod util;
pub mod work;

pub use config::{FragmentConfig, HeaderFieldSet, NonParagraphPolicy, PageSelectors, Selectors};
pub use error::{Error, Result};
pub use fragment::{
    Document, FragmentId, FragmentReport, HeaderField, IdAllocator, PageOptions, digit_count,
    fragment, fragment_count, process_document,
};
pub use work::{ProcessedPage, Work, fragment_dir, write_pages};
