//! Fragmentation: splitting paragraphs into sentence-like fragments, numbering
//! them, and rewriting a page so each fragment carries its id.
//!
//! Modules are ordered leaves first:
//!
//! - [`sentence`]: the splitting rule
//! - [`ids`]: zero-padded identifiers and their allocator
//! - [`paragraph`]: paragraph rewriting
//! - [`header`]: metadata field location and wrapping
//! - [`page`]: the per-document pipeline

pub mod header;
pub mod ids;
pub mod page;
pub mod paragraph;
pub mod sentence;

pub use header::{HEADER_RULES, HeaderAssignment, HeaderField, HeaderPlan, HeaderRule};
pub use ids::{FragmentId, IdAllocator, digit_count};
pub use page::{Document, FragmentReport, PageOptions, STYLESHEET_HREF, Stage, process_document};
pub use paragraph::ParagraphPlan;
pub use sentence::{Fragments, fragment, fragment_count, fragments};
