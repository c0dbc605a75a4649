//! Multi-page works: loading a directory of chapter exports, merging the
//! title page into the first chapter, fragmenting every page and writing the
//! results.
//!
//! Every page is processed and serialized before the first file is written,
//! so a failing page leaves the output directory untouched.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{FragmentConfig, HeaderFieldSet};
use crate::dom::CompiledSelector;
use crate::error::{Error, Result};
use crate::fragment::{Document, FragmentReport, PageOptions, process_document};

/// Extension of chapter pages, both read and written.
pub const PAGE_EXTENSION: &str = "xhtml";

/// Class of the element the title page is merged into.
pub const META_WRAPPER_CLASS: &str = "meta-wrapper";

/// An ordered set of chapter pages plus an optional title page.
pub struct Work {
    pages: Vec<Document>,
    title_page: Option<Document>,
}

/// A fragmented page, ready to be written.
pub struct ProcessedPage {
    pub file_name: String,
    pub xhtml: String,
    pub report: FragmentReport,
}

impl Work {
    pub fn new(pages: Vec<Document>, title_page: Option<Document>) -> Self {
        Self { pages, title_page }
    }

    /// Load every `.xhtml` page in `dir`, sorted by file name. The file called
    /// `title_page_name` is held back as the title page.
    pub fn load_dir(dir: impl AsRef<Path>, title_page_name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::io(dir, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == PAGE_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut pages = Vec::with_capacity(paths.len());
        let mut title_page = None;
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
            let doc = Document::from_bytes(name.clone(), &bytes);

            if name == title_page_name {
                title_page = Some(doc);
            } else {
                pages.push(doc);
            }
        }

        debug!(
            dir = %dir.display(),
            pages = pages.len(),
            title_page = title_page.is_some(),
            "loaded work"
        );
        Ok(Self::new(pages, title_page))
    }

    pub fn pages(&self) -> &[Document] {
        &self.pages
    }

    pub fn title_page(&self) -> Option<&Document> {
        self.title_page.as_ref()
    }

    /// Whether chapter titles are numbered: only works with several pages.
    pub fn is_multi_page(&self) -> bool {
        self.pages.len() > 1
    }

    /// Fragment every page.
    ///
    /// The first page receives the title page and the enabled header fields;
    /// later pages get paragraphs and, in multi-page works, their chapter
    /// title. Notes, when enabled, are wrapped on every page that has them.
    /// Numbering restarts at 1 on every page.
    pub fn process(self, config: &FragmentConfig) -> Result<Vec<ProcessedPage>> {
        let selectors = config.selectors.compile()?;
        let chapter_title = self.is_multi_page() && config.wrap_chapter_title;
        let mut pages = self.pages;

        match (pages.first_mut(), &self.title_page) {
            (Some(first), Some(title_page)) => {
                merge_title_page(first, title_page, &selectors.merge_anchor)?;
            }
            (None, Some(title_page)) => {
                warn!(title_page = title_page.name(), "title page without chapters; ignoring");
            }
            (Some(first), None) if config.header_fields.any() => {
                debug!(page = first.name(), "no title page to merge");
            }
            _ => {}
        }

        let mut processed = Vec::with_capacity(pages.len());
        for (index, mut page) in pages.into_iter().enumerate() {
            let options = PageOptions {
                selectors: &selectors,
                header: if index == 0 {
                    config.header_fields
                } else {
                    HeaderFieldSet::NONE
                },
                chapter_title,
                non_paragraph: config.non_paragraph,
                relabel: config.relabel_fields,
                notes: config.wrap_notes,
            };
            let report = process_document(&mut page, &options)?;

            processed.push(ProcessedPage {
                file_name: output_file_name(page.name()),
                xhtml: page.to_xhtml(),
                report,
            });
        }
        Ok(processed)
    }
}

/// Insert the title page's body, wrapped in `<span class="meta-wrapper">`,
/// immediately before the first `anchor` match of `page`.
pub fn merge_title_page(
    page: &mut Document,
    title_page: &Document,
    anchor: &CompiledSelector,
) -> Result<()> {
    let name = page.name().to_string();
    let dom = page.dom_mut();
    let root = dom.document();
    let target = anchor
        .select_first(dom, root)
        .ok_or_else(|| Error::MissingElement {
            document: name,
            what: format!("title page insertion point `{}`", anchor.as_str()),
        })?;

    let source = title_page.dom();
    let body = source
        .find_by_tag("body")
        .unwrap_or_else(|| source.document());

    let wrapper = dom.create_html_element("span", &[("class", META_WRAPPER_CLASS)]);
    dom.import_children(source, body, wrapper);
    dom.insert_before(target, wrapper);
    Ok(())
}

/// Output name for an input page: its stem plus `.xhtml`.
pub fn output_file_name(input: &str) -> String {
    let stem = Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| input.into());
    format!("{stem}.{PAGE_EXTENSION}")
}

/// Write processed pages into `output_dir`, creating it if needed.
pub fn write_pages(output_dir: impl AsRef<Path>, pages: &[ProcessedPage]) -> Result<Vec<PathBuf>> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;

    let mut written = Vec::with_capacity(pages.len());
    for page in pages {
        let path = output_dir.join(&page.file_name);
        fs::write(&path, page.xhtml.as_bytes()).map_err(|e| Error::io(&path, e))?;
        info!(
            path = %path.display(),
            total = page.report.total,
            width = page.report.width,
            "wrote page"
        );
        written.push(path);
    }
    Ok(written)
}

/// Fragment every page of the work in `input_dir` into `output_dir`.
pub fn fragment_dir(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &FragmentConfig,
) -> Result<Vec<FragmentReport>> {
    let input_dir = input_dir.as_ref();
    let work = Work::load_dir(input_dir, &config.title_page)?;
    if work.pages().is_empty() {
        warn!(dir = %input_dir.display(), "no .xhtml pages found");
    }

    let pages = work.process(config)?;
    write_pages(output_dir, &pages)?;

    let fragments: usize = pages.iter().map(|p| p.report.total).sum();
    info!(pages = pages.len(), fragments, "fragmented work");
    Ok(pages.into_iter().map(|p| p.report).collect())
}
