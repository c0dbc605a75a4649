//! Fragmentation settings.
//!
//! Which header fields are wrapped, whether chapter titles and notes get an
//! id, and what happens to non-paragraph content are all switches here. Settings can be
//! read from TOML; CLI flags override file values, which override the
//! defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dom::CompiledSelector;
use crate::error::{Error, Result};
use crate::fragment::HeaderField;

/// File name of the title/metadata page merged into the first chapter.
pub const DEFAULT_TITLE_PAGE: &str = "title_page.xhtml";

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentConfig {
    /// Header fields to wrap on the first page.
    pub header_fields: HeaderFieldSet,

    /// Wrap each chapter title in its own id (multi-page works only).
    pub wrap_chapter_title: bool,

    /// What to do with content-region children that are not paragraphs.
    pub non_paragraph: NonParagraphPolicy,

    /// Give each page's chapter notes block one id of its own, after the
    /// paragraphs. Pages without notes are unaffected.
    pub wrap_notes: bool,

    /// Rewrite field labels to their display names (`Category:` becomes `Fandom:`).
    pub relabel_fields: bool,

    /// Where each region lives in a chapter export.
    pub selectors: Selectors,

    /// Title page file name inside the input directory.
    pub title_page: String,
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            header_fields: HeaderFieldSet::default(),
            wrap_chapter_title: true,
            non_paragraph: NonParagraphPolicy::default(),
            wrap_notes: false,
            relabel_fields: true,
            selectors: Selectors::default(),
            title_page: DEFAULT_TITLE_PAGE.into(),
        }
    }
}

impl FragmentConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.selectors.compile()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&source)
    }
}

/// Which header fields are wrapped. Order is fixed by [`HeaderField::ALL`];
/// this only switches fields on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderFieldSet {
    pub title_author: bool,
    pub fandom: bool,
    pub tags: bool,
    pub summary: bool,
}

impl Default for HeaderFieldSet {
    fn default() -> Self {
        Self {
            title_author: true,
            fandom: true,
            tags: false,
            summary: true,
        }
    }
}

impl HeaderFieldSet {
    /// Every field switched off.
    pub const NONE: Self = Self {
        title_author: false,
        fandom: false,
        tags: false,
        summary: false,
    };

    pub fn is_enabled(&self, field: HeaderField) -> bool {
        match field {
            HeaderField::TitleAuthor => self.title_author,
            HeaderField::Fandom => self.fandom,
            HeaderField::Tags => self.tags,
            HeaderField::Summary => self.summary,
        }
    }

    pub fn set(&mut self, field: HeaderField, enabled: bool) {
        match field {
            HeaderField::TitleAuthor => self.title_author = enabled,
            HeaderField::Fandom => self.fandom = enabled,
            HeaderField::Tags => self.tags = enabled,
            HeaderField::Summary => self.summary = enabled,
        }
    }

    /// Whether any field is switched on.
    pub fn any(&self) -> bool {
        HeaderField::ALL.iter().any(|&f| self.is_enabled(f))
    }

    /// Enabled fields in wrapping order.
    pub fn enabled(&self) -> impl Iterator<Item = HeaderField> + '_ {
        HeaderField::ALL
            .iter()
            .copied()
            .filter(|&f| self.is_enabled(f))
    }
}

/// Treatment of content-region children that are not `<p>` elements.
///
/// Author notes and asides are dropped unless `Keep` is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NonParagraphPolicy {
    /// Rebuild the region from its paragraphs only.
    #[default]
    Discard,
    /// Rewrite paragraphs where they stand and leave everything else alone.
    Keep,
}

/// CSS selectors for the regions of a chapter export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// The narrative container.
    pub content: String,
    /// The merged title-page block.
    pub metadata: String,
    /// A chapter's title heading.
    pub chapter_title: String,
    /// The element the title page is inserted before.
    pub merge_anchor: String,
    /// A chapter's author notes, outside the narrative container.
    pub notes: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            content: "div.userstuff.module".into(),
            metadata: "span.meta-wrapper".into(),
            chapter_title: "h3.fff_chapter_title".into(),
            merge_anchor: "h3".into(),
            notes: "div.fff_chapter_notes".into(),
        }
    }
}

impl Selectors {
    /// Parse every selector, failing on the first invalid one.
    pub fn compile(&self) -> Result<PageSelectors> {
        Ok(PageSelectors {
            content: CompiledSelector::parse(&self.content)?,
            metadata: CompiledSelector::parse(&self.metadata)?,
            chapter_title: CompiledSelector::parse(&self.chapter_title)?,
            merge_anchor: CompiledSelector::parse(&self.merge_anchor)?,
            notes: CompiledSelector::parse(&self.notes)?,
        })
    }
}

/// Compiled form of [`Selectors`].
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub content: CompiledSelector,
    pub metadata: CompiledSelector,
    pub chapter_title: CompiledSelector,
    pub merge_anchor: CompiledSelector,
    pub notes: CompiledSelector,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Selectors::default()
            .compile()
            .expect("default selectors are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fanfic_exports() {
        let config = FragmentConfig::default();
        assert!(config.header_fields.title_author);
        assert!(config.header_fields.fandom);
        assert!(!config.header_fields.tags);
        assert!(config.header_fields.summary);
        assert!(config.wrap_chapter_title);
        assert_eq!(config.non_paragraph, NonParagraphPolicy::Discard);
        assert!(!config.wrap_notes);
        assert_eq!(config.selectors.notes, "div.fff_chapter_notes");
        assert_eq!(config.title_page, "title_page.xhtml");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FragmentConfig::from_toml_str(
            r#"
            non_paragraph = "keep"
            wrap_notes = true

            [header_fields]
            tags = true
            "#,
        )
        .unwrap();

        assert_eq!(config.non_paragraph, NonParagraphPolicy::Keep);
        assert!(config.wrap_notes);
        assert!(config.header_fields.tags);
        assert!(config.header_fields.summary);
        assert_eq!(config.selectors.content, "div.userstuff.module");
    }

    #[test]
    fn test_invalid_selector_in_toml_is_rejected() {
        let err = FragmentConfig::from_toml_str(
            r#"
            [selectors]
            content = "div["
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidSelector { .. }));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = FragmentConfig::from_toml_str("wrap_chapter_title = maybe").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_enabled_fields_follow_fixed_order() {
        let mut set = HeaderFieldSet::NONE;
        set.set(HeaderField::Summary, true);
        set.set(HeaderField::TitleAuthor, true);

        let fields: Vec<_> = set.enabled().collect();
        assert_eq!(fields, vec![HeaderField::TitleAuthor, HeaderField::Summary]);
        assert!(set.any());
        assert!(!HeaderFieldSet::NONE.any());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fragment.toml");
        std::fs::write(&path, "wrap_chapter_title = false\n").unwrap();

        let config = FragmentConfig::load(&path).unwrap();
        assert!(!config.wrap_chapter_title);
    }
}
