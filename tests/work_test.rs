//! End-to-end tests over a directory of chapter exports.
//!
//! The fixture work under `tests/fixtures/work` has a title page and two
//! chapters; each test copies it into a temp dir so it can be modified.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use fragment_ids::{
    Error, FragmentConfig, HeaderField, HeaderFieldSet, NonParagraphPolicy, fragment_dir,
};
use regex::Regex;
use tempfile::TempDir;

const FIXTURE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/work");

/// Copy the fixture work into a fresh temp dir, returning it with an output path.
fn fixture_work() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    fs::create_dir(&input).unwrap();
    for entry in fs::read_dir(FIXTURE_DIR).unwrap() {
        let path = entry.unwrap().path();
        fs::copy(&path, input.join(path.file_name().unwrap())).unwrap();
    }
    let output = tmp.path().join("out");
    (tmp, input, output)
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

fn ids(xhtml: &str) -> Vec<String> {
    let re = Regex::new(r#"id="(f[0-9]+)""#).unwrap();
    re.captures_iter(xhtml).map(|c| c[1].to_string()).collect()
}

// ============================================================================
// Numbering
// ============================================================================

#[test]
fn test_first_chapter_folds_header_and_title_into_numbering() {
    let (_tmp, input, output) = fixture_work();
    let reports = fragment_dir(&input, &output, &FragmentConfig::default()).unwrap();

    let first = &reports[0];
    assert_eq!(first.document, "chapter_001.xhtml");
    assert_eq!(first.total, 7);
    assert_eq!(first.width, 1);
    let fields: Vec<_> = first.header_ids.iter().map(|a| a.field).collect();
    assert_eq!(
        fields,
        [HeaderField::TitleAuthor, HeaderField::Fandom, HeaderField::Summary]
    );

    let xhtml = read(&output, "chapter_001.xhtml");
    assert_eq!(ids(&xhtml), ["f1", "f2", "f3", "f4", "f5", "f6", "f7"]);
    assert!(xhtml.contains(r#"<span id="f2"><b>Fandom:</b> Harry Potter</span><br/>"#));
    assert!(xhtml.contains(r#"<div id="f4"><h3 class="fff_chapter_title">Chapter 1: Departure</h3></div>"#));
    assert!(xhtml.contains(r#"<p><span id="f5">The road was long. </span><span id="f6">He walked it anyway.</span></p>"#));
    assert!(xhtml.contains(r#"<p><span id="f7">“Why?” she asked.</span></p>"#));
}

#[test]
fn test_second_chapter_restarts_at_one() {
    let (_tmp, input, output) = fixture_work();
    let reports = fragment_dir(&input, &output, &FragmentConfig::default()).unwrap();

    let second = &reports[1];
    assert_eq!(second.total, 5);
    assert!(second.header_ids.is_empty());

    let xhtml = read(&output, "chapter_002.xhtml");
    assert_eq!(ids(&xhtml), ["f1", "f2", "f3", "f4", "f5"]);
    assert!(!xhtml.contains("meta-wrapper"));
    assert!(xhtml.contains(r#"<span id="f5">Fish &amp; chips, then sleep.</span>"#));
}

#[test]
fn test_ids_are_unique_and_contiguous_per_page() {
    let (_tmp, input, output) = fixture_work();
    let reports = fragment_dir(&input, &output, &FragmentConfig::default()).unwrap();

    for report in &reports {
        let found = ids(&read(&output, &report.document));
        let unique: HashSet<_> = found.iter().collect();
        assert_eq!(unique.len(), found.len());

        let expected: Vec<_> = (1..=report.total)
            .map(|i| format!("f{i:0width$}", width = report.width))
            .collect();
        assert_eq!(found, expected);
    }
}

// ============================================================================
// Output shape
// ============================================================================

#[test]
fn test_output_mirrors_input_names_without_title_page() {
    let (_tmp, input, output) = fixture_work();
    fragment_dir(&input, &output, &FragmentConfig::default()).unwrap();

    let mut names: Vec<_> = fs::read_dir(&output)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["chapter_001.xhtml", "chapter_002.xhtml"]);
}

#[test]
fn test_output_is_xhtml_with_rewritten_stylesheet() {
    let (_tmp, input, output) = fixture_work();
    fragment_dir(&input, &output, &FragmentConfig::default()).unwrap();

    let xhtml = read(&output, "chapter_002.xhtml");
    assert!(xhtml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert_eq!(xhtml.matches("<?xml").count(), 1);
    assert!(xhtml.contains(r#"href="../styles/style.css""#));
    assert!(!xhtml.contains("stylesheet.css"));
}

#[test]
fn test_non_paragraphs_are_dropped_by_default() {
    let (_tmp, input, output) = fixture_work();
    let reports = fragment_dir(&input, &output, &FragmentConfig::default()).unwrap();

    assert_eq!(reports[0].discarded_nodes, 1);
    assert!(!read(&output, "chapter_001.xhtml").contains("<hr/>"));
}

#[test]
fn test_keep_policy_preserves_non_paragraphs() {
    let (_tmp, input, output) = fixture_work();
    let config = FragmentConfig {
        non_paragraph: NonParagraphPolicy::Keep,
        ..FragmentConfig::default()
    };
    let reports = fragment_dir(&input, &output, &config).unwrap();

    assert_eq!(reports[0].discarded_nodes, 0);
    assert!(read(&output, "chapter_001.xhtml").contains("<hr/>"));
}

// ============================================================================
// Configuration variants
// ============================================================================

#[test]
fn test_tags_field_consumes_an_id() {
    let (_tmp, input, output) = fixture_work();
    let mut config = FragmentConfig::default();
    config.header_fields.tags = true;
    let reports = fragment_dir(&input, &output, &config).unwrap();

    assert_eq!(reports[0].total, 8);
    let xhtml = read(&output, "chapter_001.xhtml");
    assert!(xhtml.contains(r#"<div id="f3"><b>Genre:</b> Angst, Hurt/Comfort<br/>"#));
}

#[test]
fn test_notes_are_wrapped_after_paragraphs_when_enabled() {
    let (_tmp, input, output) = fixture_work();
    let config = FragmentConfig {
        wrap_notes: true,
        ..FragmentConfig::default()
    };
    let reports = fragment_dir(&input, &output, &config).unwrap();

    assert_eq!(reports[0].total, 7);
    assert_eq!(reports[0].notes_id, None);
    assert_eq!(reports[1].total, 6);
    assert_eq!(reports[1].notes_id.map(|id| id.index()), Some(6));

    let xhtml = read(&output, "chapter_002.xhtml");
    assert_eq!(ids(&xhtml), ["f1", "f2", "f3", "f4", "f5", "f6"]);
    assert!(xhtml.contains(r#"<span id="f6"><div class="fff_chapter_notes">"#));
    assert!(xhtml.contains("Thanks for reading. More soon!"));
}

#[test]
fn test_notes_left_alone_by_default() {
    let (_tmp, input, output) = fixture_work();
    let reports = fragment_dir(&input, &output, &FragmentConfig::default()).unwrap();

    assert_eq!(reports[1].notes_id, None);
    let xhtml = read(&output, "chapter_002.xhtml");
    assert!(xhtml.contains(r#"<div class="fff_chapter_notes">"#));
    assert!(!xhtml.contains(r#"id="f6""#));
}

#[test]
fn test_no_header_and_no_chapter_title() {
    let (_tmp, input, output) = fixture_work();
    let config = FragmentConfig {
        header_fields: HeaderFieldSet::NONE,
        wrap_chapter_title: false,
        ..FragmentConfig::default()
    };
    let reports = fragment_dir(&input, &output, &config).unwrap();

    assert_eq!(reports[0].total, 3);
    assert_eq!(reports[1].total, 4);
    let xhtml = read(&output, "chapter_001.xhtml");
    assert!(xhtml.contains(r#"<span id="f1">The road was long. </span>"#));
}

#[test]
fn test_single_chapter_work_skips_chapter_title() {
    let (_tmp, input, output) = fixture_work();
    fs::remove_file(input.join("chapter_002.xhtml")).unwrap();

    let reports = fragment_dir(&input, &output, &FragmentConfig::default()).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].chapter_title_id, None);
    assert_eq!(reports[0].total, 6);
}

#[test]
fn test_config_file_drives_run() {
    let (tmp, input, output) = fixture_work();
    let config_path = tmp.path().join("fragment.toml");
    fs::write(
        &config_path,
        "wrap_chapter_title = false\n\n[header_fields]\nsummary = false\n",
    )
    .unwrap();

    let config = FragmentConfig::load(&config_path).unwrap();
    let reports = fragment_dir(&input, &output, &config).unwrap();
    assert_eq!(reports[0].total, 5);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_title_page_is_an_error_when_header_enabled() {
    let (_tmp, input, output) = fixture_work();
    fs::remove_file(input.join("title_page.xhtml")).unwrap();

    let err = fragment_dir(&input, &output, &FragmentConfig::default()).unwrap_err();
    assert!(matches!(err, Error::MissingMetadataRegion { .. }));
    assert!(!output.exists());
}

#[test]
fn test_missing_content_region_writes_nothing() {
    let (_tmp, input, output) = fixture_work();
    let broken = read(&input, "chapter_002.xhtml").replace("userstuff module", "notes");
    fs::write(input.join("chapter_002.xhtml"), broken).unwrap();

    let err = fragment_dir(&input, &output, &FragmentConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::MissingContentRegion { ref document, .. } if document == "chapter_002.xhtml"
    ));
    assert!(!output.exists());
}

#[test]
fn test_missing_input_dir_is_io_error() {
    let tmp = TempDir::new().unwrap();
    let config = FragmentConfig::default();
    let err = fragment_dir(tmp.path().join("nope"), tmp.path().join("out"), &config).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn test_rerun_on_same_input_is_byte_identical() {
    let (tmp, input, output) = fixture_work();
    fragment_dir(&input, &output, &FragmentConfig::default()).unwrap();
    let second = tmp.path().join("out2");
    fragment_dir(&input, &second, &FragmentConfig::default()).unwrap();

    for name in ["chapter_001.xhtml", "chapter_002.xhtml"] {
        assert_eq!(read(&output, name), read(&second, name));
    }
}
