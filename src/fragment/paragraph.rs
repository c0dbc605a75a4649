//! Paragraph rewriting: every `<p>` in the content region becomes a run of
//! `<span id="fN">` wrappers, one per fragment of its inner markup.

use tracing::warn;

use super::ids::IdAllocator;
use super::sentence::{fragment_count, fragments};
use crate::config::NonParagraphPolicy;
use crate::dom::{ArenaDom, ArenaNodeId, parse_fragment, serialize_children};
use crate::error::Result;

/// Paragraphs of a content region with their captured inner markup.
#[derive(Debug, Clone, Default)]
pub struct ParagraphPlan {
    paragraphs: Vec<(ArenaNodeId, String)>,
    fragments: usize,
}

impl ParagraphPlan {
    /// Capture every `<p>` under `region`, in document order.
    pub fn capture(dom: &ArenaDom, region: ArenaNodeId) -> Self {
        let paragraphs: Vec<_> = dom
            .descendants(region)
            .into_iter()
            .filter(|&id| dom.is_element_named(id, "p"))
            .map(|p| (p, serialize_children(dom, p)))
            .collect();
        let fragments = paragraphs
            .iter()
            .map(|(_, content)| fragment_count(content))
            .sum();

        Self {
            paragraphs,
            fragments,
        }
    }

    /// Number of paragraphs.
    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Ids the paragraphs will consume.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }
}

/// Direct children of `region` that are neither paragraphs nor blank text.
pub fn non_paragraph_children(dom: &ArenaDom, region: ArenaNodeId) -> Vec<ArenaNodeId> {
    dom.children(region)
        .filter(|&child| {
            if dom.is_element(child) {
                !dom.is_element_named(child, "p")
            } else {
                dom.text_content(child)
                    .is_some_and(|text| !text.trim().is_empty())
            }
        })
        .collect()
}

/// Rewrite the planned paragraphs, consuming one id per fragment.
///
/// With [`NonParagraphPolicy::Discard`] the region is rebuilt from its
/// paragraphs alone: other children are dropped and nested paragraphs are
/// hoisted to the top level. Returns the number of dropped children.
pub fn rewrite_paragraphs(
    dom: &mut ArenaDom,
    region: ArenaNodeId,
    plan: &ParagraphPlan,
    ids: &mut IdAllocator,
    policy: NonParagraphPolicy,
    document: &str,
) -> Result<usize> {
    for (p, content) in &plan.paragraphs {
        dom.clear_children(*p);
        for piece in fragments(content) {
            let id = ids.next_id()?;
            let wrapper = dom.create_html_element("span", &[("id", id.to_string().as_str())]);
            dom.append(*p, wrapper);

            let (parsed, body) = parse_fragment(piece);
            dom.import_children(&parsed, body, wrapper);
        }
    }

    if policy == NonParagraphPolicy::Keep {
        return Ok(0);
    }

    let discarded = non_paragraph_children(dom, region).len();
    dom.clear_children(region);
    for (p, _) in &plan.paragraphs {
        dom.detach(*p);
        dom.append(region, *p);
    }

    if discarded > 0 {
        warn!(document, discarded, "dropped non-paragraph content from the content region");
    }
    Ok(discarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{CompiledSelector, parse_document};

    fn content_region(dom: &ArenaDom) -> ArenaNodeId {
        CompiledSelector::parse("div.userstuff")
            .unwrap()
            .select_first(dom, dom.document())
            .unwrap()
    }

    fn rewrite(html: &str, policy: NonParagraphPolicy) -> (String, usize, usize) {
        let mut dom = parse_document(html);
        let region = content_region(&dom);
        let plan = ParagraphPlan::capture(&dom, region);
        let mut ids = IdAllocator::new(plan.fragment_count());
        let discarded = rewrite_paragraphs(&mut dom, region, &plan, &mut ids, policy, "t").unwrap();
        assert_eq!(ids.remaining(), 0);
        (serialize_children(&dom, region), plan.fragment_count(), discarded)
    }

    #[test]
    fn test_each_fragment_gets_a_span() {
        let (html, count, _) = rewrite(
            r#"<div class="userstuff"><p>One. Two.</p></div>"#,
            NonParagraphPolicy::Discard,
        );
        assert_eq!(count, 2);
        assert_eq!(html, r#"<p><span id="f1">One. </span><span id="f2">Two.</span></p>"#);
    }

    #[test]
    fn test_ids_continue_across_paragraphs_with_shared_width() {
        let body: String = (0..5).map(|_| "<p>A. B.</p>").collect();
        let (html, count, _) = rewrite(
            &format!(r#"<div class="userstuff">{body}</div>"#),
            NonParagraphPolicy::Discard,
        );
        assert_eq!(count, 10);
        assert!(html.starts_with(r#"<p><span id="f01">A. </span><span id="f02">B.</span></p>"#));
        assert!(html.ends_with(r#"<span id="f10">B.</span></p>"#));
    }

    #[test]
    fn test_inline_markup_is_preserved() {
        let (html, _, _) = rewrite(
            r#"<div class="userstuff"><p>She <em>ran</em>. He <a href="x.html">stayed</a>!</p></div>"#,
            NonParagraphPolicy::Discard,
        );
        assert_eq!(
            html,
            r#"<p><span id="f1">She <em>ran</em>. </span><span id="f2">He <a href="x.html">stayed</a>!</span></p>"#
        );
    }

    #[test]
    fn test_attribute_with_period_stays_in_one_fragment() {
        let (html, count, _) = rewrite(
            r#"<div class="userstuff"><p>Go <a title="Mr. Smith" href="x">here</a> now. Fine.</p></div>"#,
            NonParagraphPolicy::Discard,
        );
        assert_eq!(count, 2);
        assert_eq!(
            html,
            r#"<p><span id="f1">Go <a title="Mr. Smith" href="x">here</a> now. </span><span id="f2">Fine.</span></p>"#
        );
    }

    #[test]
    fn test_markup_split_across_fragments_is_rebalanced() {
        let (html, _, _) = rewrite(
            r#"<div class="userstuff"><p><i>Hi. Bye.</i></p></div>"#,
            NonParagraphPolicy::Discard,
        );
        assert_eq!(
            html,
            r#"<p><span id="f1"><i>Hi. </i></span><span id="f2">Bye.</span></p>"#
        );
    }

    #[test]
    fn test_empty_paragraph_consumes_no_id() {
        let (html, count, _) = rewrite(
            r#"<div class="userstuff"><p></p><p>Only.</p></div>"#,
            NonParagraphPolicy::Discard,
        );
        assert_eq!(count, 1);
        assert_eq!(html, r#"<p></p><p><span id="f1">Only.</span></p>"#);
    }

    #[test]
    fn test_discard_drops_non_paragraphs_and_hoists_nested() {
        let (html, _, discarded) = rewrite(
            r#"<div class="userstuff">
<h2>Notes</h2>
<p>First.</p>
<blockquote><p>Quoted.</p></blockquote>
<hr/>
</div>"#,
            NonParagraphPolicy::Discard,
        );
        assert_eq!(discarded, 3);
        assert_eq!(
            html,
            r#"<p><span id="f1">First.</span></p><p><span id="f2">Quoted.</span></p>"#
        );
    }

    #[test]
    fn test_keep_leaves_non_paragraphs_in_place() {
        let (html, _, discarded) = rewrite(
            r#"<div class="userstuff"><h2>Notes</h2><p>First.</p><blockquote><p>Quoted.</p></blockquote></div>"#,
            NonParagraphPolicy::Keep,
        );
        assert_eq!(discarded, 0);
        assert_eq!(
            html,
            r#"<h2>Notes</h2><p><span id="f1">First.</span></p><blockquote><p><span id="f2">Quoted.</span></p></blockquote>"#
        );
    }

    #[test]
    fn test_entities_survive_rewrite() {
        let (html, _, _) = rewrite(
            r#"<div class="userstuff"><p>Fish &amp; chips. Salt &lt; sugar.</p></div>"#,
            NonParagraphPolicy::Discard,
        );
        assert_eq!(
            html,
            r#"<p><span id="f1">Fish &amp; chips. </span><span id="f2">Salt &lt; sugar.</span></p>"#
        );
    }
}
