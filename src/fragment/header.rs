//! Header fields of a merged title page.
//!
//! Each field is described by a [`HeaderRule`]: how to find its span inside
//! the metadata region, what element to wrap it in, and an optional display
//! label. Spans are found by walking the parsed tree; text patterns are only
//! used to recognise the `<b>Label:</b>` markers that delimit fields.
//!
//! Locating is side-effect free and happens during the counting pass, so the
//! ids a page reserves for its header always equal the number of fields that
//! are actually wrapped.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ids::{FragmentId, IdAllocator};
use crate::config::HeaderFieldSet;
use crate::dom::{ArenaDom, ArenaNodeId};
use crate::error::Result;

/// The fixed set of header fields, in wrapping order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderField {
    TitleAuthor,
    Fandom,
    Tags,
    Summary,
}

impl HeaderField {
    pub const ALL: [HeaderField; 4] = [
        HeaderField::TitleAuthor,
        HeaderField::Fandom,
        HeaderField::Tags,
        HeaderField::Summary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HeaderField::TitleAuthor => "title-author",
            HeaderField::Fandom => "fandom",
            HeaderField::Tags => "tags",
            HeaderField::Summary => "summary",
        }
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a labelled field stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanEnd {
    /// Before the next `<br>` (or the next label, whichever comes first).
    NextBreak,
    /// Before the sibling label with this name.
    NextLabel(&'static str),
    /// At the end of the enclosing block.
    EndOfBlock,
}

/// How a field's span is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanMatcher {
    /// The first `h1`..`h6` element in the region.
    FirstHeading,
    /// A run of siblings starting at a `<b>Label:</b>` marker.
    Labelled { label: &'static str, end: SpanEnd },
}

/// One entry of the header rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRule {
    pub field: HeaderField,
    pub matcher: SpanMatcher,
    /// Tag of the element carrying the field's id.
    pub wrapper: &'static str,
    /// Label text to display instead of the matched one.
    pub relabel: Option<&'static str>,
}

/// Header rules, one per [`HeaderField`], in wrapping order.
pub const HEADER_RULES: &[HeaderRule] = &[
    HeaderRule {
        field: HeaderField::TitleAuthor,
        matcher: SpanMatcher::FirstHeading,
        wrapper: "div",
        relabel: None,
    },
    HeaderRule {
        field: HeaderField::Fandom,
        matcher: SpanMatcher::Labelled {
            label: "Category",
            end: SpanEnd::NextBreak,
        },
        wrapper: "span",
        relabel: Some("Fandom"),
    },
    HeaderRule {
        field: HeaderField::Tags,
        matcher: SpanMatcher::Labelled {
            label: "Genre",
            end: SpanEnd::NextLabel("Summary"),
        },
        wrapper: "div",
        relabel: None,
    },
    HeaderRule {
        field: HeaderField::Summary,
        matcher: SpanMatcher::Labelled {
            label: "Summary",
            end: SpanEnd::EndOfBlock,
        },
        wrapper: "div",
        relabel: None,
    },
];

/// The rule for a field.
pub fn rule_for(field: HeaderField) -> &'static HeaderRule {
    let index = match field {
        HeaderField::TitleAuthor => 0,
        HeaderField::Fandom => 1,
        HeaderField::Tags => 2,
        HeaderField::Summary => 3,
    };
    &HEADER_RULES[index]
}

/// A located field: the sibling run `first..=last`, plus its label marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSpan {
    pub first: ArenaNodeId,
    pub last: ArenaNodeId,
    pub label: Option<ArenaNodeId>,
}

impl HeaderSpan {
    /// The top-level nodes of the run, in order.
    fn nodes(&self, dom: &ArenaDom) -> Vec<ArenaNodeId> {
        let mut nodes = vec![self.first];
        let mut current = self.first;
        while current != self.last {
            match dom.next_sibling(current) {
                Some(next) => {
                    nodes.push(next);
                    current = next;
                }
                None => break,
            }
        }
        nodes
    }
}

/// A field assigned an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderAssignment {
    pub field: HeaderField,
    pub id: FragmentId,
}

/// Fields found in a metadata region, ready to be wrapped.
#[derive(Debug, Clone, Default)]
pub struct HeaderPlan {
    pub spans: Vec<(&'static HeaderRule, HeaderSpan)>,
    /// Enabled fields whose pattern did not match.
    pub skipped: Vec<HeaderField>,
}

impl HeaderPlan {
    /// Ids this plan will consume.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

fn label_name(text: &str) -> Option<&str> {
    static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\s*(\p{L}[\p{L} ]*?)\s*:\s*$").expect("valid regex")
    });
    LABEL_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// The label name if `id` is a `<b>Label:</b>` / `<strong>Label:</strong>` marker.
fn label_of(dom: &ArenaDom, id: ArenaNodeId) -> Option<String> {
    if !(dom.is_element_named(id, "b") || dom.is_element_named(id, "strong")) {
        return None;
    }
    label_name(&dom.text_of(id)).map(str::to_string)
}

fn is_label(dom: &ArenaDom, id: ArenaNodeId, name: &str) -> bool {
    label_of(dom, id).is_some_and(|l| l.eq_ignore_ascii_case(name))
}

fn is_heading(dom: &ArenaDom, id: ArenaNodeId) -> bool {
    dom.element_name(id).is_some_and(|name| {
        matches!(name.as_ref(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
    })
}

/// Find a rule's span inside `region`, without modifying anything.
pub fn locate(dom: &ArenaDom, region: ArenaNodeId, rule: &HeaderRule) -> Option<HeaderSpan> {
    match rule.matcher {
        SpanMatcher::FirstHeading => {
            let heading = dom
                .descendants(region)
                .into_iter()
                .find(|&id| is_heading(dom, id))?;
            Some(HeaderSpan {
                first: heading,
                last: heading,
                label: None,
            })
        }
        SpanMatcher::Labelled { label, end } => {
            let marker = dom
                .descendants(region)
                .into_iter()
                .find(|&id| is_label(dom, id, label))?;
            let last = span_end(dom, marker, end)?;
            Some(HeaderSpan {
                first: marker,
                last,
                label: Some(marker),
            })
        }
    }
}

/// Last node of a labelled span that starts at `marker`.
fn span_end(dom: &ArenaDom, marker: ArenaNodeId, end: SpanEnd) -> Option<ArenaNodeId> {
    let mut last = marker;
    let mut current = dom.next_sibling(marker);

    while let Some(id) = current {
        let stop = match end {
            SpanEnd::NextBreak => dom.is_element_named(id, "br") || label_of(dom, id).is_some(),
            SpanEnd::NextLabel(name) => is_label(dom, id, name),
            SpanEnd::EndOfBlock => false,
        };
        if stop {
            return Some(last);
        }
        last = id;
        current = dom.next_sibling(id);
    }

    // Running off the end only satisfies a field that ends with its block.
    (end == SpanEnd::EndOfBlock).then_some(last)
}

/// Locate every enabled field, in rule order.
///
/// Fields whose pattern does not match, or whose span would overlap a field
/// already claimed, are logged and recorded as skipped.
pub fn plan_header(
    dom: &ArenaDom,
    region: ArenaNodeId,
    fields: &HeaderFieldSet,
    document: &str,
) -> HeaderPlan {
    let mut plan = HeaderPlan::default();
    let mut claimed: HashSet<ArenaNodeId> = HashSet::new();

    for field in fields.enabled() {
        let rule = rule_for(field);
        let Some(span) = locate(dom, region, rule) else {
            warn!(document, field = %field, "header field pattern not found; skipping");
            plan.skipped.push(field);
            continue;
        };

        let nodes = span.nodes(dom);
        let overlaps = nodes.iter().any(|&node| {
            claimed.contains(&node)
                || claimed
                    .iter()
                    .any(|&c| dom.is_descendant_of(node, c) || dom.is_descendant_of(c, node))
        });
        if overlaps {
            warn!(document, field = %field, "header field overlaps an earlier field; skipping");
            plan.skipped.push(field);
            continue;
        }

        claimed.extend(nodes);
        plan.spans.push((rule, span));
    }

    plan
}

/// Wrap each planned field in its rule's element, consuming one id per field.
pub fn rewrite_header(
    dom: &mut ArenaDom,
    plan: &HeaderPlan,
    ids: &mut IdAllocator,
    relabel: bool,
) -> Result<Vec<HeaderAssignment>> {
    let mut assigned = Vec::with_capacity(plan.len());

    for (rule, span) in &plan.spans {
        let id = ids.next_id()?;

        if relabel
            && let (Some(display), Some(marker)) = (rule.relabel, span.label)
        {
            dom.set_text(marker, &format!("{display}:"));
        }

        let wrapper = dom.create_html_element(rule.wrapper, &[("id", id.to_string().as_str())]);
        dom.wrap_range(span.first, span.last, wrapper);

        assigned.push(HeaderAssignment {
            field: rule.field,
            id,
        });
    }

    Ok(assigned)
}
