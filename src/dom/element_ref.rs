//! CSS selector matching over the arena.
//!
//! Region lookup (content, metadata, chapter title) is configured with CSS
//! selectors, so the arena needs to answer `selectors` matching queries.

use std::fmt;

use html5ever::{LocalName, Namespace};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::context::{MatchingContext, SelectorCaches};
use selectors::matching::ElementSelectorFlags;
use selectors::parser::{ParseRelative, Selector, SelectorList, SelectorParseErrorKind};
use selectors::{OpaqueElement, SelectorImpl};

use super::arena::{ArenaDom, ArenaNode, ArenaNodeData, ArenaNodeId};
use crate::error::{Error, Result};

/// Selector flavour used for region lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomSelectors;

/// Ids, classes and attribute values as written in a selector.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct IdentStr(pub String);

impl precomputed_hash::PrecomputedHash for IdentStr {
    // FNV-1a; only feeds the bloom filter, which is disabled.
    fn precomputed_hash(&self) -> u32 {
        self.0
            .bytes()
            .fold(0x811c_9dc5, |h: u32, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193))
    }
}

impl AsRef<str> for IdentStr {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for IdentStr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'a> From<&'a str> for IdentStr {
    fn from(s: &'a str) -> Self {
        Self(s.to_string())
    }
}

impl cssparser::ToCss for IdentStr {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        dest.write_str(&self.0)
    }
}

/// Newtype over an html5ever atom so the selector parser can store it.
macro_rules! css_atom {
    ($(#[$meta:meta])* $name:ident($atom:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub $atom);

        impl precomputed_hash::PrecomputedHash for $name {
            fn precomputed_hash(&self) -> u32 {
                self.0.precomputed_hash()
            }
        }

        impl cssparser::ToCss for $name {
            fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
                dest.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(<$atom>::from(s))
            }
        }

        impl<'a> From<&'a str> for $name {
            fn from(s: &'a str) -> Self {
                Self(<$atom>::from(s))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

css_atom!(
    /// Element or attribute local name.
    CssLocalName(LocalName)
);
css_atom!(
    /// Namespace URL.
    CssNamespace(Namespace)
);

impl<'i> selectors::parser::Parser<'i> for DomSelectors {
    type Impl = DomSelectors;
    type Error = SelectorParseErrorKind<'i>;
}

/// Chapter pages never select pseudo-elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PseudoElement {}

impl cssparser::ToCss for PseudoElement {
    fn to_css<W: fmt::Write>(&self, _dest: &mut W) -> fmt::Result {
        match *self {}
    }
}

impl selectors::parser::PseudoElement for PseudoElement {
    type Impl = DomSelectors;

    fn accepts_state_pseudo_classes(&self) -> bool {
        false
    }

    fn valid_after_slotted(&self) -> bool {
        false
    }
}

/// Non-tree-structural pseudo-classes. Static documents only know `:link`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NonTSPseudoClass {
    Link,
}

impl selectors::parser::NonTSPseudoClass for NonTSPseudoClass {
    type Impl = DomSelectors;

    fn is_active_or_hover(&self) -> bool {
        false
    }

    fn is_user_action_state(&self) -> bool {
        false
    }
}

impl cssparser::ToCss for NonTSPseudoClass {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        match self {
            Self::Link => dest.write_str(":link"),
        }
    }
}

impl SelectorImpl for DomSelectors {
    type ExtraMatchingData<'a> = ();
    type AttrValue = IdentStr;
    type Identifier = IdentStr;
    type LocalName = CssLocalName;
    type NamespaceUrl = CssNamespace;
    type NamespacePrefix = IdentStr;
    type BorrowedLocalName = CssLocalName;
    type BorrowedNamespaceUrl = CssNamespace;
    type NonTSPseudoClass = NonTSPseudoClass;
    type PseudoElement = PseudoElement;
}

/// An arena element as seen by the selector matcher.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    pub dom: &'a ArenaDom,
    pub id: ArenaNodeId,
}

impl<'a> ElementRef<'a> {
    pub fn new(dom: &'a ArenaDom, id: ArenaNodeId) -> Self {
        Self { dom, id }
    }

    /// Nearest element sibling in the direction `step` walks.
    fn sibling_element(&self, step: impl Fn(&ArenaNode) -> ArenaNodeId) -> Option<Self> {
        let mut current = step(self.dom.get(self.id)?);
        while current.is_some() {
            if self.dom.is_element(current) {
                return Some(Self::new(self.dom, current));
            }
            current = step(self.dom.get(current)?);
        }
        None
    }

    fn is_anchor_with_href(&self) -> bool {
        self.dom.is_element_named(self.id, "a") && self.dom.get_attr(self.id, "href").is_some()
    }
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.id)
            .field("name", &self.dom.element_name(self.id))
            .finish()
    }
}

impl<'a> selectors::Element for ElementRef<'a> {
    type Impl = DomSelectors;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self)
    }

    fn parent_element(&self) -> Option<Self> {
        let parent = self.dom.parent(self.id)?;
        self.dom
            .is_element(parent)
            .then(|| Self::new(self.dom, parent))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.sibling_element(|node| node.prev_sibling)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.sibling_element(|node| node.next_sibling)
    }

    fn first_element_child(&self) -> Option<Self> {
        self.dom
            .children(self.id)
            .find(|&child| self.dom.is_element(child))
            .map(|child| Self::new(self.dom, child))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &CssLocalName) -> bool {
        self.dom
            .element_name(self.id)
            .is_some_and(|n| n == &name.0)
    }

    fn has_namespace(&self, ns: &CssNamespace) -> bool {
        self.dom
            .element_namespace(self.id)
            .is_some_and(|n| n == &ns.0)
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.dom.element_name(self.id) == other.dom.element_name(other.id)
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&CssNamespace>,
        local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&IdentStr>,
    ) -> bool {
        let Some(element) = self.dom.element(self.id) else {
            return false;
        };

        element
            .attrs()
            .iter()
            .filter(|attr| match ns {
                NamespaceConstraint::Any => true,
                NamespaceConstraint::Specific(ns) => attr.name.ns == ns.0,
            })
            .find(|attr| attr.name.local == local_name.0)
            .is_some_and(|attr| operation.eval_str(&attr.value))
    }

    fn match_non_ts_pseudo_class(
        &self,
        pc: &NonTSPseudoClass,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        match pc {
            NonTSPseudoClass::Link => self.is_anchor_with_href(),
        }
    }

    fn match_pseudo_element(
        &self,
        _pe: &PseudoElement,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        false
    }

    fn is_link(&self) -> bool {
        self.is_anchor_with_href()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &IdentStr, case_sensitivity: CaseSensitivity) -> bool {
        self.dom
            .element_id(self.id)
            .is_some_and(|elem_id| case_sensitivity.eq(elem_id.as_bytes(), id.0.as_bytes()))
    }

    fn has_class(&self, name: &IdentStr, case_sensitivity: CaseSensitivity) -> bool {
        self.dom
            .element_classes(self.id)
            .iter()
            .any(|c| case_sensitivity.eq(c.as_bytes(), name.0.as_bytes()))
    }

    fn imported_part(&self, _name: &IdentStr) -> Option<IdentStr> {
        None
    }

    fn is_part(&self, _name: &IdentStr) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.dom.children(self.id).all(|child| match self.dom.get(child) {
            Some(node) => match &node.data {
                ArenaNodeData::Element(_) => false,
                ArenaNodeData::Text(t) => t.trim().is_empty(),
                _ => true,
            },
            None => true,
        })
    }

    fn is_root(&self) -> bool {
        self.dom
            .parent(self.id)
            .and_then(|parent| self.dom.get(parent))
            .is_some_and(|parent| matches!(parent.data, ArenaNodeData::Document))
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn add_element_unique_hashes(&self, _filter: &mut selectors::bloom::BloomFilter) -> bool {
        false
    }

    fn has_custom_state(&self, _name: &IdentStr) -> bool {
        false
    }
}

/// A parsed, comma-separated selector list such as `div.userstuff.module`.
#[derive(Clone)]
pub struct CompiledSelector {
    source: String,
    selectors: Vec<Selector<DomSelectors>>,
}

impl fmt::Debug for CompiledSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledSelector").field(&self.source).finish()
    }
}

impl CompiledSelector {
    /// Parse a selector list, rejecting anything `selectors` cannot parse.
    pub fn parse(source: &str) -> Result<Self> {
        let mut input = cssparser::ParserInput::new(source);
        let mut parser = cssparser::Parser::new(&mut input);
        let list = SelectorList::parse(&DomSelectors, &mut parser, ParseRelative::No)
            .map_err(|e| Error::InvalidSelector {
                selector: source.to_string(),
                reason: format!("{:?}", e.kind),
            })?;

        Ok(Self {
            source: source.to_string(),
            selectors: list.slice().to_vec(),
        })
    }

    /// The selector text this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check whether an element matches any selector in the list.
    pub fn matches(&self, dom: &ArenaDom, id: ArenaNodeId) -> bool {
        if !dom.is_element(id) {
            return false;
        }
        let elem = ElementRef::new(dom, id);
        let mut caches = SelectorCaches::default();
        let mut context = MatchingContext::new(
            selectors::matching::MatchingMode::Normal,
            None,
            &mut caches,
            selectors::context::QuirksMode::NoQuirks,
            selectors::matching::NeedsSelectorFlags::No,
            selectors::matching::MatchingForInvalidation::No,
        );

        self.selectors.iter().any(|selector| {
            selectors::matching::matches_selector(selector, 0, None, &elem, &mut context)
        })
    }

    /// First matching descendant of `root` in document order.
    pub fn select_first(&self, dom: &ArenaDom, root: ArenaNodeId) -> Option<ArenaNodeId> {
        dom.descendants(root)
            .into_iter()
            .find(|&id| self.matches(dom, id))
    }
}
