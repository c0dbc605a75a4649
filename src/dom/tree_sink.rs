//! Building an [`ArenaDom`] from html5ever parse events.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};

use html5ever::tendril::StrTendril;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute as Html5Attribute, QualName};
use tracing::trace;

use super::arena::{ArenaDom, ArenaNodeData, ArenaNodeId, Attribute};

fn convert_attrs(attrs: Vec<Html5Attribute>) -> Vec<Attribute> {
    attrs
        .into_iter()
        .map(|a| Attribute {
            name: a.name,
            value: a.value.to_string(),
        })
        .collect()
}

/// A detached node for `child`, ready to be linked in.
fn take_node(dom: &mut ArenaDom, child: NodeOrText<ArenaNodeId>) -> ArenaNodeId {
    match child {
        NodeOrText::AppendNode(node) => {
            dom.detach(node);
            node
        }
        NodeOrText::AppendText(text) => dom.create_text(text.to_string()),
    }
}

/// Tree builder target that writes straight into an arena.
///
/// html5ever drives the sink through `&self`, so the arena sits behind a
/// `RefCell`. Node handles are plain arena ids.
pub struct ArenaSink {
    dom: RefCell<ArenaDom>,
    quirks_mode: Cell<QuirksMode>,
    parse_errors: Cell<usize>,
}

impl Default for ArenaSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ArenaSink {
    pub fn new() -> Self {
        Self {
            dom: RefCell::new(ArenaDom::new()),
            quirks_mode: Cell::new(QuirksMode::NoQuirks),
            parse_errors: Cell::new(0),
        }
    }

    /// Number of recoverable parse errors seen so far.
    pub fn parse_errors(&self) -> usize {
        self.parse_errors.get()
    }

    /// Quirks mode selected by the document's doctype.
    pub fn quirks_mode(&self) -> QuirksMode {
        self.quirks_mode.get()
    }

    /// Consume the sink and return the DOM.
    pub fn into_dom(self) -> ArenaDom {
        self.dom.into_inner()
    }

    fn with_dom<R>(&self, f: impl FnOnce(&mut ArenaDom) -> R) -> R {
        f(&mut self.dom.borrow_mut())
    }
}

impl TreeSink for ArenaSink {
    type Handle = ArenaNodeId;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.parse_errors.set(self.parse_errors.get() + 1);
        trace!(%msg, "html parse error");
    }

    fn get_document(&self) -> ArenaNodeId {
        self.dom.borrow().document()
    }

    fn elem_name<'a>(&'a self, target: &'a ArenaNodeId) -> &'a QualName {
        static NO_NAME: QualName = QualName {
            prefix: None,
            ns: html5ever::ns!(),
            local: html5ever::local_name!(""),
        };

        let dom = self.dom.borrow();
        let Some(element) = dom.element(*target) else {
            return &NO_NAME;
        };
        // SAFETY: html5ever only compares or copies the returned name before
        // it calls back into the sink, and element names are never rewritten.
        // No node is pushed while the reference is live, so the arena vector
        // does not reallocate under it. Only the RefCell guard ties it to a
        // shorter lifetime.
        unsafe { std::mem::transmute::<&QualName, &'a QualName>(&element.name) }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Html5Attribute>,
        _flags: ElementFlags,
    ) -> ArenaNodeId {
        let attrs = convert_attrs(attrs);
        self.with_dom(|dom| dom.create_element(name, attrs))
    }

    fn create_comment(&self, text: StrTendril) -> ArenaNodeId {
        self.with_dom(|dom| dom.create_comment(text.to_string()))
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> ArenaNodeId {
        // Dropped by the serializer.
        self.with_dom(|dom| dom.create_comment(String::new()))
    }

    fn append(&self, parent: &ArenaNodeId, child: NodeOrText<ArenaNodeId>) {
        self.with_dom(|dom| match child {
            NodeOrText::AppendNode(node) => dom.append(*parent, node),
            NodeOrText::AppendText(text) => dom.append_text(*parent, &text),
        });
    }

    fn append_based_on_parent_node(
        &self,
        element: &ArenaNodeId,
        prev_element: &ArenaNodeId,
        child: NodeOrText<ArenaNodeId>,
    ) {
        if self.dom.borrow().parent(*element).is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        self.with_dom(|dom| {
            let doctype = dom.create_doctype(
                name.to_string(),
                public_id.to_string(),
                system_id.to_string(),
            );
            let document = dom.document();
            dom.append(document, doctype);
        });
    }

    fn get_template_contents(&self, target: &ArenaNodeId) -> ArenaNodeId {
        *target
    }

    fn same_node(&self, x: &ArenaNodeId, y: &ArenaNodeId) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        self.quirks_mode.set(mode);
    }

    fn append_before_sibling(&self, sibling: &ArenaNodeId, new_node: NodeOrText<ArenaNodeId>) {
        self.with_dom(|dom| {
            let node = take_node(dom, new_node);
            dom.insert_before(*sibling, node);
        });
    }

    fn add_attrs_if_missing(&self, target: &ArenaNodeId, attrs: Vec<Html5Attribute>) {
        self.with_dom(|dom| {
            for attr in convert_attrs(attrs) {
                let local = attr.name.local.to_string();
                if dom.get_attr(*target, &local).is_none() {
                    dom.set_attr(*target, &local, &attr.value);
                }
            }
        });
    }

    fn remove_from_parent(&self, target: &ArenaNodeId) {
        self.with_dom(|dom| dom.detach(*target));
    }

    fn reparent_children(&self, node: &ArenaNodeId, new_parent: &ArenaNodeId) {
        self.with_dom(|dom| {
            for child in dom.clear_children(*node) {
                dom.append(*new_parent, child);
            }
        });
    }
}
