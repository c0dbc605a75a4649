//! Arena-based DOM for XHTML chapters.
//!
//! html5ever parses into this arena; the fragment rewriters then mutate it in
//! place (detach, wrap, re-parent) before it is serialized back out. Node ids
//! stay valid for the lifetime of the arena, including after a node has been
//! detached, so passes can plan against ids and apply their edits later.

use html5ever::{LocalName, Namespace, QualName, ns};

/// Index of a node in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaNodeId(pub u32);

impl ArenaNodeId {
    /// Link value meaning "no node".
    pub const NONE: ArenaNodeId = ArenaNodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        *self != Self::NONE
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    fn get(self) -> Option<Self> {
        self.is_some().then_some(self)
    }
}

/// Element attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    /// Attribute in the null namespace, which is where every plain XHTML
    /// attribute lives after an HTML parse.
    pub fn new(local: &str, value: impl Into<String>) -> Self {
        Self {
            name: QualName::new(None, ns!(), LocalName::from(local)),
            value: value.into(),
        }
    }
}

/// An element's name and attributes.
///
/// The `id` and `class` attributes are mirrored into dedicated fields so
/// selector matching does not rescan the attribute list.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub name: QualName,
    attrs: Vec<Attribute>,
    id: Option<String>,
    classes: Vec<String>,
}

impl ElementData {
    pub fn new(name: QualName, attrs: Vec<Attribute>) -> Self {
        let mut element = Self {
            name,
            attrs: Vec::with_capacity(attrs.len()),
            id: None,
            classes: Vec::new(),
        };
        for attr in attrs {
            element.mirror(&attr.name.local, &attr.value);
            element.attrs.push(attr);
        }
        element
    }

    fn mirror(&mut self, local: &str, value: &str) {
        match local {
            "id" => self.id = Some(value.to_string()),
            "class" => self.classes = value.split_whitespace().map(str::to_string).collect(),
            _ => {}
        }
    }

    pub fn local_name(&self) -> &LocalName {
        &self.name.local
    }

    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Value of the attribute with this local name.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.local.as_ref() == local)
            .map(|a| a.value.as_str())
    }

    /// Overwrite an attribute in place, or append it.
    pub fn set_attr(&mut self, local: &str, value: &str) {
        match self.attrs.iter_mut().find(|a| a.name.local.as_ref() == local) {
            Some(attr) => attr.value = value.to_string(),
            None => self.attrs.push(Attribute::new(local, value)),
        }
        self.mirror(local, value);
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// What a node holds.
#[derive(Debug, Clone)]
pub enum ArenaNodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

/// A node and its tree links. Unset links are [`ArenaNodeId::NONE`].
#[derive(Debug)]
pub struct ArenaNode {
    pub data: ArenaNodeData,
    pub parent: ArenaNodeId,
    pub first_child: ArenaNodeId,
    pub last_child: ArenaNodeId,
    pub prev_sibling: ArenaNodeId,
    pub next_sibling: ArenaNodeId,
}

impl ArenaNode {
    fn detached(data: ArenaNodeData) -> Self {
        Self {
            data,
            parent: ArenaNodeId::NONE,
            first_child: ArenaNodeId::NONE,
            last_child: ArenaNodeId::NONE,
            prev_sibling: ArenaNodeId::NONE,
            next_sibling: ArenaNodeId::NONE,
        }
    }

    pub fn element(&self) -> Option<&ElementData> {
        match &self.data {
            ArenaNodeData::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// A document tree stored in one vector, linked by index.
///
/// Nodes are never freed: detaching only unlinks, so ids held by a caller
/// keep pointing at the same node.
pub struct ArenaDom {
    nodes: Vec<ArenaNode>,
    document: ArenaNodeId,
}

impl ArenaDom {
    /// An arena holding only a document root.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            document: ArenaNodeId::NONE,
        };
        dom.document = dom.push(ArenaNodeData::Document);
        dom
    }

    fn push(&mut self, data: ArenaNodeData) -> ArenaNodeId {
        let id = ArenaNodeId(self.nodes.len() as u32);
        self.nodes.push(ArenaNode::detached(data));
        id
    }

    pub fn document(&self) -> ArenaNodeId {
        self.document
    }

    pub fn get(&self, id: ArenaNodeId) -> Option<&ArenaNode> {
        self.nodes.get(id.get()?.0 as usize)
    }

    pub fn get_mut(&mut self, id: ArenaNodeId) -> Option<&mut ArenaNode> {
        self.nodes.get_mut(id.get()?.0 as usize)
    }

    /// Number of nodes ever allocated, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing but the document root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // ------------------------------------------------------------------
    // Node creation. New nodes start detached.
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> ArenaNodeId {
        self.push(ArenaNodeData::Element(ElementData::new(name, attrs)))
    }

    /// An XHTML-namespaced element.
    pub fn create_html_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> ArenaNodeId {
        let name = QualName::new(None, ns!(html), LocalName::from(tag));
        let attrs = attrs
            .iter()
            .map(|(local, value)| Attribute::new(local, *value))
            .collect();
        self.create_element(name, attrs)
    }

    pub fn create_text(&mut self, text: String) -> ArenaNodeId {
        self.push(ArenaNodeData::Text(text))
    }

    pub fn create_comment(&mut self, text: String) -> ArenaNodeId {
        self.push(ArenaNodeData::Comment(text))
    }

    pub fn create_doctype(
        &mut self,
        name: String,
        public_id: String,
        system_id: String,
    ) -> ArenaNodeId {
        self.push(ArenaNodeData::Doctype {
            name,
            public_id,
            system_id,
        })
    }

    // ------------------------------------------------------------------
    // Linking
    // ------------------------------------------------------------------

    /// Link a detached node between `prev` and `next` under `parent`.
    fn link(
        &mut self,
        node: ArenaNodeId,
        parent: ArenaNodeId,
        prev: ArenaNodeId,
        next: ArenaNodeId,
    ) {
        if let Some(n) = self.get_mut(node) {
            n.parent = parent;
            n.prev_sibling = prev;
            n.next_sibling = next;
        }

        match self.get_mut(prev) {
            Some(p) => p.next_sibling = node,
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first_child = node;
                }
            }
        }
        match self.get_mut(next) {
            Some(n) => n.prev_sibling = node,
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last_child = node;
                }
            }
        }
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append(&mut self, parent: ArenaNodeId, child: ArenaNodeId) {
        let Some(last) = self.get(parent).map(|p| p.last_child) else {
            return;
        };
        self.link(child, parent, last, ArenaNodeId::NONE);
    }

    /// Insert a detached node immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: ArenaNodeId, new_node: ArenaNodeId) {
        let Some((parent, prev)) = self.get(sibling).map(|s| (s.parent, s.prev_sibling)) else {
            return;
        };
        self.link(new_node, parent, prev, sibling);
    }

    /// Append text, extending the last child when it is already text.
    pub fn append_text(&mut self, parent: ArenaNodeId, text: &str) {
        let last = self.get(parent).map_or(ArenaNodeId::NONE, |p| p.last_child);
        if let Some(ArenaNode {
            data: ArenaNodeData::Text(existing),
            ..
        }) = self.get_mut(last)
        {
            existing.push_str(text);
            return;
        }

        let node = self.create_text(text.to_string());
        self.append(parent, node);
    }

    /// Unlink a node from its parent and siblings. Its own subtree is kept.
    pub fn detach(&mut self, target: ArenaNodeId) {
        let Some((parent, prev, next)) = self
            .get(target)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };

        match self.get_mut(prev) {
            Some(p) => p.next_sibling = next,
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first_child = next;
                }
            }
        }
        match self.get_mut(next) {
            Some(n) => n.prev_sibling = prev,
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last_child = prev;
                }
            }
        }

        if let Some(node) = self.get_mut(target) {
            node.parent = ArenaNodeId::NONE;
            node.prev_sibling = ArenaNodeId::NONE;
            node.next_sibling = ArenaNodeId::NONE;
        }
    }

    /// Detach every child of `parent`, returning them in their former order.
    pub fn clear_children(&mut self, parent: ArenaNodeId) -> Vec<ArenaNodeId> {
        let children: Vec<_> = self.children(parent).collect();
        for &child in &children {
            self.detach(child);
        }
        children
    }

    /// Move the sibling run `first..=last` into `wrapper`, which takes the
    /// run's place in the tree.
    ///
    /// `last` must be `first` or one of its following siblings; if it is not,
    /// the run extends to the end of the parent's children.
    pub fn wrap_range(&mut self, first: ArenaNodeId, last: ArenaNodeId, wrapper: ArenaNodeId) {
        let mut run = vec![first];
        let mut current = first;
        while current != last
            && let Some(next) = self.next_sibling(current)
        {
            run.push(next);
            current = next;
        }

        self.insert_before(first, wrapper);
        for node in run {
            self.detach(node);
            self.append(wrapper, node);
        }
    }

    /// Deep-copy `node` out of another arena. The copy is detached.
    pub fn import(&mut self, src: &ArenaDom, node: ArenaNodeId) -> ArenaNodeId {
        let Some(source) = src.get(node) else {
            return ArenaNodeId::NONE;
        };

        let copy = match &source.data {
            ArenaNodeData::Element(element) => {
                self.create_element(element.name.clone(), element.attrs.clone())
            }
            other => self.push(other.clone()),
        };
        self.import_children(src, node, copy);
        copy
    }

    /// Deep-copy the children of `src_parent` onto the end of `dest_parent`.
    pub fn import_children(
        &mut self,
        src: &ArenaDom,
        src_parent: ArenaNodeId,
        dest_parent: ArenaNodeId,
    ) {
        for child in src.children(src_parent) {
            let copy = self.import(src, child);
            self.append(dest_parent, copy);
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn children(&self, parent: ArenaNodeId) -> ChildrenIter<'_> {
        ChildrenIter {
            dom: self,
            next: self.get(parent).map_or(ArenaNodeId::NONE, |p| p.first_child),
        }
    }

    pub fn parent(&self, id: ArenaNodeId) -> Option<ArenaNodeId> {
        self.get(id)?.parent.get()
    }

    pub fn next_sibling(&self, id: ArenaNodeId) -> Option<ArenaNodeId> {
        self.get(id)?.next_sibling.get()
    }

    fn first_child(&self, id: ArenaNodeId) -> Option<ArenaNodeId> {
        self.get(id)?.first_child.get()
    }

    /// All descendants of `root` in document order, excluding `root` itself.
    pub fn descendants(&self, root: ArenaNodeId) -> Vec<ArenaNodeId> {
        let mut out = Vec::new();
        let mut current = self.first_child(root);
        while let Some(id) = current {
            out.push(id);
            current = self
                .first_child(id)
                .or_else(|| self.next_outside(id, root));
        }
        out
    }

    /// The node after `id`'s subtree in document order, staying within `root`.
    fn next_outside(&self, mut id: ArenaNodeId, root: ArenaNodeId) -> Option<ArenaNodeId> {
        while id != root {
            if let Some(next) = self.next_sibling(id) {
                return Some(next);
            }
            id = self.parent(id)?;
        }
        None
    }

    /// Whether `node` lies inside the subtree rooted at `ancestor`.
    pub fn is_descendant_of(&self, node: ArenaNodeId, ancestor: ArenaNodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// First node under the document, in document order, matching `predicate`.
    pub fn find<F>(&self, predicate: F) -> Option<ArenaNodeId>
    where
        F: Fn(&ArenaNode) -> bool,
    {
        self.descendants(self.document)
            .into_iter()
            .find(|&id| self.get(id).is_some_and(&predicate))
    }

    /// First element with this tag name.
    pub fn find_by_tag(&self, tag: &str) -> Option<ArenaNodeId> {
        self.find(|node| node.element().is_some_and(|e| e.local_name().as_ref() == tag))
    }

    // ------------------------------------------------------------------
    // Element and text accessors
    // ------------------------------------------------------------------

    pub fn element(&self, id: ArenaNodeId) -> Option<&ElementData> {
        self.get(id)?.element()
    }

    pub fn element_name(&self, id: ArenaNodeId) -> Option<&LocalName> {
        self.element(id).map(ElementData::local_name)
    }

    pub fn element_namespace(&self, id: ArenaNodeId) -> Option<&Namespace> {
        self.element(id).map(|e| &e.name.ns)
    }

    pub fn is_element(&self, id: ArenaNodeId) -> bool {
        self.element(id).is_some()
    }

    /// Whether `id` is an element with this local name.
    pub fn is_element_named(&self, id: ArenaNodeId, tag: &str) -> bool {
        self.element_name(id).is_some_and(|name| name.as_ref() == tag)
    }

    pub fn get_attr(&self, id: ArenaNodeId, attr_name: &str) -> Option<&str> {
        self.element(id)?.attr(attr_name)
    }

    /// Set (or add) an attribute. Non-elements are left alone.
    pub fn set_attr(&mut self, id: ArenaNodeId, attr_name: &str, value: &str) {
        if let Some(ArenaNode {
            data: ArenaNodeData::Element(element),
            ..
        }) = self.get_mut(id)
        {
            element.set_attr(attr_name, value);
        }
    }

    pub fn element_id(&self, id: ArenaNodeId) -> Option<&str> {
        self.element(id)?.id()
    }

    pub fn element_classes(&self, id: ArenaNodeId) -> &[String] {
        self.element(id).map(ElementData::classes).unwrap_or_default()
    }

    pub fn is_text(&self, id: ArenaNodeId) -> bool {
        self.text_content(id).is_some()
    }

    /// The string of a text node.
    pub fn text_content(&self, id: ArenaNodeId) -> Option<&str> {
        match &self.get(id)?.data {
            ArenaNodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Concatenated text of a node and all its descendants.
    pub fn text_of(&self, id: ArenaNodeId) -> String {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter_map(|node| self.text_content(node))
            .collect()
    }

    /// Replace a node's children with a single text node.
    pub fn set_text(&mut self, id: ArenaNodeId, text: &str) {
        self.clear_children(id);
        let node = self.create_text(text.to_string());
        self.append(id, node);
    }
}

impl Default for ArenaDom {
    fn default() -> Self {
        Self::new()
    }
}

/// Children of one node, first to last.
pub struct ChildrenIter<'a> {
    dom: &'a ArenaDom,
    next: ArenaNodeId,
}

impl Iterator for ChildrenIter<'_> {
    type Item = ArenaNodeId;

    fn next(&mut self) -> Option<ArenaNodeId> {
        let current = self.next.get()?;
        self.next = self
            .dom
            .get(current)
            .map_or(ArenaNodeId::NONE, |n| n.next_sibling);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `div > [a, b, i, u]`, attached to the document.
    fn row() -> (ArenaDom, ArenaNodeId, Vec<ArenaNodeId>) {
        let mut dom = ArenaDom::new();
        let parent = dom.create_html_element("div", &[]);
        dom.append(dom.document(), parent);
        let nodes: Vec<_> = ["a", "b", "i", "u"]
            .iter()
            .map(|tag| dom.create_html_element(tag, &[]))
            .collect();
        for &n in &nodes {
            dom.append(parent, n);
        }
        (dom, parent, nodes)
    }

    #[test]
    fn test_element_mirrors_id_and_class() {
        let mut dom = ArenaDom::new();
        let div = dom.create_html_element("div", &[("id", "main"), ("class", "userstuff  module")]);

        assert_eq!(dom.element_name(div).map(|n| n.as_ref()), Some("div"));
        assert_eq!(dom.element_id(div), Some("main"));
        assert_eq!(dom.element_classes(div), ["userstuff", "module"]);
        assert!(!dom.is_empty());
    }

    #[test]
    fn test_append_text_extends_trailing_text() {
        let mut dom = ArenaDom::new();
        let p = dom.create_html_element("p", &[]);
        dom.append_text(p, "Hello, ");
        dom.append_text(p, "World!");

        let children: Vec<_> = dom.children(p).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(dom.text_content(children[0]), Some("Hello, World!"));
    }

    #[test]
    fn test_detach_middle_and_ends() {
        let (mut dom, parent, n) = row();

        dom.detach(n[1]);
        assert_eq!(dom.children(parent).collect::<Vec<_>>(), [n[0], n[2], n[3]]);
        assert_eq!(dom.parent(n[1]), None);
        assert_eq!(dom.next_sibling(n[0]), Some(n[2]));

        dom.detach(n[0]);
        dom.detach(n[3]);
        assert_eq!(dom.children(parent).collect::<Vec<_>>(), [n[2]]);
    }

    #[test]
    fn test_insert_before_first_child() {
        let (mut dom, parent, n) = row();
        let hr = dom.create_html_element("hr", &[]);
        dom.insert_before(n[0], hr);

        assert_eq!(dom.children(parent).next(), Some(hr));
        assert_eq!(dom.next_sibling(hr), Some(n[0]));
    }

    #[test]
    fn test_clear_children_returns_old_order() {
        let (mut dom, parent, n) = row();
        assert_eq!(dom.clear_children(parent), n);
        assert_eq!(dom.children(parent).count(), 0);

        // Cleared nodes can be re-appended.
        dom.append(parent, n[2]);
        assert_eq!(dom.children(parent).collect::<Vec<_>>(), [n[2]]);
    }

    #[test]
    fn test_wrap_range_moves_run_into_wrapper() {
        let (mut dom, parent, n) = row();
        let wrapper = dom.create_html_element("span", &[("id", "w")]);
        dom.wrap_range(n[1], n[2], wrapper);

        assert_eq!(dom.children(parent).collect::<Vec<_>>(), [n[0], wrapper, n[3]]);
        assert_eq!(dom.children(wrapper).collect::<Vec<_>>(), [n[1], n[2]]);
    }

    #[test]
    fn test_wrap_range_single_node() {
        let (mut dom, parent, n) = row();
        let wrapper = dom.create_html_element("div", &[]);
        dom.wrap_range(n[3], n[3], wrapper);

        assert_eq!(dom.children(parent).last(), Some(wrapper));
        assert_eq!(dom.children(wrapper).collect::<Vec<_>>(), [n[3]]);
    }

    #[test]
    fn test_import_deep_copies_subtree() {
        let mut src = ArenaDom::new();
        let b = src.create_html_element("b", &[("class", "x")]);
        src.append(src.document(), b);
        src.append_text(b, "bold");

        let mut dest = ArenaDom::new();
        let copy = dest.import(&src, b);
        dest.append(dest.document(), copy);

        assert!(dest.is_element_named(copy, "b"));
        assert_eq!(dest.element_classes(copy), ["x"]);
        assert_eq!(dest.text_of(copy), "bold");
    }

    #[test]
    fn test_set_attr_updates_mirrors() {
        let mut dom = ArenaDom::new();
        let span = dom.create_html_element("span", &[]);
        dom.set_attr(span, "id", "f01");
        dom.set_attr(span, "class", "a b");
        dom.set_attr(span, "class", "c");

        assert_eq!(dom.element_id(span), Some("f01"));
        assert_eq!(dom.element_classes(span), ["c"]);
        assert_eq!(dom.get_attr(span, "id"), Some("f01"));
        assert_eq!(dom.element(span).map(|e| e.attrs().len()), Some(2));
    }

    #[test]
    fn test_descendants_document_order() {
        let mut dom = ArenaDom::new();
        let div = dom.create_html_element("div", &[]);
        let p1 = dom.create_html_element("p", &[]);
        let i = dom.create_html_element("i", &[]);
        let p2 = dom.create_html_element("p", &[]);
        let after = dom.create_html_element("p", &[]);
        dom.append(dom.document(), div);
        dom.append(div, p1);
        dom.append(p1, i);
        dom.append(div, p2);
        dom.append(dom.document(), after);

        assert_eq!(dom.descendants(div), [p1, i, p2]);
        assert!(dom.descendants(i).is_empty());
        assert!(dom.is_descendant_of(i, div));
        assert!(!dom.is_descendant_of(div, i));
        assert_eq!(dom.find_by_tag("p"), Some(p1));
    }

    #[test]
    fn test_text_of_collects_nested_text() {
        let mut dom = ArenaDom::new();
        let p = dom.create_html_element("p", &[]);
        dom.append_text(p, "one ");
        let b = dom.create_html_element("b", &[]);
        dom.append(p, b);
        dom.append_text(b, "two");
        dom.append_text(p, " three");

        assert_eq!(dom.text_of(p), "one two three");
        dom.set_text(p, "done");
        assert_eq!(dom.text_of(p), "done");
    }
}
