//! DOM tree implementation for the Folio book compiler.
//!
//! This crate provides an arena-based DOM tree structure following the
//! [DOM Living Standard](https://dom.spec.whatwg.org/).
//!
//! # Design
//!
//! The tree uses arena allocation with [`NodeId`] indices for all
//! relationships, providing O(1) access and traversal without ownership
//! cycles: the document owns the node slab, and parent links are plain
//! indices into it. All node payloads (text data, attribute values) live in
//! the slab and are dropped with the document.

use std::fmt::Write as _;
use std::sync::LazyLock;

use folio_common::intern::Atom;

/// The HTML namespace URI.
pub static HTML_NAMESPACE: LazyLock<Atom> =
    LazyLock::new(|| Atom::new("http://www.w3.org/1999/xhtml"));

/// The SVG namespace URI.
pub static SVG_NAMESPACE: LazyLock<Atom> =
    LazyLock::new(|| Atom::new("http://www.w3.org/2000/svg"));

/// The MathML namespace URI.
pub static MATHML_NAMESPACE: LazyLock<Atom> =
    LazyLock::new(|| Atom::new("http://www.w3.org/1998/Math/MathML"));

/// A type-safe index into the DOM tree.
///
/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
/// "Each node has an associated node document..."
///
/// `NodeId` provides O(1) access to any node in the tree without borrowing
/// issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root document node is always at index 0.
    pub const ROOT: Self = Self(0);
}

/// An attribute on an element.
///
/// [§ 4.9.1 Interface Attr](https://dom.spec.whatwg.org/#interface-attr)
/// "An Attr object represents an attribute of an Element object."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute's name, interned.
    pub name: Atom,
    /// The attribute's value.
    pub value: String,
}

impl Attribute {
    /// Create a new attribute.
    #[must_use]
    pub const fn new(name: Atom, value: String) -> Self {
        Self { name, value }
    }
}

/// Element-specific data.
///
/// Per [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element):
/// "Elements have an associated namespace... When an element is created, its
/// local name is always given." The attribute list preserves insertion order,
/// and inserting a duplicate name is a no-op - the first occurrence wins,
/// matching HTML parsing.
#[derive(Debug, Clone)]
pub struct ElementData {
    /// The element's local name, interned.
    pub tag_name: Atom,
    /// The element's namespace URI, interned. One of HTML / SVG / MathML.
    pub namespace: Atom,
    /// Ordered attribute list.
    attributes: Vec<Attribute>,
    /// Cached `id` attribute, interned for rule-cache lookups.
    id: Option<Atom>,
    /// Cached class list from the `class` attribute, in document order.
    classes: Vec<Atom>,
}

impl ElementData {
    /// Create element data with no attributes.
    #[must_use]
    pub fn new(tag_name: Atom, namespace: Atom) -> Self {
        Self {
            tag_name,
            namespace,
            attributes: Vec::new(),
            id: None,
            classes: Vec::new(),
        }
    }

    /// Append an attribute. A duplicate name is a no-op (first wins).
    pub fn add_attribute(&mut self, name: Atom, value: String) {
        if self.attributes.iter().any(|attr| attr.name == name) {
            return;
        }
        if name == "id" {
            self.id = Some(Atom::new(&value));
        } else if name == "class" {
            self.classes = value.split_ascii_whitespace().map(Atom::new).collect();
        }
        self.attributes.push(Attribute::new(name, value));
    }

    /// The ordered attribute list.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Look up an attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: Atom) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Look up an attribute value by plain-text name.
    #[must_use]
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// True if the attribute is present, regardless of value.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attr| attr.name == name)
    }

    /// The cached `id` attribute.
    #[must_use]
    pub const fn id(&self) -> Option<Atom> {
        self.id
    }

    /// The cached class-name list.
    #[must_use]
    pub fn classes(&self) -> &[Atom] {
        &self.classes
    }

    /// True for elements in the HTML namespace.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.namespace == *HTML_NAMESPACE
    }
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Each node has an associated node type"
#[derive(Debug, Clone)]
pub enum NodeType {
    /// [§ 4.5 Interface Document](https://dom.spec.whatwg.org/#interface-document)
    Document,
    /// [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element)
    Element(ElementData),
    /// [§ 4.10 Interface Text](https://dom.spec.whatwg.org/#interface-text)
    Text(String),
    /// [§ 4.7 Interface Comment](https://dom.spec.whatwg.org/#interface-comment)
    Comment(String),
}

/// One node in the arena.
///
/// Stores indices for parent/child/sibling relationships, enabling O(1)
/// traversal in any direction. Sibling links and the parent's `children`
/// list are kept consistent by every mutation.
#[derive(Debug, Clone)]
pub struct Node {
    /// The node's payload.
    pub node_type: NodeType,
    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-parent)
    pub parent: Option<NodeId>,
    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-child)
    pub children: Vec<NodeId>,
    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-next-sibling)
    pub next_sibling: Option<NodeId>,
    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-previous-sibling)
    pub prev_sibling: Option<NodeId>,
}

/// Arena-based DOM tree with O(1) node access and traversal.
///
/// [§ 4 Nodes](https://dom.spec.whatwg.org/#nodes)
///
/// All nodes live in one contiguous vector; `NodeId`s index into it. The
/// Document node is always at index 0 (`NodeId::ROOT`) and owns everything
/// transitively.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a new DOM tree with just the Document node at the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                node_type: NodeType::Document,
                parent: None,
                children: Vec::new(),
                next_sibling: None,
                prev_sibling: None,
            }],
        }
    }

    /// Get the root document node ID.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by its ID.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get a mutable reference to a node by its ID.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Get the number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (never true: the Document is always there).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a new node in the arena and return its ID.
    /// The node is not yet attached to the tree (no parent, no siblings).
    pub fn alloc(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            node_type,
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
        });
        id
    }

    /// [§ 4.2.2 Append](https://dom.spec.whatwg.org/#concept-node-append)
    ///
    /// "To append a node to a parent, pre-insert node into parent before
    /// null." Detaches `child` from any previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let prev_last_child = self.nodes[parent.0].children.last().copied();
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        if let Some(prev_id) = prev_last_child {
            self.nodes[prev_id.0].next_sibling = Some(child);
            self.nodes[child.0].prev_sibling = Some(prev_id);
        }
    }

    /// [§ 4.2.1 Insert](https://dom.spec.whatwg.org/#concept-node-insert)
    ///
    /// Insert `child` into `parent` immediately before `before`. Detaches
    /// `child` from any previous parent first. Falls back to append when
    /// `before` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: NodeId) {
        self.detach(child);
        let Some(index) = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == before)
        else {
            self.append_child(parent, child);
            return;
        };
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);

        let prev = self.nodes[before.0].prev_sibling;
        self.nodes[child.0].prev_sibling = prev;
        self.nodes[child.0].next_sibling = Some(before);
        self.nodes[before.0].prev_sibling = Some(child);
        if let Some(prev_id) = prev {
            self.nodes[prev_id.0].next_sibling = Some(child);
        }
    }

    /// [§ 4.2.3 Remove](https://dom.spec.whatwg.org/#concept-node-remove)
    ///
    /// Detach a node from its parent, fixing up the parent's child list and
    /// both sibling links atomically. A node with no parent is untouched.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.0].parent else {
            return;
        };
        let prev = self.nodes[id.0].prev_sibling;
        let next = self.nodes[id.0].next_sibling;
        self.nodes[parent.0].children.retain(|&c| c != id);
        if let Some(prev_id) = prev {
            self.nodes[prev_id.0].next_sibling = next;
        }
        if let Some(next_id) = next {
            self.nodes[next_id.0].prev_sibling = prev;
        }
        self.nodes[id.0].parent = None;
        self.nodes[id.0].prev_sibling = None;
        self.nodes[id.0].next_sibling = None;
    }

    /// Move every child of `from` onto the end of `to`, preserving order.
    /// Used by the adoption agency algorithm.
    pub fn reparent_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.nodes[from.0].children);
        for child in children {
            // The child list was already taken, so only the links need fixing.
            self.nodes[child.0].parent = None;
            self.nodes[child.0].prev_sibling = None;
            self.nodes[child.0].next_sibling = None;
            self.append_child(to, child);
        }
    }

    /// Get the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Get the parent of a node if that parent is an element.
    #[must_use]
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id)
            .filter(|&p| matches!(self.get(p).map(|n| &n.node_type), Some(NodeType::Element(_))))
    }

    /// Get all children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Get the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.first().copied())
    }

    /// Get the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.last().copied())
    }

    /// Get the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Get the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// [§ 4.2.6 Descendant](https://dom.spec.whatwg.org/#concept-tree-descendant)
    ///
    /// Check if `descendant` is a descendant of `ancestor` by walking up
    /// the parent chain.
    #[must_use]
    pub fn is_descendant_of(&self, descendant: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(descendant);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Returns an iterator over all ancestors of a node, from parent to root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> AncestorIterator<'_> {
        AncestorIterator {
            tree: self,
            current: self.parent(id),
        }
    }

    /// Returns an iterator over preceding siblings, nearest first.
    #[must_use]
    pub fn preceding_siblings(&self, id: NodeId) -> PrecedingSiblingIterator<'_> {
        PrecedingSiblingIterator {
            tree: self,
            current: self.prev_sibling(id),
        }
    }

    /// Get element data if this node is an element.
    #[must_use]
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        })
    }

    /// Get mutable element data if this node is an element.
    pub fn as_element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(|n| match &mut n.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        })
    }

    /// Get text content if this node is a text node.
    #[must_use]
    pub fn as_text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Append characters to a text node's data. Used by the tree builder to
    /// merge adjacent character runs into one text node.
    pub fn append_text(&mut self, id: NodeId, data: &str) {
        if let Some(node) = self.get_mut(id) {
            if let NodeType::Text(existing) = &mut node.node_type {
                existing.push_str(data);
            }
        }
    }

    /// The tag name of an element node, or `None` for non-elements.
    #[must_use]
    pub fn tag_name(&self, id: NodeId) -> Option<Atom> {
        self.as_element(id).map(|e| e.tag_name)
    }

    /// Returns an iterator over all descendants of a node in document order
    /// (depth-first, pre-order). Does not include the starting node.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> DescendantIterator<'_> {
        DescendantIterator {
            tree: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    /// Iterate over all nodes in the tree in document order.
    pub fn iter_all(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(self.root()).chain(self.descendants(self.root()))
    }

    /// [§ 3.1.1 The document element](https://html.spec.whatwg.org/multipage/dom.html#the-html-element-2)
    ///
    /// "The document element of a document is the element whose parent is
    /// that document, if it exists; otherwise null." For HTML documents this
    /// is the `<html>` element.
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .iter()
            .find(|&&id| matches!(self.get(id).map(|n| &n.node_type), Some(NodeType::Element(_))))
            .copied()
    }

    /// [§ 3.1.3 The body element](https://html.spec.whatwg.org/multipage/dom.html#the-body-element-2)
    ///
    /// "The body element of a document is the first of the html element's
    /// children that is either a body element or a frameset element."
    #[must_use]
    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .find(|&&id| {
                self.as_element(id)
                    .is_some_and(|e| e.tag_name == "body" || e.tag_name == "frameset")
            })
            .copied()
    }

    /// Concatenated text content of a node's descendants, in document order.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.as_text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Serialize the subtree rooted at `id` back to markup, for debugging
    /// and tests.
    #[must_use]
    pub fn serialize(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(id, &mut out);
        out
    }

    fn serialize_into(&self, id: NodeId, out: &mut String) {
        match self.get(id).map(|n| &n.node_type) {
            Some(NodeType::Document) => {
                for &child in self.children(id) {
                    self.serialize_into(child, out);
                }
            }
            Some(NodeType::Element(data)) => {
                let _ = write!(out, "<{}", data.tag_name);
                for attr in data.attributes() {
                    let _ = write!(out, " {}=\"{}\"", attr.name, attr.value);
                }
                out.push('>');
                for &child in self.children(id) {
                    self.serialize_into(child, out);
                }
                let _ = write!(out, "</{}>", data.tag_name);
            }
            Some(NodeType::Text(text)) => out.push_str(text),
            Some(NodeType::Comment(text)) => {
                let _ = write!(out, "<!--{text}-->");
            }
            None => {}
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator that walks up the tree from a node to the root.
pub struct AncestorIterator<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
}

impl Iterator for AncestorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}

/// Iterator that walks backwards through siblings of a node.
pub struct PrecedingSiblingIterator<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
}

impl Iterator for PrecedingSiblingIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.prev_sibling(id);
        Some(id)
    }
}

/// Iterator that walks the tree in document order (depth-first, pre-order).
pub struct DescendantIterator<'a> {
    tree: &'a DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let children = self.tree.children(id);
        self.stack.extend(children.iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tree: &mut DomTree, tag: &str) -> NodeId {
        tree.alloc(NodeType::Element(ElementData::new(
            Atom::new(tag),
            *HTML_NAMESPACE,
        )))
    }

    #[test]
    fn sibling_links_stay_consistent() {
        let mut tree = DomTree::new();
        let parent = element(&mut tree, "ul");
        tree.append_child(NodeId::ROOT, parent);
        let a = element(&mut tree, "li");
        let b = element(&mut tree, "li");
        let c = element(&mut tree, "li");
        tree.append_child(parent, a);
        tree.append_child(parent, c);
        tree.insert_before(parent, b, c);

        assert_eq!(tree.children(parent), &[a, b, c]);
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.next_sibling(b), Some(c));
        assert_eq!(tree.prev_sibling(c), Some(b));
        assert_eq!(tree.prev_sibling(b), Some(a));

        // Every child appears exactly once and links agree both ways.
        for &child in tree.children(parent) {
            assert_eq!(tree.parent(child), Some(parent));
            if let Some(next) = tree.next_sibling(child) {
                assert_eq!(tree.prev_sibling(next), Some(child));
            }
        }
    }

    #[test]
    fn detach_is_atomic() {
        let mut tree = DomTree::new();
        let parent = element(&mut tree, "div");
        tree.append_child(NodeId::ROOT, parent);
        let a = element(&mut tree, "span");
        let b = element(&mut tree, "span");
        let c = element(&mut tree, "span");
        tree.append_child(parent, a);
        tree.append_child(parent, b);
        tree.append_child(parent, c);

        tree.detach(b);
        assert_eq!(tree.children(parent), &[a, c]);
        assert_eq!(tree.next_sibling(a), Some(c));
        assert_eq!(tree.prev_sibling(c), Some(a));
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.prev_sibling(b), None);
        assert_eq!(tree.next_sibling(b), None);
    }

    #[test]
    fn append_moves_between_parents() {
        let mut tree = DomTree::new();
        let first = element(&mut tree, "div");
        let second = element(&mut tree, "div");
        tree.append_child(NodeId::ROOT, first);
        tree.append_child(NodeId::ROOT, second);
        let child = element(&mut tree, "p");
        tree.append_child(first, child);
        tree.append_child(second, child);

        assert!(tree.children(first).is_empty());
        assert_eq!(tree.children(second), &[child]);
        assert_eq!(tree.parent(child), Some(second));
    }

    #[test]
    fn duplicate_attribute_is_ignored() {
        let mut data = ElementData::new(Atom::new("input"), *HTML_NAMESPACE);
        data.add_attribute(Atom::new("type"), "text".into());
        data.add_attribute(Atom::new("type"), "password".into());
        assert_eq!(data.attribute_str("type"), Some("text"));
        assert_eq!(data.attributes().len(), 1);
    }

    #[test]
    fn id_and_classes_are_cached() {
        let mut data = ElementData::new(Atom::new("p"), *HTML_NAMESPACE);
        data.add_attribute(Atom::new("id"), "intro".into());
        data.add_attribute(Atom::new("class"), "lead  wide".into());
        assert_eq!(data.id(), Some(Atom::new("intro")));
        assert_eq!(data.classes(), &[Atom::new("lead"), Atom::new("wide")]);
    }

    #[test]
    fn text_merging_appends_in_place() {
        let mut tree = DomTree::new();
        let text = tree.alloc(NodeType::Text("AB".into()));
        tree.append_child(NodeId::ROOT, text);
        tree.append_text(text, "CD");
        assert_eq!(tree.as_text(text), Some("ABCD"));
    }

    #[test]
    fn serialize_round_trips_simple_markup() {
        let mut tree = DomTree::new();
        let p = element(&mut tree, "p");
        tree.append_child(NodeId::ROOT, p);
        let text = tree.alloc(NodeType::Text("hi".into()));
        tree.append_child(p, text);
        assert_eq!(tree.serialize(NodeId::ROOT), "<p>hi</p>");
    }
}
