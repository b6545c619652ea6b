//! Arena-indexed element tree for policy documents.
//!
//! Nodes live in a flat `Vec` and refer to each other by index, so a subtree
//! can be reparented by updating indices instead of juggling owned pointers.
//! Detached nodes stay in the arena but are unreachable from the root and are
//! skipped by every traversal.

mod parse;
mod serialize;

use crate::error::Result;

/// Index of a node in the document arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Comment(String),
}

/// Element payload: tag name (possibly prefixed) and ordered attributes
#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed policy document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Parse a document from markup text.
    ///
    /// Whitespace-only text runs are dropped so that serialized sizes are
    /// stable regardless of the formatting of the input.
    pub fn parse(xml: &str) -> Result<Document> {
        parse::parse_document(xml)
    }

    /// Pretty-print the whole document
    pub fn to_xml(&self) -> String {
        serialize::pretty(self, self.root)
    }

    /// Pretty-print a single subtree
    pub fn node_to_xml(&self, id: NodeId) -> String {
        serialize::pretty(self, id)
    }

    /// Serialized UTF-8 byte size of a subtree
    pub fn node_size(&self, id: NodeId) -> usize {
        self.node_to_xml(id).len()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Element(_))
    }

    /// Tag name as written in the source (possibly prefixed)
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element(el) => Some(&el.name),
            _ => None,
        }
    }

    /// Tag name with any namespace prefix stripped
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.name(id).map(local_part)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element(el) => el
                .attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Set or replace an attribute, preserving attribute order
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element(el) = &mut self.node_mut(id).kind {
            if let Some(pair) = el.attrs.iter_mut().find(|(k, _)| k == name) {
                pair.1 = value.to_string();
            } else {
                el.attrs.push((name.to_string(), value.to_string()));
            }
        }
    }

    /// Concatenated text of the subtree (the DOM `textContent`)
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element(_) => {
                for &child in &self.node(id).children {
                    self.collect_text(child, out);
                }
            }
            NodeKind::Comment(_) => {}
        }
    }

    /// Replace the element's children with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.node_mut(child).parent = None;
        }
        let text_id = self.push_node(NodeKind::Text(text.to_string()));
        self.node_mut(text_id).parent = Some(id);
        self.node_mut(id).children.push(text_id);
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// First direct child element with the given local name
    pub fn child_element_named(&self, id: NodeId, local: &str) -> Option<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|&c| self.local_name(c) == Some(local))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// All elements of the subtree in pre-order, including the scope itself
    pub fn descendant_elements(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk_elements(scope, &mut out);
        out
    }

    fn walk_elements(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.is_element(id) {
            out.push(id);
        }
        for &child in &self.node(id).children {
            self.walk_elements(child, out);
        }
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push_node(NodeKind::Element(Element {
            name: name.to_string(),
            attrs: Vec::new(),
        }))
    }

    /// Detach a node from its parent. The node stays in the arena but is no
    /// longer reachable from the root.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|&c| c != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Append a node as the last child, detaching it from any previous parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Insert a node as the first child, detaching it from any previous parent
    pub fn insert_first_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.insert(0, child);
    }

    /// Insert a node as the sibling immediately before `anchor`
    pub fn insert_before_sibling(&mut self, anchor: NodeId, new: NodeId) {
        let Some(parent) = self.node(anchor).parent else {
            return;
        };
        self.detach(new);
        self.node_mut(new).parent = Some(parent);
        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|&c| c == anchor)
            .unwrap_or(self.node(parent).children.len());
        self.node_mut(parent).children.insert(pos, new);
    }

    /// Whether the node is still reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `id` is `ancestor` or lies inside its subtree
    pub fn is_in_subtree(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == ancestor {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Clone an element without its children (attributes only)
    pub fn shallow_clone(&mut self, id: NodeId) -> NodeId {
        let kind = self.node(id).kind.clone();
        self.push_node(kind)
    }

    /// Clone a whole subtree; the clone is detached
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let kind = self.node(id).kind.clone();
        let children = self.node(id).children.clone();
        let clone = self.push_node(kind);
        for child in children {
            let child_clone = self.deep_clone(child);
            self.append_child(clone, child_clone);
        }
        clone
    }
}

/// Strip a namespace prefix from a qualified name
pub fn local_part(name: &str) -> &str {
    match name.rsplit(':').next() {
        Some(local) => local,
        None => name,
    }
}
