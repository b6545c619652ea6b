//! Event-based document loading via quick-xml.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{Document, Element, Node, NodeId, NodeKind};
use crate::error::{ConvertError, Result};

fn malformed(err: impl std::fmt::Display) -> ConvertError {
    ConvertError::invalid_policy_set(err)
}

pub(super) fn parse_document(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    let mut nodes: Vec<Node> = Vec::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut root: Option<NodeId> = None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) => {
                let id = push_element(&mut nodes, &start)?;
                attach(&mut nodes, &stack, &mut root, id)?;
                stack.push(id);
            }
            Event::Empty(start) => {
                let id = push_element(&mut nodes, &start)?;
                attach(&mut nodes, &stack, &mut root, id)?;
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(malformed)?;
                // whitespace-only runs carry no content and are dropped;
                // surrounding whitespace never survives pretty-printing
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    push_leaf(&mut nodes, &stack, NodeKind::Text(trimmed.to_string()));
                }
            }
            Event::CData(cdata) => {
                let value =
                    String::from_utf8(cdata.into_inner().into_owned()).map_err(malformed)?;
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    push_leaf(&mut nodes, &stack, NodeKind::Text(trimmed.to_string()));
                }
            }
            Event::Comment(comment) => {
                let value =
                    String::from_utf8(comment.as_ref().to_vec()).map_err(malformed)?;
                push_leaf(&mut nodes, &stack, NodeKind::Comment(value));
            }
            Event::Eof => break,
            // declaration, processing instructions, doctype
            _ => {}
        }
    }

    let root = root.ok_or_else(|| malformed("document has no root element"))?;
    Ok(Document { nodes, root })
}

fn push_element(
    nodes: &mut Vec<Node>,
    start: &quick_xml::events::BytesStart<'_>,
) -> Result<NodeId> {
    let name = String::from_utf8(start.name().as_ref().to_vec()).map_err(malformed)?;
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = String::from_utf8(attr.key.as_ref().to_vec()).map_err(malformed)?;
        let value = attr.unescape_value().map_err(malformed)?.into_owned();
        attrs.push((key, value));
    }
    let id = NodeId(nodes.len());
    nodes.push(Node {
        kind: NodeKind::Element(Element { name, attrs }),
        parent: None,
        children: Vec::new(),
    });
    Ok(id)
}

fn attach(
    nodes: &mut [Node],
    stack: &[NodeId],
    root: &mut Option<NodeId>,
    id: NodeId,
) -> Result<()> {
    if let Some(&parent) = stack.last() {
        nodes[id.0].parent = Some(parent);
        nodes[parent.0].children.push(id);
    } else if root.is_none() {
        *root = Some(id);
    } else {
        return Err(malformed("multiple root elements"));
    }
    Ok(())
}

fn push_leaf(nodes: &mut Vec<Node>, stack: &[NodeId], kind: NodeKind) {
    // text or comments outside the root element carry nothing we keep
    if let Some(&parent) = stack.last() {
        let id = NodeId(nodes.len());
        nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        nodes[parent.0].children.push(id);
    }
}
