//! Pretty-printing serializer.
//!
//! Two-space indentation; elements whose children are all text are collapsed
//! onto a single line. No XML declaration is emitted.

use super::{Document, NodeId, NodeKind};

const INDENT: &str = "  ";

pub(super) fn pretty(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, 0, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    match doc.kind(id) {
        NodeKind::Text(text) => out.push_str(&escape_text(text.trim())),
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (key, value) in &el.attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }

            let children = doc.children(id);
            if children.is_empty() {
                out.push_str("/>");
            } else if children
                .iter()
                .all(|&c| matches!(doc.kind(c), NodeKind::Text(_)))
            {
                out.push('>');
                for &child in children {
                    if let NodeKind::Text(text) = doc.kind(child) {
                        out.push_str(&escape_text(text));
                    }
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            } else {
                out.push('>');
                for &child in children {
                    out.push('\n');
                    write_node(doc, child, depth + 1, out);
                }
                out.push('\n');
                for _ in 0..depth {
                    out.push_str(INDENT);
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
    }
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
