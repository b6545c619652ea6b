//! Reference queries over a policy document.
//!
//! All id comparisons are ASCII case-insensitive, and every query scans the
//! requested scope's whole subtree: references legally cross the base-policy
//! chain, so liveness can only be judged against the full document.

use crate::dom::{Document, NodeId};
use crate::schema::{ElementPath, ObjectType, PathSegment, RefLocator, ReferenceIndex};

pub const POLICY_TAG: &str = "TrustFrameworkPolicy";

/// All policy elements in document order
pub fn policies(doc: &Document) -> Vec<NodeId> {
    doc.descendant_elements(doc.root())
        .into_iter()
        .filter(|&el| doc.local_name(el) == Some(POLICY_TAG))
        .collect()
}

/// Elements matching a relative path anywhere in the scope subtree
pub fn match_path(doc: &Document, scope: NodeId, path: &ElementPath) -> Vec<NodeId> {
    doc.descendant_elements(scope)
        .into_iter()
        .filter(|&el| path_matches_at(doc, scope, el, path))
        .collect()
}

fn path_matches_at(doc: &Document, scope: NodeId, el: NodeId, path: &ElementPath) -> bool {
    let mut segments = path.segments.iter().rev();
    let Some(last) = segments.next() else {
        return false;
    };
    if !segment_matches(doc, el, last) {
        return false;
    }
    let mut current = el;
    for segment in segments {
        current = match doc.parent(current) {
            Some(parent) => parent,
            None => return false,
        };
        if !doc.is_element(current) || !segment_matches(doc, current, segment) {
            return false;
        }
    }
    // the whole chain has to sit inside the scope
    doc.is_in_subtree(current, scope)
}

fn segment_matches(doc: &Document, el: NodeId, segment: &PathSegment) -> bool {
    if doc.local_name(el) != Some(segment.name.as_str()) {
        return false;
    }
    match &segment.attr_eq {
        Some((key, value)) => doc.attr(el, key) == Some(value.as_str()),
        None => true,
    }
}

/// The target id carried by a reference location, if any
pub fn locator_value(doc: &Document, el: NodeId, locator: &RefLocator) -> Option<String> {
    let value = match locator {
        RefLocator::Attribute(name) => doc.attr(el, name)?.to_string(),
        RefLocator::Text => doc.text_content(el),
    };
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Definition elements of a type within the scope (those carrying an `Id`)
pub fn objects_of_type(
    doc: &Document,
    index: &ReferenceIndex,
    scope: NodeId,
    object_type: ObjectType,
) -> Vec<NodeId> {
    match_path(doc, scope, index.definition_path(object_type))
        .into_iter()
        .filter(|&el| doc.attr(el, "Id").is_some_and(|id| !id.trim().is_empty()))
        .collect()
}

/// Definitions of a type with a specific id; overrides can yield several
pub fn objects_of_type_with_id(
    doc: &Document,
    index: &ReferenceIndex,
    scope: NodeId,
    object_type: ObjectType,
    id: &str,
) -> Vec<NodeId> {
    objects_of_type(doc, index, scope, object_type)
        .into_iter()
        .filter(|&el| {
            doc.attr(el, "Id")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(id))
        })
        .collect()
}

/// Whether any reference location in the document points at the id
pub fn is_referenced(
    doc: &Document,
    index: &ReferenceIndex,
    object_type: ObjectType,
    id: &str,
) -> bool {
    index.sources(object_type).iter().any(|source| {
        match_path(doc, doc.root(), &source.path).iter().any(|&el| {
            locator_value(doc, el, &source.locator).is_some_and(|v| v.eq_ignore_ascii_case(id))
        })
    })
}

/// An outgoing reference held somewhere in a subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub object_type: ObjectType,
    pub id: String,
}

/// Every outgoing reference held by the subtree, across all object types
pub fn outgoing_references(
    doc: &Document,
    index: &ReferenceIndex,
    scope: NodeId,
) -> Vec<ObjectRef> {
    let mut refs = Vec::new();
    for object_type in index.object_types() {
        for source in index.sources(object_type) {
            for el in match_path(doc, scope, &source.path) {
                if let Some(id) = locator_value(doc, el, &source.locator) {
                    refs.push(ObjectRef { object_type, id });
                }
            }
        }
    }
    refs
}
