//! Cascading removal of unreferenced policy objects.
//!
//! An object is dead when no reference location anywhere in the document
//! yields its id. Removing a dead object can strand the objects it was the
//! last referrer of, so every outgoing reference of a removed subtree is
//! re-checked and the cascade recurses. Ids recur across a base chain
//! (override semantics), so a cascade removes every definition sharing the
//! dead id and type.

use tracing::{debug, info};

use crate::dom::{Document, NodeId};
use crate::query;
use crate::schema::ReferenceIndex;

/// Remove every policy object with no live incoming reference.
///
/// A second run over the same document is a no-op: the scan only ever
/// removes objects that are dead at the time of the check, and removal
/// cascades through everything the removed objects referenced.
pub fn remove_unreferenced_objects(doc: &mut Document, index: &ReferenceIndex) {
    for object_type in index.object_types() {
        debug!(object_type = %object_type, "searching unreferenced objects");
        let dead: Vec<NodeId> = query::objects_of_type(doc, index, doc.root(), object_type)
            .into_iter()
            .filter(|&candidate| {
                let id = doc.attr(candidate, "Id").unwrap_or_default();
                !query::is_referenced(doc, index, object_type, id)
            })
            .collect();
        for candidate in dead {
            // an earlier cascade may already have detached this candidate
            if doc.is_attached(candidate) {
                remove_recursive(doc, index, candidate);
            }
        }
    }
}

fn remove_recursive(doc: &mut Document, index: &ReferenceIndex, element: NodeId) {
    info!(
        element = doc.local_name(element).unwrap_or_default(),
        id = doc.attr(element, "Id").unwrap_or_default(),
        "removing unreferenced object"
    );

    // capture the outgoing references before the subtree disappears; their
    // targets are the objects whose liveness this removal can change
    let outgoing = query::outgoing_references(doc, index, element);
    doc.detach(element);

    for reference in outgoing {
        if !query::is_referenced(doc, index, reference.object_type, &reference.id) {
            debug!(
                object_type = %reference.object_type,
                id = %reference.id,
                "object has been de-referenced"
            );
            let definitions = query::objects_of_type_with_id(
                doc,
                index,
                doc.root(),
                reference.object_type,
                &reference.id,
            );
            for definition in definitions {
                remove_recursive(doc, index, definition);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ReferenceIndex;

    fn sweep(xml: &str) -> Document {
        let mut doc = Document::parse(xml).unwrap();
        let index = ReferenceIndex::build().unwrap();
        remove_unreferenced_objects(&mut doc, &index);
        doc
    }

    #[test]
    fn test_removes_simple_orphan() {
        let doc = sweep(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="P" TenantId="t">
                   <ClaimType Id="used"/>
                   <ClaimType Id="orphan"/>
                   <OutputClaim ClaimTypeReferenceId="used"/>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#,
        );
        let xml = doc.to_xml();
        assert!(xml.contains(r#"<ClaimType Id="used"/>"#));
        assert!(!xml.contains("orphan"));
    }

    #[test]
    fn test_cascade_removes_chain() {
        // journey "Dead" is referenced by nothing; profile "OnlyFromDead" is
        // referenced only from inside "Dead", so both must go in one run
        let doc = sweep(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="P" TenantId="t">
                   <UserJourney Id="Dead">
                     <ClaimsExchange TechnicalProfileReferenceId="OnlyFromDead"/>
                   </UserJourney>
                   <TechnicalProfile Id="OnlyFromDead"/>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#,
        );
        let xml = doc.to_xml();
        assert!(!xml.contains("Dead"));
        assert!(!xml.contains("OnlyFromDead"));
    }

    #[test]
    fn test_cascade_spares_still_referenced_target() {
        let doc = sweep(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="P" TenantId="t">
                   <DefaultUserJourney ReferenceId="Live"/>
                   <UserJourney Id="Live">
                     <ClaimsExchange TechnicalProfileReferenceId="Shared"/>
                   </UserJourney>
                   <UserJourney Id="Dead">
                     <ClaimsExchange TechnicalProfileReferenceId="Shared"/>
                   </UserJourney>
                   <TechnicalProfile Id="Shared"/>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#,
        );
        let xml = doc.to_xml();
        assert!(!xml.contains(r#"UserJourney Id="Dead""#));
        // "Shared" survives: the live journey still references it
        assert!(xml.contains(r#"<TechnicalProfile Id="Shared"/>"#));
    }

    #[test]
    fn test_override_instances_removed_together() {
        // the same id defined in two policies of the chain; once the only
        // reference disappears, both definitions go
        let doc = sweep(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="Base" TenantId="t">
                   <TechnicalProfile Id="Shared"/>
                 </TrustFrameworkPolicy>
                 <TrustFrameworkPolicy PolicyId="Leaf" TenantId="t">
                   <TechnicalProfile Id="Shared"/>
                   <UserJourney Id="Dead">
                     <ClaimsExchange TechnicalProfileReferenceId="Shared"/>
                   </UserJourney>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#,
        );
        let xml = doc.to_xml();
        assert!(!xml.contains("Shared"));
    }

    #[test]
    fn test_override_instances_kept_while_any_reference_lives() {
        let doc = sweep(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="Base" TenantId="t">
                   <TechnicalProfile Id="Shared"/>
                 </TrustFrameworkPolicy>
                 <TrustFrameworkPolicy PolicyId="Leaf" TenantId="t">
                   <TechnicalProfile Id="Shared"/>
                   <DefaultUserJourney ReferenceId="Live"/>
                   <UserJourney Id="Live">
                     <ClaimsExchange TechnicalProfileReferenceId="Shared"/>
                   </UserJourney>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#,
        );
        // removal granularity is per id+type across the whole set: while one
        // live reference exists, every override instance stays
        let xml = doc.to_xml();
        assert_eq!(xml.matches(r#"<TechnicalProfile Id="Shared"/>"#).count(), 2);
    }

    #[test]
    fn test_idempotent() {
        let xml = r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="P" TenantId="t">
                   <ClaimType Id="used"/>
                   <ClaimType Id="orphan"/>
                   <OutputClaim ClaimTypeReferenceId="used"/>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#;
        let mut doc = Document::parse(xml).unwrap();
        let index = ReferenceIndex::build().unwrap();
        remove_unreferenced_objects(&mut doc, &index);
        let once = doc.to_xml();
        remove_unreferenced_objects(&mut doc, &index);
        assert_eq!(doc.to_xml(), once);
    }

    #[test]
    fn test_references_cross_policy_boundaries() {
        // the definition lives in the base policy, the reference in the leaf
        let doc = sweep(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="Base" TenantId="t">
                   <ClaimType Id="email"/>
                 </TrustFrameworkPolicy>
                 <TrustFrameworkPolicy PolicyId="Leaf" TenantId="t">
                   <OutputClaim ClaimTypeReferenceId="email"/>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#,
        );
        assert!(doc.to_xml().contains(r#"<ClaimType Id="email"/>"#));
    }
}
