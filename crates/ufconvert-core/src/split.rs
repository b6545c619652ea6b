//! Size-constrained policy splitting.
//!
//! A policy larger than the upload budget is split by forking new base
//! fragments: each fork extends the inheritance chain one level further back
//! and receives as much of the original's content as fits. The original
//! policy stays the most specific fragment of its chain. Sizes are measured
//! by serializing the current in-memory subtree at the moment of every
//! check, so each migration immediately affects the next decision.

use tracing::info;

use crate::dom::{Document, NodeId};
use crate::error::{ConvertError, Result};
use crate::normalize;
use crate::query::{self, POLICY_TAG};
use crate::schema::ReferenceIndex;

/// Admin upload limit for a single custom policy file
const POLICY_UPLOAD_LIMIT_BYTES: usize = 1_024_000;

/// Default budget: half the upload limit, leaving room for manual edits and
/// formatting changes after conversion
pub const DEFAULT_MAX_POLICY_SIZE: usize = POLICY_UPLOAD_LIMIT_BYTES / 2;

/// Split one policy until its serialized size fits the budget.
///
/// Forks are numbered `<id>_1..<id>_n` and inserted before the original in
/// document order; the original ends up renamed `<id>_n+1` with its base
/// reference pointing at the newest fork.
pub fn split_policy(
    doc: &mut Document,
    index: &ReferenceIndex,
    policy: NodeId,
    home_tenant: &str,
    max_size: usize,
) -> Result<()> {
    let policy_id = doc
        .attr(policy, "PolicyId")
        .ok_or_else(|| ConvertError::missing_attribute(POLICY_TAG, "PolicyId"))?
        .to_string();

    let mut parts = 0usize;
    while doc.node_size(policy) >= max_size {
        if parts == 0 {
            info!(
                policy = %policy_id,
                "policy is too large to be a custom policy and will be split into smaller files"
            );
        }
        parts += 1;
        let fork_id = format!("{policy_id}_{parts}");
        fork_policy(doc, index, policy, &fork_id, home_tenant, max_size)?;
    }

    if parts > 0 {
        // the remaining original becomes the leaf-most fragment: renumbered
        // past the last fork and based on it
        normalize::update_base_policy_reference(
            doc,
            policy,
            home_tenant,
            Some(&format!("{policy_id}_{parts}")),
        );
        parts += 1;
        let final_id = format!("{policy_id}_{parts}");
        doc.set_attr(policy, "PolicyId", &final_id);
        info!(policy = %policy_id, parts, "policy split complete");
    }
    Ok(())
}

/// Fork a new base fragment and migrate content into it
fn fork_policy(
    doc: &mut Document,
    index: &ReferenceIndex,
    policy: NodeId,
    fork_id: &str,
    tenant: &str,
    max_size: usize,
) -> Result<()> {
    let fork = doc.shallow_clone(policy);
    doc.set_attr(fork, "PolicyId", fork_id);

    // the fork inherits the original's current base, extending the chain
    if let Some(base) = doc.child_element_named(policy, "BasePolicy") {
        let base_clone = doc.deep_clone(base);
        doc.append_child(fork, base_clone);
    }
    normalize::update_base_policy_reference(doc, policy, tenant, Some(fork_id));

    // base fragments precede the policy they were forked from
    doc.insert_before_sibling(policy, fork);

    if !move_child_elements(doc, index, policy, policy, fork, max_size) {
        return Err(ConvertError::NoProgress {
            policy_id: doc
                .attr(policy, "PolicyId")
                .unwrap_or_default()
                .to_string(),
        });
    }
    Ok(())
}

/// Migrate children of `source` into `target` while the target's policy
/// stays under budget. Returns whether anything actually moved.
fn move_child_elements(
    doc: &mut Document,
    index: &ReferenceIndex,
    policy: NodeId,
    source: NodeId,
    target: NodeId,
    max_size: usize,
) -> bool {
    let mut budget = remaining_budget(doc, target, max_size);
    if budget == 0 {
        return false;
    }

    let mut moved = false;
    for child in doc.child_elements(source) {
        // the chain pointer itself never migrates
        if doc.local_name(child) == Some("BasePolicy") {
            continue;
        }

        if doc.node_size(child) < budget && subtree_is_movable(doc, index, policy, child) {
            doc.append_child(target, child);
            budget = remaining_budget(doc, target, max_size);
            moved = true;
        } else {
            // too big or pinned: try to move grandchildren into an empty
            // shell of the child's tag instead; the shell's own attributes
            // can carry a reference, so it faces the same integrity check
            let shell = doc.shallow_clone(child);
            if doc.node_size(shell) < budget && subtree_is_movable(doc, index, policy, shell) {
                doc.append_child(target, shell);
                if move_child_elements(doc, index, policy, child, shell, max_size) {
                    moved = true;
                } else {
                    // nothing fit inside the shell; drop it again
                    doc.detach(shell);
                }
                budget = remaining_budget(doc, target, max_size);
            }
        }
    }
    moved
}

fn remaining_budget(doc: &Document, target: NodeId, max_size: usize) -> usize {
    max_size.saturating_sub(enclosing_policy_size(doc, target))
}

/// Serialized size of the policy fragment that contains `node`
fn enclosing_policy_size(doc: &Document, node: NodeId) -> usize {
    let mut current = node;
    loop {
        if doc.local_name(current) == Some(POLICY_TAG) {
            return doc.node_size(current);
        }
        match doc.parent(current) {
            Some(parent) => current = parent,
            None => return doc.node_size(node),
        }
    }
}

/// A subtree can move into a base fragment only if nothing inside it
/// references an object whose definition stays behind in this policy:
/// a base policy must never depend on a more specific fragment.
fn subtree_is_movable(
    doc: &Document,
    index: &ReferenceIndex,
    policy: NodeId,
    candidate: NodeId,
) -> bool {
    for reference in query::outgoing_references(doc, index, candidate) {
        let definitions = query::objects_of_type_with_id(
            doc,
            index,
            policy,
            reference.object_type,
            &reference.id,
        );
        if definitions
            .iter()
            .any(|&def| !doc.is_in_subtree(def, candidate))
        {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query;
    use crate::schema::ReferenceIndex;

    fn filler(len: usize) -> String {
        "x".repeat(len)
    }

    fn parse(xml: &str) -> (Document, ReferenceIndex) {
        (
            Document::parse(xml).unwrap(),
            ReferenceIndex::build().unwrap(),
        )
    }

    fn base_chain(doc: &Document) -> Vec<(String, Option<String>)> {
        query::policies(doc)
            .into_iter()
            .map(|p| {
                let id = doc.attr(p, "PolicyId").unwrap().to_string();
                let base = doc.child_element_named(p, "BasePolicy").map(|b| {
                    doc.text_content(doc.child_element_named(b, "PolicyId").unwrap())
                });
                (id, base)
            })
            .collect()
    }

    #[test]
    fn test_small_policy_untouched() {
        let (mut doc, index) = parse(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="B2C_1A_P" TenantId="T1">
                   <BuildingBlocks><ClaimType Id="email"/></BuildingBlocks>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#,
        );
        let policy = query::policies(&doc)[0];
        let before = doc.to_xml();
        split_policy(&mut doc, &index, policy, "T1", DEFAULT_MAX_POLICY_SIZE).unwrap();
        assert_eq!(doc.to_xml(), before);
    }

    #[test]
    fn test_split_produces_linear_chain_under_budget() {
        // three independently movable blocks of ~400 bytes each against a
        // 700-byte budget force repeated forking
        let xml = format!(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="B2C_1A_P" TenantId="T1">
                   <BasePolicy><TenantId>T1</TenantId><PolicyId>B2C_1A_Root</PolicyId></BasePolicy>
                   <BlockA Note="{a}"/>
                   <BlockB Note="{b}"/>
                   <BlockC Note="{c}"/>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#,
            a = filler(400),
            b = filler(400),
            c = filler(400),
        );
        let (mut doc, index) = parse(&xml);
        let policy = query::policies(&doc)[0];
        split_policy(&mut doc, &index, policy, "T1", 700).unwrap();

        let policies = query::policies(&doc);
        assert!(policies.len() > 1);
        for &p in &policies {
            assert!(doc.node_size(p) <= 700, "fragment over budget");
        }

        // fragments form one linear chain ending at the original base
        let chain = base_chain(&doc);
        assert_eq!(chain[0].1.as_deref(), Some("B2C_1A_Root"));
        for pair in chain.windows(2) {
            assert_eq!(pair[1].1.as_deref(), Some(pair[0].0.as_str()));
        }
        // the original policy is the leaf-most fragment, renumbered past
        // the last fork
        let last = chain.last().unwrap();
        assert_eq!(last.0, format!("B2C_1A_P_{}", chain.len()));
    }

    #[test]
    fn test_forks_inherit_original_base() {
        let xml = format!(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="B2C_1A_P" TenantId="T1">
                   <BasePolicy><TenantId>T1</TenantId><PolicyId>B2C_1A_Root</PolicyId></BasePolicy>
                   <BlockA Note="{a}"/>
                   <BlockB Note="{b}"/>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#,
            a = filler(300),
            b = filler(300),
        );
        let (mut doc, index) = parse(&xml);
        let policy = query::policies(&doc)[0];
        split_policy(&mut doc, &index, policy, "T1", 550).unwrap();

        let chain = base_chain(&doc);
        // the first fork points at the chain's original root
        assert_eq!(chain[0].1.as_deref(), Some("B2C_1A_Root"));
        assert!(chain.iter().skip(1).all(|(_, base)| base.is_some()));
    }

    #[test]
    fn test_container_split_across_fragments() {
        // one container bigger than the budget, whose children fit one at a
        // time: an empty shell is cloned into the fork and filled
        let xml = format!(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="B2C_1A_P" TenantId="T1">
                   <BuildingBlocks>
                     <ItemA Note="{a}"/>
                     <ItemB Note="{b}"/>
                     <ItemC Note="{c}"/>
                   </BuildingBlocks>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#,
            a = filler(300),
            b = filler(300),
            c = filler(300),
        );
        let (mut doc, index) = parse(&xml);
        let policy = query::policies(&doc)[0];
        split_policy(&mut doc, &index, policy, "T1", 600).unwrap();

        for &p in &query::policies(&doc) {
            assert!(doc.node_size(p) <= 600);
        }
        // every leaf item still exists exactly once
        let xml = doc.to_xml();
        for item in ["ItemA", "ItemB", "ItemC"] {
            assert_eq!(xml.matches(&format!("<{item} ")).count(), 1);
        }
        // the container tag now exists in more than one fragment
        assert!(xml.matches("<BuildingBlocks>").count() >= 2);
    }

    #[test]
    fn test_referencing_subtree_not_migrated_without_definition() {
        // the journey references a profile that stays behind, so the journey
        // must not move wholesale into the fork
        let xml = format!(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="B2C_1A_P" TenantId="T1">
                   <UserJourney Id="Main" Note="{a}">
                     <ClaimsExchange TechnicalProfileReferenceId="Login"/>
                   </UserJourney>
                   <TechnicalProfile Id="Login" Note="{b}"/>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#,
            a = filler(300),
            b = filler(300),
        );
        let (mut doc, index) = parse(&xml);
        let policy = query::policies(&doc)[0];
        split_policy(&mut doc, &index, policy, "T1", 600).unwrap();

        // wherever the journey's reference ended up, the profile definition
        // must not sit in a more specific fragment than the reference
        let policies = query::policies(&doc);
        let pos_of = |needle: &str| {
            policies
                .iter()
                .position(|&p| doc.node_to_xml(p).contains(needle))
                .unwrap()
        };
        let ref_pos = pos_of("TechnicalProfileReferenceId=\"Login\"");
        let def_pos = pos_of("TechnicalProfile Id=\"Login\"");
        // fragments are serialized base-first: a reference may only look at
        // its own fragment or an earlier (more basic) one
        assert!(def_pos <= ref_pos);
    }

    #[test]
    fn test_no_progress_is_fatal() {
        // a single monolithic attribute can never be split
        let xml = format!(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="B2C_1A_P" TenantId="T1" Note="{a}"/>
               </TrustFrameworkPolicies>"#,
            a = filler(2_000),
        );
        let (mut doc, index) = parse(&xml);
        let policy = query::policies(&doc)[0];
        let err = split_policy(&mut doc, &index, policy, "T1", 500).unwrap_err();
        assert!(matches!(err, ConvertError::NoProgress { .. }));
    }
}
