//! Policy id and tenant normalization.
//!
//! Custom policy ids must carry the `B2C_1A_` prefix; exported user flows
//! arrive with `B2C_1_` ids or bare names. Every policy in the set is also
//! rewritten to the home tenant (the first policy's tenant in document
//! order), or to a template placeholder when the output is meant to be
//! reused across tenants.

use tracing::info;

use crate::dom::{Document, NodeId};
use crate::error::{ConvertError, Result};
use crate::query::POLICY_TAG;

pub const TARGET_ID_PREFIX: &str = "B2C_1A_";
pub const LEGACY_ID_PREFIX: &str = "B2C_1_";

/// Placeholder written in place of the home tenant when tokenizing
pub const TENANT_DOMAIN_TOKEN: &str = "{{config.tenantDomain}}";

/// Bring a policy id into the custom-policy naming convention
pub fn compliant_policy_id(policy_id: &str) -> String {
    if policy_id.starts_with(TARGET_ID_PREFIX) {
        return policy_id.to_string();
    }
    let renamed = match policy_id.strip_prefix(LEGACY_ID_PREFIX) {
        Some(rest) => format!("{TARGET_ID_PREFIX}{rest}"),
        None => format!("{TARGET_ID_PREFIX}{policy_id}"),
    };
    info!(
        from = policy_id,
        to = %renamed,
        "renaming policy to comply with custom policy naming requirements"
    );
    renamed
}

/// The authoritative tenant for the whole set: the leaf policy's declared
/// tenant, or the template token when tokenizing
pub fn resolve_home_tenant(
    doc: &Document,
    policies: &[NodeId],
    tokenize: bool,
) -> Result<String> {
    if tokenize {
        return Ok(TENANT_DOMAIN_TOKEN.to_string());
    }
    policies
        .first()
        .and_then(|&p| doc.attr(p, "TenantId"))
        .filter(|tenant| !tenant.trim().is_empty())
        .map(str::to_string)
        .ok_or(ConvertError::NoHomeTenant)
}

/// How a policy's tenant was rewritten, if it was
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantRewrite {
    /// The policy declared a different tenant and will be imported from it
    Imported { from: String },
    /// The literal tenant value was replaced with the template token
    Tokenized,
}

/// Rewrite a policy's tenant to the home value where it differs
pub fn reconcile_tenant(
    doc: &mut Document,
    policy: NodeId,
    home_tenant: &str,
    tokenize: bool,
) -> Result<Option<TenantRewrite>> {
    let tenant = match doc.attr(policy, "TenantId") {
        Some(tenant) => tenant.to_string(),
        None if tokenize => String::new(),
        None => {
            return Err(ConvertError::missing_attribute(POLICY_TAG, "TenantId"));
        }
    };
    if tenant.eq_ignore_ascii_case(home_tenant) {
        return Ok(None);
    }

    let policy_id = doc.attr(policy, "PolicyId").unwrap_or_default().to_string();
    let rewrite = if tokenize {
        info!(policy = %policy_id, tenant = %tenant, "tokenizing tenant value");
        TenantRewrite::Tokenized
    } else {
        info!(
            policy = %policy_id,
            tenant = %tenant,
            "policy will be imported from another tenant"
        );
        TenantRewrite::Imported { from: tenant }
    };
    doc.set_attr(policy, "TenantId", home_tenant);
    Ok(Some(rewrite))
}

/// Reconcile a policy's base reference with the resolved tenant, renaming
/// its target to the compliant form or to an explicitly supplied id.
///
/// With no existing `BasePolicy` and a supplied id, a new reference is
/// synthesized as the policy's first child. The terminal base policy has
/// neither and is left alone.
pub fn update_base_policy_reference(
    doc: &mut Document,
    policy: NodeId,
    tenant: &str,
    base_policy_id: Option<&str>,
) {
    if let Some(base) = doc.child_element_named(policy, "BasePolicy") {
        if let Some(tenant_el) = doc.child_element_named(base, "TenantId") {
            if !doc.text_content(tenant_el).eq_ignore_ascii_case(tenant) {
                doc.set_text_content(tenant_el, tenant);
            }
        }
        if let Some(id_el) = doc.child_element_named(base, "PolicyId") {
            let new_id = match base_policy_id {
                Some(id) => id.to_string(),
                None => compliant_policy_id(doc.text_content(id_el).trim()),
            };
            doc.set_text_content(id_el, &new_id);
        }
    } else if let Some(base_policy_id) = base_policy_id {
        let base = doc.create_element("BasePolicy");
        let tenant_el = doc.create_element("TenantId");
        doc.set_text_content(tenant_el, tenant);
        doc.append_child(base, tenant_el);
        let id_el = doc.create_element("PolicyId");
        doc.set_text_content(id_el, base_policy_id);
        doc.append_child(base, id_el);
        // first child, to keep the chain pointer easy to spot
        doc.insert_first_child(policy, base);
    }
}

/// Normalize one policy: compliant id, reconciled tenant, updated base
/// reference. Returns the compliant policy id.
pub fn normalize_policy(
    doc: &mut Document,
    policy: NodeId,
    home_tenant: &str,
    tokenize: bool,
) -> Result<String> {
    let policy_id = doc
        .attr(policy, "PolicyId")
        .ok_or_else(|| ConvertError::missing_attribute(POLICY_TAG, "PolicyId"))?
        .to_string();
    info!(policy = %policy_id, "processing policy");

    let compliant = compliant_policy_id(&policy_id);
    doc.set_attr(policy, "PolicyId", &compliant);

    reconcile_tenant(doc, policy, home_tenant, tokenize)?;
    update_base_policy_reference(doc, policy, home_tenant, None);

    Ok(compliant)
}
