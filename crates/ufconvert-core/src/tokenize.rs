//! Mechanical substitution of first-party identifiers and removal of
//! first-party policy constraint blocks.
//!
//! The substitution runs on the raw text before parsing, so placeholder
//! tokens land everywhere the identifiers appear, attributes and text alike.

use regex::RegexBuilder;
use tracing::warn;

use crate::dom::{Document, NodeId};

/// Well-known first-party object identifiers found in exported user flows
pub mod first_party {
    /// Identity Experience Framework client application
    pub const IEF_APP_ID: &str = "1d2e42b6-7685-4d2c-82c2-7318fce0d740";
    /// Proxy IEF application ("CPIM Service" in enterprise applications)
    pub const PROXY_IEF_APP_ID: &str = "bb2a2e3a-c5e7-4f0a-88e0-8e01fd3fc1f4";
    pub const JWT_TOKEN_SIGNING_KEY_CONTAINER: &str = "JwtTokenSigningKeyContainer";
    pub const SIGNING_KEY_CONTAINER: &str = "SigningKeyContainer";
    pub const ID_TOKEN_SIGNING_KEY_CONTAINER: &str = "IdTokenSigningKeyContainer";
    pub const REFRESH_TOKEN_ENCRYPTION_KEY_CONTAINER: &str = "RefreshTokenEncryptionKeyContainer";
}

fn substitutions() -> Vec<(String, &'static str)> {
    vec![
        (
            regex::escape(first_party::IEF_APP_ID),
            "{{config.identityExperienceFrameworkAppId}}",
        ),
        (
            regex::escape(first_party::PROXY_IEF_APP_ID),
            "{{config.proxyIdentityExperienceFrameworkAppId}}",
        ),
        (
            format!(
                "StorageReferenceId=\"{}\"",
                first_party::JWT_TOKEN_SIGNING_KEY_CONTAINER
            ),
            "StorageReferenceId=\"{{config.tokenSigningKeyContainerName}}\"",
        ),
        (
            format!(
                "StorageReferenceId=\"{}\"",
                first_party::SIGNING_KEY_CONTAINER
            ),
            "StorageReferenceId=\"{{config.tokenSigningKeyContainerName}}\"",
        ),
        (
            format!(
                "StorageReferenceId=\"{}\"",
                first_party::ID_TOKEN_SIGNING_KEY_CONTAINER
            ),
            "StorageReferenceId=\"{{config.tokenSigningKeyContainerName}}\"",
        ),
        (
            format!(
                "StorageReferenceId=\"{}\"",
                first_party::REFRESH_TOKEN_ENCRYPTION_KEY_CONTAINER
            ),
            "StorageReferenceId=\"{{config.tokenEncryptionKeyContainerName}}\"",
        ),
    ]
}

/// Replace first-party object references with template placeholders
pub fn replace_first_party_refs(xml: &str) -> String {
    let mut out = xml.to_string();
    for (pattern, replacement) in substitutions() {
        let re = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(re) => re,
            Err(e) => {
                warn!(error = %e, pattern = %pattern, "failed to compile substitution pattern");
                continue;
            }
        };
        out = re.replace_all(&out, replacement).into_owned();
    }
    out
}

/// Detach every first-party `PolicyConstraints` block from the document
pub fn remove_policy_constraints(doc: &mut Document) {
    let constraints: Vec<NodeId> = doc
        .descendant_elements(doc.root())
        .into_iter()
        .filter(|&el| doc.local_name(el) == Some("PolicyConstraints"))
        .collect();
    for node in constraints {
        tracing::debug!("removing policy constraints block");
        doc.detach(node);
    }
}
