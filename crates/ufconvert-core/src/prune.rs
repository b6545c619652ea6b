//! Removal of localized-resource references for undeclared languages.

use std::collections::HashSet;

use tracing::info;

use crate::dom::{Document, NodeId};
use crate::query;
use crate::schema::ElementPath;

/// Detach every `LocalizedResourcesReference` whose language the policy set
/// does not declare as supported.
///
/// The supported set is the superset of `SupportedLanguages` entries across
/// all content definitions; merge behavior options are ignored. Only the
/// reference is removed, never the underlying resource.
pub fn remove_unsupported_language_references(doc: &mut Document) {
    info!("removing unsupported language resource references");

    let languages_path = ElementPath::parse("SupportedLanguages/SupportedLanguage");
    let languages: HashSet<String> = query::match_path(doc, doc.root(), &languages_path)
        .into_iter()
        .map(|el| doc.text_content(el).trim().to_string())
        .filter(|lang| !lang.is_empty())
        .collect();

    let references: Vec<NodeId> = doc
        .descendant_elements(doc.root())
        .into_iter()
        .filter(|&el| doc.local_name(el) == Some("LocalizedResourcesReference"))
        .collect();

    for reference in references {
        let Some(language) = doc.attr(reference, "Language").map(str::to_string) else {
            continue;
        };
        if !languages.contains(&language) {
            let resource = doc
                .attr(reference, "LocalizedResourcesReferenceId")
                .unwrap_or("unknown");
            info!(
                resource = resource,
                language = %language,
                "removing localized resource reference"
            );
            doc.detach(reference);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::parse(
            r#"<TrustFrameworkPolicies>
                 <TrustFrameworkPolicy PolicyId="P" TenantId="t">
                   <ContentDefinition Id="api.signup">
                     <SupportedLanguages>
                       <SupportedLanguage>en</SupportedLanguage>
                       <SupportedLanguage>fr</SupportedLanguage>
                     </SupportedLanguages>
                     <LocalizedResourcesReference Language="en" LocalizedResourcesReferenceId="api.signup.en"/>
                     <LocalizedResourcesReference Language="de" LocalizedResourcesReferenceId="api.signup.de"/>
                   </ContentDefinition>
                   <LocalizedResources Id="api.signup.de"/>
                 </TrustFrameworkPolicy>
               </TrustFrameworkPolicies>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_removes_undeclared_language_reference() {
        let mut d = doc();
        remove_unsupported_language_references(&mut d);
        let xml = d.to_xml();
        assert!(xml.contains("api.signup.en"));
        assert!(!xml.contains(r#"Language="de""#));
    }

    #[test]
    fn test_keeps_underlying_resource() {
        let mut d = doc();
        remove_unsupported_language_references(&mut d);
        // the LocalizedResources definition itself stays; only the
        // reference goes away
        assert!(d.to_xml().contains(r#"<LocalizedResources Id="api.signup.de"/>"#));
    }

    #[test]
    fn test_idempotent() {
        let mut d = doc();
        remove_unsupported_language_references(&mut d);
        let once = d.to_xml();
        remove_unsupported_language_references(&mut d);
        assert_eq!(d.to_xml(), once);
    }
}
