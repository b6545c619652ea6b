//! Reference schema over the policy object types.
//!
//! The declarative table below records every location in a policy document
//! that can hold a reference to an identifiable object, keyed by the locator
//! that carries the target id. It is inverted once into "object type →
//! incoming reference locations" for reachability queries.

use std::fmt;

use crate::error::{ConvertError, Result};

/// The object types that can be referenced by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    UserJourney,
    TechnicalProfile,
    ClientDefinition,
    ClaimsTransformation,
    ClaimType,
    ContentDefinition,
    LocalizedResources,
}

impl ObjectType {
    /// All object types, in schema order
    pub const ALL: [ObjectType; 7] = [
        ObjectType::UserJourney,
        ObjectType::TechnicalProfile,
        ObjectType::ClientDefinition,
        ObjectType::ClaimsTransformation,
        ObjectType::ClaimType,
        ObjectType::ContentDefinition,
        ObjectType::LocalizedResources,
    ];

    /// Path of the element that defines an object of this type
    pub fn definition_path(&self) -> &'static str {
        match self {
            ObjectType::UserJourney => "UserJourney",
            ObjectType::TechnicalProfile => "TechnicalProfile",
            ObjectType::ClientDefinition => "ClientDefinitions/ClientDefinition",
            ObjectType::ClaimsTransformation => "ClaimsTransformation",
            ObjectType::ClaimType => "ClaimType",
            ObjectType::ContentDefinition => "ContentDefinition",
            ObjectType::LocalizedResources => "LocalizedResources",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition_path())
    }
}

/// Where a reference location carries its target id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefLocator {
    /// In a named attribute (`@ReferenceId`)
    Attribute(String),
    /// In the element's text content (`text()`)
    Text,
}

impl RefLocator {
    fn parse(locator: &str) -> Result<RefLocator> {
        if let Some(name) = locator.strip_prefix('@') {
            if !name.is_empty() {
                return Ok(RefLocator::Attribute(name.to_string()));
            }
        }
        if locator == "text()" {
            return Ok(RefLocator::Text);
        }
        Err(ConvertError::InvalidLocator {
            locator: locator.to_string(),
        })
    }
}

/// One step of a relative element path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    /// Attribute-equality constraint (`Item[@Key="..."]`)
    pub attr_eq: Option<(String, String)>,
}

/// A relative element path, matched against consecutive parent/child chains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPath {
    pub segments: Vec<PathSegment>,
}

impl ElementPath {
    pub fn parse(path: &str) -> ElementPath {
        let segments = path.split('/').map(parse_segment).collect();
        ElementPath { segments }
    }
}

fn parse_segment(segment: &str) -> PathSegment {
    if let Some((name, predicate)) = segment.split_once("[@") {
        if let Some(predicate) = predicate.strip_suffix("\"]") {
            if let Some((key, value)) = predicate.split_once("=\"") {
                return PathSegment {
                    name: name.to_string(),
                    attr_eq: Some((key.to_string(), value.to_string())),
                };
            }
        }
    }
    PathSegment {
        name: segment.to_string(),
        attr_eq: None,
    }
}

struct RawEntry {
    locator: &'static str,
    targets: &'static [(ObjectType, &'static [&'static str])],
}

/// Every object reference location the converter has to track
const REFERENCE_TABLE: &[RawEntry] = &[
    RawEntry {
        locator: "@ReferenceId",
        targets: &[
            (ObjectType::UserJourney, &["DefaultUserJourney"]),
            (
                ObjectType::TechnicalProfile,
                &[
                    "AuthorizationTechnicalProfile",
                    "ValidationTechnicalProfile",
                    "IncludeTechnicalProfile",
                    "UseTechnicalProfileForSessionManagement",
                ],
            ),
            (ObjectType::ClientDefinition, &["OrchestrationStep/ClientDefinition"]),
            (
                ObjectType::ClaimsTransformation,
                &["OutputClaimsTransformation", "InputClaimsTransformation"],
            ),
        ],
    },
    RawEntry {
        locator: "@TechnicalProfileReferenceId",
        targets: &[(ObjectType::TechnicalProfile, &["ClaimsExchange"])],
    },
    RawEntry {
        locator: "@CpimIssuerTechnicalProfileReferenceId",
        targets: &[(ObjectType::TechnicalProfile, &["OrchestrationStep"])],
    },
    RawEntry {
        locator: "@ClaimTypeReferenceId",
        targets: &[(
            ObjectType::ClaimType,
            &["InputClaim", "OutputClaim", "PersistedClaim"],
        )],
    },
    RawEntry {
        locator: "text()",
        targets: &[
            (ObjectType::ClaimType, &["Value"]),
            (
                ObjectType::ContentDefinition,
                &["TechnicalProfile/Metadata/Item[@Key=\"ContentDefinitionReferenceId\"]"],
            ),
        ],
    },
    RawEntry {
        locator: "@ElementId",
        targets: &[
            (ObjectType::ClaimType, &["LocalizedCollection", "LocalizedString"]),
            (ObjectType::ContentDefinition, &["Item"]),
        ],
    },
    RawEntry {
        locator: "@ContentDefinitionReferenceId",
        targets: &[(ObjectType::ContentDefinition, &["OrchestrationStep"])],
    },
    RawEntry {
        locator: "@LocalizedResourcesReferenceId",
        targets: &[(ObjectType::LocalizedResources, &["LocalizedResourcesReference"])],
    },
];

/// An incoming reference location for some object type
#[derive(Debug, Clone)]
pub struct ReferenceSource {
    pub path: ElementPath,
    pub locator: RefLocator,
}

/// The reference table inverted into "object type → incoming locations",
/// with definition paths pre-parsed. Built once per run, read-only after.
#[derive(Debug)]
pub struct ReferenceIndex {
    by_type: Vec<(ObjectType, ElementPath, Vec<ReferenceSource>)>,
}

impl ReferenceIndex {
    pub fn build() -> Result<ReferenceIndex> {
        let mut by_type: Vec<(ObjectType, ElementPath, Vec<ReferenceSource>)> = ObjectType::ALL
            .iter()
            .map(|&t| (t, ElementPath::parse(t.definition_path()), Vec::new()))
            .collect();

        for entry in REFERENCE_TABLE {
            let locator = RefLocator::parse(entry.locator)?;
            for (object_type, from_paths) in entry.targets {
                let slot = by_type
                    .iter_mut()
                    .find(|(t, _, _)| t == object_type)
                    .map(|(_, _, sources)| sources);
                if let Some(sources) = slot {
                    for &path in *from_paths {
                        sources.push(ReferenceSource {
                            path: ElementPath::parse(path),
                            locator: locator.clone(),
                        });
                    }
                }
            }
        }

        Ok(ReferenceIndex { by_type })
    }

    /// Object types in schema order
    pub fn object_types(&self) -> impl Iterator<Item = ObjectType> + '_ {
        self.by_type.iter().map(|(t, _, _)| *t)
    }

    /// Pre-parsed definition path for an object type
    pub fn definition_path(&self, object_type: ObjectType) -> &ElementPath {
        // ALL covers every variant, so the lookup cannot miss
        self.by_type
            .iter()
            .find(|(t, _, _)| *t == object_type)
            .map(|(_, path, _)| path)
            .unwrap_or(&self.by_type[0].1)
    }

    /// Incoming reference locations for an object type
    pub fn sources(&self, object_type: ObjectType) -> &[ReferenceSource] {
        self.by_type
            .iter()
            .find(|(t, _, _)| *t == object_type)
            .map(|(_, _, sources)| sources.as_slice())
            .unwrap_or(&[])
    }
}
