//! FHIR StructureDefinition model
//!
//! Version-agnostic model for StructureDefinition resources

use super::element_definition::{Differential, ElementDefinition, Snapshot};
use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// FHIR StructureDefinition resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructureDefinition {
    /// Resource type - always "StructureDefinition"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// Logical id of this artifact
    #[serde(default)]
    pub id: String,

    /// Canonical identifier for this structure definition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Name for this structure definition (computer friendly)
    #[serde(default)]
    pub name: String,

    /// Natural language description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// primitive-type | complex-type | resource | logical
    pub kind: StructureDefinitionKind,

    /// Whether the structure is abstract
    #[serde(rename = "abstract", default)]
    pub abstract_: bool,

    /// If an extension, where it can be used in instances
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<ExtensionContext>>,

    /// Type defined or constrained by this structure
    #[serde(rename = "type")]
    pub type_: String,

    /// Definition that this type is constrained/specialized from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_definition: Option<String>,

    /// specialization | constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation: Option<TypeDerivationRule>,

    /// Snapshot view of the structure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,

    /// Differential view of the structure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differential: Option<Differential>,

    /// Additional content beyond core fields (meta, text, mappings, ...)
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

fn default_resource_type() -> String {
    "StructureDefinition".to_string()
}

/// Kind of structure definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructureDefinitionKind {
    PrimitiveType,
    ComplexType,
    Resource,
    Logical,
}

impl StructureDefinitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StructureDefinitionKind::PrimitiveType => "primitive-type",
            StructureDefinitionKind::ComplexType => "complex-type",
            StructureDefinitionKind::Resource => "resource",
            StructureDefinitionKind::Logical => "logical",
        }
    }
}

/// How a type relates to its base definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDerivationRule {
    Specialization,
    Constraint,
}

/// Where an extension may be used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionContext {
    #[serde(rename = "type")]
    pub type_: ExtensionContextType,
    pub expression: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionContextType {
    Fhirpath,
    Element,
    Extension,
}

impl StructureDefinition {
    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        match value.get("resourceType").and_then(Value::as_str) {
            Some("StructureDefinition") | None => {}
            Some(other) => {
                return Err(Error::InvalidResource(format!(
                    "expected StructureDefinition, got {}",
                    other
                )))
            }
        }
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    /// The canonical url, or "" when missing
    pub fn url_str(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }

    /// Check if this is a profile (constraint on another type)
    pub fn is_profile(&self) -> bool {
        self.derivation == Some(TypeDerivationRule::Constraint)
    }

    /// Check if this is a profile of Extension (directly or through another profile)
    pub fn is_extension_profile(&self) -> bool {
        self.type_ == "Extension" && self.is_profile()
    }

    /// Snapshot elements, empty when there is no snapshot
    pub fn snapshot_elements(&self) -> &[ElementDefinition] {
        self.snapshot
            .as_ref()
            .map(|s| s.element.as_slice())
            .unwrap_or_default()
    }

    /// Differential elements, empty when there is no differential
    pub fn differential_elements(&self) -> &[ElementDefinition] {
        self.differential
            .as_ref()
            .map(|d| d.element.as_slice())
            .unwrap_or_default()
    }

    /// `meta.lastUpdated`, if present
    pub fn last_updated(&self) -> Option<&str> {
        self.extensions
            .get("meta")
            .and_then(|meta| meta.get("lastUpdated"))
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_profile() {
        let sd = StructureDefinition::from_value(&json!({
            "resourceType": "StructureDefinition",
            "id": "birthPlace",
            "url": "http://hl7.org/fhir/StructureDefinition/patient-birthPlace",
            "name": "birthPlace",
            "kind": "complex-type",
            "abstract": false,
            "context": [{ "type": "element", "expression": "Patient" }],
            "type": "Extension",
            "baseDefinition": "http://hl7.org/fhir/StructureDefinition/Extension",
            "derivation": "constraint",
            "meta": { "lastUpdated": "2019-11-01T09:29:23.356+11:00" }
        }))
        .unwrap();

        assert!(sd.is_profile());
        assert!(sd.is_extension_profile());
        assert_eq!(sd.kind, StructureDefinitionKind::ComplexType);
        assert_eq!(sd.context.as_ref().unwrap()[0].expression, "Patient");
        assert_eq!(sd.last_updated(), Some("2019-11-01T09:29:23.356+11:00"));
        assert!(sd.snapshot_elements().is_empty());
    }

    #[test]
    fn test_rejects_other_resource_types() {
        let result = StructureDefinition::from_value(&json!({
            "resourceType": "ValueSet",
            "kind": "resource",
            "type": "ValueSet"
        }));
        assert!(matches!(result, Err(Error::InvalidResource(_))));
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(StructureDefinitionKind::PrimitiveType.as_str(), "primitive-type");
        let kind: StructureDefinitionKind = serde_json::from_value(json!("logical")).unwrap();
        assert_eq!(kind, StructureDefinitionKind::Logical);
    }
}
