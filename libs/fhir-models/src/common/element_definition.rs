//! FHIR ElementDefinition model
//!
//! Version-agnostic model for ElementDefinition (used in StructureDefinition snapshots and differentials)

use super::complex::*;
use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Extension url carrying an author-chosen type name for a nested element
pub const EXPLICIT_TYPE_NAME_URL: &str =
    "http://hl7.org/fhir/StructureDefinition/structuredefinition-explicit-type-name";

/// Extension url carrying the regex a primitive value must match
pub const REGEX_URL: &str = "http://hl7.org/fhir/StructureDefinition/regex";

/// FHIR ElementDefinition - defines an element in a resource or data type structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    /// Unique id for inter-element referencing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Path of the element in the hierarchy (e.g., "Patient.name")
    pub path: String,

    /// Extensions on the element itself (explicit type names and the like)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    /// Name for this particular element (in a slice)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice_name: Option<String>,

    /// Short label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,

    /// Full formal definition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,

    /// Minimum cardinality
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,

    /// Maximum cardinality (can be "*")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,

    /// Base definition information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<ElementDefinitionBase>,

    /// Reference to definition of content if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_reference: Option<String>,

    /// Data type and profile for this element
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<ElementDefinitionType>>,

    /// Condition that must evaluate to true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Vec<ElementDefinitionConstraint>>,

    /// If this modifies the meaning of other elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_modifier: Option<bool>,

    /// Include when in summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_summary: Option<bool>,

    /// ValueSet details if this is coded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<ElementDefinitionBinding>,

    /// If this element must be supported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_support: Option<bool>,

    /// Additional content beyond core fields (`fixed[x]`, `pattern[x]`, mappings, ...)
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// Base definition information for an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDefinitionBase {
    /// Path that identifies the base element
    pub path: String,

    /// Min cardinality of the base element
    pub min: u32,

    /// Max cardinality of the base element
    pub max: String,
}

/// Data type for an element
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinitionType {
    /// Data type code
    pub code: String,

    /// Extensions on the type (e.g. the primitive regex)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    /// Profile (StructureDefinition canonical URLs) that apply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Vec<String>>,

    /// Profile (StructureDefinition) for Reference/canonical target types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_profile: Option<Vec<String>>,
}

impl ElementDefinitionType {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    /// The only profile on this type, if exactly one non-empty profile is given
    pub fn single_profile(&self) -> Option<&str> {
        match self.profile.as_deref() {
            Some([profile]) if !profile.is_empty() => Some(profile),
            _ => None,
        }
    }

    pub fn profile_count(&self) -> usize {
        self.profile.as_ref().map_or(0, Vec::len)
    }

    pub fn target_profiles(&self) -> impl Iterator<Item = &str> {
        self.target_profile
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|profile| !profile.is_empty())
    }
}

/// Constraint on an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDefinitionConstraint {
    /// Target of 'condition' reference
    pub key: String,

    /// Severity (error | warning)
    pub severity: ConstraintSeverity,

    /// Human description of constraint
    pub human: String,

    /// FHIRPath expression of constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Reference to original source of constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Severity of a constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintSeverity {
    Error,
    Warning,
}

/// ValueSet binding for a coded element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinitionBinding {
    /// Binding strength (required | extensible | preferred | example)
    pub strength: BindingStrength,

    /// Human explanation of the value set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Source of value set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_set: Option<String>,
}

/// Snapshot - a set of elements that define the structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub element: Vec<ElementDefinition>,
}

/// Differential - a set of elements that define changes from the base
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Differential {
    pub element: Vec<ElementDefinition>,
}

impl Snapshot {
    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }
}

impl Differential {
    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }
}

impl ElementDefinition {
    /// Element with the given id and path
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            path: path.into(),
            ..Default::default()
        }
    }

    /// The element id, falling back to the path for id-less elements
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.path)
    }

    /// Check if this element has a slice name
    pub fn is_slice(&self) -> bool {
        self.slice_name.is_some()
    }

    /// Path of the base element, or "" when there is no base
    pub fn base_path(&self) -> &str {
        self.base.as_ref().map_or("", |base| base.path.as_str())
    }

    /// Declared types, empty for content references
    pub fn types(&self) -> &[ElementDefinitionType] {
        self.types.as_deref().unwrap_or_default()
    }

    /// Code of the first declared type
    pub fn first_type_code(&self) -> Option<&str> {
        self.types().first().map(|t| t.code.as_str())
    }

    /// Number of distinct type codes (multiple Reference entries count once)
    pub fn distinct_type_count(&self) -> usize {
        let mut seen: Vec<&str> = Vec::new();
        for t in self.types() {
            if !seen.contains(&t.code.as_str()) {
                seen.push(&t.code);
            }
        }
        seen.len()
    }

    /// Whether max is "0", meaning the element is removed
    pub fn is_prohibited(&self) -> bool {
        self.max.as_deref() == Some("0")
    }

    /// A `fixed[x]` value by its element name, e.g. `fixed_value("fixedUri")`
    pub fn fixed_value(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    /// `fixedUri`, if present
    pub fn fixed_uri(&self) -> Option<&str> {
        self.fixed_value("fixedUri").and_then(Value::as_str)
    }

    /// `fixedCode`, if present
    pub fn fixed_code(&self) -> Option<&str> {
        self.fixed_value("fixedCode").and_then(Value::as_str)
    }

    /// Value of the explicit-type-name extension, if any
    pub fn explicit_type_name(&self) -> Option<&str> {
        extensions_with_url(self.extension.as_deref(), EXPLICIT_TYPE_NAME_URL)
            .find_map(Extension::value_string)
    }

    /// FHIRPath expressions of all constraints that carry one
    pub fn constraint_expressions(&self) -> impl Iterator<Item = &str> {
        self.constraint
            .iter()
            .flatten()
            .filter_map(|c| c.expression.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_element(path: &str, max: Option<&str>) -> ElementDefinition {
        ElementDefinition {
            max: max.map(|s| s.to_string()),
            ..ElementDefinition::new(path, path)
        }
    }

    #[test]
    fn test_prohibited() {
        assert!(make_element("Patient.photo", Some("0")).is_prohibited());
        assert!(!make_element("Patient.name", Some("*")).is_prohibited());
        assert!(!make_element("Patient.gender", Some("1")).is_prohibited());
    }

    #[test]
    fn test_distinct_type_count_collapses_references() {
        let mut elem = make_element("Observation.subject", Some("1"));
        elem.types = Some(vec![
            ElementDefinitionType::new("Reference"),
            ElementDefinitionType::new("Reference"),
        ]);
        assert_eq!(elem.distinct_type_count(), 1);
        assert_eq!(elem.types().len(), 2);
    }

    #[test]
    fn test_fixed_values_from_json() {
        let elem: ElementDefinition = serde_json::from_value(json!({
            "id": "Extension.url",
            "path": "Extension.url",
            "fixedUri": "http://example.org/ext",
            "base": { "path": "Extension.url", "min": 1, "max": "1" }
        }))
        .unwrap();

        assert_eq!(elem.fixed_uri(), Some("http://example.org/ext"));
        assert_eq!(elem.fixed_code(), None);
        assert_eq!(elem.base_path(), "Extension.url");
    }

    #[test]
    fn test_explicit_type_name() {
        let mut elem = make_element("Bundle.entry", Some("*"));
        elem.extension = Some(vec![Extension::new(
            EXPLICIT_TYPE_NAME_URL,
            "valueString",
            json!("Entry"),
        )]);
        assert_eq!(elem.explicit_type_name(), Some("Entry"));
    }

    #[test]
    fn test_id_falls_back_to_path() {
        let elem = ElementDefinition {
            path: "Patient.name".to_string(),
            ..Default::default()
        };
        assert_eq!(elem.id(), "Patient.name");
    }
}
