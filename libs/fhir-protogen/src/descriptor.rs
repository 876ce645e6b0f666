//! Descriptor model
//!
//! A serde-friendly mirror of protobuf's `FileDescriptorProto` family, carrying
//! the FHIR annotations as typed option fields.

use ferrum_models::StructureDefinitionKind;
use serde::{Deserialize, Serialize};

/// A generated file: one package of messages plus its imports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDescriptor {
    pub package: String,
    pub syntax: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    pub options: FileOptions,
    pub message_types: Vec<MessageDescriptor>,
}

impl FileDescriptor {
    pub fn message_type(&self, name: &str) -> Option<&MessageDescriptor> {
        self.message_types.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_package: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub java_multiple_files: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub go_package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fhir_version: Option<String>,
}

/// A message type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nested_types: Vec<MessageDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_types: Vec<EnumDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub oneof_decls: Vec<OneofDescriptor>,
    pub options: MessageOptions,
}

impl MessageDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Field by name; reserved placeholders have no name and never match
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| !f.is_reserved() && f.name == name)
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }

    pub fn nested_type(&self, name: &str) -> Option<&MessageDescriptor> {
        self.nested_types.iter().find(|m| m.name == name)
    }

    pub fn max_field_number(&self) -> u32 {
        self.fields.iter().map(|f| f.number).max().unwrap_or(0)
    }
}

/// Message-level FHIR annotations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure_definition_kind: Option<StructureDefinitionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure_definition_url: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract_type: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_choice_type: bool,
    /// Canonical urls of every definition in the constraint chain, nearest first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profile_base: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_set_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_system: Option<String>,
}

/// A field, or a reserved placeholder holding a tag number
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDescriptor {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<FieldLabel>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oneof_index: Option<u32>,
    pub options: FieldOptions,
}

impl FieldDescriptor {
    /// A placeholder keeping `number` out of use, with the reason it is unused
    pub fn reserved(number: u32, reason: impl Into<String>) -> Self {
        Self {
            number,
            options: FieldOptions {
                reserved_reason: Some(reason.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn is_reserved(&self) -> bool {
        self.options.reserved_reason.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLabel {
    Optional,
    Repeated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Message,
    Enum,
    String,
    Bool,
    Int64,
    Sint32,
    Uint32,
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Requirement {
    RequiredByFhir,
}

/// Field-level FHIR annotations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_requirement: Option<Requirement>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fhir_path_constraint: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inlined_extension_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub valid_reference_type: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inlined_coding_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inlined_coding_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumDescriptor {
    pub name: String,
    pub values: Vec<EnumValueDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumValueDescriptor {
    pub name: String,
    pub number: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneofDescriptor {
    pub name: String,
}

/// A message type name paired with the package it lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedType {
    pub type_name: String,
    pub package: String,
}

impl QualifiedType {
    pub fn new(type_name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            package: package.into(),
        }
    }

    /// Fully qualified form with a leading dot, e.g. `.google.fhir.r4.core.String`
    pub fn to_qualified_string(&self) -> String {
        format!(".{}.{}", self.package, self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn qualified_type_string() {
        let qt = QualifiedType::new("Patient.Contact", "my.pkg");
        assert_eq!(qt.to_qualified_string(), ".my.pkg.Patient.Contact");
    }

    #[test]
    fn reserved_fields_are_skipped_by_name_lookup() {
        let mut message = MessageDescriptor::new("Patient");
        message.fields.push(FieldDescriptor::reserved(3, "Patient.photo not present on profile."));

        assert!(message.fields[0].is_reserved());
        assert!(message.field("").is_none());
        assert_eq!(message.max_field_number(), 3);
        assert!(message.field_by_number(3).is_some());
    }

    #[test]
    fn serializes_compactly() {
        let field = FieldDescriptor {
            name: "gender".to_string(),
            number: 2,
            label: Some(FieldLabel::Optional),
            field_type: Some(FieldType::Message),
            type_name: Some(".core.Code".to_string()),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&field).unwrap(),
            json!({
                "name": "gender",
                "number": 2,
                "label": "optional",
                "type": "message",
                "type_name": ".core.Code",
                "options": {}
            })
        );
    }
}
