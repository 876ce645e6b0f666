//! Descriptor generation
//!
//! [`ProtoGenerator`] walks the snapshot of a definition and produces one
//! message descriptor per definition, plus nested messages for containers,
//! choice types and specialized coded types. Field tags follow snapshot
//! order, with slices appended after every unsliced sibling, so a profile
//! keeps the tags of the type it constrains.
//!
//! A generator owns a container-name cache keyed by element id. Use one
//! generator per coherent batch of definitions.

mod contained;
mod field;
mod message;
mod primitive;
mod resolve;

use crate::classify;
use crate::config::PackageInfo;
use crate::descriptor::{FileDescriptor, FileOptions, MessageDescriptor, MessageOptions};
use crate::elements;
use crate::error::{Error, Result};
use crate::naming::{self, ContainerNamer};
use crate::registry::Registry;
use ferrum_models::{
    canonical_uri, ElementDefinition, StructureDefinition, StructureDefinitionKind,
};
use ferrum_snapshot::{normalize_structure_definition, reconcile};
use std::collections::BTreeSet;

/// Syntax of every generated file
pub const PROTO_SYNTAX: &str = "proto3";

/// Generates descriptors for definitions known to a [`Registry`]
#[derive(Debug)]
pub struct ProtoGenerator<'r> {
    registry: &'r Registry,
    package_info: PackageInfo,
    namer: ContainerNamer,
}

impl<'r> ProtoGenerator<'r> {
    pub fn new(registry: &'r Registry, package_info: PackageInfo) -> Self {
        Self {
            registry,
            package_info,
            namer: ContainerNamer::new(),
        }
    }

    pub fn package_info(&self) -> &PackageInfo {
        &self.package_info
    }

    fn local_package(&self) -> &str {
        &self.package_info.proto_package
    }

    fn core_package(&self) -> &'r str {
        &self.registry.core().core_package
    }

    /// Generate the message for one definition.
    ///
    /// The input is normalized and reconciled on a copy; it is never modified.
    pub fn generate_proto(&mut self, definition: &StructureDefinition) -> Result<MessageDescriptor> {
        let mut normalized = definition.clone();
        normalize_structure_definition(&mut normalized);
        elements::validate_element_ids(&normalized)?;
        let sd = reconcile(&normalized);

        let url = sd
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::MissingUrl(sd.id.clone()))?;
        let registry = self.registry;
        let data = registry
            .definition(url)
            .ok_or_else(|| Error::NotRegistered(url.to_string()))?;
        if data.package != self.package_info.proto_package
            && !classify::is_single_typed_extension_definition(&data.definition)?
        {
            return Err(Error::PackageMismatch {
                url: url.to_string(),
                registered: data.package.clone(),
                requested: self.package_info.proto_package.clone(),
            });
        }

        let all = sd.snapshot_elements();
        let root = all
            .first()
            .ok_or_else(|| Error::MissingSnapshot(url.to_string()))?;

        let mut message = MessageDescriptor {
            options: MessageOptions {
                structure_definition_kind: Some(sd.kind),
                message_description: Some(message_description(&sd, root, url)),
                structure_definition_url: Some(url.to_string()),
                is_abstract_type: sd.abstract_,
                ..Default::default()
            },
            ..Default::default()
        };

        if sd.kind == StructureDefinitionKind::PrimitiveType {
            self.generate_primitive_value(&sd, &mut message)?;
        }

        let mut message = self.generate_message(root, all, message)?;

        if sd.is_profile() {
            let name = naming::type_name(&sd);
            replace_type(&mut message, &sd.type_, &name);
            message.name = name;

            let mut current: &StructureDefinition = &sd;
            while current.is_profile() {
                let Some(base_url) = current.base_definition.as_deref().map(canonical_uri) else {
                    break;
                };
                message.options.profile_base.push(base_url.to_string());
                current = &registry
                    .definition(base_url)
                    .ok_or_else(|| Error::NotRegistered(base_url.to_string()))?
                    .definition;
            }
        }

        tracing::debug!(
            url,
            message = %message.name,
            fields = message.fields.len(),
            nested = message.nested_types.len(),
            "generated message"
        );
        Ok(message)
    }

    /// Generate a file holding one message per definition, with its imports.
    ///
    /// A core file is imported when the batch uses one of its types without
    /// defining any of them.
    pub fn generate_file_descriptor(
        &mut self,
        definitions: &[StructureDefinition],
    ) -> Result<FileDescriptor> {
        let package_info = &self.package_info;
        let registry = self.registry;
        let core = registry.core();

        let mut options = FileOptions {
            fhir_version: Some(core.fhir_version.clone()),
            ..Default::default()
        };
        if !package_info.java_proto_package.is_empty() {
            options.java_package = Some(package_info.java_proto_package.clone());
            options.java_multiple_files = true;
        }
        if !package_info.go_proto_package.is_empty() {
            options.go_package = Some(package_info.go_proto_package.clone());
        }

        let mut file = FileDescriptor {
            package: package_info.proto_package.clone(),
            syntax: PROTO_SYNTAX.to_string(),
            options,
            ..Default::default()
        };
        for definition in definitions {
            let message = self.generate_proto(definition)?;
            file.message_types.push(message);
        }

        file.dependencies.push(core.annotations_path.clone());
        for (file_name, types) in &core.core_types_by_file {
            if needs_dependency(&file, &core.core_package, types) {
                file.dependencies.push(core.import_path(file_name));
            }
        }
        Ok(file)
    }
}

/// "Auto-generated from ..." description of a definition's message
fn message_description(sd: &StructureDefinition, root: &ElementDefinition, url: &str) -> String {
    let mut description = format!("Auto-generated from StructureDefinition for {}", sd.name);
    if let Some(last_updated) = sd.last_updated() {
        description.push_str(", last updated ");
        description.push_str(last_updated);
    }
    description.push('.');
    if let Some(short) = root.short.as_deref() {
        description.push('\n');
        description.push_str(&short.replace('\r', "\n"));
        if !short.ends_with('.') {
            description.push('.');
        }
    }
    description.push_str("\nSee ");
    description.push_str(url);
    description
}

/// Whether the file uses a type from `types` without defining one of them.
///
/// `RelatedArtifact` is ignored as a definition: an extension shares its name.
fn needs_dependency(file: &FileDescriptor, core_package: &str, types: &BTreeSet<String>) -> bool {
    let defines_type = file.message_types.iter().any(|message| {
        message.name != "RelatedArtifact"
            && types.contains(&format!("{}.{}", core_package, message.name))
    });
    if defines_type {
        return false;
    }
    file.message_types
        .iter()
        .any(|message| uses_type_from_set(message, types))
}

fn uses_type_from_set(message: &MessageDescriptor, types: &BTreeSet<String>) -> bool {
    let uses_directly = message.fields.iter().any(|field| {
        field
            .type_name
            .as_deref()
            .and_then(|type_name| type_name.strip_prefix('.'))
            .is_some_and(|type_name| types.contains(type_name))
    });
    uses_directly
        || message
            .nested_types
            .iter()
            .any(|nested| uses_type_from_set(nested, types))
}

/// Rename the `from` segment of nested type names to `to`, e.g.
/// `.pkg.Patient.Contact` to `.pkg.MyPatient.Contact`
fn replace_type(message: &mut MessageDescriptor, from: &str, to: &str) {
    replace_segment(message, &format!(".{}.", from), &format!(".{}.", to));
}

fn replace_segment(message: &mut MessageDescriptor, from: &str, to: &str) {
    for field in &mut message.fields {
        if let Some(type_name) = field.type_name.as_mut() {
            if type_name.contains(from) {
                *type_name = type_name.replacen(from, to, 1);
            }
        }
    }
    for nested in &mut message.nested_types {
        replace_segment(nested, from, to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldDescriptor;

    fn message_with_field(name: &str, type_name: &str) -> MessageDescriptor {
        let mut message = MessageDescriptor::new(name);
        message.fields.push(FieldDescriptor {
            name: "field".to_string(),
            number: 1,
            type_name: Some(type_name.to_string()),
            ..Default::default()
        });
        message
    }

    #[test]
    fn replace_type_renames_nested_references() {
        let mut message = message_with_field("Patient", ".my.pkg.Patient.Contact");
        message
            .nested_types
            .push(message_with_field("Contact", ".my.pkg.Patient.Contact.Name"));

        replace_type(&mut message, "Patient", "MyPatient");

        assert_eq!(
            message.fields[0].type_name.as_deref(),
            Some(".my.pkg.MyPatient.Contact")
        );
        assert_eq!(
            message.nested_types[0].fields[0].type_name.as_deref(),
            Some(".my.pkg.MyPatient.Contact.Name")
        );
    }

    #[test]
    fn dependencies_follow_usage_not_definition() {
        let types: BTreeSet<String> = ["core.String", "core.RelatedArtifact"]
            .into_iter()
            .map(String::from)
            .collect();

        let mut file = FileDescriptor {
            message_types: vec![message_with_field("MyPatient", ".core.String")],
            ..Default::default()
        };
        assert!(needs_dependency(&file, "core", &types));

        file.message_types.push(MessageDescriptor::new("RelatedArtifact"));
        assert!(needs_dependency(&file, "core", &types));

        file.message_types.push(MessageDescriptor::new("String"));
        assert!(!needs_dependency(&file, "core", &types));

        let nested_only = FileDescriptor {
            message_types: vec![MessageDescriptor {
                name: "Outer".to_string(),
                nested_types: vec![message_with_field("Inner", ".core.String")],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(needs_dependency(&nested_only, "core", &types));
    }

    #[test]
    fn description_includes_short_and_url() {
        let sd: StructureDefinition = serde_json::from_value(serde_json::json!({
            "id": "Patient",
            "name": "Patient",
            "kind": "resource",
            "type": "Patient",
            "meta": { "lastUpdated": "2019-11-01T09:29:23.356+11:00" }
        }))
        .unwrap();
        let mut root = ElementDefinition::new("Patient", "Patient");
        root.short = Some("Information about an individual".to_string());

        assert_eq!(
            message_description(&sd, &root, "http://hl7.org/fhir/StructureDefinition/Patient"),
            "Auto-generated from StructureDefinition for Patient, last updated \
             2019-11-01T09:29:23.356+11:00.\nInformation about an individual.\n\
             See http://hl7.org/fhir/StructureDefinition/Patient"
        );
    }
}
