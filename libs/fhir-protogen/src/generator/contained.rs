//! The `ContainedResource` union over every resource of a file

use super::ProtoGenerator;
use crate::descriptor::{
    FieldDescriptor, FieldLabel, FieldType, FileDescriptor, MessageDescriptor, OneofDescriptor,
};
use crate::elements;
use crate::error::{Error, Result};
use crate::naming;
use ferrum_models::StructureDefinitionKind;

const CONTAINED_RESOURCE: &str = "ContainedResource";
const RESOURCE_ONEOF: &str = "oneof_resource";

impl ProtoGenerator<'_> {
    /// Append a `ContainedResource` message with one oneof member per
    /// concrete resource in `file`.
    ///
    /// In the core package members are tagged in file order. Elsewhere a
    /// member keeps the tag the core union gives the same resource, and new
    /// resources are tagged after the core union's highest tag.
    pub fn add_contained_resource(&self, mut file: FileDescriptor) -> Result<FileDescriptor> {
        let members: Vec<&str> = file
            .message_types
            .iter()
            .filter(|message| {
                !message.options.is_abstract_type
                    && message.options.structure_definition_kind
                        == Some(StructureDefinitionKind::Resource)
            })
            .map(|message| message.name.as_str())
            .collect();

        let mut contained = MessageDescriptor::new(CONTAINED_RESOURCE);
        contained.oneof_decls.push(OneofDescriptor {
            name: RESOURCE_ONEOF.to_string(),
        });

        if self.local_package() == self.core_package() {
            for (index, name) in members.iter().enumerate() {
                contained.fields.push(member_field(name, index as u32 + 1));
            }
        } else {
            let base = self
                .registry
                .core()
                .contained_resource
                .as_ref()
                .ok_or(Error::MissingBaseContainedResource)?;
            let mut remaining = members;
            for field in &base.fields {
                let type_name = elements::last_segment(field.type_name.as_deref().unwrap_or_default());
                let Some(position) = remaining.iter().position(|name| *name == type_name) else {
                    continue;
                };
                remaining.remove(position);
                contained.fields.push(FieldDescriptor {
                    type_name: Some(type_name.to_string()),
                    oneof_index: Some(0),
                    ..field.clone()
                });
            }
            let mut next_tag = base.max_field_number() + 1;
            for name in remaining {
                contained.fields.push(member_field(name, next_tag));
                next_tag += 1;
            }
        }

        tracing::debug!(
            package = %file.package,
            members = contained.fields.len(),
            "added contained resource union"
        );
        file.message_types.push(contained);
        Ok(file)
    }
}

fn member_field(resource: &str, number: u32) -> FieldDescriptor {
    FieldDescriptor {
        name: naming::to_field_name_case(resource),
        number,
        label: Some(FieldLabel::Optional),
        field_type: Some(FieldType::Message),
        type_name: Some(resource.to_string()),
        oneof_index: Some(0),
        ..Default::default()
    }
}
