//! Message construction: fields in snapshot order, nested types, slices

use super::field::{build_field_internal, field_label};
use super::ProtoGenerator;
use crate::classify;
use crate::descriptor::{
    FieldDescriptor, FieldLabel, FieldOptions, FieldType, MessageDescriptor, OneofDescriptor,
    QualifiedType,
};
use crate::elements::{self, EXTENSION_URL_PATH, EXTENSION_VALUE_PATH};
use crate::error::{Error, Result};
use crate::naming;
use ferrum_models::{ElementDefinition, ElementDefinitionType};
use std::collections::HashSet;

const CODEABLE_CONCEPT_URL: &str = "http://hl7.org/fhir/StructureDefinition/CodeableConcept";
const CODING_URL: &str = "http://hl7.org/fhir/StructureDefinition/Coding";
const CODING_WITH_FIXED_CODE: &str = "CodingWithFixedCode";
/// Oneof every choice message declares
const CHOICE_ONEOF: &str = "choice";
/// Tag of `Coding.code` when the Coding message has no such field
const DEFAULT_CODING_CODE_TAG: u32 = 5;

impl ProtoGenerator<'_> {
    /// Fill `message` with one field per direct child of `current`.
    ///
    /// Tags continue after any fields already present. Sliced children are
    /// appended after all unsliced ones; unsupported slices keep a reserved tag.
    pub(super) fn generate_message(
        &mut self,
        current: &ElementDefinition,
        all: &[ElementDefinition],
        mut message: MessageDescriptor,
    ) -> Result<MessageDescriptor> {
        let container = self.namer.container_type(current, all)?;
        message.name = elements::last_segment(&container).to_string();

        let mut next_tag = message.fields.len() as u32 + 1;
        let mut slices = Vec::new();

        for element in elements::direct_children(current, all) {
            // primitive values are generated separately
            if matches!(element.types(), [only] if only.code.is_empty()) {
                continue;
            }
            // a fixed url is implied by the message
            if element.base_path() == EXTENSION_URL_PATH && element.fixed_uri().is_some() {
                continue;
            }
            if !classify::is_choice_type(element) && !classify::is_single_type(element) {
                if element.types().is_empty() {
                    return Err(Error::MissingType(element.id().to_string()));
                }
                return Err(Error::MultipleTypes(element.id().to_string()));
            }

            if elements::last_token(element).slice_name.is_some() {
                slices.push(element);
                continue;
            }
            self.build_and_add_field(element, all, next_tag, &mut message)?;
            next_tag += 1;
        }

        for element in slices {
            if classify::is_element_supported_for_slicing(element) {
                self.build_and_add_field(element, all, next_tag, &mut message)?;
            } else {
                let code = element.first_type_code().unwrap_or_default();
                tracing::warn!(
                    element = element.id(),
                    code,
                    tag = next_tag,
                    "reserving field for unsupported slicing"
                );
                message.fields.push(FieldDescriptor::reserved(
                    next_tag,
                    format!(
                        "field {} reserved for {} which uses an unsupported slicing on {}",
                        next_tag,
                        element.id(),
                        code
                    ),
                ));
            }
            next_tag += 1;
        }

        Ok(message)
    }

    fn build_and_add_field(
        &mut self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
        tag: u32,
        message: &mut MessageDescriptor,
    ) -> Result<()> {
        let Some(mut field) = self.build_field(element, all, tag)? else {
            if element.path != "Extension.extension" && element.path != EXTENSION_VALUE_PATH {
                message.fields.push(FieldDescriptor::reserved(
                    tag,
                    format!("{} not present on profile.", element.path),
                ));
            }
            return Ok(());
        };

        if let Some(nested) = self.build_nested_type_if_needed(element, all)? {
            message.nested_types.push(nested);
            // a nested type is defined here, even when named after a core type
            let core_prefix = format!(".{}.", self.core_package());
            if let Some(type_name) = field.type_name.as_mut() {
                if let Some(rest) = type_name.strip_prefix(&core_prefix) {
                    *type_name = format!(".{}.{}", self.local_package(), rest);
                }
            }
        }
        message.fields.push(field);
        Ok(())
    }

    fn build_nested_type_if_needed(
        &mut self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
    ) -> Result<Option<MessageDescriptor>> {
        if let Some(choice) = self.choice_type_if_required(element, all)? {
            return Ok(Some(choice));
        }
        if element.types().len() != 1 {
            return Ok(None);
        }
        if let Some(coding) = self.standalone_coding(element, all)? {
            return Ok(Some(coding));
        }
        if classify::is_container(element) || classify::is_complex_internal_extension(element, all)? {
            return self
                .generate_message(element, all, MessageDescriptor::default())
                .map(Some);
        }
        if element.first_type_code() == Some("CodeableConcept") {
            let slices: Vec<&ElementDefinition> = elements::direct_children(element, all)
                .into_iter()
                .filter(|child| child.is_slice())
                .collect();
            if !slices.is_empty() {
                return self
                    .profiled_codeable_concept(element, all, &slices)
                    .map(Some);
            }
        }
        Ok(None)
    }

    fn choice_type_if_required(
        &mut self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
    ) -> Result<Option<MessageDescriptor>> {
        if classify::is_choice_type_extension(element, all)? {
            let value = elements::extension_value_element(element, all)?;
            let mut choice = self.make_choice_type(value, all)?;
            let container = self.namer.container_type(element, all)?;
            choice.name = elements::last_segment(&container).to_string();
            return Ok(Some(choice));
        }

        if let Some(base) = self.choice_type_base(element)? {
            // a narrowed choice keeps the base tags of the types it allows
            let base_codes = unique_types(base.types());
            let base_choice = self.make_choice_type(base, all)?;
            let mut seen = HashSet::new();
            let mut fields = Vec::new();
            for element_type in element.types() {
                if !seen.insert(element_type.code.as_str()) {
                    continue;
                }
                let field = base_codes
                    .iter()
                    .position(|base_type| base_type.code == element_type.code)
                    .and_then(|index| base_choice.fields.get(index))
                    .ok_or_else(|| Error::InvalidChoiceNarrowing {
                        element: element.id().to_string(),
                        base: base.id().to_string(),
                        code: element_type.code.clone(),
                    })?;
                fields.push(field.clone());
            }
            return Ok(Some(MessageDescriptor {
                fields,
                ..base_choice
            }));
        }

        if classify::is_choice_type(element) {
            return self.make_choice_type(element, all).map(Some);
        }
        Ok(None)
    }

    /// Choice message with one oneof member per distinct type, tagged in order
    fn make_choice_type(
        &mut self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
    ) -> Result<MessageDescriptor> {
        let container = self.namer.container_type(element, all)?;
        let mut choice = MessageDescriptor::new(elements::last_segment(&container));
        choice.options.is_choice_type = true;
        choice.oneof_decls.push(OneofDescriptor {
            name: CHOICE_ONEOF.to_string(),
        });

        let reference_targets: Vec<&str> = element
            .types()
            .iter()
            .filter(|t| t.code == "Reference")
            .flat_map(|t| t.target_profiles())
            .collect();
        let core = self.core_package();

        for (index, element_type) in unique_types(element.types()).into_iter().enumerate() {
            let mut options = FieldOptions::default();
            if element_type.code == "Reference" {
                for target in &reference_targets {
                    self.add_reference_type(&mut options, target);
                }
            }
            let field_type = QualifiedType::new(self.normalize_type(element_type)?, core);
            let mut field = build_field_internal(
                &element_type.code,
                &field_type,
                index as u32 + 1,
                FieldLabel::Optional,
                options,
            );
            field.oneof_index = Some(0);
            if field.name == CHOICE_ONEOF {
                field.json_name = Some(field.name.clone());
                field.name.push_str("_value");
            }
            choice.fields.push(field);
        }
        Ok(choice)
    }

    /// A CodeableConcept whose codings are sliced: one field per slice
    fn profiled_codeable_concept(
        &mut self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
        slices: &[&ElementDefinition],
    ) -> Result<MessageDescriptor> {
        let registry = self.registry;
        let codeable_concept = registry
            .definition(CODEABLE_CONCEPT_URL)
            .ok_or_else(|| Error::NotRegistered(CODEABLE_CONCEPT_URL.to_string()))?;
        let qualified = self.qualified_field_type(element, all)?;

        let cc_elements = codeable_concept.definition.snapshot_elements();
        let cc_root = cc_elements
            .first()
            .ok_or_else(|| Error::MissingSnapshot(CODEABLE_CONCEPT_URL.to_string()))?;
        let mut message = self.generate_message(cc_root, cc_elements, MessageDescriptor::default())?;
        message.name = elements::last_segment(&qualified.type_name).to_string();
        message.options.structure_definition_kind = None;
        message.options.structure_definition_url = None;
        message.options.profile_base.push(CODEABLE_CONCEPT_URL.to_string());
        let message_type = qualified.to_qualified_string();

        for slice in slices {
            let mut fixed_system = None;
            let mut code_element = None;
            for child in elements::direct_children(slice, all) {
                match child.base_path() {
                    "Coding.system" => fixed_system = child.fixed_uri(),
                    "Coding.code" => code_element = Some(child),
                    _ => {}
                }
            }
            let (Some(system), Some(code_element)) = (fixed_system, code_element) else {
                tracing::warn!(
                    slice = slice.id(),
                    "skipping coding slice without a fixed system and a code"
                );
                continue;
            };
            let Some(label) = field_label(slice) else {
                continue;
            };
            let slice_name = slice.slice_name.as_deref().unwrap_or_default();

            match code_element.fixed_code() {
                Some(code) => {
                    let number = message.fields.len() as u32 + 1;
                    message.fields.push(FieldDescriptor {
                        name: naming::to_field_name_case(slice_name),
                        number,
                        label: Some(label),
                        field_type: Some(FieldType::Message),
                        type_name: Some(format!(
                            ".{}.{}",
                            self.core_package(),
                            CODING_WITH_FIXED_CODE
                        )),
                        options: FieldOptions {
                            inlined_coding_system: Some(system.to_string()),
                            inlined_coding_code: Some(code.to_string()),
                            ..Default::default()
                        },
                        ..Default::default()
                    });
                }
                None => {
                    self.add_coding_field_with_fixed_system(
                        &mut message,
                        &message_type,
                        slice_name,
                        label,
                        system,
                    )?;
                }
            }
        }
        Ok(message)
    }

    fn add_coding_field_with_fixed_system(
        &mut self,
        parent: &mut MessageDescriptor,
        parent_type: &str,
        slice_name: &str,
        label: FieldLabel,
        system: &str,
    ) -> Result<()> {
        let type_name = naming::to_field_type_case(slice_name);
        let code_type = match self.registry.value_set_entry(system) {
            Some((_, enum_type)) => enum_type.clone(),
            None => {
                tracing::warn!(system, "no generated enum for coding system, using code");
                QualifiedType::new("Code", self.core_package())
            }
        };
        let nested = self.coding_with_fixed_system(&type_name, system, &code_type)?;
        parent.nested_types.push(nested);

        let number = parent.fields.len() as u32 + 1;
        parent.fields.push(FieldDescriptor {
            name: naming::to_field_name_case(slice_name),
            number,
            label: Some(label),
            field_type: Some(FieldType::Message),
            type_name: Some(format!("{}.{}", parent_type, type_name)),
            ..Default::default()
        });
        Ok(())
    }

    /// A Coding whose system is fixed and whose code is typed as `code_type`
    fn coding_with_fixed_system(
        &mut self,
        name: &str,
        system: &str,
        code_type: &QualifiedType,
    ) -> Result<MessageDescriptor> {
        let registry = self.registry;
        let coding = registry
            .definition(CODING_URL)
            .ok_or_else(|| Error::NotRegistered(CODING_URL.to_string()))?;
        let coding_elements = coding.definition.snapshot_elements();
        let coding_root = coding_elements
            .first()
            .ok_or_else(|| Error::MissingSnapshot(CODING_URL.to_string()))?;
        let base = self.generate_message(coding_root, coding_elements, MessageDescriptor::default())?;

        let code_tag = base
            .field("code")
            .map_or(DEFAULT_CODING_CODE_TAG, |field| field.number);
        let mut fields: Vec<FieldDescriptor> = base
            .fields
            .into_iter()
            .filter(|field| field.name != "code" && field.name != "system")
            .collect();
        fields.push(FieldDescriptor {
            name: "code".to_string(),
            number: code_tag,
            label: Some(FieldLabel::Optional),
            field_type: Some(FieldType::Message),
            type_name: Some(code_type.to_qualified_string()),
            ..Default::default()
        });
        fields.sort_by_key(|field| field.number);

        let mut message = MessageDescriptor::new(name);
        message.fields = fields;
        message.options.fixed_system = Some(system.to_string());
        message.options.profile_base.push(CODING_URL.to_string());
        Ok(message)
    }

    /// A Coding field, or a simple extension with a Coding value, bound to a
    /// value set with a generated enum
    fn standalone_coding(
        &mut self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
    ) -> Result<Option<MessageDescriptor>> {
        let value = if classify::is_simple_internal_extension(element, all)? {
            elements::extension_value_element(element, all)?
        } else {
            element
        };
        if value.first_type_code() != Some("Coding") {
            return Ok(None);
        }
        let Some((value_set, code_type)) = self.binding_value_set_type(value, all)? else {
            return Ok(None);
        };
        let Some(bound) = self.bound_value_set_type(element, all)? else {
            return Ok(None);
        };
        let name = elements::last_segment(&bound.type_name).to_string();
        self.coding_with_fixed_system(&name, value_set, code_type)
            .map(Some)
    }
}

/// Types with distinct codes, first occurrence wins
fn unique_types(types: &[ElementDefinitionType]) -> Vec<&ElementDefinitionType> {
    let mut seen = HashSet::new();
    types
        .iter()
        .filter(|t| seen.insert(t.code.as_str()))
        .collect()
}
