//! Field construction

use super::ProtoGenerator;
use crate::classify::{self, ElementShape};
use crate::descriptor::{
    FieldDescriptor, FieldLabel, FieldOptions, FieldType, QualifiedType, Requirement,
};
use crate::elements;
use crate::error::{Error, Result};
use crate::naming::{self, RESERVED_FIELD_NAMES};
use ferrum_models::ElementDefinition;

/// Boilerplate constraint carried by every element; it adds nothing to a schema
const EXCLUDED_CONSTRAINT: &str = "hasValue() | (children().count() > id.count())";

/// Label for an element's cardinality; `None` when the element is prohibited
pub(super) fn field_label(element: &ElementDefinition) -> Option<FieldLabel> {
    match element.max.as_deref() {
        Some("0") => None,
        Some("1") => Some(FieldLabel::Optional),
        _ => Some(FieldLabel::Repeated),
    }
}

/// A message-typed field.
///
/// Reserved names get a `Value` suffix and keep the original as json name.
pub(super) fn build_field_internal(
    json_name: &str,
    field_type: &QualifiedType,
    tag: u32,
    label: FieldLabel,
    options: FieldOptions,
) -> FieldDescriptor {
    let (name, reserved_json_name) = if RESERVED_FIELD_NAMES.contains(json_name) {
        (
            naming::to_field_name_case(&format!("{}Value", json_name)),
            Some(json_name.to_string()),
        )
    } else {
        (naming::to_field_name_case(json_name), None)
    };
    FieldDescriptor {
        name,
        number: tag,
        label: Some(label),
        field_type: Some(FieldType::Message),
        type_name: Some(field_type.to_qualified_string()),
        json_name: reserved_json_name,
        oneof_index: None,
        options,
    }
}

impl ProtoGenerator<'_> {
    /// Build the field for `element` with the given tag.
    ///
    /// Returns `None` for prohibited elements; the caller decides whether the
    /// tag is reserved.
    pub(super) fn build_field(
        &mut self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
        tag: u32,
    ) -> Result<Option<FieldDescriptor>> {
        let Some(label) = field_label(element) else {
            return Ok(None);
        };

        let mut options = FieldOptions {
            field_description: element.short.clone(),
            fhir_path_constraint: element
                .constraint_expressions()
                .filter(|expression| *expression != EXCLUDED_CONSTRAINT)
                .map(String::from)
                .collect(),
            ..Default::default()
        };
        match element.min.unwrap_or(0) {
            0 => {}
            1 => options.validation_requirement = Some(Requirement::RequiredByFhir),
            min => tracing::warn!(element = element.id(), min, "unexpected minimum cardinality"),
        }

        let mut json_name = naming::json_name_for_element(element);
        let registry = self.registry;

        if let ElementShape::ExternalExtension { profile } = classify::classify(element, all)? {
            let data = registry
                .definition(profile)
                .ok_or_else(|| Error::UnknownExtensionProfile {
                    element: element.id().to_string(),
                    url: profile.to_string(),
                })?;
            json_name = naming::resolve_slice_name_conflicts(json_name, element, all)?;
            options.inlined_extension_url = Some(profile.to_string());
            return Ok(Some(build_field_internal(
                &json_name,
                &data.qualified_type(),
                tag,
                label,
                options,
            )));
        }

        if let Some(base) = self.choice_type_base(element)? {
            // an inherited choice keeps the base's name and choice message
            let base_json_name = naming::json_name_for_element(base);
            let base_container = self.namer.container_type(base, all)?;
            let container = self.namer.container_type(element, all)?;
            let type_name = format!(
                "{}{}",
                elements::type_prefix(&container),
                elements::last_segment(&base_container)
            );
            let field_type = QualifiedType::new(type_name, self.local_package());
            return Ok(Some(build_field_internal(
                &base_json_name,
                &field_type,
                tag,
                label,
                options,
            )));
        }

        if classify::is_extension_backbone_element(element) {
            // the url is only recorded when it can't be read back from the field name
            json_name = naming::resolve_slice_name_conflicts(json_name, element, all)?;
            let url_id = format!("{}.url", element.id());
            if let Some(url) = elements::element_by_id(&url_id, all)?.fixed_uri() {
                if url != json_name {
                    options.inlined_extension_url = Some(url.to_string());
                }
            }
        }

        let field_type = self.qualified_field_type(element, all)?;

        let is_choice = classify::is_choice_type(element)
            || classify::is_choice_type_extension(element, all)?;
        if !is_choice && element.first_type_code() == Some("Reference") {
            let targets = element
                .types()
                .iter()
                .filter(|t| t.code == "Reference")
                .flat_map(|t| t.target_profiles());
            for target in targets {
                self.add_reference_type(&mut options, target);
            }
        }

        Ok(Some(build_field_internal(
            &json_name,
            &field_type,
            tag,
            label,
            options,
        )))
    }

    /// Record the base resource type of a reference target profile
    pub(super) fn add_reference_type(&self, options: &mut FieldOptions, url: &str) {
        match self.registry.base_data(url) {
            Some(data) => options.valid_reference_type.push(data.inline_type.clone()),
            None => tracing::warn!(url, "unknown reference target profile, skipping"),
        }
    }
}
