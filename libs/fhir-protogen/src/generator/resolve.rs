//! Field type resolution

use super::ProtoGenerator;
use crate::classify::{self, ElementShape, ExtensionKind};
use crate::descriptor::QualifiedType;
use crate::elements::{self, EXTENSION_VALUE_PATH};
use crate::error::{Error, Result};
use crate::naming;
use ferrum_models::{
    canonical_uri, BindingStrength, ElementDefinition, ElementDefinitionType, StructureDefinition,
};
use std::collections::BTreeSet;

const CONTAINED_RESOURCE: &str = "ContainedResource";
const REFERENCE: &str = "Reference";

impl<'r> ProtoGenerator<'r> {
    /// The fully qualified type of the field generated for `element`
    pub(super) fn qualified_field_type(
        &mut self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
    ) -> Result<QualifiedType> {
        let local = self.local_package().to_string();
        match classify::classify(element, all)? {
            ElementShape::Container
            | ElementShape::Choice
            | ElementShape::InternalExtension(ExtensionKind::Complex) => Ok(QualifiedType::new(
                self.namer.container_type(element, all)?,
                local,
            )),
            ElementShape::ContentReference => {
                let container = self.namer.container_type(element, all)?;
                if is_local_content_reference(element) {
                    Ok(QualifiedType::new(container, local))
                } else {
                    Ok(QualifiedType::new(container, self.core_package()))
                }
            }
            ElementShape::InternalExtension(_) => self.simple_internal_extension_type(element, all),
            ElementShape::Reference => {
                let type_name = if self.package_info.use_typed_references {
                    self.typed_reference_name(element)?
                } else {
                    REFERENCE.to_string()
                };
                Ok(QualifiedType::new(type_name, self.core_package()))
            }
            ElementShape::ExternalExtension { .. } | ElementShape::Typed => {
                self.typed_field_type(element, all)
            }
        }
    }

    fn typed_field_type(
        &mut self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
    ) -> Result<QualifiedType> {
        let only = match element.types() {
            [only] => only,
            [] => return Err(Error::MissingType(element.id().to_string())),
            _ => return Err(Error::MultipleTypes(element.id().to_string())),
        };
        let normalized = self.normalize_type(only)?;

        if elements::descendants_have_slices(element, all) {
            // slices make this a per-field specialization of the datatype
            let container = self.namer.container_type(element, all)?;
            return Ok(QualifiedType::new(
                format!(
                    "{}{}For{}",
                    elements::type_prefix(&container),
                    normalized,
                    elements::last_segment(&container)
                ),
                self.local_package(),
            ));
        }

        if normalized == "Resource" {
            let package_info = &self.package_info;
            let package = if package_info.local_contained_resource {
                package_info.proto_package.as_str()
            } else if !package_info.contained_resource_package.is_empty() {
                package_info.contained_resource_package.as_str()
            } else {
                self.core_package()
            };
            return Ok(QualifiedType::new(CONTAINED_RESOURCE, package));
        }

        if let Some(bound) = self.bound_value_set_type(element, all)? {
            return Ok(bound);
        }
        Ok(QualifiedType::new(normalized, self.core_package()))
    }

    /// Type name for a type reference; a single profile resolves to the profile's inline type
    pub(super) fn normalize_type(&self, element_type: &ElementDefinitionType) -> Result<String> {
        let Some(profile) = element_type.single_profile() else {
            return Ok(naming::to_field_type_case(&element_type.code));
        };
        self.registry
            .definition(profile)
            .map(|data| data.inline_type.clone())
            .ok_or_else(|| Error::UnknownProfileType {
                profile: profile.to_string(),
                code: element_type.code.clone(),
            })
    }

    fn simple_internal_extension_type(
        &mut self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
    ) -> Result<QualifiedType> {
        let value = elements::extension_value_element(element, all)?;
        if value.distinct_type_count() == 1 {
            if let Some(bound) = self.bound_value_set_type(element, all)? {
                return Ok(bound);
            }
            let code = value.first_type_code().unwrap_or_default();
            return Ok(QualifiedType::new(
                naming::to_field_type_case(code),
                self.core_package(),
            ));
        }
        Ok(QualifiedType::new(
            self.namer.container_type(element, all)?,
            self.local_package(),
        ))
    }

    /// Type a field gets when it uses the extension defined by `sd`
    pub(crate) fn simple_extension_definition_type(
        &mut self,
        sd: &StructureDefinition,
    ) -> Result<QualifiedType> {
        let all = sd.snapshot_elements();
        let root = all
            .first()
            .filter(|_| sd.is_extension_profile())
            .ok_or_else(|| Error::NotSimpleExtension(sd.url_str().to_string()))?;
        if classify::is_single_typed_extension_definition(sd)? {
            return self.simple_internal_extension_type(root, all);
        }
        if classify::is_choice_type_extension(root, all)? {
            return Ok(QualifiedType::new(
                format!("{}.ValueX", naming::type_name(sd)),
                self.local_package(),
            ));
        }
        Err(Error::NotSimpleExtension(sd.url_str().to_string()))
    }

    /// Enum or specialized coding type for a bound `code` or `Coding` element
    pub(super) fn bound_value_set_type(
        &mut self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
    ) -> Result<Option<QualifiedType>> {
        let value = if classify::is_simple_internal_extension(element, all)? {
            elements::extension_value_element(element, all)?
        } else {
            element
        };
        if value.distinct_type_count() != 1 {
            return Ok(None);
        }
        let Some((_, enum_type)) = self.binding_value_set_type(value, all)? else {
            return Ok(None);
        };
        match value.first_type_code() {
            Some("code") => Ok(Some(enum_type.clone())),
            Some("Coding") => {
                let container = self.namer.container_type(element, all)?;
                Ok(Some(QualifiedType::new(
                    format!("{}Coding", container),
                    self.local_package(),
                )))
            }
            _ => Ok(None),
        }
    }

    /// Value set url and enum type of an enumerable binding with a generated enum
    pub(super) fn binding_value_set_type(
        &self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
    ) -> Result<Option<(&'r str, &'r QualifiedType)>> {
        if classify::is_simple_internal_extension(element, all)? {
            let value = elements::extension_value_element(element, all)?;
            return self.binding_value_set_type(value, all);
        }
        let Some(binding) = element.binding.as_ref() else {
            return Ok(None);
        };
        if !binding.strength.is_enumerable() {
            return Ok(None);
        }
        let Some(value_set) = binding
            .value_set
            .as_deref()
            .map(canonical_uri)
            .filter(|url| !url.is_empty())
        else {
            return Ok(None);
        };

        let registry = self.registry;
        let entry = registry.value_set_entry(value_set);
        if entry.is_none() && binding.strength == BindingStrength::Required {
            tracing::warn!(
                element = element.id(),
                value_set,
                "required binding to a value set without a generated enum"
            );
        }
        Ok(entry)
    }

    /// `Reference` specialized by its target types, e.g. `PatientOrGroupReference`
    fn typed_reference_name(&self, element: &ElementDefinition) -> Result<String> {
        let targets: BTreeSet<&str> = element
            .types()
            .iter()
            .flat_map(|t| t.target_profiles())
            .collect();
        let mut names = Vec::with_capacity(targets.len());
        for target in targets {
            let data = self
                .registry
                .definition(target)
                .ok_or_else(|| Error::UnsupportedReferenceProfile(target.to_string()))?;
            names.push(data.inline_type.as_str());
        }
        let joined = names.join("Or");
        if joined.is_empty() || joined == "Resource" {
            Ok(REFERENCE.to_string())
        } else {
            Ok(format!("{}{}", joined, REFERENCE))
        }
    }

    /// The base element of an inherited choice type, following the base chain.
    ///
    /// `None` when the element doesn't narrow a choice declared on a base type.
    pub(super) fn choice_type_base(
        &self,
        element: &ElementDefinition,
    ) -> Result<Option<&'r ElementDefinition>> {
        let Some(base) = element.base.as_ref() else {
            return Ok(None);
        };
        let base_path = base.path.as_str();
        if base_path == EXTENSION_VALUE_PATH {
            return Ok(None);
        }
        let base_type = base_path.split('.').next().unwrap_or(base_path);
        if base_type == "Element" && !base_path.ends_with("[x]") {
            return Ok(None);
        }

        let registry = self.registry;
        let base_sd = registry.base_definition(base_type)?;
        let base_element = elements::element_by_id(base_path, base_sd.snapshot_elements())?;
        if base_path.ends_with("[x]") {
            return Ok(Some(base_element));
        }
        if base_element.id() == element.id() {
            return Ok(None);
        }
        self.choice_type_base(base_element)
    }
}

/// A content reference into the definition's own type, e.g. `#Questionnaire.item`
fn is_local_content_reference(element: &ElementDefinition) -> bool {
    let root_type = element.id().split('.').next().unwrap_or_default();
    element
        .content_reference
        .as_deref()
        .is_some_and(|reference| reference.starts_with(&format!("#{}", root_type)))
}
