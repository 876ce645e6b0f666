//! Element shape classification
//!
//! Every element becomes one of a handful of field shapes. The predicates here
//! are the building blocks; [`classify`] combines them into an [`ElementShape`]
//! in the order the type resolver checks them.

use crate::elements;
use crate::error::Result;
use ferrum_models::{ElementDefinition, StructureDefinition};

const BACKBONE_ELEMENT: &str = "BackboneElement";
const ELEMENT: &str = "Element";

/// How an internally defined extension is inlined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    /// A single value type, inlined as that type
    SingleTyped,
    /// Several value types, inlined as a choice message
    ChoiceTyped,
    /// No value, only sub-extensions; inlined as a nested message
    Complex,
}

/// The field shape of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementShape<'a> {
    /// Extension defined by an external profile
    ExternalExtension { profile: &'a str },
    /// Root element or a BackboneElement/Element with its own children
    Container,
    /// `[x]` element accepting one of several types
    Choice,
    /// Reuses the type of another element
    ContentReference,
    /// Extension slice defined inline in the same definition
    InternalExtension(ExtensionKind),
    Reference,
    /// Anything else: a single datatype, resource or primitive
    Typed,
}

/// Classify an element; the first matching shape wins
pub fn classify<'a>(
    element: &'a ElementDefinition,
    all: &[ElementDefinition],
) -> Result<ElementShape<'a>> {
    if is_external_extension(element) {
        let profile = element
            .types()
            .first()
            .and_then(|t| t.profile.as_ref())
            .and_then(|profiles| profiles.first())
            .map_or("", String::as_str);
        return Ok(ElementShape::ExternalExtension { profile });
    }
    if is_container(element) {
        return Ok(ElementShape::Container);
    }
    if is_choice_type(element) {
        return Ok(ElementShape::Choice);
    }
    if element.content_reference.is_some() {
        return Ok(ElementShape::ContentReference);
    }
    if is_extension_backbone_element(element) {
        return Ok(ElementShape::InternalExtension(extension_kind(element, all)?));
    }
    if element.first_type_code() == Some("Reference") {
        return Ok(ElementShape::Reference);
    }
    Ok(ElementShape::Typed)
}

fn extension_kind(element: &ElementDefinition, all: &[ElementDefinition]) -> Result<ExtensionKind> {
    let value = elements::extension_value_element(element, all)?;
    Ok(if value.is_prohibited() {
        ExtensionKind::Complex
    } else if value.distinct_type_count() > 1 {
        ExtensionKind::ChoiceTyped
    } else {
        ExtensionKind::SingleTyped
    })
}

/// Root elements and fields typed BackboneElement or Element own nested fields
pub fn is_container(element: &ElementDefinition) -> bool {
    let [only] = element.types() else {
        return false;
    };
    !element.id().contains('.') || only.code == BACKBONE_ELEMENT || only.code == ELEMENT
}

/// Whether the element has one well-defined type; repeated codes count once
pub fn is_single_type(element: &ElementDefinition) -> bool {
    if element.types().is_empty() && element.content_reference.is_some() {
        return true;
    }
    element.distinct_type_count() == 1
}

/// An extension whose definition lives in its own profile
pub fn is_external_extension(element: &ElementDefinition) -> bool {
    matches!(element.types(), [only] if only.code == "Extension" && only.profile_count() == 1)
}

pub fn is_choice_type(element: &ElementDefinition) -> bool {
    elements::last_token(element).is_choice_type
}

/// The root of an extension definition, or an extension slice defined inline
pub fn is_extension_backbone_element(element: &ElementDefinition) -> bool {
    if element.id() == "Extension" && element.base.is_some() {
        return true;
    }
    element.base_path().ends_with(".extension")
        && elements::last_token(element).slice_name.is_some()
        && element.types().first().map_or(0, |t| t.profile_count()) == 0
}

/// An inline extension carrying a value
pub fn is_simple_internal_extension(
    element: &ElementDefinition,
    all: &[ElementDefinition],
) -> Result<bool> {
    if !is_extension_backbone_element(element) {
        return Ok(false);
    }
    Ok(!elements::extension_value_element(element, all)?.is_prohibited())
}

/// An inline extension made only of sub-extensions
pub fn is_complex_internal_extension(
    element: &ElementDefinition,
    all: &[ElementDefinition],
) -> Result<bool> {
    Ok(is_extension_backbone_element(element) && !is_simple_internal_extension(element, all)?)
}

/// An inline extension whose value may be one of several types
pub fn is_choice_type_extension(
    element: &ElementDefinition,
    all: &[ElementDefinition],
) -> Result<bool> {
    if !is_extension_backbone_element(element) {
        return Ok(false);
    }
    let value = elements::extension_value_element(element, all)?;
    Ok(!value.is_prohibited() && value.distinct_type_count() > 1)
}

/// Slices are only generated for extensions and codings
pub fn is_element_supported_for_slicing(element: &ElementDefinition) -> bool {
    matches!(element.types(), [only] if only.code == "Extension" || only.code == "Coding")
}

/// An extension definition whose value has exactly one type
pub fn is_single_typed_extension_definition(sd: &StructureDefinition) -> Result<bool> {
    let all = sd.snapshot_elements();
    let Some(root) = all.first() else {
        return Ok(false);
    };
    if !is_simple_internal_extension(root, all)? {
        return Ok(false);
    }
    Ok(elements::extension_value_element(root, all)?.distinct_type_count() == 1)
}
