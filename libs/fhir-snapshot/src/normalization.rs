//! ID and type-code normalization for FHIR elements
//!
//! Upstream packages are not uniform: hand-written differentials often leave
//! out element ids, and R4 encodes the types of primitive value elements as
//! FHIRPath system types. Both views are normalized before any lookup by id.

use ferrum_models::{
    extensions_with_url, Differential, ElementDefinition, Snapshot, StructureDefinition,
};

/// Prefix of FHIRPath system type codes (`http://hl7.org/fhirpath/System.String`, ...)
pub const FHIRPATH_SYSTEM_PREFIX: &str = "http://hl7.org/fhirpath/System.";

/// Extension naming the FHIR type behind a FHIRPath system type code
pub const FHIR_TYPE_URL: &str =
    "http://hl7.org/fhir/StructureDefinition/structuredefinition-fhir-type";

/// Normalize both element views of a StructureDefinition in place
pub fn normalize_structure_definition(sd: &mut StructureDefinition) {
    if let Some(snapshot) = sd.snapshot.as_mut() {
        normalize_snapshot(snapshot);
    }
    if let Some(differential) = sd.differential.as_mut() {
        normalize_differential(differential);
    }
}

/// Normalize IDs and type codes in a snapshot
///
/// FHIR rules:
/// - If ID is missing, generate from path
/// - For slices, a generated ID is "path:sliceName"
pub fn normalize_snapshot(snapshot: &mut Snapshot) {
    for element in &mut snapshot.element {
        normalize_element_id(element);
        normalize_type_codes(element);
    }
}

/// Normalize IDs and type codes in a differential
pub fn normalize_differential(differential: &mut Differential) {
    for element in &mut differential.element {
        normalize_element_id(element);
        normalize_type_codes(element);
    }
}

/// Fill a missing element ID based on path and slice name
fn normalize_element_id(element: &mut ElementDefinition) {
    if element.id.is_some() {
        return;
    }
    element.id = Some(match &element.slice_name {
        Some(slice_name) => format!("{}:{}", element.path, slice_name),
        None => element.path.clone(),
    });
}

/// Map FHIRPath system type codes back to FHIR type codes
///
/// A code carrying the fhir-type extension takes the extension's value
/// (`Element.id` becomes `string`). Without the extension the element is the
/// anonymous value of a primitive type and its code becomes empty.
fn normalize_type_codes(element: &mut ElementDefinition) {
    let Some(types) = element.types.as_mut() else {
        return;
    };
    for type_ref in types.iter_mut() {
        if !type_ref.code.starts_with(FHIRPATH_SYSTEM_PREFIX) {
            continue;
        }
        let fhir_type = extensions_with_url(type_ref.extension.as_deref(), FHIR_TYPE_URL)
            .find_map(|ext| ext.value_as_str())
            .unwrap_or_default()
            .to_string();
        type_ref.code = fhir_type;
    }
}
