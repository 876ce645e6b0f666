//! Naming engine
//!
//! Converts FHIR ids, slice names and definition names into message type
//! names, field names and json names, and computes the dotted container type
//! name of every nested message.

use crate::elements::{self, EXTENSION_URL_PATH};
use crate::error::{Error, Result};
use ferrum_models::{id, ElementDefinition, ExtensionContextType, StructureDefinition};
use heck::{ToLowerCamelCase, ToSnakeCase};
use phf::{phf_map, phf_set};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

/// Field names that are reserved words in some target language
pub static RESERVED_FIELD_NAMES: phf::Set<&'static str> =
    phf_set! {"assert", "for", "hasAnswer", "package", "string", "class"};

/// Explicit type names for definitions whose derived names collide or read badly
static STRUCTURE_DEFINITION_RENAMINGS: phf::Map<&'static str, &'static str> = phf_map! {
    "http://hl7.org/fhir/StructureDefinition/valueset-reference" => "ValueSetReference",
    "http://hl7.org/fhir/StructureDefinition/codesystem-reference" => "CodeSystemReference",
    "http://hl7.org/fhir/StructureDefinition/request-statusReason" => "StatusReasonExtension",
    "http://hl7.org/fhir/StructureDefinition/workflow-relatedArtifact" => "RelatedArtifactExtension",
    "http://hl7.org/fhir/StructureDefinition/event-location" => "LocationExtension",
    "http://hl7.org/fhir/StructureDefinition/workflow-episodeOfCare" => "EpisodeOfCareExtension",
    "http://hl7.org/fhir/StructureDefinition/workflow-researchStudy" => "ResearchStudyExtension",
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-condition" => "UsCoreCondition",
    "http://hl7.org/fhir/us/core/StructureDefinition/us-core-direct" => "UsCoreDirectEmail",
    "http://hl7.org/fhir/StructureDefinition/hdlcholesterol" => "HdlCholesterol",
    "http://hl7.org/fhir/StructureDefinition/ldlcholesterol" => "LdlCholesterol",
    "http://hl7.org/fhir/StructureDefinition/lipidprofile" => "LipidProfile",
    "http://hl7.org/fhir/StructureDefinition/cholesterol" => "Cholesterol",
    "http://hl7.org/fhir/StructureDefinition/triglyceride" => "Triglyceride",
};

fn word_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[^A-Za-z0-9]+([A-Za-z0-9])").expect("word break regex must compile")
    })
}

/// UpperCamelCase for message type names; hyphens, underscores and spaces break words
pub fn to_field_type_case(name: &str) -> String {
    let mut chars = name.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => return String::new(),
    };
    word_break_regex()
        .replace_all(&capitalized, |caps: &regex::Captures| caps[1].to_uppercase())
        .into_owned()
}

/// snake_case for field names
pub fn to_field_name_case(name: &str) -> String {
    name.to_snake_case()
}

/// lowerCamelCase for json names
pub fn to_json_case(name: &str) -> String {
    if name.contains('-') || name.contains('_') {
        return name.to_lower_camel_case();
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Name of the top-level message generated for a definition
pub fn type_name(sd: &StructureDefinition) -> String {
    if let Some(renamed) = STRUCTURE_DEFINITION_RENAMINGS.get(sd.url_str()) {
        return (*renamed).to_string();
    }
    if sd.is_profile() {
        profile_type_name(sd)
    } else {
        to_field_type_case(&sd.id)
    }
}

/// Profile names come from `name`, prefixed by the resource when the profile
/// applies to exactly one element context
fn profile_type_name(sd: &StructureDefinition) -> String {
    let mut name = to_field_type_case(&sd.name);
    let contexts: BTreeSet<&str> = sd
        .context
        .iter()
        .flatten()
        .filter(|context| context.type_ == ExtensionContextType::Element)
        .filter_map(|context| context.expression.split('.').next())
        .collect();
    if contexts.len() == 1 {
        if let Some(context) = contexts.first().filter(|context| **context != "*") {
            name = format!("{}{}", context, name);
        }
    }
    to_field_type_case(&name)
}

/// The json name of the field an element becomes.
///
/// Slices are named after their slice name, everything else after the last
/// path part of the id.
pub fn json_name_for_element(element: &ElementDefinition) -> String {
    let token = elements::last_token(element);
    let Some(token_slice) = token.slice_name else {
        return to_json_case(token.path_part);
    };
    // a slice on the root element carries no meaning
    if !element.id().contains('.') {
        return to_json_case(token.path_part);
    }
    let slice_name = element.slice_name.as_deref().unwrap_or(token_slice);
    if !token_slice.eq_ignore_ascii_case(slice_name) {
        tracing::warn!(
            element = element.id(),
            slice_name,
            "inconsistent slice name between id and sliceName"
        );
    }
    to_json_case(slice_name)
}

/// Suffix a slice field name with `Slice` when it is reserved or collides with a sibling
pub fn resolve_slice_name_conflicts(
    json_name: String,
    element: &ElementDefinition,
    all: &[ElementDefinition],
) -> Result<String> {
    if RESERVED_FIELD_NAMES.contains(json_name.as_str()) {
        return Ok(json_name + "Slice");
    }
    let Some(parent_id) = id::parent_id(element.id()) else {
        return Ok(json_name);
    };
    let parent = elements::element_by_id(parent_id, all)?;
    let conflicts = elements::direct_children(parent, all).into_iter().any(|sibling| {
        to_field_name_case(elements::last_token(sibling).path_part) == json_name
            && sibling.base_path() != EXTENSION_URL_PATH
    });
    Ok(if conflicts {
        json_name + "Slice"
    } else {
        json_name
    })
}

/// Computes and memoizes dotted container type names, e.g. `Medication.Package.Content`.
///
/// The cache is keyed by element id only, so one namer must not be shared by
/// unrelated definitions.
#[derive(Debug, Default)]
pub struct ContainerNamer {
    cache: HashMap<String, String>,
}

impl ContainerNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container_type(
        &mut self,
        element: &ElementDefinition,
        all: &[ElementDefinition],
    ) -> Result<String> {
        if let Some(reference) = element.content_reference.as_deref() {
            // never cached: a profile can point the same id somewhere else
            return self.content_reference_type(element, reference, all);
        }

        let element_id = element.id();
        if let Some(cached) = self.cache.get(element_id) {
            return Ok(cached.clone());
        }

        let mut type_name = match element.explicit_type_name() {
            Some(explicit) => to_field_type_case(explicit),
            None => to_field_type_case(&json_name_for_element(element)),
        };

        let prefix = match id::parent_id(element_id) {
            Some(parent_id) => {
                let parent = elements::element_by_id(parent_id, all)?;
                format!("{}.", self.container_type(parent, all)?)
            }
            None => String::new(),
        };

        if elements::last_token(element).is_choice_type {
            type_name.push('X');
        }
        let segment = format!("{}.", type_name);
        if prefix.starts_with(&segment) || prefix.contains(&format!(".{}", segment)) {
            type_name.push_str("Type");
        }

        let container_type = prefix + &type_name;
        self.cache
            .insert(element_id.to_string(), container_type.clone());
        Ok(container_type)
    }

    fn content_reference_type(
        &mut self,
        element: &ElementDefinition,
        reference: &str,
        all: &[ElementDefinition],
    ) -> Result<String> {
        let referenced_id = reference.split_once('#').map_or(reference, |(_, id)| id);
        let mut referenced = elements::element_by_id(referenced_id, all)?;
        if !crate::classify::is_container(referenced) {
            return Err(Error::InvalidContentReference {
                element: element.id().to_string(),
                reference: reference.to_string(),
            });
        }
        if elements::last_token(referenced).slice_name.is_some()
            && !crate::classify::is_element_supported_for_slicing(referenced)
        {
            // unsupported slices are never generated, so use the unsliced element
            if let Some((unsliced, _)) = referenced_id.rsplit_once(':') {
                referenced = elements::element_by_id(unsliced, all)?;
            }
        }
        self.container_type(referenced, all)
    }
}
