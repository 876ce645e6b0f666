//! Small hand-written R4 definitions shared by the integration tests

#![allow(dead_code)]

use ferrum_models::StructureDefinition;
use ferrum_protogen::{CoreVersion, FileDescriptor, MessageDescriptor, MessageOptions, Registry};
use serde_json::{json, Value};

pub const CORE: &str = "google.fhir.r4.core";
pub const PROFILES: &str = "my.profiles";

pub const PATIENT_URL: &str = "http://hl7.org/fhir/StructureDefinition/Patient";
pub const MY_PATIENT_URL: &str = "http://example.org/fhir/StructureDefinition/my-patient";
pub const GENDER_VALUE_SET: &str = "http://hl7.org/fhir/ValueSet/administrative-gender";

pub fn definition(value: Value) -> StructureDefinition {
    serde_json::from_value(value).unwrap()
}

fn base_type(id: &str, kind: &str, elements: Value) -> StructureDefinition {
    definition(json!({
        "resourceType": "StructureDefinition",
        "id": id,
        "url": format!("http://hl7.org/fhir/StructureDefinition/{}", id),
        "name": id,
        "kind": kind,
        "abstract": false,
        "type": id,
        "derivation": "specialization",
        "snapshot": { "element": elements }
    }))
}

pub fn date_type() -> StructureDefinition {
    base_type(
        "date",
        "primitive-type",
        json!([
            { "id": "date", "path": "date", "short": "Primitive Type date", "min": 0, "max": "*" },
            { "id": "date.id", "path": "date.id", "min": 0, "max": "1", "type": [{ "code": "string" }] },
            { "id": "date.extension", "path": "date.extension", "min": 0, "max": "*", "type": [{ "code": "Extension" }] },
            {
                "id": "date.value", "path": "date.value", "min": 0, "max": "1",
                "type": [{
                    "code": "http://hl7.org/fhirpath/System.Date",
                    "extension": [{
                        "url": "http://hl7.org/fhir/StructureDefinition/regex",
                        "valueString": "([0-9]{4})(-(0[1-9]|1[0-2]))?"
                    }]
                }]
            }
        ]),
    )
}

pub fn organization() -> StructureDefinition {
    base_type(
        "Organization",
        "resource",
        json!([
            { "id": "Organization", "path": "Organization", "min": 0, "max": "*" },
            { "id": "Organization.name", "path": "Organization.name", "min": 0, "max": "1", "type": [{ "code": "string" }] }
        ]),
    )
}

fn patient_elements() -> Vec<Value> {
    vec![
        json!({ "id": "Patient", "path": "Patient", "short": "Information about an individual", "min": 0, "max": "*" }),
        json!({ "id": "Patient.id", "path": "Patient.id", "min": 0, "max": "1", "type": [{ "code": "id" }] }),
        json!({
            "id": "Patient.extension", "path": "Patient.extension", "min": 0, "max": "*",
            "base": { "path": "Patient.extension", "min": 0, "max": "*" },
            "type": [{ "code": "Extension" }]
        }),
        json!({ "id": "Patient.identifier", "path": "Patient.identifier", "min": 0, "max": "*", "type": [{ "code": "Identifier" }] }),
        json!({ "id": "Patient.active", "path": "Patient.active", "min": 0, "max": "1", "type": [{ "code": "boolean" }] }),
        json!({
            "id": "Patient.gender", "path": "Patient.gender", "min": 0, "max": "1",
            "type": [{ "code": "code" }],
            "binding": { "strength": "required", "valueSet": format!("{}|4.0.1", GENDER_VALUE_SET) }
        }),
        json!({ "id": "Patient.birthDate", "path": "Patient.birthDate", "min": 0, "max": "1", "type": [{ "code": "date" }] }),
        json!({
            "id": "Patient.deceased[x]", "path": "Patient.deceased[x]", "min": 0, "max": "1",
            "base": { "path": "Patient.deceased[x]", "min": 0, "max": "1" },
            "type": [{ "code": "boolean" }, { "code": "dateTime" }]
        }),
        json!({ "id": "Patient.contact", "path": "Patient.contact", "min": 0, "max": "*", "type": [{ "code": "BackboneElement" }] }),
        json!({ "id": "Patient.contact.name", "path": "Patient.contact.name", "min": 0, "max": "1", "type": [{ "code": "HumanName" }] }),
        json!({
            "id": "Patient.managingOrganization", "path": "Patient.managingOrganization", "min": 0, "max": "1",
            "type": [{
                "code": "Reference",
                "targetProfile": ["http://hl7.org/fhir/StructureDefinition/Organization"]
            }]
        }),
    ]
}

pub fn patient() -> StructureDefinition {
    base_type("Patient", "resource", Value::Array(patient_elements()))
}

/// A Patient profile that narrows `deceased[x]`, removes `contact` and adds an
/// inline `birthPlace` extension
pub fn my_patient() -> StructureDefinition {
    let mut elements: Vec<Value> = patient_elements()
        .into_iter()
        .filter(|element| element["id"] != "Patient.contact.name")
        .collect();
    for element in &mut elements {
        match element["id"].as_str() {
            Some("Patient.deceased[x]") => element["type"] = json!([{ "code": "dateTime" }]),
            Some("Patient.contact") => element["max"] = json!("0"),
            _ => {}
        }
    }
    elements.extend([
        json!({
            "id": "Patient.extension:birthPlace", "path": "Patient.extension", "sliceName": "birthPlace",
            "min": 0, "max": "1",
            "base": { "path": "Patient.extension", "min": 0, "max": "*" },
            "type": [{ "code": "Extension" }]
        }),
        json!({
            "id": "Patient.extension:birthPlace.url", "path": "Patient.extension.url", "min": 1, "max": "1",
            "base": { "path": "Extension.url", "min": 1, "max": "1" },
            "type": [{ "code": "uri" }],
            "fixedUri": "birthPlace"
        }),
        json!({
            "id": "Patient.extension:birthPlace.value[x]", "path": "Patient.extension.value[x]", "min": 0, "max": "1",
            "base": { "path": "Extension.value[x]", "min": 0, "max": "1" },
            "type": [{ "code": "string" }]
        }),
    ]);

    definition(json!({
        "resourceType": "StructureDefinition",
        "id": "my-patient",
        "url": MY_PATIENT_URL,
        "name": "MyPatient",
        "kind": "resource",
        "abstract": false,
        "type": "Patient",
        "baseDefinition": PATIENT_URL,
        "derivation": "constraint",
        "snapshot": { "element": elements }
    }))
}

pub fn coding() -> StructureDefinition {
    base_type(
        "Coding",
        "complex-type",
        json!([
            { "id": "Coding", "path": "Coding", "min": 0, "max": "*" },
            { "id": "Coding.id", "path": "Coding.id", "min": 0, "max": "1", "type": [{ "code": "string" }] },
            { "id": "Coding.extension", "path": "Coding.extension", "min": 0, "max": "*", "type": [{ "code": "Extension" }] },
            { "id": "Coding.system", "path": "Coding.system", "min": 0, "max": "1", "type": [{ "code": "uri" }] },
            { "id": "Coding.version", "path": "Coding.version", "min": 0, "max": "1", "type": [{ "code": "string" }] },
            { "id": "Coding.code", "path": "Coding.code", "min": 0, "max": "1", "type": [{ "code": "code" }] },
            { "id": "Coding.display", "path": "Coding.display", "min": 0, "max": "1", "type": [{ "code": "string" }] },
            { "id": "Coding.userSelected", "path": "Coding.userSelected", "min": 0, "max": "1", "type": [{ "code": "boolean" }] }
        ]),
    )
}

pub fn codeable_concept() -> StructureDefinition {
    base_type(
        "CodeableConcept",
        "complex-type",
        json!([
            { "id": "CodeableConcept", "path": "CodeableConcept", "min": 0, "max": "*" },
            { "id": "CodeableConcept.id", "path": "CodeableConcept.id", "min": 0, "max": "1", "type": [{ "code": "string" }] },
            { "id": "CodeableConcept.extension", "path": "CodeableConcept.extension", "min": 0, "max": "*", "type": [{ "code": "Extension" }] },
            { "id": "CodeableConcept.coding", "path": "CodeableConcept.coding", "min": 0, "max": "*", "type": [{ "code": "Coding" }] },
            { "id": "CodeableConcept.text", "path": "CodeableConcept.text", "min": 0, "max": "1", "type": [{ "code": "string" }] }
        ]),
    )
}

fn observation_elements() -> Vec<Value> {
    vec![
        json!({ "id": "Observation", "path": "Observation", "min": 0, "max": "*" }),
        json!({ "id": "Observation.id", "path": "Observation.id", "min": 0, "max": "1", "type": [{ "code": "id" }] }),
        json!({
            "id": "Observation.code", "path": "Observation.code", "min": 1, "max": "1",
            "base": { "path": "Observation.code", "min": 1, "max": "1" },
            "type": [{ "code": "CodeableConcept" }]
        }),
        json!({
            "id": "Observation.value[x]", "path": "Observation.value[x]", "min": 0, "max": "1",
            "base": { "path": "Observation.value[x]", "min": 0, "max": "1" },
            "type": [{ "code": "Quantity" }, { "code": "string" }, { "code": "Reference" }]
        }),
    ]
}

pub fn observation() -> StructureDefinition {
    base_type("Observation", "resource", Value::Array(observation_elements()))
}

/// An Observation profile slicing `code.coding` into a fixed LOINC code and a
/// local coding with a fixed system
pub fn body_weight() -> StructureDefinition {
    let mut elements = observation_elements();
    elements[3]["type"] = json!([{ "code": "Quantity" }]);
    elements.extend([
        json!({
            "id": "Observation.code.coding", "path": "Observation.code.coding", "min": 0, "max": "*",
            "slicing": { "discriminator": [{ "type": "value", "path": "system" }], "rules": "open" },
            "type": [{ "code": "Coding" }]
        }),
        json!({
            "id": "Observation.code.coding:loinc", "path": "Observation.code.coding", "sliceName": "loinc",
            "min": 1, "max": "1", "type": [{ "code": "Coding" }]
        }),
        json!({
            "id": "Observation.code.coding:loinc.system", "path": "Observation.code.coding.system",
            "min": 1, "max": "1", "base": { "path": "Coding.system", "min": 0, "max": "1" },
            "type": [{ "code": "uri" }], "fixedUri": "http://loinc.org"
        }),
        json!({
            "id": "Observation.code.coding:loinc.code", "path": "Observation.code.coding.code",
            "min": 1, "max": "1", "base": { "path": "Coding.code", "min": 0, "max": "1" },
            "type": [{ "code": "code" }], "fixedCode": "29463-7"
        }),
        json!({
            "id": "Observation.code.coding:local", "path": "Observation.code.coding", "sliceName": "local",
            "min": 0, "max": "*", "type": [{ "code": "Coding" }]
        }),
        json!({
            "id": "Observation.code.coding:local.system", "path": "Observation.code.coding.system",
            "min": 1, "max": "1", "base": { "path": "Coding.system", "min": 0, "max": "1" },
            "type": [{ "code": "uri" }], "fixedUri": "http://example.org/codes"
        }),
        json!({
            "id": "Observation.code.coding:local.code", "path": "Observation.code.coding.code",
            "min": 1, "max": "1", "base": { "path": "Coding.code", "min": 0, "max": "1" },
            "type": [{ "code": "code" }]
        }),
    ]);

    definition(json!({
        "resourceType": "StructureDefinition",
        "id": "body-weight",
        "url": "http://example.org/fhir/StructureDefinition/body-weight",
        "name": "BodyWeight",
        "kind": "resource",
        "abstract": false,
        "type": "Observation",
        "baseDefinition": "http://hl7.org/fhir/StructureDefinition/Observation",
        "derivation": "constraint",
        "snapshot": { "element": elements }
    }))
}

/// Core version with a generated enum for administrative gender
pub fn core_version() -> CoreVersion {
    let mut gender = MessageDescriptor::new("AdministrativeGenderCode");
    gender.options = MessageOptions {
        value_set_url: Some(GENDER_VALUE_SET.to_string()),
        ..Default::default()
    };
    CoreVersion {
        code_type_files: vec![FileDescriptor {
            package: CORE.to_string(),
            message_types: vec![gender],
            ..Default::default()
        }],
        ..CoreVersion::default()
    }
}

/// Registry with the core types above in the core package and the profiles in [`PROFILES`]
pub fn registry() -> Registry {
    let core = [
        date_type(),
        organization(),
        patient(),
        coding(),
        codeable_concept(),
        observation(),
    ]
    .into_iter()
    .map(|sd| (sd, CORE.to_string()));
    let profiles = [my_patient(), body_weight()]
        .into_iter()
        .map(|sd| (sd, PROFILES.to_string()));
    Registry::new(core.chain(profiles), core_version()).unwrap()
}

/// Tag and type of every field, reserved fields typed as `None`
pub fn tags(message: &MessageDescriptor) -> Vec<(u32, &str, Option<&str>)> {
    message
        .fields
        .iter()
        .map(|field| (field.number, field.name.as_str(), field.type_name.as_deref()))
        .collect()
}
