//! File descriptors and the ContainedResource union

use ferrum_protogen::{
    CoreVersion, Error, FieldDescriptor, MessageDescriptor, PackageInfo, ProtoGenerator, Registry,
    PROTO_SYNTAX,
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
mod test_support;

use test_support::*;

fn resource(id: &str, url: &str) -> ferrum_models::StructureDefinition {
    definition(json!({
        "resourceType": "StructureDefinition",
        "id": id,
        "url": url,
        "name": id,
        "kind": "resource",
        "type": id,
        "derivation": "specialization",
        "snapshot": { "element": [
            { "id": id, "path": id, "min": 0, "max": "*" },
            {
                "id": format!("{}.status", id), "path": format!("{}.status", id),
                "min": 0, "max": "1", "type": [{ "code": "code" }]
            }
        ]}
    }))
}

fn union_member(name: &str, resource: &str, number: u32) -> FieldDescriptor {
    FieldDescriptor {
        name: name.to_string(),
        number,
        type_name: Some(format!(".google.fhir.r4.core.{}", resource)),
        oneof_index: Some(0),
        ..Default::default()
    }
}

#[test]
fn core_union_tags_resources_in_file_order() {
    let registry = registry();
    let mut generator = ProtoGenerator::new(&registry, PackageInfo::new(CORE));

    let file = generator
        .generate_file_descriptor(&[organization(), coding(), patient(), observation()])
        .unwrap();
    let file = generator.add_contained_resource(file).unwrap();

    assert_eq!(file.package, CORE);
    assert_eq!(file.syntax, PROTO_SYNTAX);

    let union = file.message_type("ContainedResource").unwrap();
    assert_eq!(union.oneof_decls[0].name, "oneof_resource");
    assert_eq!(
        tags(union),
        vec![
            (1, "organization", Some("Organization")),
            (2, "patient", Some("Patient")),
            (3, "observation", Some("Observation")),
        ]
    );
}

#[test]
fn derived_union_keeps_core_tags() {
    let mut base_union = MessageDescriptor::new("ContainedResource");
    base_union.fields = vec![
        union_member("account", "Account", 1),
        union_member("observation", "Observation", 2),
        union_member("patient", "Patient", 3),
    ];
    let core = CoreVersion {
        contained_resource: Some(base_union),
        ..CoreVersion::default()
    };
    let known = vec![
        (
            resource("Observation", "http://example.org/StructureDefinition/Observation"),
            "my.resources".to_string(),
        ),
        (
            resource("Shipment", "http://example.org/StructureDefinition/Shipment"),
            "my.resources".to_string(),
        ),
    ];
    let definitions: Vec<_> = known.iter().map(|(sd, _)| sd.clone()).collect();
    let registry = Registry::new(known, core).unwrap();
    let mut generator = ProtoGenerator::new(&registry, PackageInfo::new("my.resources"));

    let file = generator.generate_file_descriptor(&definitions).unwrap();
    let file = generator.add_contained_resource(file).unwrap();

    let union = file.message_type("ContainedResource").unwrap();
    assert_eq!(
        tags(union),
        vec![(2, "observation", Some("Observation")), (4, "shipment", Some("Shipment"))]
    );
}

#[test]
fn derived_union_needs_the_core_union() {
    let registry = Registry::new(
        vec![(
            resource("Shipment", "http://example.org/StructureDefinition/Shipment"),
            "my.resources".to_string(),
        )],
        CoreVersion::default(),
    )
    .unwrap();
    let generator = ProtoGenerator::new(&registry, PackageInfo::new("my.resources"));

    let file = ferrum_protogen::FileDescriptor::default();
    assert!(matches!(
        generator.add_contained_resource(file),
        Err(Error::MissingBaseContainedResource)
    ));
}

#[test]
fn file_options_and_core_imports() {
    let mut core = core_version();
    core.core_types_by_file = BTreeMap::from([
        (
            "datatypes.proto".to_string(),
            BTreeSet::from([
                format!("{}.String", CORE),
                format!("{}.DateTime", CORE),
                format!("{}.Reference", CORE),
            ]),
        ),
        (
            "codes.proto".to_string(),
            BTreeSet::from([format!("{}.AdministrativeGenderCode", CORE)]),
        ),
        (
            "resources/patient.proto".to_string(),
            BTreeSet::from([format!("{}.Patient", CORE)]),
        ),
    ]);
    let known = [
        date_type(),
        organization(),
        patient(),
        coding(),
        codeable_concept(),
        observation(),
    ]
    .into_iter()
    .map(|sd| (sd, CORE.to_string()))
    .chain([(my_patient(), PROFILES.to_string())]);
    let registry = Registry::new(known, core).unwrap();

    let package_info = PackageInfo {
        java_proto_package: "org.example.profiles".to_string(),
        go_proto_package: "example.org/profiles".to_string(),
        ..PackageInfo::new(PROFILES)
    };
    let mut generator = ProtoGenerator::new(&registry, package_info);
    let file = generator.generate_file_descriptor(&[my_patient()]).unwrap();

    assert_eq!(file.options.java_package.as_deref(), Some("org.example.profiles"));
    assert!(file.options.java_multiple_files);
    assert_eq!(file.options.go_package.as_deref(), Some("example.org/profiles"));
    assert_eq!(file.options.fhir_version.as_deref(), Some("R4"));
    assert_eq!(
        file.dependencies,
        vec![
            "proto/annotations.proto".to_string(),
            "proto/google/fhir/proto/r4/core/codes.proto".to_string(),
            "proto/google/fhir/proto/r4/core/datatypes.proto".to_string(),
        ]
    );
}
