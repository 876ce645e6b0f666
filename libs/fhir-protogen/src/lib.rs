//! Protocol buffer descriptors for FHIR StructureDefinitions
//!
//! Every definition becomes a message; containers, choice types and sliced
//! coded types become nested messages. Field tags follow snapshot order, so a
//! profile keeps every tag of the type it constrains and marks the fields it
//! removes as reserved.
//!
//! Generation happens in two steps:
//!
//! 1. Build a [`Registry`] from every definition a batch may reference, each
//!    paired with the package it is generated in.
//! 2. Run a [`ProtoGenerator`] for one output package over the definitions of
//!    that package.
//!
//! # Example
//!
//! ```rust
//! use ferrum_models::StructureDefinition;
//! use ferrum_protogen::{CoreVersion, PackageInfo, ProtoGenerator, Registry};
//! use serde_json::json;
//!
//! let string: StructureDefinition = serde_json::from_value(json!({
//!     "id": "string",
//!     "url": "http://hl7.org/fhir/StructureDefinition/string",
//!     "name": "string",
//!     "kind": "primitive-type",
//!     "type": "string",
//!     "derivation": "specialization",
//!     "snapshot": { "element": [
//!         { "id": "string", "path": "string", "min": 0, "max": "*" },
//!         { "id": "string.value", "path": "string.value", "min": 0, "max": "1",
//!           "type": [{ "code": "" }] }
//!     ]}
//! }))
//! .unwrap();
//!
//! let core = CoreVersion::default();
//! let package = core.core_package.clone();
//! let registry = Registry::new(vec![(string.clone(), package.clone())], core).unwrap();
//!
//! let mut generator = ProtoGenerator::new(&registry, PackageInfo::new(package));
//! let message = generator.generate_proto(&string).unwrap();
//! assert_eq!(message.name, "String");
//! assert_eq!(message.fields[0].name, "value");
//! ```

pub mod classify;
pub mod config;
pub mod descriptor;
pub mod elements;
pub mod error;
pub mod generator;
pub mod naming;
pub mod registry;

pub use config::{CoreVersion, PackageInfo};
pub use descriptor::{
    EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FieldLabel, FieldOptions, FieldType,
    FileDescriptor, FileOptions, MessageDescriptor, MessageOptions, OneofDescriptor,
    QualifiedType, Requirement,
};
pub use error::{Error, Result};
pub use generator::{ProtoGenerator, PROTO_SYNTAX};
pub use registry::{DefinitionData, Registry};
