//! FHIR conformance models
//!
//! Strongly-typed Rust structures for the conformance resources the schema
//! compiler consumes: StructureDefinition and its ElementDefinitions.
//!
//! # Module Organization
//!
//! - `common`: Version-agnostic models that work across FHIR R4, R4B, and R5
//!
//! Unknown properties are kept in the `extensions` catch-all of each model so
//! a definition survives a parse/serialize cycle unchanged.
//!
//! # Example
//!
//! ```rust
//! use ferrum_models::common::{StructureDefinition, StructureDefinitionKind};
//! use serde_json::json;
//!
//! let sd_json = json!({
//!     "resourceType": "StructureDefinition",
//!     "id": "Patient",
//!     "url": "http://hl7.org/fhir/StructureDefinition/Patient",
//!     "version": "4.0.1",
//!     "name": "Patient",
//!     "status": "active",
//!     "kind": "resource",
//!     "abstract": false,
//!     "type": "Patient"
//! });
//!
//! let sd: StructureDefinition = serde_json::from_value(sd_json).unwrap();
//! assert_eq!(sd.name, "Patient");
//! assert_eq!(sd.kind, StructureDefinitionKind::Resource);
//! assert!(sd.extensions.contains_key("version"));
//! ```

pub mod common;

// Re-export commonly used types
pub use common::*;
