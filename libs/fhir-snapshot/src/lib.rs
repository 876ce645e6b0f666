//! FHIR StructureDefinition snapshot preparation
//!
//! Before a snapshot is walked it is normalized (element ids filled in,
//! FHIRPath system type codes mapped back to FHIR types) and reconciled
//! against the differential, which is authoritative where the two disagree.
//!
//! # Example
//!
//! ```rust
//! use ferrum_models::StructureDefinition;
//! use ferrum_snapshot::{normalize_structure_definition, reconcile};
//! use serde_json::json;
//!
//! let mut sd: StructureDefinition = serde_json::from_value(json!({
//!     "url": "http://example.org/StructureDefinition/p",
//!     "kind": "resource",
//!     "type": "Patient",
//!     "snapshot": { "element": [{ "path": "Patient.name", "max": "*" }] },
//!     "differential": { "element": [{ "path": "Patient.name", "max": "1" }] }
//! }))
//! .unwrap();
//!
//! normalize_structure_definition(&mut sd);
//! let reconciled = reconcile(&sd);
//! assert_eq!(reconciled.snapshot_elements()[0].max.as_deref(), Some("1"));
//! ```

pub mod normalization;
pub mod reconcile;

pub use ferrum_models::{Differential, ElementDefinition, ElementDefinitionType, Snapshot};
pub use normalization::{normalize_structure_definition, FHIRPATH_SYSTEM_PREFIX, FHIR_TYPE_URL};
pub use reconcile::reconcile;
