//! Generation configuration
//!
//! [`PackageInfo`] describes where generated messages go. [`CoreVersion`] is the
//! precomputed lookup for the base FHIR version the output builds on: its
//! package, the files its types live in, and the generated enum types for
//! bound value sets.

use crate::descriptor::{FileDescriptor, MessageDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Output package configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageInfo {
    /// Package generated messages are declared in
    pub proto_package: String,
    pub java_proto_package: String,
    pub go_proto_package: String,
    /// Whether `Resource` fields use a `ContainedResource` generated in this package
    pub local_contained_resource: bool,
    /// Package of an external `ContainedResource` to use instead of the core one
    pub contained_resource_package: String,
    /// Emit `<T1>Or<T2>Reference` types for constrained references instead of `Reference`
    pub use_typed_references: bool,
}

impl PackageInfo {
    pub fn new(proto_package: impl Into<String>) -> Self {
        Self {
            proto_package: proto_package.into(),
            ..Default::default()
        }
    }
}

/// The base FHIR version generated packages depend on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreVersion {
    /// Version annotation written to file options (e.g. "R4")
    pub fhir_version: String,
    /// Package of the core datatypes and resources
    pub core_package: String,
    /// Directory core files are imported from
    pub import_root: String,
    /// Import path of the annotations file every generated file depends on
    pub annotations_path: String,
    /// Core file name to the fully qualified names of the messages it defines
    pub core_types_by_file: BTreeMap<String, BTreeSet<String>>,
    /// Files of generated code enums, each message annotated with its value set url
    pub code_type_files: Vec<FileDescriptor>,
    /// The core `ContainedResource` union, whose tags derived unions keep
    pub contained_resource: Option<MessageDescriptor>,
}

impl Default for CoreVersion {
    fn default() -> Self {
        Self {
            fhir_version: "R4".to_string(),
            core_package: "google.fhir.r4.core".to_string(),
            import_root: "proto/google/fhir/proto/r4/core".to_string(),
            annotations_path: "proto/annotations.proto".to_string(),
            core_types_by_file: BTreeMap::new(),
            code_type_files: Vec::new(),
            contained_resource: None,
        }
    }
}

impl CoreVersion {
    /// Import path of a core file
    pub fn import_path(&self, file: &str) -> String {
        if self.import_root.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", self.import_root.trim_end_matches('/'), file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn package_info_defaults_missing_fields() {
        let info: PackageInfo = serde_json::from_value(json!({
            "proto_package": "my.profiles"
        }))
        .unwrap();

        assert_eq!(info, PackageInfo::new("my.profiles"));
        assert!(!info.use_typed_references);
    }

    #[test]
    fn import_paths() {
        let core = CoreVersion::default();
        assert_eq!(
            core.import_path("datatypes.proto"),
            "proto/google/fhir/proto/r4/core/datatypes.proto"
        );

        let flat = CoreVersion {
            import_root: String::new(),
            ..CoreVersion::default()
        };
        assert_eq!(flat.import_path("datatypes.proto"), "datatypes.proto");
    }
}
