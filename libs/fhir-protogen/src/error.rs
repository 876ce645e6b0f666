//! Error types for descriptor generation

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid FHIR structure definition: {0} has no url")]
    MissingUrl(String),

    #[error("Base StructureDefinition id {id} is defined by both {first} and {second}")]
    DuplicateBaseDefinition {
        id: String,
        first: String,
        second: String,
    },

    #[error("No StructureDefinition data found for: {0}")]
    NotRegistered(String),

    #[error("Inconsistent package name for {url}. Registered in {registered} but being generated in {requested}")]
    PackageMismatch {
        url: String,
        registered: String,
        requested: String,
    },

    #[error("Model error: {0}")]
    Model(#[from] ferrum_models::Error),

    #[error("No element with id: {0}")]
    ElementNotFound(String),

    #[error("More than one element with id: {0}")]
    DuplicateElement(String),

    #[error("Element {0} has multiple types but is not a choice type")]
    MultipleTypes(String),

    #[error("Element {0} has no type")]
    MissingType(String),

    #[error("Encountered unknown extension url {url} on {element}")]
    UnknownExtensionProfile { element: String, url: String },

    #[error("Unable to deduce typename for profile {profile} on type {code}")]
    UnknownProfileType { profile: String, code: String },

    #[error("Unknown base StructureDefinition: {0}")]
    UnknownBaseDefinition(String),

    #[error("Content reference {reference} on {element} does not reference a container")]
    InvalidContentReference { element: String, reference: String },

    #[error("Element {0} has no value element")]
    MissingExtensionValue(String),

    #[error("Unsupported reference profile: {0}")]
    UnsupportedReferenceProfile(String),

    #[error("StructureDefinition {0} has no snapshot")]
    MissingSnapshot(String),

    #[error("Element {element} constrains choice type {base} to unknown type {code}")]
    InvalidChoiceNarrowing {
        element: String,
        base: String,
        code: String,
    },

    #[error("StructureDefinition {0} is not a simple extension")]
    NotSimpleExtension(String),

    #[error("Core version has no base ContainedResource to derive tag numbers from")]
    MissingBaseContainedResource,
}
