//! FHIR complex types shared by conformance resources
//!
//! Only the pieces the schema compiler reads are modelled; everything else
//! rides along in the catch-all maps of the owning resource.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Binding strength for terminology bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Required,
    Extensible,
    Preferred,
    Example,
}

impl BindingStrength {
    /// Whether the binding restricts codes tightly enough to be inlined as an enum
    pub fn is_enumerable(self) -> bool {
        matches!(self, BindingStrength::Required | BindingStrength::Extensible)
    }
}

/// FHIR Extension
///
/// The `value[x]` member is kept as raw JSON keyed by its element name
/// (`valueString`, `valueUri`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub url: String,

    #[serde(flatten)]
    pub value: BTreeMap<String, Value>,
}

impl Extension {
    pub fn new(url: impl Into<String>, key: &str, value: Value) -> Self {
        let mut values = BTreeMap::new();
        values.insert(key.to_string(), value);
        Self {
            url: url.into(),
            value: values,
        }
    }

    /// `valueString`, if present
    pub fn value_string(&self) -> Option<&str> {
        self.value.get("valueString").and_then(Value::as_str)
    }

    /// Any string-valued `value[x]` (`valueString`, `valueUri`, `valueUrl`, `valueCode`, ...)
    pub fn value_as_str(&self) -> Option<&str> {
        self.value
            .iter()
            .find(|(key, _)| key.starts_with("value"))
            .and_then(|(_, value)| value.as_str())
    }
}

/// Find all extensions with the given url
pub fn extensions_with_url<'a>(
    extensions: Option<&'a [Extension]>,
    url: &'a str,
) -> impl Iterator<Item = &'a Extension> + 'a {
    extensions
        .unwrap_or_default()
        .iter()
        .filter(move |ext| ext.url == url)
}

/// Strip the `|version` suffix of a canonical reference
pub fn canonical_uri(canonical: &str) -> &str {
    canonical
        .split_once('|')
        .map(|(uri, _)| uri)
        .unwrap_or(canonical)
}
