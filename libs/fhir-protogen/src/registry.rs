//! Known-type registry
//!
//! Built once from every definition generation may reference, each paired
//! with the package it is (or will be) generated in. Read-only afterwards and
//! shared by reference between generators.

use crate::classify;
use crate::config::{CoreVersion, PackageInfo};
use crate::descriptor::QualifiedType;
use crate::elements;
use crate::error::{Error, Result};
use crate::generator::ProtoGenerator;
use crate::naming;
use ferrum_models::{canonical_uri, StructureDefinition};
use ferrum_snapshot::normalize_structure_definition;
use std::collections::HashMap;

/// What the registry knows about one definition
#[derive(Debug, Clone)]
pub struct DefinitionData {
    /// The normalized definition
    pub definition: StructureDefinition,
    /// Type a field referencing this definition is given
    pub inline_type: String,
    /// Package `inline_type` lives in
    pub package: String,
}

impl DefinitionData {
    pub fn qualified_type(&self) -> QualifiedType {
        QualifiedType::new(&self.inline_type, &self.package)
    }
}

/// Lookup of all known definitions and generated value set enums
#[derive(Debug)]
pub struct Registry {
    data_by_url: HashMap<String, DefinitionData>,
    /// Base (non-profile) definition id to its url
    base_urls_by_id: HashMap<String, String>,
    value_set_types: HashMap<String, QualifiedType>,
    core: CoreVersion,
}

impl Registry {
    /// Build the registry from `(definition, package)` pairs.
    ///
    /// Simple extension definitions are registered with the type of their
    /// value, so fields using them are inlined as that type.
    pub fn new<I>(known: I, core: CoreVersion) -> Result<Self>
    where
        I: IntoIterator<Item = (StructureDefinition, String)>,
    {
        let value_set_types = core
            .code_type_files
            .iter()
            .flat_map(|file| {
                file.message_types.iter().filter_map(|message| {
                    let url = message.options.value_set_url.as_ref()?;
                    Some((
                        url.clone(),
                        QualifiedType::new(&message.name, &file.package),
                    ))
                })
            })
            .collect();

        let mut registry = Self {
            data_by_url: HashMap::new(),
            base_urls_by_id: HashMap::new(),
            value_set_types,
            core,
        };

        for (mut definition, package) in known {
            normalize_structure_definition(&mut definition);
            elements::validate_element_ids(&definition)?;

            let Some(url) = definition.url.clone().filter(|url| !url.is_empty()) else {
                return Err(Error::MissingUrl(definition.id.clone()));
            };

            if !definition.is_profile() {
                match registry.base_urls_by_id.get(&definition.id) {
                    Some(first) if *first != url => {
                        return Err(Error::DuplicateBaseDefinition {
                            id: definition.id.clone(),
                            first: first.clone(),
                            second: url,
                        });
                    }
                    Some(_) => {}
                    None => {
                        registry
                            .base_urls_by_id
                            .insert(definition.id.clone(), url.clone());
                    }
                }
            }

            let inline_type = naming::type_name(&definition);
            registry.data_by_url.insert(
                url,
                DefinitionData {
                    definition,
                    inline_type,
                    package,
                },
            );
        }

        let simple_extensions = registry.simple_extension_types()?;
        for (url, qualified) in simple_extensions {
            if let Some(data) = registry.data_by_url.get_mut(&url) {
                data.inline_type = qualified.type_name;
                data.package = qualified.package;
            }
        }

        tracing::debug!(
            definitions = registry.data_by_url.len(),
            base_definitions = registry.base_urls_by_id.len(),
            value_sets = registry.value_set_types.len(),
            "built known-type registry"
        );
        Ok(registry)
    }

    /// Inline types of every extension definition that inlines as its value
    fn simple_extension_types(&self) -> Result<Vec<(String, QualifiedType)>> {
        let mut resolved = Vec::new();
        for (url, data) in &self.data_by_url {
            let definition = &data.definition;
            if !definition.is_extension_profile() {
                continue;
            }
            let all = definition.snapshot_elements();
            let Some(root) = all.first() else {
                continue;
            };
            if !classify::is_simple_internal_extension(root, all)? {
                continue;
            }
            let mut generator = ProtoGenerator::new(self, PackageInfo::new(&data.package));
            resolved.push((
                url.clone(),
                generator.simple_extension_definition_type(definition)?,
            ));
        }
        Ok(resolved)
    }

    /// Data for a definition url
    pub fn definition(&self, url: &str) -> Option<&DefinitionData> {
        self.data_by_url.get(url)
    }

    /// A base definition by id, e.g. `Patient`
    pub fn base_definition(&self, id: &str) -> Result<&StructureDefinition> {
        self.base_urls_by_id
            .get(id)
            .and_then(|url| self.data_by_url.get(url))
            .map(|data| &data.definition)
            .ok_or_else(|| Error::UnknownBaseDefinition(id.to_string()))
    }

    /// Data of the first non-profile definition in the constraint chain of `url`
    pub fn base_data(&self, url: &str) -> Option<&DefinitionData> {
        let mut data = self.data_by_url.get(url)?;
        while data.definition.is_profile() {
            let base_url = canonical_uri(data.definition.base_definition.as_deref()?);
            data = self.data_by_url.get(base_url)?;
        }
        Some(data)
    }

    /// Generated enum type for a value set url, with the url as stored
    pub fn value_set_entry(&self, url: &str) -> Option<(&str, &QualifiedType)> {
        self.value_set_types
            .get_key_value(url)
            .map(|(url, qualified)| (url.as_str(), qualified))
    }

    pub fn core(&self) -> &CoreVersion {
        &self.core
    }
}
