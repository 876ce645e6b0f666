//! Snapshot/differential reconciliation
//!
//! Published snapshots are usually generated from the differential and can be
//! stale: a scalar the author changed in the differential may still carry the
//! base value in the snapshot, or a repeated entry may be missing. The
//! differential is authoritative, so before a snapshot is consumed every
//! element with a differential counterpart (matched by id) is merged:
//!
//! - non-repeated scalars that differ take the differential value
//! - non-repeated complex values are merged recursively under the same rule
//! - repeated values are unioned; differential entries missing from the
//!   snapshot are appended and nothing is removed
//!
//! Discrepancies are logged at debug level and never fail.

use ferrum_models::{
    ElementDefinition, ElementDefinitionBase, ElementDefinitionBinding, StructureDefinition,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;

/// Return a copy of `sd` whose snapshot agrees with its differential.
///
/// The input is never modified. Definitions without a snapshot or
/// differential come back unchanged.
pub fn reconcile(sd: &StructureDefinition) -> StructureDefinition {
    let mut reconciled = sd.clone();

    let diffs: HashMap<&str, &ElementDefinition> = sd
        .differential_elements()
        .iter()
        .map(|element| (element.id(), element))
        .collect();
    if diffs.is_empty() {
        return reconciled;
    }

    if let Some(snapshot) = reconciled.snapshot.as_mut() {
        for element in &mut snapshot.element {
            let Some(diff) = diffs.get(element.id()).copied() else {
                continue;
            };
            let element_id = element.id().to_string();
            let mut merge = Merge {
                definition_id: &sd.id,
                element_id: &element_id,
                field_path: String::new(),
            };
            merge.element(element, diff);
        }
    }

    reconciled
}

/// Location of a merge, used for discrepancy logging
struct Merge<'a> {
    definition_id: &'a str,
    element_id: &'a str,
    field_path: String,
}

impl Merge<'_> {
    fn element(&mut self, snapshot: &mut ElementDefinition, diff: &ElementDefinition) {
        self.required("path", &mut snapshot.path, &diff.path);
        self.scalar("sliceName", &mut snapshot.slice_name, &diff.slice_name);
        self.scalar("short", &mut snapshot.short, &diff.short);
        self.scalar("definition", &mut snapshot.definition, &diff.definition);
        self.scalar("min", &mut snapshot.min, &diff.min);
        self.scalar("max", &mut snapshot.max, &diff.max);
        self.scalar(
            "contentReference",
            &mut snapshot.content_reference,
            &diff.content_reference,
        );
        self.scalar("isModifier", &mut snapshot.is_modifier, &diff.is_modifier);
        self.scalar("isSummary", &mut snapshot.is_summary, &diff.is_summary);
        self.scalar("mustSupport", &mut snapshot.must_support, &diff.must_support);

        self.nested("base", &mut snapshot.base, &diff.base, Self::base);
        self.nested("binding", &mut snapshot.binding, &diff.binding, Self::binding);

        self.repeated("extension", &mut snapshot.extension, &diff.extension);
        self.repeated("type", &mut snapshot.types, &diff.types);
        self.repeated("constraint", &mut snapshot.constraint, &diff.constraint);

        self.json_map(&mut snapshot.extensions, &diff.extensions);
    }

    fn base(&mut self, snapshot: &mut ElementDefinitionBase, diff: &ElementDefinitionBase) {
        self.required("path", &mut snapshot.path, &diff.path);
        self.required("min", &mut snapshot.min, &diff.min);
        self.required("max", &mut snapshot.max, &diff.max);
    }

    fn binding(&mut self, snapshot: &mut ElementDefinitionBinding, diff: &ElementDefinitionBinding) {
        self.required("strength", &mut snapshot.strength, &diff.strength);
        self.scalar("description", &mut snapshot.description, &diff.description);
        self.scalar("valueSet", &mut snapshot.value_set, &diff.value_set);
    }

    /// Overwrite an optional scalar when the differential sets a different value
    fn scalar<T: Clone + PartialEq + Debug>(
        &mut self,
        field: &str,
        snapshot: &mut Option<T>,
        diff: &Option<T>,
    ) {
        if diff.is_some() && snapshot != diff {
            self.log_overwrite(field, &*snapshot, diff);
            snapshot.clone_from(diff);
        }
    }

    /// Overwrite a mandatory scalar of a nested value
    fn required<T: Clone + PartialEq + Debug>(&mut self, field: &str, snapshot: &mut T, diff: &T) {
        if snapshot != diff {
            self.log_overwrite(field, &*snapshot, diff);
            snapshot.clone_from(diff);
        }
    }

    /// Merge a complex value field by field, or take the differential value when the snapshot lacks one
    fn nested<T: Clone + PartialEq + Debug>(
        &mut self,
        field: &str,
        snapshot: &mut Option<T>,
        diff: &Option<T>,
        merge: fn(&mut Self, &mut T, &T),
    ) {
        let Some(diff_value) = diff else {
            return;
        };
        match snapshot {
            Some(snapshot_value) if snapshot_value != diff_value => {
                let parent = self.enter(field);
                merge(self, snapshot_value, diff_value);
                self.field_path = parent;
            }
            Some(_) => {}
            None => {
                self.log_overwrite(field, &*snapshot, diff);
                *snapshot = Some(diff_value.clone());
            }
        }
    }

    /// Append differential entries the snapshot is missing
    fn repeated<T: Clone + PartialEq + Debug>(
        &mut self,
        field: &str,
        snapshot: &mut Option<Vec<T>>,
        diff: &Option<Vec<T>>,
    ) {
        let Some(diff_values) = diff else {
            return;
        };
        for value in diff_values {
            let values = snapshot.get_or_insert_with(Vec::new);
            if !values.contains(value) {
                self.log_missing(field, value);
                values.push(value.clone());
            }
        }
    }

    /// Merge the untyped remainder of an element with the same rules
    fn json_map(&mut self, snapshot: &mut BTreeMap<String, Value>, diff: &BTreeMap<String, Value>) {
        for (key, diff_value) in diff {
            match snapshot.get_mut(key) {
                Some(snapshot_value) => self.json_value(key, snapshot_value, diff_value),
                None => {
                    self.log_overwrite(key, &Value::Null, diff_value);
                    snapshot.insert(key.clone(), diff_value.clone());
                }
            }
        }
    }

    fn json_value(&mut self, field: &str, snapshot: &mut Value, diff: &Value) {
        if snapshot == diff {
            return;
        }
        match (snapshot, diff) {
            (Value::Array(values), Value::Array(diff_values)) => {
                for value in diff_values {
                    if !values.contains(value) {
                        self.log_missing(field, value);
                        values.push(value.clone());
                    }
                }
            }
            (Value::Object(fields), Value::Object(diff_fields)) => {
                let parent = self.enter(field);
                for (key, diff_value) in diff_fields {
                    match fields.get_mut(key) {
                        Some(value) => self.json_value(key, value, diff_value),
                        None => {
                            self.log_overwrite(key, &Value::Null, diff_value);
                            fields.insert(key.clone(), diff_value.clone());
                        }
                    }
                }
                self.field_path = parent;
            }
            (snapshot, diff) => {
                self.log_overwrite(field, &*snapshot, diff);
                *snapshot = diff.clone();
            }
        }
    }

    /// Descend into `field`, returning the previous path to restore afterwards
    fn enter(&mut self, field: &str) -> String {
        let child = self.qualify(field);
        std::mem::replace(&mut self.field_path, child)
    }

    fn qualify(&self, field: &str) -> String {
        if self.field_path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.field_path, field)
        }
    }

    fn log_overwrite(&self, field: &str, snapshot: &dyn Debug, diff: &dyn Debug) {
        tracing::debug!(
            definition = self.definition_id,
            element = self.element_id,
            field = %self.qualify(field),
            snapshot = ?snapshot,
            differential = ?diff,
            "inconsistent snapshot, using differential value"
        );
    }

    fn log_missing(&self, field: &str, value: &dyn Debug) {
        tracing::debug!(
            definition = self.definition_id,
            element = self.element_id,
            field = %self.qualify(field),
            value = ?value,
            "differential value missing from snapshot, adding it"
        );
    }
}
