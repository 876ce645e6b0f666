//! Element tree navigation
//!
//! Snapshots are flat lists; the tree is implied by element ids. A descendant's
//! id starts with its ancestor's id plus a dot, and a direct child adds exactly
//! one token.

use crate::error::{Error, Result};
use ferrum_models::{id, ElementDefinition, IdToken, StructureDefinition};

/// Base path of the value element every extension inherits
pub const EXTENSION_VALUE_PATH: &str = "Extension.value[x]";

/// Base path of the url element every extension inherits
pub const EXTENSION_URL_PATH: &str = "Extension.url";

/// Parse every token of every element id, failing on the first malformed one
pub fn validate_element_ids(sd: &StructureDefinition) -> Result<()> {
    for element in sd
        .snapshot_elements()
        .iter()
        .chain(sd.differential_elements())
    {
        for token in element.id().split('.') {
            IdToken::parse(token)?;
        }
    }
    Ok(())
}

/// The last id token of an element.
///
/// Ids are checked by [`validate_element_ids`] before any tree is walked, so a
/// malformed token here is read as a plain path part.
pub fn last_token(element: &ElementDefinition) -> IdToken<'_> {
    let id = element.id();
    IdToken::last(id).unwrap_or(IdToken {
        path_part: id,
        is_choice_type: false,
        slice_name: None,
        reslice: None,
    })
}

/// Returns the only element in the list with the given id
pub fn element_by_id<'a>(
    id: &str,
    elements: &'a [ElementDefinition],
) -> Result<&'a ElementDefinition> {
    optional_element_by_id(id, elements)?.ok_or_else(|| Error::ElementNotFound(id.to_string()))
}

/// Returns the element with the given id, if any; more than one match is an error
pub fn optional_element_by_id<'a>(
    id: &str,
    elements: &'a [ElementDefinition],
) -> Result<Option<&'a ElementDefinition>> {
    let mut matches = elements.iter().filter(|element| element.id() == id);
    let found = matches.next();
    if matches.next().is_some() {
        return Err(Error::DuplicateElement(id.to_string()));
    }
    Ok(found)
}

/// All elements below `element`, in snapshot order
pub fn descendants<'a>(
    element: &ElementDefinition,
    elements: &'a [ElementDefinition],
) -> Vec<&'a ElementDefinition> {
    let prefix = format!("{}.", element.id());
    elements
        .iter()
        .filter(|candidate| candidate.id().starts_with(&prefix))
        .collect()
}

/// Elements exactly one level below `element`, in snapshot order
pub fn direct_children<'a>(
    element: &ElementDefinition,
    elements: &'a [ElementDefinition],
) -> Vec<&'a ElementDefinition> {
    let depth = id::token_count(element.id()) + 1;
    descendants(element, elements)
        .into_iter()
        .filter(|candidate| id::token_count(candidate.id()) == depth)
        .collect()
}

pub fn descendants_have_slices(element: &ElementDefinition, elements: &[ElementDefinition]) -> bool {
    descendants(element, elements)
        .iter()
        .any(|candidate| candidate.is_slice())
}

/// The `value[x]` child of an extension element
pub fn extension_value_element<'a>(
    element: &ElementDefinition,
    elements: &'a [ElementDefinition],
) -> Result<&'a ElementDefinition> {
    direct_children(element, elements)
        .into_iter()
        .find(|child| child.base_path() == EXTENSION_VALUE_PATH)
        .ok_or_else(|| Error::MissingExtensionValue(element.id().to_string()))
}

/// Everything up to and including the last dot of a dotted type name
pub fn type_prefix(type_name: &str) -> &str {
    type_name
        .rfind('.')
        .map_or("", |pos| &type_name[..=pos])
}

/// The segment after the last dot of a dotted type name
pub fn last_segment(type_name: &str) -> &str {
    type_name
        .rsplit_once('.')
        .map_or(type_name, |(_, last)| last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_element(id: &str) -> ElementDefinition {
        ElementDefinition::new(id, id.replace(":a", ""))
    }

    fn tree() -> Vec<ElementDefinition> {
        vec![
            make_element("Patient"),
            make_element("Patient.contact"),
            make_element("Patient.contact.name"),
            make_element("Patient.contactPoint"),
            make_element("Patient.extension:a"),
            make_element("Patient.extension:a.url"),
        ]
    }

    #[test]
    fn direct_children_skip_grandchildren_and_prefix_lookalikes() {
        let elements = tree();
        let children: Vec<&str> = direct_children(&elements[0], &elements)
            .iter()
            .map(|e| e.id())
            .collect();
        assert_eq!(
            children,
            vec!["Patient.contact", "Patient.contactPoint", "Patient.extension:a"]
        );

        let contact: Vec<&str> = descendants(&elements[1], &elements)
            .iter()
            .map(|e| e.id())
            .collect();
        assert_eq!(contact, vec!["Patient.contact.name"]);
    }

    #[test]
    fn lookup_by_id() {
        let elements = tree();
        assert_eq!(element_by_id("Patient.contact", &elements).unwrap().id(), "Patient.contact");
        assert!(matches!(
            element_by_id("Patient.gender", &elements),
            Err(Error::ElementNotFound(_))
        ));

        let mut duplicated = tree();
        duplicated.push(make_element("Patient.contact"));
        assert!(matches!(
            element_by_id("Patient.contact", &duplicated),
            Err(Error::DuplicateElement(_))
        ));
    }

    #[test]
    fn type_name_segments() {
        assert_eq!(type_prefix("Observation.Component"), "Observation.");
        assert_eq!(last_segment("Observation.Component"), "Component");
        assert_eq!(type_prefix("Observation"), "");
        assert_eq!(last_segment("Observation"), "Observation");
    }
}
