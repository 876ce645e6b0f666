//! Value fields of primitive types

use super::ProtoGenerator;
use crate::descriptor::{
    EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FieldLabel, FieldType,
    MessageDescriptor,
};
use crate::elements;
use crate::error::Result;
use crate::naming;
use ferrum_models::{extensions_with_url, ElementDefinitionType, StructureDefinition, REGEX_URL};
use phf::{phf_map, phf_set};

/// Precisions a time-like primitive can carry, after the implicit unspecified value
static TIME_LIKE_PRECISIONS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "date" => &["YEAR", "MONTH", "DAY"],
    "dateTime" => &["YEAR", "MONTH", "DAY", "SECOND", "MILLISECOND", "MICROSECOND"],
    "instant" => &["SECOND", "MILLISECOND", "MICROSECOND"],
    "time" => &["SECOND", "MILLISECOND", "MICROSECOND"],
};

/// A date is a calendar day; only types with a time of day carry a timezone
static TYPES_WITH_TIMEZONE: phf::Set<&'static str> = phf_set! {
    "dateTime",
    "instant",
};

/// Primitive value types other than string
static PRIMITIVE_TYPE_OVERRIDES: phf::Map<&'static str, FieldType> = phf_map! {
    "base64Binary" => FieldType::Bytes,
    "boolean" => FieldType::Bool,
    "integer" => FieldType::Sint32,
    "positiveInt" => FieldType::Uint32,
    "unsignedInt" => FieldType::Uint32,
};

const PRECISION_ENUM: &str = "Precision";
const PRECISION_UNSPECIFIED: &str = "PRECISION_UNSPECIFIED";

impl ProtoGenerator<'_> {
    /// Add the value fields of a primitive definition to `message`
    pub(super) fn generate_primitive_value(
        &mut self,
        sd: &StructureDefinition,
        message: &mut MessageDescriptor,
    ) -> Result<()> {
        let all = sd.snapshot_elements();
        let value_id = format!("{}.value", sd.id);
        let value = elements::element_by_id(&value_id, all)?;

        if let [only] = value.types() {
            let mut regexes = extensions_with_url(only.extension.as_deref(), REGEX_URL)
                .filter_map(|extension| extension.value_as_str());
            match (regexes.next(), regexes.next()) {
                (Some(regex), None) => message.options.value_regex = Some(regex.to_string()),
                (Some(_), Some(_)) => {
                    tracing::warn!(definition = %sd.id, "multiple value regexes, ignoring them")
                }
                _ => {}
            }
        }

        // the value element usually has no concrete type; any single type builds the field
        let mut typed_value = value.clone();
        typed_value.types = Some(vec![ElementDefinitionType::new("string")]);
        let Some(mut field) = self.build_field(&typed_value, &[], 1)? else {
            return Ok(());
        };
        field.type_name = None;

        match TIME_LIKE_PRECISIONS.get(sd.id.as_str()) {
            Some(precisions) => {
                field.field_type = Some(FieldType::Int64);
                field.name = "value_us".to_string();
                message.fields.push(field);

                if TYPES_WITH_TIMEZONE.contains(sd.id.as_str()) {
                    message.fields.push(FieldDescriptor {
                        name: "timezone".to_string(),
                        number: message.fields.len() as u32 + 1,
                        label: Some(FieldLabel::Optional),
                        field_type: Some(FieldType::String),
                        ..Default::default()
                    });
                }

                message.enum_types.push(precision_enum(precisions));
                message.fields.push(FieldDescriptor {
                    name: "precision".to_string(),
                    number: message.fields.len() as u32 + 1,
                    label: Some(FieldLabel::Optional),
                    field_type: Some(FieldType::Enum),
                    type_name: Some(format!(
                        ".{}.{}.{}",
                        self.local_package(),
                        naming::to_field_type_case(&sd.id),
                        PRECISION_ENUM
                    )),
                    ..Default::default()
                });
            }
            None => {
                let field_type = PRIMITIVE_TYPE_OVERRIDES
                    .get(sd.id.as_str())
                    .copied()
                    .unwrap_or(FieldType::String);
                field.field_type = Some(field_type);
                message.fields.push(field);
            }
        }
        Ok(())
    }
}

fn precision_enum(precisions: &[&str]) -> EnumDescriptor {
    let values = std::iter::once(PRECISION_UNSPECIFIED)
        .chain(precisions.iter().copied())
        .enumerate()
        .map(|(number, name)| EnumValueDescriptor {
            name: name.to_string(),
            number: number as i32,
        })
        .collect();
    EnumDescriptor {
        name: PRECISION_ENUM.to_string(),
        values,
    }
}
