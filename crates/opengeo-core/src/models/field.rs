//! Typed fields carried by generic objects and sub-objects.
//!
//! Fields are schema-less: each document holds an ordered list of
//! `{label, type, value}` triples and the shape of `value` depends on
//! `type`. [`GenericField::coerce`] normalizes whatever a client sent
//! into the canonical stored shape.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{OpenGeoError, OpenGeoResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Date,
    Boolean,
    Coordinates,
    Entity,
    File,
    Url,
}

impl FieldType {
    /// Value given to a field that has just been created.
    pub fn empty_value(self) -> Value {
        match self {
            FieldType::String | FieldType::Date | FieldType::Entity | FieldType::Url => json!(""),
            FieldType::Number | FieldType::File => Value::Null,
            FieldType::Boolean => json!(false),
            FieldType::Coordinates => json!(["", ""]),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
            FieldType::Coordinates => "coordinates",
            FieldType::Entity => "entity",
            FieldType::File => "file",
            FieldType::Url => "url",
        }
    }
}

/// Reference to an uploaded document stored outside the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileReference {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenericField {
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub value: Value,
}

impl GenericField {
    pub fn new(label: impl Into<String>, field_type: FieldType, value: Value) -> Self {
        Self {
            label: label.into(),
            field_type,
            value,
        }
    }

    /// A field of the given type holding its empty value.
    pub fn empty(label: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(label, field_type, field_type.empty_value())
    }

    pub fn is_empty(&self) -> bool {
        self.value == self.field_type.empty_value()
            || self.value.is_null()
            || self.value.as_str().is_some_and(str::is_empty)
    }

    /// Normalize the value to the canonical shape of its type.
    pub fn coerce(self) -> OpenGeoResult<Self> {
        let value = coerce_value(&self.label, self.field_type, self.value)?;
        Ok(Self { value, ..self })
    }

    /// Parsed `[lat, lng]` when this is a non-empty coordinates field.
    pub fn coordinates(&self) -> Option<[f64; 2]> {
        if self.field_type != FieldType::Coordinates {
            return None;
        }
        let pair = self.value.as_array()?;
        match (pair.first()?.as_f64(), pair.get(1)?.as_f64()) {
            (Some(lat), Some(lng)) => Some([lat, lng]),
            _ => None,
        }
    }
}

/// Coerce every field of a list, stopping at the first invalid one.
pub fn coerce_fields(fields: Vec<GenericField>) -> OpenGeoResult<Vec<GenericField>> {
    fields.into_iter().map(GenericField::coerce).collect()
}

fn invalid(label: &str, expected: &str) -> OpenGeoError {
    OpenGeoError::validation(format!("le champ « {label} » attend {expected}"))
}

fn coerce_value(label: &str, field_type: FieldType, value: Value) -> OpenGeoResult<Value> {
    match field_type {
        FieldType::Coordinates => coerce_coordinates(label, value),
        FieldType::Number => match value {
            Value::Null => Ok(Value::Null),
            Value::Number(_) => Ok(value),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => parse_number(s.trim())
                .map(|n| json!(n))
                .ok_or_else(|| invalid(label, "un nombre")),
            _ => Err(invalid(label, "un nombre")),
        },
        FieldType::Boolean => match value {
            Value::Bool(_) => Ok(value),
            Value::Null => Ok(json!(false)),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "oui" | "1" => Ok(json!(true)),
                "false" | "non" | "0" | "" => Ok(json!(false)),
                _ => Err(invalid(label, "un booléen")),
            },
            _ => Err(invalid(label, "un booléen")),
        },
        FieldType::File => match value {
            Value::Null => Ok(Value::Null),
            Value::Object(_) => {
                let file: FileReference = serde_json::from_value(value)
                    .map_err(|_| invalid(label, "une référence de fichier"))?;
                serde_json::to_value(file).map_err(|e| OpenGeoError::Internal(e.to_string()))
            }
            _ => Err(invalid(label, "une référence de fichier")),
        },
        FieldType::String | FieldType::Date | FieldType::Entity | FieldType::Url => match value {
            Value::Null => Ok(json!("")),
            Value::String(_) => Ok(value),
            _ => Err(invalid(label, "du texte")),
        },
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.replace(',', ".").parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Split a `lat,lng` string. Components written with a decimal comma
/// need `;` or `", "` between them, or exactly one comma each.
fn split_pair(s: &str) -> Option<(&str, &str)> {
    if let Some(pair) = s.split_once(';') {
        return Some(pair);
    }
    if let Some(pair) = s.split_once(", ") {
        return Some(pair);
    }
    match s.matches(',').count() {
        1 => s.split_once(','),
        3 => {
            let (at, _) = s.match_indices(',').nth(1)?;
            Some((&s[..at], &s[at + 1..]))
        }
        _ => None,
    }
}

fn coerce_coordinates(label: &str, value: Value) -> OpenGeoResult<Value> {
    let (lat, lng) = match value {
        Value::Null => return Ok(FieldType::Coordinates.empty_value()),
        Value::String(s) if s.trim().is_empty() => {
            return Ok(FieldType::Coordinates.empty_value());
        }
        Value::String(s) => {
            let (lat, lng) =
                split_pair(&s).ok_or_else(|| invalid(label, "des coordonnées « lat, lng »"))?;
            (Value::String(lat.into()), Value::String(lng.into()))
        }
        Value::Array(items) if items.len() == 2 => {
            let mut items = items.into_iter();
            match (items.next(), items.next()) {
                (Some(lat), Some(lng)) => (lat, lng),
                _ => return Err(invalid(label, "une paire de coordonnées")),
            }
        }
        _ => return Err(invalid(label, "une paire de coordonnées")),
    };

    let is_blank = |v: &Value| v.is_null() || v.as_str().is_some_and(|s| s.trim().is_empty());
    if is_blank(&lat) && is_blank(&lng) {
        return Ok(FieldType::Coordinates.empty_value());
    }

    let component = |v: Value| -> Option<f64> {
        match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_number(s.trim()),
            _ => None,
        }
    };
    let lat = component(lat).ok_or_else(|| invalid(label, "une latitude numérique"))?;
    let lng = component(lng).ok_or_else(|| invalid(label, "une longitude numérique"))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(invalid(label, "une latitude comprise entre -90 et 90"));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(invalid(label, "une longitude comprise entre -180 et 180"));
    }
    Ok(json!([lat, lng]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_from_string_pair() {
        let field = GenericField::new("position", FieldType::Coordinates, json!("48.85, 2.35"))
            .coerce()
            .unwrap();
        assert_eq!(field.value, json!([48.85, 2.35]));
        assert_eq!(field.coordinates(), Some([48.85, 2.35]));
    }

    #[test]
    fn coordinates_with_decimal_commas() {
        for raw in ["48,39, -4,49", "48,39;-4,49", "48,39,-4,49"] {
            let field = GenericField::new("position", FieldType::Coordinates, json!(raw))
                .coerce()
                .unwrap();
            assert_eq!(field.value, json!([48.39, -4.49]), "{raw}");
        }
        assert!(
            GenericField::new("position", FieldType::Coordinates, json!("48,39,-4"))
                .coerce()
                .is_err()
        );
    }

    #[test]
    fn validation_message_is_french() {
        let err = GenericField::new("surface", FieldType::Number, json!("beaucoup"))
            .coerce()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: le champ « surface » attend un nombre"
        );
    }

    #[test]
    fn coordinates_from_numeric_strings() {
        let field = GenericField::new("position", FieldType::Coordinates, json!(["45.7", "4.83"]))
            .coerce()
            .unwrap();
        assert_eq!(field.value, json!([45.7, 4.83]));
    }

    #[test]
    fn empty_coordinates_stay_empty() {
        let field = GenericField::new("position", FieldType::Coordinates, json!(["", ""]))
            .coerce()
            .unwrap();
        assert_eq!(field.value, json!(["", ""]));
        assert!(field.is_empty());
        assert_eq!(field.coordinates(), None);
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let err = GenericField::new("position", FieldType::Coordinates, json!([123.0, 2.0]))
            .coerce()
            .unwrap_err();
        assert!(matches!(err, OpenGeoError::Validation { .. }));
    }

    #[test]
    fn number_accepts_decimal_comma() {
        let field = GenericField::new("surface", FieldType::Number, json!("12,5"))
            .coerce()
            .unwrap();
        assert_eq!(field.value, json!(12.5));
    }

    #[test]
    fn boolean_accepts_french_words() {
        let field = GenericField::new("ouvert", FieldType::Boolean, json!("Oui"))
            .coerce()
            .unwrap();
        assert_eq!(field.value, json!(true));
    }

    #[test]
    fn string_rejects_numbers() {
        assert!(
            GenericField::new("nom", FieldType::String, json!(3))
                .coerce()
                .is_err()
        );
    }

    #[test]
    fn file_requires_reference_shape() {
        let ok = GenericField::new(
            "plan",
            FieldType::File,
            json!({"id": "f1", "name": "plan.pdf", "path": "/upload/plan.pdf", "type": "application/pdf"}),
        )
        .coerce();
        assert!(ok.is_ok());

        let bad = GenericField::new("plan", FieldType::File, json!({"name": "plan.pdf"})).coerce();
        assert!(bad.is_err());
    }

    #[test]
    fn field_type_serializes_lowercase() {
        let field = GenericField::empty("site web", FieldType::Url);
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json, json!({"label": "site web", "type": "url", "value": ""}));
    }
}
