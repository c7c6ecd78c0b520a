//! Fiche de synthèse: printable summary of a generic object and a
//! selection of its embedded sub-objects.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::document::children_key;
use super::field::{FieldType, GenericField};
use super::generic_object::GenericObject;
use super::habilitation::Actor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FicheSynthese {
    pub object_id: Uuid,
    pub label: String,
    pub entity: String,
    pub description: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    pub fields: Vec<GenericField>,
    pub sections: Vec<SyntheseSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheseSection {
    pub key: String,
    pub label: String,
    pub entries: Vec<SyntheseEntry>,
}

/// One copy of a sub-object; `index` is its position among the copies
/// filed under the section's key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheseEntry {
    pub index: usize,
    pub values: Vec<GenericField>,
}

impl FicheSynthese {
    /// Assemble the sheet for `actor`.
    ///
    /// `domains` selects children keys (case-insensitive); an empty
    /// selection takes every key. Copies whose authorization level is
    /// above what the actor holds on the object's entity are left out.
    pub fn build(object: &GenericObject, domains: &[String], actor: &Actor) -> Self {
        let wanted: Vec<String> = domains.iter().map(|d| children_key(d)).collect();
        let level = actor.level_on(&object.metadata.entity);

        let sections = object
            .children
            .iter()
            .filter(|(key, _)| wanted.is_empty() || wanted.contains(key))
            .filter_map(|(key, copies)| {
                let visible: Vec<_> = copies
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| level.is_some_and(|l| l >= c.metadata.authorization))
                    .collect();
                let (_, first) = visible.first()?;
                Some(SyntheseSection {
                    key: key.clone(),
                    label: first.metadata.label.clone(),
                    entries: visible
                        .iter()
                        .map(|(index, c)| SyntheseEntry {
                            index: *index,
                            values: c.values.clone(),
                        })
                        .collect(),
                })
            })
            .collect();

        Self {
            object_id: object.id,
            label: object.metadata.label.clone(),
            entity: object.metadata.entity.clone(),
            description: object.metadata.description.clone(),
            generated_at: Utc::now(),
            generated_by: actor.user.clone(),
            fields: object.values.clone(),
            sections,
        }
    }

    /// Printable Markdown rendering.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Fiche de synthèse : {}", self.label);
        let _ = writeln!(out);
        let _ = writeln!(out, "Entité : {}  ", self.entity);
        let _ = writeln!(
            out,
            "Générée le {} par {}",
            self.generated_at.format("%d/%m/%Y à %H:%M"),
            self.generated_by
        );
        if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out);
            let _ = writeln!(out, "{description}");
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "## Informations générales");
        write_fields(&mut out, &self.fields);

        for section in &self.sections {
            let _ = writeln!(out);
            let _ = writeln!(out, "## {}", section.label);
            for entry in &section.entries {
                if section.entries.len() > 1 {
                    let _ = writeln!(out);
                    let _ = writeln!(out, "### {} n°{}", section.label, entry.index + 1);
                }
                write_fields(&mut out, &entry.values);
            }
        }
        out
    }
}

fn write_fields(out: &mut String, fields: &[GenericField]) {
    let _ = writeln!(out);
    let _ = writeln!(out, "| Champ | Valeur |");
    let _ = writeln!(out, "|---|---|");
    for field in fields {
        let _ = writeln!(out, "| {} | {} |", field.label, display_value(field));
    }
}

/// Human readable rendering of a field value.
pub fn display_value(field: &GenericField) -> String {
    if field.is_empty() && field.field_type != FieldType::Boolean {
        return "-".into();
    }
    match (field.field_type, &field.value) {
        (FieldType::Boolean, Value::Bool(true)) => "Oui".into(),
        (FieldType::Boolean, _) => "Non".into(),
        (FieldType::Coordinates, _) => match field.coordinates() {
            Some([lat, lng]) => format!("{lat}, {lng}"),
            None => "-".into(),
        },
        (FieldType::File, Value::Object(file)) => file
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("-")
            .to_string(),
        (_, Value::String(s)) => s.replace('|', "\\|"),
        (_, other) => other.to_string(),
    }
}
