//! Sub-object (domain) model.
//!
//! A sub-object is a reusable field schema such as "Contact" or
//! "Occupation". Generic objects embed snapshot copies of it; the copies
//! hold per-object values and must be refreshed explicitly whenever the
//! sub-object itself changes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{Document, Metadata, children_key};
use super::field::GenericField;
use super::habilitation::PermissionLevel;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubObject {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub metadata: Metadata,
    pub values: Vec<GenericField>,
}

impl SubObject {
    /// Key of this sub-object inside a generic object's `children`.
    pub fn key(&self) -> String {
        children_key(&self.metadata.label)
    }

    /// Copy with every value reset to its type's empty value.
    pub fn template(&self) -> SubObject {
        SubObject {
            values: self
                .values
                .iter()
                .map(|f| GenericField::empty(f.label.clone(), f.field_type))
                .collect(),
            ..self.clone()
        }
    }

    /// Rebuild an embedded `copy` from this sub-object's current schema.
    ///
    /// Metadata and the field list come from `self`; a field keeps the
    /// copy's value when a field with the same label and type exists in it.
    pub fn refresh_copy(&self, copy: &SubObject) -> SubObject {
        let values = self
            .values
            .iter()
            .map(|field| {
                copy.values
                    .iter()
                    .find(|old| old.label == field.label && old.field_type == field.field_type)
                    .cloned()
                    .unwrap_or_else(|| GenericField::empty(field.label.clone(), field.field_type))
            })
            .collect();
        SubObject {
            id: self.id,
            metadata: self.metadata.clone(),
            values,
        }
    }
}

impl Document for SubObject {
    fn id(&self) -> Uuid {
        self.id
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn values(&self) -> &[GenericField] {
        &self.values
    }
}

/// Fields required to create a new sub-object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubObject {
    pub label: String,
    pub entity: String,
    #[serde(default)]
    pub authorization: PermissionLevel,
    pub color: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub values: Vec<GenericField>,
    /// Filled in from the session, never from the request body.
    #[serde(skip_deserializing, default)]
    pub created_by: String,
}

/// Fields that can be updated on an existing sub-object.
///
/// An empty string clears `color` or `description`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateSubObject {
    pub label: Option<String>,
    pub authorization: Option<PermissionLevel>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub values: Option<Vec<GenericField>>,
}
