//! Generic object (site) model.
//!
//! A generic object is a geolocated record with its own typed fields and
//! a `children` map holding snapshot copies of sub-objects, keyed by the
//! lower-cased sub-object label.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{Document, Metadata};
use super::field::GenericField;
use super::habilitation::PermissionLevel;
use super::sub_object::SubObject;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenericObject {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub metadata: Metadata,
    pub values: Vec<GenericField>,
    #[serde(default)]
    pub children: BTreeMap<String, Vec<SubObject>>,
}

impl GenericObject {
    /// Append a copy of `sub` under its children key.
    pub fn embed(&mut self, sub: SubObject) {
        self.children.entry(sub.key()).or_default().push(sub);
    }

    /// Whether at least one copy of the sub-object is embedded.
    pub fn embeds(&self, sub_id: Uuid) -> bool {
        self.children
            .values()
            .any(|copies| copies.iter().any(|c| c.id == sub_id))
    }

    /// Remove every copy of the sub-object, dropping keys left empty.
    /// Returns the number of copies removed.
    pub fn detach(&mut self, sub_id: Uuid) -> usize {
        let mut removed = 0;
        for copies in self.children.values_mut() {
            let before = copies.len();
            copies.retain(|c| c.id != sub_id);
            removed += before - copies.len();
        }
        self.children.retain(|_, copies| !copies.is_empty());
        removed
    }

    /// Replace every copy of `sub` with a refreshed one, moving the copies
    /// under the new key when the label changed. Returns whether anything
    /// was rewritten.
    pub fn refresh_embedded(&mut self, sub: &SubObject) -> bool {
        let mut refreshed = Vec::new();
        for copies in self.children.values_mut() {
            let (matching, others): (Vec<_>, Vec<_>) =
                copies.drain(..).partition(|c| c.id == sub.id);
            *copies = others;
            refreshed.extend(matching.iter().map(|copy| sub.refresh_copy(copy)));
        }
        self.children.retain(|_, copies| !copies.is_empty());
        if refreshed.is_empty() {
            return false;
        }
        self.children.entry(sub.key()).or_default().extend(refreshed);
        true
    }

    /// First coordinates field holding a valid pair.
    pub fn coordinates(&self) -> Option<[f64; 2]> {
        self.values.iter().find_map(GenericField::coordinates)
    }
}

impl Document for GenericObject {
    fn id(&self) -> Uuid {
        self.id
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn values(&self) -> &[GenericField] {
        &self.values
    }

    fn children(&self) -> Option<&BTreeMap<String, Vec<SubObject>>> {
        Some(&self.children)
    }
}

/// Fields required to create a new generic object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGenericObject {
    pub label: String,
    pub entity: String,
    #[serde(default)]
    pub authorization: PermissionLevel,
    pub color: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub values: Vec<GenericField>,
    #[serde(default)]
    pub children: BTreeMap<String, Vec<SubObject>>,
    /// Filled in from the session, never from the request body.
    #[serde(skip_deserializing, default)]
    pub created_by: String,
}

/// Fields that can be updated on an existing generic object.
///
/// An empty string clears `color` or `description`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateGenericObject {
    pub label: Option<String>,
    pub authorization: Option<PermissionLevel>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub values: Option<Vec<GenericField>>,
    pub children: Option<BTreeMap<String, Vec<SubObject>>>,
}

/// Point shown on the map for a generic object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapMarker {
    pub id: Uuid,
    pub label: String,
    pub entity: String,
    pub color: Option<String>,
    pub coordinates: [f64; 2],
}

impl MapMarker {
    pub fn from_object(object: &GenericObject) -> Option<Self> {
        Some(Self {
            id: object.id,
            label: object.metadata.label.clone(),
            entity: object.metadata.entity.clone(),
            color: object.metadata.color.clone(),
            coordinates: object.coordinates()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::models::field::FieldType;

    fn metadata(label: &str) -> Metadata {
        let now = Utc::now();
        Metadata {
            label: label.into(),
            entity: "bretagne".into(),
            authorization: PermissionLevel::Reader,
            color: Some("#ff0000".into()),
            description: None,
            created_at: now,
            created_by: "admin".into(),
            updated_at: now,
            updated_by: "admin".into(),
        }
    }

    fn site() -> GenericObject {
        GenericObject {
            id: Uuid::new_v4(),
            metadata: metadata("Mairie de Rennes"),
            values: vec![
                GenericField::new("adresse", FieldType::String, json!("Place de la Mairie")),
                GenericField::new("position", FieldType::Coordinates, json!([48.111, -1.68])),
            ],
            children: BTreeMap::new(),
        }
    }

    fn sub(label: &str) -> SubObject {
        SubObject {
            id: Uuid::new_v4(),
            metadata: metadata(label),
            values: vec![GenericField::new("nom", FieldType::String, json!("Durand"))],
        }
    }

    #[test]
    fn embed_uses_lowercased_key() {
        let mut object = site();
        let contact = sub("Contact");
        object.embed(contact.clone());
        object.embed(contact.clone());
        assert_eq!(object.children["contact"].len(), 2);
        assert!(object.embeds(contact.id));
    }

    #[test]
    fn detach_drops_empty_keys() {
        let mut object = site();
        let contact = sub("Contact");
        object.embed(contact.clone());
        object.embed(sub("Occupation"));
        assert_eq!(object.detach(contact.id), 1);
        assert!(!object.children.contains_key("contact"));
        assert!(object.children.contains_key("occupation"));
    }

    #[test]
    fn refresh_moves_copies_on_rename() {
        let mut object = site();
        let contact = sub("Contact");
        object.embed(contact.clone());

        let mut renamed = contact.clone();
        renamed.metadata.label = "Interlocuteur".into();
        assert!(object.refresh_embedded(&renamed));
        assert!(!object.children.contains_key("contact"));
        assert_eq!(object.children["interlocuteur"][0].values[0].value, json!("Durand"));
    }

    #[test]
    fn refresh_ignores_objects_without_copy() {
        let mut object = site();
        assert!(!object.refresh_embedded(&sub("Contact")));
        assert!(object.children.is_empty());
    }

    #[test]
    fn marker_requires_coordinates() {
        let object = site();
        let marker = MapMarker::from_object(&object).unwrap();
        assert_eq!(marker.coordinates, [48.111, -1.68]);

        let mut without = site();
        without.values.pop();
        assert!(MapMarker::from_object(&without).is_none());
    }

    #[test]
    fn id_serializes_as_underscore_id() {
        let json = serde_json::to_value(site()).unwrap();
        assert!(json.get("_id").is_some());
        assert!(json.get("children").is_some());
    }
}
