//! Row mapping shared by the `generic_object` and `sub_object` tables.
//!
//! Both tables store the metadata envelope as flat columns and the
//! schema-less part (`values`, `children`) inside a FLEXIBLE `body`
//! object.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use opengeo_core::models::document::Metadata;
use opengeo_core::models::field::GenericField;
use opengeo_core::models::habilitation::PermissionLevel;
use opengeo_core::models::sub_object::SubObject;
use opengeo_core::repository::EntityFilter;
use serde::{Deserialize, Serialize};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Content of the `body` column.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct DocumentBody {
    #[serde(default)]
    pub values: Vec<GenericField>,
    #[serde(default)]
    pub children: BTreeMap<String, Vec<SubObject>>,
}

impl DocumentBody {
    pub fn to_json(&self) -> Result<serde_json::Value, DbError> {
        serde_json::to_value(self).map_err(|e| DbError::Decode(format!("document body: {e}")))
    }
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
pub(crate) struct DocumentRow {
    label: String,
    entity: String,
    authorization: String,
    color: Option<String>,
    description: Option<String>,
    body: serde_json::Value,
    created_by: String,
    updated_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(crate) struct DocumentRowWithId {
    record_id: String,
    label: String,
    entity: String,
    authorization: String,
    color: Option<String>,
    description: Option<String>,
    body: serde_json::Value,
    created_by: String,
    updated_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub total: u64,
}

pub(crate) fn parse_level(s: &str) -> Result<PermissionLevel, DbError> {
    PermissionLevel::parse(s).ok_or_else(|| DbError::Decode(format!("unknown permission level: {s}")))
}

pub(crate) fn parse_uuid(s: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

/// Turn an empty string into `None`; used for clearable optional columns.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl DocumentRow {
    pub fn into_parts(self) -> Result<(Metadata, DocumentBody), DbError> {
        let body = serde_json::from_value(self.body)
            .map_err(|e| DbError::Decode(format!("document body: {e}")))?;
        let metadata = Metadata {
            label: self.label,
            entity: self.entity,
            authorization: parse_level(&self.authorization)?,
            color: self.color,
            description: self.description,
            created_at: self.created_at,
            created_by: self.created_by,
            updated_at: self.updated_at,
            updated_by: self.updated_by,
        };
        Ok((metadata, body))
    }
}

impl DocumentRowWithId {
    pub fn into_parts(self) -> Result<(Uuid, Metadata, DocumentBody), DbError> {
        let id = parse_uuid(&self.record_id, "document")?;
        let row = DocumentRow {
            label: self.label,
            entity: self.entity,
            authorization: self.authorization,
            color: self.color,
            description: self.description,
            body: self.body,
            created_by: self.created_by,
            updated_by: self.updated_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        let (metadata, body) = row.into_parts()?;
        Ok((id, metadata, body))
    }
}

/// `WHERE` clause for a document listing, reading `$entities` and
/// `$visible`, or an empty string when every document is listed.
pub(crate) fn filter_clause(filter: &EntityFilter) -> String {
    let mut conditions = Vec::new();
    if filter.entities.is_some() {
        conditions.push("entity IN $entities");
    }
    if filter.clearance.is_some() {
        conditions.push("string::concat(entity, '/', authorization) IN $visible");
    }
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

/// `entity/level` pairs a listed document may carry under the filter's
/// clearance.
pub(crate) fn visible_pairs(filter: &EntityFilter) -> Vec<String> {
    filter
        .clearance
        .iter()
        .flatten()
        .flat_map(|(entity, max)| {
            PermissionLevel::ALL
                .into_iter()
                .filter(move |level| level <= max)
                .map(move |level| format!("{entity}/{}", level.as_str()))
        })
        .collect()
}
