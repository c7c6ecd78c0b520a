//! Envelope shared by generic objects and sub-objects.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::field::GenericField;
use super::habilitation::PermissionLevel;
use super::sub_object::SubObject;

/// Descriptive and audit metadata of a stored document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    pub label: String,
    /// Business perimeter the document belongs to.
    pub entity: String,
    /// Minimum habilitation level required to read the document.
    pub authorization: PermissionLevel,
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Read access to the parts of a document the diff engine walks.
pub trait Document: Serialize {
    fn id(&self) -> Uuid;
    fn metadata(&self) -> &Metadata;
    fn values(&self) -> &[GenericField];

    /// Embedded sub-object copies, for documents that carry them.
    fn children(&self) -> Option<&BTreeMap<String, Vec<SubObject>>> {
        None
    }
}

/// Key under which copies of a sub-object labelled `label` are embedded.
pub fn children_key(label: &str) -> String {
    label.trim().to_lowercase()
}
