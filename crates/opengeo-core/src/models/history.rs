//! History (audit trail) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::diff::Difference;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HistoryAction {
    Create,
    Update,
    Delete,
    /// An accepted suggestion applied to the object.
    Suggestion,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::Create => "Create",
            HistoryAction::Update => "Update",
            HistoryAction::Delete => "Delete",
            HistoryAction::Suggestion => "Suggestion",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Create" => Some(HistoryAction::Create),
            "Update" => Some(HistoryAction::Update),
            "Delete" => Some(HistoryAction::Delete),
            "Suggestion" => Some(HistoryAction::Suggestion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub object_id: Uuid,
    pub entity: String,
    pub action: HistoryAction,
    pub author: String,
    pub changes: Vec<Difference>,
    pub affected_count: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHistoryEntry {
    pub object_id: Uuid,
    pub entity: String,
    pub action: HistoryAction,
    pub author: String,
    pub changes: Vec<Difference>,
}

impl CreateHistoryEntry {
    /// Number of differences recorded, reported to clients as `affectedCount`.
    pub fn affected_count(&self) -> u64 {
        self.changes.len() as u64
    }
}
