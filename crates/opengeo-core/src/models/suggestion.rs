//! Suggestion domain model.
//!
//! A suggestion proposes a new value at one path of a generic object.
//! It is submitted by a contributor and reviewed by an editor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "Pending",
            SuggestionStatus::Accepted => "Accepted",
            SuggestionStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(SuggestionStatus::Pending),
            "Accepted" => Some(SuggestionStatus::Accepted),
            "Rejected" => Some(SuggestionStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub object_id: Uuid,
    pub entity: String,
    /// Path into the object, e.g. `<id>.children["contact"][0].values[1].value`.
    pub path: String,
    pub initial_value: serde_json::Value,
    pub value: serde_json::Value,
    pub comment: Option<String>,
    pub author: String,
    pub status: SuggestionStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSuggestion {
    pub object_id: Uuid,
    pub entity: String,
    pub path: String,
    pub initial_value: serde_json::Value,
    pub value: serde_json::Value,
    pub comment: Option<String>,
    pub author: String,
}
