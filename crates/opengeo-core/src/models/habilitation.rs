//! Habilitation domain model.
//!
//! A habilitation grants a user a [`PermissionLevel`] on one entity
//! (a business perimeter such as a region or an agency). Users request
//! habilitations; administrators grant or reject them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered permission levels: each level includes the ones below it.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum PermissionLevel {
    /// Read objects and fiches de synthèse.
    #[default]
    Reader,
    /// Submit suggestions.
    Contributor,
    /// Update objects and review suggestions.
    Editor,
    /// Create and delete objects, manage sub-objects.
    Manager,
}

impl PermissionLevel {
    /// Every level, lowest first.
    pub const ALL: [PermissionLevel; 4] = [
        PermissionLevel::Reader,
        PermissionLevel::Contributor,
        PermissionLevel::Editor,
        PermissionLevel::Manager,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::Reader => "Reader",
            PermissionLevel::Contributor => "Contributor",
            PermissionLevel::Editor => "Editor",
            PermissionLevel::Manager => "Manager",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Reader" => Some(PermissionLevel::Reader),
            "Contributor" => Some(PermissionLevel::Contributor),
            "Editor" => Some(PermissionLevel::Editor),
            "Manager" => Some(PermissionLevel::Manager),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HabilitationStatus {
    Pending,
    Granted,
    Rejected,
}

impl HabilitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HabilitationStatus::Pending => "Pending",
            HabilitationStatus::Granted => "Granted",
            HabilitationStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(HabilitationStatus::Pending),
            "Granted" => Some(HabilitationStatus::Granted),
            "Rejected" => Some(HabilitationStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habilitation {
    pub id: Uuid,
    /// Login of the user the habilitation is for.
    pub user: String,
    pub entity: String,
    pub level: PermissionLevel,
    pub status: HabilitationStatus,
    pub reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHabilitation {
    pub user: String,
    pub entity: String,
    pub level: PermissionLevel,
    pub reason: Option<String>,
}

/// The authenticated caller, with the habilitations currently granted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub user: String,
    pub is_admin: bool,
    pub habilitations: Vec<Habilitation>,
}

impl Actor {
    pub fn new(user: impl Into<String>, is_admin: bool) -> Self {
        Self {
            user: user.into(),
            is_admin,
            habilitations: Vec::new(),
        }
    }

    pub fn with_habilitations(mut self, habilitations: Vec<Habilitation>) -> Self {
        self.habilitations = habilitations;
        self
    }

    /// Highest granted level on `entity`, if any.
    pub fn level_on(&self, entity: &str) -> Option<PermissionLevel> {
        if self.is_admin {
            return Some(PermissionLevel::Manager);
        }
        self.habilitations
            .iter()
            .filter(|h| h.status == HabilitationStatus::Granted && h.entity == entity)
            .map(|h| h.level)
            .max()
    }

    pub fn can_access(&self, entity: &str, level: PermissionLevel) -> bool {
        self.level_on(entity).is_some_and(|granted| granted >= level)
    }

    /// Entities the actor can at least read. Empty for administrators,
    /// who are not restricted.
    pub fn readable_entities(&self) -> Vec<String> {
        let mut entities: Vec<String> = self
            .habilitations
            .iter()
            .filter(|h| h.status == HabilitationStatus::Granted)
            .map(|h| h.entity.clone())
            .collect();
        entities.sort();
        entities.dedup();
        entities
    }
}
