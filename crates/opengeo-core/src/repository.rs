//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Access control is not the
//! repositories' concern: services check the caller's habilitations
//! before reaching them.

use uuid::Uuid;

use crate::error::OpenGeoResult;
use crate::models::{
    document::Metadata,
    generic_object::{CreateGenericObject, GenericObject},
    habilitation::{CreateHabilitation, Habilitation, HabilitationStatus, PermissionLevel},
    history::{CreateHistoryEntry, HistoryAction, HistoryEntry},
    sub_object::{CreateSubObject, SubObject},
    suggestion::{CreateSuggestion, Suggestion, SuggestionStatus},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Restricts a document listing to a set of entities and, optionally, to
/// the documents whose `authorization` the caller meets on each of them.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    /// `None` lists every entity.
    pub entities: Option<Vec<String>>,
    /// Highest document `authorization` visible per entity. `None` shows
    /// every level; an entity missing from the list shows nothing.
    pub clearance: Option<Vec<(String, PermissionLevel)>>,
}

impl EntityFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only(entities: Vec<String>) -> Self {
        Self {
            entities: Some(entities),
            clearance: None,
        }
    }

    pub fn with_clearance(mut self, clearance: Vec<(String, PermissionLevel)>) -> Self {
        self.clearance = Some(clearance);
        self
    }

    /// Whether a document with `metadata` passes the filter.
    pub fn admits(&self, metadata: &Metadata) -> bool {
        let in_scope = self
            .entities
            .as_ref()
            .is_none_or(|entities| entities.contains(&metadata.entity));
        let cleared = self.clearance.as_ref().is_none_or(|clearance| {
            clearance.iter().any(|(entity, level)| {
                *entity == metadata.entity && metadata.authorization <= *level
            })
        });
        in_scope && cleared
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

pub trait GenericObjectRepository: Send + Sync {
    fn create(
        &self,
        input: CreateGenericObject,
    ) -> impl Future<Output = OpenGeoResult<GenericObject>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = OpenGeoResult<GenericObject>> + Send;
    /// Overwrite the stored document; stamps `updated_at` and `updated_by`.
    fn replace(
        &self,
        object: GenericObject,
        updated_by: &str,
    ) -> impl Future<Output = OpenGeoResult<GenericObject>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = OpenGeoResult<()>> + Send;
    fn list(
        &self,
        filter: EntityFilter,
        pagination: Pagination,
    ) -> impl Future<Output = OpenGeoResult<PaginatedResult<GenericObject>>> + Send;
    /// Every object of one entity, unpaginated (cascades and map feed).
    fn list_by_entity(
        &self,
        entity: &str,
    ) -> impl Future<Output = OpenGeoResult<Vec<GenericObject>>> + Send;
    /// Overwrite many documents, one write each, with no atomicity across
    /// them. Returns the number of documents written.
    fn replace_many(
        &self,
        objects: Vec<GenericObject>,
        updated_by: &str,
    ) -> impl Future<Output = OpenGeoResult<u64>> + Send;
}

pub trait SubObjectRepository: Send + Sync {
    fn create(&self, input: CreateSubObject)
    -> impl Future<Output = OpenGeoResult<SubObject>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = OpenGeoResult<SubObject>> + Send;
    fn replace(
        &self,
        sub_object: SubObject,
        updated_by: &str,
    ) -> impl Future<Output = OpenGeoResult<SubObject>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = OpenGeoResult<()>> + Send;
    fn list(
        &self,
        filter: EntityFilter,
        pagination: Pagination,
    ) -> impl Future<Output = OpenGeoResult<PaginatedResult<SubObject>>> + Send;
}

// ---------------------------------------------------------------------------
// History (append-only)
// ---------------------------------------------------------------------------

/// Query filters for history entries.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub object_id: Option<Uuid>,
    pub entity: Option<String>,
    pub author: Option<String>,
    pub action: Option<HistoryAction>,
}

pub trait HistoryRepository: Send + Sync {
    /// Append a new history entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateHistoryEntry,
    ) -> impl Future<Output = OpenGeoResult<HistoryEntry>> + Send;
    /// Newest entries first.
    fn list(
        &self,
        filter: HistoryFilter,
        pagination: Pagination,
    ) -> impl Future<Output = OpenGeoResult<PaginatedResult<HistoryEntry>>> + Send;
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct SuggestionFilter {
    pub object_id: Option<Uuid>,
    pub entities: Option<Vec<String>>,
    pub status: Option<SuggestionStatus>,
}

pub trait SuggestionRepository: Send + Sync {
    fn create(
        &self,
        input: CreateSuggestion,
    ) -> impl Future<Output = OpenGeoResult<Suggestion>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = OpenGeoResult<Suggestion>> + Send;
    /// Record the review outcome.
    fn review(
        &self,
        id: Uuid,
        status: SuggestionStatus,
        reviewed_by: &str,
    ) -> impl Future<Output = OpenGeoResult<Suggestion>> + Send;
    /// Oldest entries first.
    fn list(
        &self,
        filter: SuggestionFilter,
    ) -> impl Future<Output = OpenGeoResult<Vec<Suggestion>>> + Send;
}

// ---------------------------------------------------------------------------
// Habilitations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct HabilitationFilter {
    pub status: Option<HabilitationStatus>,
    pub entity: Option<String>,
}

pub trait HabilitationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateHabilitation,
    ) -> impl Future<Output = OpenGeoResult<Habilitation>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = OpenGeoResult<Habilitation>> + Send;
    /// Move a habilitation to `Granted` or `Rejected`.
    fn decide(
        &self,
        id: Uuid,
        status: HabilitationStatus,
        decided_by: &str,
    ) -> impl Future<Output = OpenGeoResult<Habilitation>> + Send;
    fn list_for_user(
        &self,
        user: &str,
    ) -> impl Future<Output = OpenGeoResult<Vec<Habilitation>>> + Send;
    fn list(
        &self,
        filter: HabilitationFilter,
    ) -> impl Future<Output = OpenGeoResult<Vec<Habilitation>>> + Send;
}
