//! Suggestion service: field-level edits proposed by contributors and
//! applied once an editor accepts them.

use std::collections::HashMap;

use opengeo_core::error::{OpenGeoError, OpenGeoResult};
use opengeo_core::models::field::coerce_fields;
use opengeo_core::models::generic_object::GenericObject;
use opengeo_core::models::habilitation::{Actor, PermissionLevel};
use opengeo_core::models::history::HistoryAction;
use opengeo_core::models::suggestion::{CreateSuggestion, Suggestion, SuggestionStatus};
use opengeo_core::path::{DocumentPath, Segment};
use opengeo_core::repository::{
    EntityFilter, GenericObjectRepository, HistoryRepository, SuggestionFilter,
    SuggestionRepository,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::access;
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::objects::store_edit;

/// A proposed value for one field of a generic object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSuggestion {
    pub object_id: Uuid,
    /// Path as produced by the diff engine, ending in `.value`.
    pub path: String,
    pub value: Value,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Listing filter for suggestions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionQuery {
    pub object_id: Option<Uuid>,
    pub status: Option<SuggestionStatus>,
}

/// Reviewed suggestion and the number of changes it applied.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub suggestion: Suggestion,
    pub affected_count: u64,
}

/// Parse `raw` and check it addresses a field value of `object`.
fn value_path(raw: &str, object: &GenericObject) -> OpenGeoResult<DocumentPath> {
    let path: DocumentPath = raw.parse()?;
    let targets_value =
        matches!(path.segments.last(), Some(Segment::Field(name)) if name == "value");
    let in_values = matches!(
        path.segments.first(),
        Some(Segment::Field(name)) if name == "values" || name == "children"
    );
    if path.root != object.id.to_string() || !targets_value || !in_values {
        return Err(ServiceError::PathOutsideObject(raw.to_string()).into());
    }
    Ok(path)
}

fn to_document(object: &GenericObject) -> OpenGeoResult<Value> {
    serde_json::to_value(object).map_err(|e| OpenGeoError::Internal(e.to_string()))
}

/// Write `value` at `path` and return the coerced result.
fn apply(
    object: &GenericObject,
    path: &DocumentPath,
    value: Value,
) -> OpenGeoResult<GenericObject> {
    let mut document = to_document(object)?;
    path.set(&mut document, value)?;
    let mut candidate: GenericObject = serde_json::from_value(document)
        .map_err(|e| OpenGeoError::validation(format!("la valeur suggérée ne convient pas : {e}")))?;

    candidate.values = coerce_fields(candidate.values)?;
    for copies in candidate.children.values_mut() {
        for copy in copies.iter_mut() {
            copy.values = coerce_fields(std::mem::take(&mut copy.values))?;
        }
    }
    Ok(candidate)
}

/// Suggestion service.
pub struct SuggestionService<Sg, G, H>
where
    Sg: SuggestionRepository,
    G: GenericObjectRepository,
    H: HistoryRepository,
{
    suggestions: Sg,
    objects: G,
    history: H,
    config: ServiceConfig,
}

impl<Sg, G, H> SuggestionService<Sg, G, H>
where
    Sg: SuggestionRepository,
    G: GenericObjectRepository,
    H: HistoryRepository,
{
    pub fn new(suggestions: Sg, objects: G, history: H, config: ServiceConfig) -> Self {
        Self {
            suggestions,
            objects,
            history,
            config,
        }
    }

    /// Record a proposal. The current value at the path is kept as the
    /// suggestion's `initial_value`.
    pub async fn submit(
        &self,
        actor: &Actor,
        input: SubmitSuggestion,
    ) -> OpenGeoResult<Suggestion> {
        let object = self.objects.get_by_id(input.object_id).await?;
        access::require_on(actor, &object.metadata, PermissionLevel::Contributor)?;

        let path = value_path(&input.path, &object)?;
        let initial_value = path
            .get(&to_document(&object)?)
            .cloned()
            .ok_or_else(|| ServiceError::PathOutsideObject(input.path.clone()))?;
        if initial_value == input.value {
            return Err(OpenGeoError::validation("la valeur suggérée est identique à la valeur actuelle"));
        }
        // Reject values that would not coerce now rather than at review time.
        apply(&object, &path, input.value.clone())?;

        let comment = input.comment.filter(|c| !c.trim().is_empty());
        if comment
            .as_ref()
            .is_some_and(|c| c.chars().count() > self.config.max_comment_length)
        {
            return Err(OpenGeoError::validation(format!(
                "le commentaire dépasse {} caractères",
                self.config.max_comment_length
            )));
        }

        let suggestion = self
            .suggestions
            .create(CreateSuggestion {
                object_id: object.id,
                entity: object.metadata.entity.clone(),
                path: path.to_string(),
                initial_value,
                value: input.value,
                comment,
                author: actor.user.clone(),
            })
            .await?;

        info!(
            suggestion_id = %suggestion.id,
            object_id = %object.id,
            user = %actor.user,
            "suggestion submitted"
        );
        Ok(suggestion)
    }

    /// Accept or reject a pending suggestion.
    ///
    /// Accepting writes the value into the object, provided the field
    /// still holds the value seen at submission, and records a
    /// `Suggestion` history entry.
    pub async fn review(
        &self,
        actor: &Actor,
        id: Uuid,
        accept: bool,
    ) -> OpenGeoResult<ReviewOutcome> {
        let suggestion = self.suggestions.get_by_id(id).await?;
        access::require(actor, &suggestion.entity, PermissionLevel::Editor)?;
        // A suggestion on a deleted object can still be rejected.
        let object = match self.objects.get_by_id(suggestion.object_id).await {
            Ok(object) => {
                access::require_on(actor, &object.metadata, PermissionLevel::Editor)?;
                Some(object)
            }
            Err(OpenGeoError::NotFound { .. }) if !accept => None,
            Err(e) => return Err(e),
        };
        if suggestion.status != SuggestionStatus::Pending {
            return Err(ServiceError::AlreadyReviewed { what: "suggestion" }.into());
        }

        let mut affected_count = 0;
        if let Some(object) = object.filter(|_| accept) {
            let path = value_path(&suggestion.path, &object)?;
            let current = path.get(&to_document(&object)?).cloned();
            if current.as_ref() != Some(&suggestion.initial_value) {
                return Err(ServiceError::StaleSuggestion(suggestion.path.clone()).into());
            }

            let candidate = apply(&object, &path, suggestion.value.clone())?;
            let stored = store_edit(
                &self.objects,
                &self.history,
                actor,
                &object,
                candidate,
                HistoryAction::Suggestion,
            )
            .await?;
            if let Some((_, entry)) = stored {
                affected_count = entry.affected_count;
            }
        }

        let status = if accept {
            SuggestionStatus::Accepted
        } else {
            SuggestionStatus::Rejected
        };
        let suggestion = self.suggestions.review(id, status, &actor.user).await?;

        info!(
            suggestion_id = %id,
            status = status.as_str(),
            user = %actor.user,
            affected_count,
            "suggestion reviewed"
        );
        Ok(ReviewOutcome {
            suggestion,
            affected_count,
        })
    }

    /// Suggestions of one object, or of every object the actor can read.
    ///
    /// Without an object, the listing is scoped to the readable entities
    /// and then narrowed to the objects whose `authorization` the actor
    /// meets; suggestions on deleted objects are left to administrators.
    pub async fn list(
        &self,
        actor: &Actor,
        query: SuggestionQuery,
    ) -> OpenGeoResult<Vec<Suggestion>> {
        let scope = match query.object_id {
            Some(object_id) => {
                let object = self.objects.get_by_id(object_id).await?;
                access::require_on(actor, &object.metadata, PermissionLevel::Reader)?;
                None
            }
            None => Some(access::readable_scope(actor, None)?),
        };

        let suggestions = self
            .suggestions
            .list(SuggestionFilter {
                object_id: query.object_id,
                entities: scope.as_ref().and_then(|s| s.entities.clone()),
                status: query.status,
            })
            .await?;

        match scope {
            Some(scope) if !actor.is_admin => self.readable_only(&scope, suggestions).await,
            _ => Ok(suggestions),
        }
    }

    /// Keep the suggestions whose object passes `scope`.
    async fn readable_only(
        &self,
        scope: &EntityFilter,
        suggestions: Vec<Suggestion>,
    ) -> OpenGeoResult<Vec<Suggestion>> {
        let mut readable: HashMap<Uuid, bool> = HashMap::new();
        let mut visible = Vec::with_capacity(suggestions.len());
        for suggestion in suggestions {
            let admitted = match readable.get(&suggestion.object_id) {
                Some(&admitted) => admitted,
                None => {
                    let admitted = match self.objects.get_by_id(suggestion.object_id).await {
                        Ok(object) => scope.admits(&object.metadata),
                        Err(OpenGeoError::NotFound { .. }) => false,
                        Err(e) => return Err(e),
                    };
                    readable.insert(suggestion.object_id, admitted);
                    admitted
                }
            };
            if admitted {
                visible.push(suggestion);
            }
        }
        Ok(visible)
    }
}
