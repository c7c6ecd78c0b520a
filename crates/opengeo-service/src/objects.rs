//! Generic object service: CRUD with an audit trail, sub-object
//! attachment and the map feed.

use std::collections::BTreeMap;

use opengeo_core::diff::{Difference, get_difference};
use opengeo_core::error::{OpenGeoError, OpenGeoResult};
use opengeo_core::models::field::coerce_fields;
use opengeo_core::models::generic_object::{
    CreateGenericObject, GenericObject, MapMarker, UpdateGenericObject,
};
use opengeo_core::models::habilitation::{Actor, PermissionLevel};
use opengeo_core::models::history::{CreateHistoryEntry, HistoryAction, HistoryEntry};
use opengeo_core::models::sub_object::SubObject;
use opengeo_core::repository::{
    GenericObjectRepository, HistoryFilter, HistoryRepository, PaginatedResult, Pagination,
    SubObjectRepository,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::access;
use crate::config::ServiceConfig;
use crate::error::ServiceError;

/// Result of an edit: the stored object and the number of recorded changes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub object: GenericObject,
    pub affected_count: u64,
}

/// Generic object service.
///
/// Generic over repository implementations so that the service layer
/// has no dependency on the database crate.
pub struct ObjectService<G, S, H>
where
    G: GenericObjectRepository,
    S: SubObjectRepository,
    H: HistoryRepository,
{
    objects: G,
    sub_objects: S,
    history: H,
    config: ServiceConfig,
}

/// Whole-document change used for create and delete entries.
fn snapshot_change(object: &GenericObject, created: bool) -> OpenGeoResult<Difference> {
    let snapshot =
        serde_json::to_value(object).map_err(|e| OpenGeoError::Internal(e.to_string()))?;
    let (initial_value, value) = if created {
        (Value::Null, snapshot)
    } else {
        (snapshot, Value::Null)
    };
    Ok(Difference {
        path: object.id.to_string(),
        initial_value,
        value,
    })
}

/// Rebuild a client-supplied `children` map: every copy is filed under
/// its own children key and coerced. Copies of another entity's
/// sub-objects are rejected.
fn normalize_children(
    entity: &str,
    children: BTreeMap<String, Vec<SubObject>>,
) -> OpenGeoResult<BTreeMap<String, Vec<SubObject>>> {
    let mut normalized: BTreeMap<String, Vec<SubObject>> = BTreeMap::new();
    for mut copy in children.into_values().flatten() {
        if copy.metadata.entity != entity {
            return Err(ServiceError::EntityMismatch {
                sub: copy.metadata.label,
                entity: copy.metadata.entity,
            }
            .into());
        }
        copy.values = coerce_fields(std::mem::take(&mut copy.values))?;
        normalized.entry(copy.key()).or_default().push(copy);
    }
    Ok(normalized)
}

/// Apply an update request on top of `current`, producing the candidate
/// snapshot that will be diffed and stored.
fn apply_update(current: &GenericObject, input: UpdateGenericObject) -> OpenGeoResult<GenericObject> {
    let mut candidate = current.clone();
    if let Some(label) = input.label {
        candidate.metadata.label = access::label(&label)?;
    }
    if let Some(authorization) = input.authorization {
        candidate.metadata.authorization = authorization;
    }
    if let Some(color) = input.color {
        candidate.metadata.color = Some(color).filter(|c| !c.is_empty());
    }
    if let Some(description) = input.description {
        candidate.metadata.description = Some(description).filter(|d| !d.is_empty());
    }
    if let Some(values) = input.values {
        candidate.values = coerce_fields(values)?;
    }
    if let Some(children) = input.children {
        candidate.children = normalize_children(&current.metadata.entity, children)?;
    }
    Ok(candidate)
}

impl<G, S, H> ObjectService<G, S, H>
where
    G: GenericObjectRepository,
    S: SubObjectRepository,
    H: HistoryRepository,
{
    pub fn new(objects: G, sub_objects: S, history: H, config: ServiceConfig) -> Self {
        Self {
            objects,
            sub_objects,
            history,
            config,
        }
    }

    /// Create a generic object and record a `Create` history entry.
    pub async fn create(
        &self,
        actor: &Actor,
        mut input: CreateGenericObject,
    ) -> OpenGeoResult<GenericObject> {
        access::require(actor, &input.entity, PermissionLevel::Manager)?;
        input.label = access::label(&input.label)?;
        input.values = coerce_fields(input.values)?;
        let children = std::mem::take(&mut input.children);
        input.children = normalize_children(&input.entity, children)?;
        input.created_by = actor.user.clone();

        let object = self.objects.create(input).await?;
        self.record(actor, &object, HistoryAction::Create, vec![snapshot_change(&object, true)?])
            .await?;

        info!(
            object_id = %object.id,
            entity = %object.metadata.entity,
            user = %actor.user,
            "generic object created"
        );
        Ok(object)
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> OpenGeoResult<GenericObject> {
        let object = self.objects.get_by_id(id).await?;
        access::require_on(actor, &object.metadata, PermissionLevel::Reader)?;
        Ok(object)
    }

    /// Objects of `entity`, or of every entity the actor can read.
    pub async fn list(
        &self,
        actor: &Actor,
        entity: Option<&str>,
        pagination: Pagination,
    ) -> OpenGeoResult<PaginatedResult<GenericObject>> {
        let filter = access::readable_scope(actor, entity)?;
        self.objects
            .list(filter, access::clamp(pagination, &self.config))
            .await
    }

    /// Apply an edit, diff it against the stored snapshot and record the
    /// differences. An edit that changes nothing is not written.
    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateGenericObject,
    ) -> OpenGeoResult<UpdateOutcome> {
        let current = self.objects.get_by_id(id).await?;
        let entity = current.metadata.entity.clone();
        access::require_on(actor, &current.metadata, PermissionLevel::Editor)?;
        if input
            .authorization
            .is_some_and(|level| level != current.metadata.authorization)
        {
            access::require(actor, &entity, PermissionLevel::Manager)?;
        }

        let candidate = apply_update(&current, input)?;
        self.store_edit(actor, &current, candidate, HistoryAction::Update)
            .await
    }

    /// Delete an object, keeping its last snapshot in the history.
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> OpenGeoResult<()> {
        let object = self.objects.get_by_id(id).await?;
        access::require_on(actor, &object.metadata, PermissionLevel::Manager)?;

        self.objects.delete(id).await?;
        self.record(actor, &object, HistoryAction::Delete, vec![snapshot_change(&object, false)?])
            .await?;

        info!(object_id = %id, user = %actor.user, "generic object deleted");
        Ok(())
    }

    /// Embed an empty copy of a sub-object of the same entity.
    pub async fn attach_sub_object(
        &self,
        actor: &Actor,
        id: Uuid,
        sub_id: Uuid,
    ) -> OpenGeoResult<UpdateOutcome> {
        let current = self.objects.get_by_id(id).await?;
        access::require_on(actor, &current.metadata, PermissionLevel::Editor)?;

        let sub = self.sub_objects.get_by_id(sub_id).await?;
        if sub.metadata.entity != current.metadata.entity {
            return Err(ServiceError::EntityMismatch {
                sub: sub.metadata.label,
                entity: sub.metadata.entity,
            }
            .into());
        }

        let mut candidate = current.clone();
        candidate.embed(sub.template());
        self.store_edit(actor, &current, candidate, HistoryAction::Update)
            .await
    }

    /// Remove every embedded copy of a sub-object.
    pub async fn detach_sub_object(
        &self,
        actor: &Actor,
        id: Uuid,
        sub_id: Uuid,
    ) -> OpenGeoResult<UpdateOutcome> {
        let current = self.objects.get_by_id(id).await?;
        access::require_on(actor, &current.metadata, PermissionLevel::Editor)?;

        let mut candidate = current.clone();
        if candidate.detach(sub_id) == 0 {
            return Err(OpenGeoError::not_found("sub_object", sub_id));
        }
        self.store_edit(actor, &current, candidate, HistoryAction::Update)
            .await
    }

    /// History of one object, newest first.
    ///
    /// Administrators can still read the history of a deleted object.
    pub async fn history(
        &self,
        actor: &Actor,
        id: Uuid,
        pagination: Pagination,
    ) -> OpenGeoResult<PaginatedResult<HistoryEntry>> {
        match self.objects.get_by_id(id).await {
            Ok(object) => {
                access::require_on(actor, &object.metadata, PermissionLevel::Reader)?
            }
            Err(OpenGeoError::NotFound { .. }) if actor.is_admin => {}
            Err(e) => return Err(e),
        }

        self.history
            .list(
                HistoryFilter {
                    object_id: Some(id),
                    ..Default::default()
                },
                access::clamp(pagination, &self.config),
            )
            .await
    }

    /// Markers for every readable object that has coordinates.
    pub async fn map_markers(
        &self,
        actor: &Actor,
        entity: Option<&str>,
    ) -> OpenGeoResult<Vec<MapMarker>> {
        let filter = access::readable_scope(actor, entity)?;
        let objects = match filter.entities.as_deref() {
            Some([entity]) => self.objects.list_by_entity(entity).await?,
            _ => {
                self.objects
                    .list(
                        filter.clone(),
                        Pagination {
                            offset: 0,
                            limit: self.config.scan_limit,
                        },
                    )
                    .await?
                    .items
            }
        };

        Ok(objects
            .iter()
            .filter(|object| filter.admits(&object.metadata))
            .filter_map(MapMarker::from_object)
            .collect())
    }

    async fn store_edit(
        &self,
        actor: &Actor,
        current: &GenericObject,
        candidate: GenericObject,
        action: HistoryAction,
    ) -> OpenGeoResult<UpdateOutcome> {
        let stored =
            store_edit(&self.objects, &self.history, actor, current, candidate, action).await?;
        let Some((object, entry)) = stored else {
            return Ok(UpdateOutcome {
                object: current.clone(),
                affected_count: 0,
            });
        };

        info!(
            object_id = %object.id,
            user = %actor.user,
            affected_count = entry.affected_count,
            "generic object updated"
        );
        Ok(UpdateOutcome {
            object,
            affected_count: entry.affected_count,
        })
    }

    async fn record(
        &self,
        actor: &Actor,
        object: &GenericObject,
        action: HistoryAction,
        changes: Vec<Difference>,
    ) -> OpenGeoResult<HistoryEntry> {
        self.history
            .append(CreateHistoryEntry {
                object_id: object.id,
                entity: object.metadata.entity.clone(),
                action,
                author: actor.user.clone(),
                changes,
            })
            .await
    }
}

/// Diff `candidate` against `current`, then store it with a history
/// entry holding the differences. Returns `None`, writing nothing, when
/// the two snapshots are identical.
pub(crate) async fn store_edit<G, H>(
    objects: &G,
    history: &H,
    actor: &Actor,
    current: &GenericObject,
    candidate: GenericObject,
    action: HistoryAction,
) -> OpenGeoResult<Option<(GenericObject, HistoryEntry)>>
where
    G: GenericObjectRepository,
    H: HistoryRepository,
{
    let changes = get_difference(current, &candidate);
    if changes.is_empty() {
        return Ok(None);
    }
    let object = objects.replace(candidate, &actor.user).await?;
    let entry = history
        .append(CreateHistoryEntry {
            object_id: object.id,
            entity: object.metadata.entity.clone(),
            action,
            author: actor.user.clone(),
            changes,
        })
        .await?;
    Ok(Some((object, entry)))
}
