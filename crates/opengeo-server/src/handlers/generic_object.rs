//! `/api/generic-object` handlers.

use axum::extract::State;
use opengeo_core::models::generic_object::{
    CreateGenericObject, GenericObject, MapMarker, UpdateGenericObject,
};
use opengeo_core::models::history::HistoryEntry;
use opengeo_core::repository::PaginatedResult;
use opengeo_service::UpdateOutcome;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ListQuery, PageQuery};
use crate::error::{ApiResult, Envelope};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Session};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MapQuery {
    pub entity: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
}

pub async fn list(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<PaginatedResult<GenericObject>> {
    let page = state
        .objects
        .list(&actor, query.entity.as_deref(), query.pagination())
        .await?;
    Ok(Envelope::ok(page))
}

pub async fn create(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiJson(input): ApiJson<CreateGenericObject>,
) -> ApiResult<GenericObject> {
    Ok(Envelope::ok(state.objects.create(&actor, input).await?))
}

pub async fn map(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiQuery(query): ApiQuery<MapQuery>,
) -> ApiResult<Vec<MapMarker>> {
    let markers = state
        .objects
        .map_markers(&actor, query.entity.as_deref())
        .await?;
    Ok(Envelope::ok(markers))
}

pub async fn get(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<GenericObject> {
    Ok(Envelope::ok(state.objects.get(&actor, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateGenericObject>,
) -> ApiResult<UpdateOutcome> {
    Ok(Envelope::ok(state.objects.update(&actor, id, input).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Deleted> {
    state.objects.delete(&actor, id).await?;
    Ok(Envelope::ok(Deleted { id }))
}

pub async fn history(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<PaginatedResult<HistoryEntry>> {
    let entries = state
        .objects
        .history(&actor, id, page.pagination())
        .await?;
    Ok(Envelope::ok(entries))
}

pub async fn attach(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath((id, sub_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<UpdateOutcome> {
    let outcome = state.objects.attach_sub_object(&actor, id, sub_id).await?;
    Ok(Envelope::ok(outcome))
}

pub async fn detach(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath((id, sub_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<UpdateOutcome> {
    let outcome = state.objects.detach_sub_object(&actor, id, sub_id).await?;
    Ok(Envelope::ok(outcome))
}
