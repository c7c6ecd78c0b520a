//! `/api/sub-object` handlers.

use axum::extract::State;
use opengeo_core::models::sub_object::{CreateSubObject, SubObject, UpdateSubObject};
use opengeo_core::repository::PaginatedResult;
use opengeo_service::CascadeOutcome;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ListQuery;
use crate::error::{ApiResult, Envelope};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Session};
use crate::state::AppState;

/// Creation body; `autoLink` embeds the new sub-object everywhere.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
    #[serde(flatten)]
    pub input: CreateSubObject,
    #[serde(default)]
    pub auto_link: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBody {
    #[serde(flatten)]
    pub input: UpdateSubObject,
    #[serde(default)]
    pub auto_link: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    pub id: Uuid,
    pub affected_count: u64,
}

pub async fn list(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<PaginatedResult<SubObject>> {
    let page = state
        .sub_objects
        .list(&actor, query.entity.as_deref(), query.pagination())
        .await?;
    Ok(Envelope::ok(page))
}

pub async fn create(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiJson(body): ApiJson<CreateBody>,
) -> ApiResult<CascadeOutcome> {
    let outcome = state
        .sub_objects
        .create(&actor, body.input, body.auto_link)
        .await?;
    Ok(Envelope::ok(outcome))
}

pub async fn get(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<SubObject> {
    Ok(Envelope::ok(state.sub_objects.get(&actor, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateBody>,
) -> ApiResult<CascadeOutcome> {
    let outcome = state
        .sub_objects
        .update(&actor, id, body.input, body.auto_link)
        .await?;
    Ok(Envelope::ok(outcome))
}

pub async fn delete(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Deleted> {
    let affected_count = state.sub_objects.delete(&actor, id).await?;
    Ok(Envelope::ok(Deleted { id, affected_count }))
}
