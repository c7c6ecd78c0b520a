//! `/api/habilitation` and `/api/admin/habilitation` handlers.

use axum::extract::State;
use opengeo_core::models::habilitation::{Habilitation, HabilitationStatus};
use opengeo_core::repository::HabilitationFilter;
use opengeo_service::HabilitationRequest;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiResult, Envelope};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Session};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    pub status: Option<HabilitationStatus>,
    pub entity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub grant: bool,
}

pub async fn request(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiJson(input): ApiJson<HabilitationRequest>,
) -> ApiResult<Habilitation> {
    Ok(Envelope::ok(state.habilitations.request(&actor, input).await?))
}

pub async fn list_mine(
    State(state): State<AppState>,
    Session(actor): Session,
) -> ApiResult<Vec<Habilitation>> {
    Ok(Envelope::ok(state.habilitations.list_mine(&actor).await?))
}

pub async fn list_all(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiQuery(query): ApiQuery<AdminListQuery>,
) -> ApiResult<Vec<Habilitation>> {
    let filter = HabilitationFilter {
        status: query.status,
        entity: query.entity,
    };
    Ok(Envelope::ok(state.habilitations.list(&actor, filter).await?))
}

pub async fn decide(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<DecisionBody>,
) -> ApiResult<Habilitation> {
    let decided = state.habilitations.decide(&actor, id, body.grant).await?;
    Ok(Envelope::ok(decided))
}
