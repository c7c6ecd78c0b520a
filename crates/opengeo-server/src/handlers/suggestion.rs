//! `/api/suggestion` and `/api/admin/suggestion` handlers.

use axum::extract::State;
use opengeo_core::models::suggestion::Suggestion;
use opengeo_service::{ReviewOutcome, SubmitSuggestion, SuggestionQuery};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiResult, Envelope};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Session};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    pub accept: bool,
}

pub async fn submit(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiJson(input): ApiJson<SubmitSuggestion>,
) -> ApiResult<Suggestion> {
    Ok(Envelope::ok(state.suggestions.submit(&actor, input).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiQuery(query): ApiQuery<SuggestionQuery>,
) -> ApiResult<Vec<Suggestion>> {
    Ok(Envelope::ok(state.suggestions.list(&actor, query).await?))
}

pub async fn review(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ReviewBody>,
) -> ApiResult<ReviewOutcome> {
    let outcome = state.suggestions.review(&actor, id, body.accept).await?;
    Ok(Envelope::ok(outcome))
}
