//! `/api/synthese` handlers.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use opengeo_core::models::synthese::FicheSynthese;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, Envelope};
use crate::extract::{ApiPath, ApiQuery, Session};
use crate::state::AppState;

/// `?domains=contact,occupation`; absent or empty selects every domain.
#[derive(Debug, Deserialize)]
pub struct DomainsQuery {
    pub domains: Option<String>,
}

impl DomainsQuery {
    fn domains(&self) -> Vec<String> {
        self.domains
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from)
            .collect()
    }
}

pub async fn build(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<DomainsQuery>,
) -> ApiResult<FicheSynthese> {
    let fiche = state.synthese.build(&actor, id, &query.domains()).await?;
    Ok(Envelope::ok(fiche))
}

/// Printable sheet, served as Markdown.
pub async fn print(
    State(state): State<AppState>,
    Session(actor): Session,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<DomainsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let markdown = state.synthese.render(&actor, id, &query.domains()).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        markdown,
    ))
}
