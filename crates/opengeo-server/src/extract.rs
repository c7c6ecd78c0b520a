//! Request extractors answering with the JSON error envelope.

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use opengeo_core::error::OpenGeoError;
use opengeo_core::models::habilitation::Actor;

use crate::error::ApiError;
use crate::state::AppState;

/// Login of the caller, set by the authentication proxy.
pub const USER_HEADER: &str = "x-opengeo-user";
/// `true` or `1` when the caller is an administrator.
pub const ADMIN_HEADER: &str = "x-opengeo-admin";

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// The authenticated caller with its granted habilitations.
pub struct Session(pub Actor);

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = header(&parts.headers, USER_HEADER).ok_or(OpenGeoError::Unauthenticated)?;
        let is_admin = header(&parts.headers, ADMIN_HEADER)
            .is_some_and(|v| matches!(v.trim(), "true" | "1"));

        let actor = state.habilitations.resolve_actor(user, is_admin).await?;
        Ok(Session(actor))
    }
}
