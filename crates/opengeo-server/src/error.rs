//! Conversion of service errors into the JSON envelope.
//!
//! Every failure answers HTTP 500 with `{"data": null, "error":
//! {"message": ...}}`; the message is meant for end users and is in French.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use opengeo_core::error::OpenGeoError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] OpenGeoError),

    #[error("malformed request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn entity_name(entity: &str) -> &'static str {
    match entity {
        "generic_object" | "object" | "document" => "Objet",
        "sub_object" => "Sous-objet",
        "suggestion" => "Suggestion",
        "habilitation" => "Habilitation",
        "history" => "Historique",
        _ => "Élément",
    }
}

impl ApiError {
    /// Message shown to the user.
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(detail) => format!("Requête invalide : {detail}"),
            ApiError::Domain(err) => match err {
                OpenGeoError::NotFound { entity, .. } => {
                    format!("{} introuvable", entity_name(entity))
                }
                OpenGeoError::AlreadyExists { entity } => {
                    format!("{} déjà existant", entity_name(entity))
                }
                OpenGeoError::Unauthenticated => "Vous devez être connecté".into(),
                OpenGeoError::AuthorizationDenied { .. } => {
                    "Vous n'avez pas les droits nécessaires".into()
                }
                OpenGeoError::Validation { message } => format!("Données invalides : {message}"),
                OpenGeoError::Conflict(detail) => format!("Opération impossible : {detail}"),
                OpenGeoError::Database(_) | OpenGeoError::Internal(_) => {
                    "Une erreur interne est survenue".into()
                }
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            data: Some(data),
            error: None,
        })
    }
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Domain(OpenGeoError::Database(_) | OpenGeoError::Internal(_)) => {
                error!(error = %self, "request failed")
            }
            _ => warn!(error = %self, "request rejected"),
        }

        let body = Envelope::<()> {
            data: None,
            error: Some(ErrorBody {
                message: self.message(),
            }),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
