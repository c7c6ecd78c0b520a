//! Service error types.

use opengeo_core::error::OpenGeoError;
use opengeo_core::models::habilitation::PermissionLevel;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("niveau {required:?} requis sur l'entité « {entity} »")]
    InsufficientLevel {
        entity: String,
        required: PermissionLevel,
    },

    #[error("droits d'administrateur requis")]
    AdminOnly,

    #[error("le libellé ne doit pas être vide")]
    EmptyLabel,

    #[error("{what} déjà traitée")]
    AlreadyReviewed { what: &'static str },

    #[error("une demande est déjà en attente pour l'entité « {0} »")]
    DuplicateRequest(String),

    #[error("le chemin « {0} » ne désigne pas la valeur d'un champ de l'objet")]
    PathOutsideObject(String),

    #[error("la valeur de « {0} » a changé depuis la suggestion")]
    StaleSuggestion(String),

    #[error("le sous-objet « {sub} » appartient à l'entité « {entity} »")]
    EntityMismatch { sub: String, entity: String },
}

impl From<ServiceError> for OpenGeoError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InsufficientLevel { .. } | ServiceError::AdminOnly => {
                OpenGeoError::AuthorizationDenied {
                    reason: err.to_string(),
                }
            }
            ServiceError::DuplicateRequest(_) => OpenGeoError::AlreadyExists {
                entity: "habilitation".into(),
            },
            ServiceError::AlreadyReviewed { .. } | ServiceError::StaleSuggestion(_) => {
                OpenGeoError::Conflict(err.to_string())
            }
            ServiceError::EmptyLabel
            | ServiceError::PathOutsideObject(_)
            | ServiceError::EntityMismatch { .. } => OpenGeoError::validation(err.to_string()),
        }
    }
}
