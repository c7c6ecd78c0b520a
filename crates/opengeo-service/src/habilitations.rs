//! Habilitation workflow: users request a level on an entity and an
//! administrator grants or rejects it.

use opengeo_core::error::{OpenGeoError, OpenGeoResult};
use opengeo_core::models::habilitation::{
    Actor, CreateHabilitation, Habilitation, HabilitationStatus, PermissionLevel,
};
use opengeo_core::repository::{HabilitationFilter, HabilitationRepository};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::access;
use crate::error::ServiceError;

/// Body of a habilitation request.
#[derive(Debug, Clone, Deserialize)]
pub struct HabilitationRequest {
    pub entity: String,
    pub level: PermissionLevel,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Habilitation service.
pub struct HabilitationService<R: HabilitationRepository> {
    habilitations: R,
}

impl<R: HabilitationRepository> HabilitationService<R> {
    pub fn new(habilitations: R) -> Self {
        Self { habilitations }
    }

    /// File a request for the calling user.
    ///
    /// At most one pending request per entity; asking for a level the
    /// user already holds is rejected as well.
    pub async fn request(
        &self,
        actor: &Actor,
        input: HabilitationRequest,
    ) -> OpenGeoResult<Habilitation> {
        let entity = input.entity.trim().to_string();
        if entity.is_empty() {
            return Err(OpenGeoError::validation("l'entité ne doit pas être vide"));
        }
        if actor.can_access(&entity, input.level) {
            return Err(OpenGeoError::Conflict(format!(
                "niveau {} déjà accordé sur « {entity} »",
                input.level.as_str()
            )));
        }

        let existing = self.habilitations.list_for_user(&actor.user).await?;
        if existing
            .iter()
            .any(|h| h.status == HabilitationStatus::Pending && h.entity == entity)
        {
            return Err(ServiceError::DuplicateRequest(entity).into());
        }

        let habilitation = self
            .habilitations
            .create(CreateHabilitation {
                user: actor.user.clone(),
                entity,
                level: input.level,
                reason: input.reason.filter(|r| !r.trim().is_empty()),
            })
            .await?;

        info!(
            habilitation_id = %habilitation.id,
            user = %actor.user,
            entity = %habilitation.entity,
            level = habilitation.level.as_str(),
            "habilitation requested"
        );
        Ok(habilitation)
    }

    /// Grant or reject a pending request. Administrators only.
    pub async fn decide(
        &self,
        actor: &Actor,
        id: Uuid,
        grant: bool,
    ) -> OpenGeoResult<Habilitation> {
        access::require_admin(actor)?;

        let habilitation = self.habilitations.get_by_id(id).await?;
        if habilitation.status != HabilitationStatus::Pending {
            return Err(ServiceError::AlreadyReviewed {
                what: "habilitation",
            }
            .into());
        }

        let status = if grant {
            HabilitationStatus::Granted
        } else {
            HabilitationStatus::Rejected
        };
        let decided = self.habilitations.decide(id, status, &actor.user).await?;

        info!(
            habilitation_id = %id,
            user = %decided.user,
            status = status.as_str(),
            decided_by = %actor.user,
            "habilitation decided"
        );
        Ok(decided)
    }

    /// Every request of the calling user, whatever its status.
    pub async fn list_mine(&self, actor: &Actor) -> OpenGeoResult<Vec<Habilitation>> {
        self.habilitations.list_for_user(&actor.user).await
    }

    pub async fn list(
        &self,
        actor: &Actor,
        filter: HabilitationFilter,
    ) -> OpenGeoResult<Vec<Habilitation>> {
        access::require_admin(actor)?;
        self.habilitations.list(filter).await
    }

    /// Build the [`Actor`] for a session, loading its granted habilitations.
    pub async fn resolve_actor(&self, user: &str, is_admin: bool) -> OpenGeoResult<Actor> {
        let user = user.trim();
        if user.is_empty() {
            return Err(OpenGeoError::Unauthenticated);
        }

        let granted = self
            .habilitations
            .list_for_user(user)
            .await?
            .into_iter()
            .filter(|h| h.status == HabilitationStatus::Granted)
            .collect();

        Ok(Actor::new(user, is_admin).with_habilitations(granted))
    }
}
