//! Access checks shared by every service.

use opengeo_core::error::OpenGeoResult;
use opengeo_core::models::document::Metadata;
use opengeo_core::models::habilitation::{Actor, PermissionLevel};
use opengeo_core::repository::{EntityFilter, Pagination};
use tracing::warn;

use crate::config::ServiceConfig;
use crate::error::ServiceError;

/// Fail unless `actor` holds at least `level` on `entity`.
pub fn require(actor: &Actor, entity: &str, level: PermissionLevel) -> OpenGeoResult<()> {
    if actor.can_access(entity, level) {
        return Ok(());
    }
    warn!(user = %actor.user, entity, required = level.as_str(), "access denied");
    Err(ServiceError::InsufficientLevel {
        entity: entity.to_string(),
        required: level,
    }
    .into())
}

pub fn require_admin(actor: &Actor) -> OpenGeoResult<()> {
    if actor.is_admin {
        return Ok(());
    }
    warn!(user = %actor.user, "administrator access denied");
    Err(ServiceError::AdminOnly.into())
}

/// Fail unless `actor` holds `level` on the document's entity, and at
/// least the document's own `authorization` level.
pub fn require_on(
    actor: &Actor,
    metadata: &Metadata,
    level: PermissionLevel,
) -> OpenGeoResult<()> {
    require(actor, &metadata.entity, level.max(metadata.authorization))
}

/// Listing scope for `actor`: one entity when asked for (and readable),
/// otherwise every entity for administrators and the readable ones for
/// everybody else. Non-administrators only see documents whose
/// `authorization` they meet.
pub fn readable_scope(actor: &Actor, entity: Option<&str>) -> OpenGeoResult<EntityFilter> {
    if actor.is_admin {
        return Ok(match entity {
            Some(entity) => EntityFilter::only(vec![entity.to_string()]),
            None => EntityFilter::all(),
        });
    }

    let entities = match entity {
        Some(entity) => {
            require(actor, entity, PermissionLevel::Reader)?;
            vec![entity.to_string()]
        }
        None => actor.readable_entities(),
    };
    let clearance = entities
        .iter()
        .filter_map(|e| actor.level_on(e).map(|level| (e.clone(), level)))
        .collect();
    Ok(EntityFilter::only(entities).with_clearance(clearance))
}

/// Clamp a requested page to the configured maximum size.
pub fn clamp(pagination: Pagination, config: &ServiceConfig) -> Pagination {
    Pagination {
        offset: pagination.offset,
        limit: pagination.limit.clamp(1, config.max_page_size),
    }
}

/// Trimmed label, rejecting blank ones.
pub fn label(raw: &str) -> OpenGeoResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::EmptyLabel.into());
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use opengeo_core::error::OpenGeoError;
    use opengeo_core::models::habilitation::{Habilitation, HabilitationStatus};
    use uuid::Uuid;

    use super::*;

    fn granted(entity: &str, level: PermissionLevel) -> Habilitation {
        Habilitation {
            id: Uuid::new_v4(),
            user: "alice".into(),
            entity: entity.into(),
            level,
            status: HabilitationStatus::Granted,
            reason: None,
            requested_at: Utc::now(),
            decided_at: Some(Utc::now()),
            decided_by: Some("admin".into()),
        }
    }

    #[test]
    fn require_compares_levels() {
        let actor = Actor::new("alice", false)
            .with_habilitations(vec![granted("bretagne", PermissionLevel::Contributor)]);

        assert!(require(&actor, "bretagne", PermissionLevel::Reader).is_ok());
        assert!(require(&actor, "bretagne", PermissionLevel::Contributor).is_ok());
        assert!(matches!(
            require(&actor, "bretagne", PermissionLevel::Editor),
            Err(OpenGeoError::AuthorizationDenied { .. })
        ));
        assert!(require(&actor, "normandie", PermissionLevel::Reader).is_err());
    }

    #[test]
    fn document_level_raises_the_requirement() {
        let actor = Actor::new("alice", false)
            .with_habilitations(vec![granted("bretagne", PermissionLevel::Editor)]);
        let now = Utc::now();
        let mut metadata = Metadata {
            label: "Mairie".into(),
            entity: "bretagne".into(),
            authorization: PermissionLevel::Reader,
            color: None,
            description: None,
            created_at: now,
            created_by: "admin".into(),
            updated_at: now,
            updated_by: "admin".into(),
        };
        assert!(require_on(&actor, &metadata, PermissionLevel::Reader).is_ok());
        assert!(require_on(&actor, &metadata, PermissionLevel::Editor).is_ok());

        metadata.authorization = PermissionLevel::Manager;
        assert!(require_on(&actor, &metadata, PermissionLevel::Reader).is_err());
    }

    #[test]
    fn admin_passes_every_check() {
        let admin = Actor::new("root", true);
        assert!(require(&admin, "anything", PermissionLevel::Manager).is_ok());
        assert!(require_admin(&admin).is_ok());
        assert!(require_admin(&Actor::new("alice", false)).is_err());
    }

    #[test]
    fn scope_depends_on_role() {
        let actor = Actor::new("alice", false)
            .with_habilitations(vec![granted("bretagne", PermissionLevel::Reader)]);

        let own = readable_scope(&actor, None).unwrap();
        assert_eq!(own.entities, Some(vec!["bretagne".to_string()]));
        assert_eq!(
            own.clearance,
            Some(vec![("bretagne".to_string(), PermissionLevel::Reader)])
        );
        assert!(readable_scope(&actor, Some("normandie")).is_err());

        let admin = readable_scope(&Actor::new("root", true), None).unwrap();
        assert_eq!(admin.entities, None);
        assert_eq!(admin.clearance, None);
    }

    #[test]
    fn clamp_bounds_limit() {
        let config = ServiceConfig::default();
        let page = clamp(
            Pagination {
                offset: 10,
                limit: 10_000,
            },
            &config,
        );
        assert_eq!(page.offset, 10);
        assert_eq!(page.limit, config.max_page_size);
        assert_eq!(clamp(Pagination { offset: 0, limit: 0 }, &config).limit, 1);
    }

    #[test]
    fn blank_label_is_rejected() {
        assert_eq!(label("  Contact ").unwrap(), "Contact");
        assert!(matches!(label("   "), Err(OpenGeoError::Validation { .. })));
    }
}
