//! Fiche de synthèse generation.

use opengeo_core::error::OpenGeoResult;
use opengeo_core::models::habilitation::{Actor, PermissionLevel};
use opengeo_core::models::synthese::FicheSynthese;
use opengeo_core::repository::GenericObjectRepository;
use tracing::debug;
use uuid::Uuid;

use crate::access;

pub struct SyntheseService<G: GenericObjectRepository> {
    objects: G,
}

impl<G: GenericObjectRepository> SyntheseService<G> {
    pub fn new(objects: G) -> Self {
        Self { objects }
    }

    /// Sheet for one object, restricted to the `domains` children keys
    /// (every key when empty).
    pub async fn build(
        &self,
        actor: &Actor,
        object_id: Uuid,
        domains: &[String],
    ) -> OpenGeoResult<FicheSynthese> {
        let object = self.objects.get_by_id(object_id).await?;
        access::require_on(actor, &object.metadata, PermissionLevel::Reader)?;

        let fiche = FicheSynthese::build(&object, domains, actor);
        debug!(object_id = %object_id, sections = fiche.sections.len(), "fiche de synthèse built");
        Ok(fiche)
    }

    /// Printable Markdown version of [`Self::build`].
    pub async fn render(
        &self,
        actor: &Actor,
        object_id: Uuid,
        domains: &[String],
    ) -> OpenGeoResult<String> {
        Ok(self.build(actor, object_id, domains).await?.render_markdown())
    }
}
