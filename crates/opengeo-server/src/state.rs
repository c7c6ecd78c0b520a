//! Shared application state handed to every handler.

use std::sync::Arc;

use opengeo_db::repository::{
    SurrealGenericObjectRepository, SurrealHabilitationRepository, SurrealHistoryRepository,
    SurrealSubObjectRepository, SurrealSuggestionRepository,
};
use opengeo_service::{
    HabilitationService, ObjectService, ServiceConfig, SubObjectService, SuggestionService,
    SyntheseService,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

pub type Objects = ObjectService<
    SurrealGenericObjectRepository<Any>,
    SurrealSubObjectRepository<Any>,
    SurrealHistoryRepository<Any>,
>;
pub type SubObjects =
    SubObjectService<SurrealSubObjectRepository<Any>, SurrealGenericObjectRepository<Any>>;
pub type Suggestions = SuggestionService<
    SurrealSuggestionRepository<Any>,
    SurrealGenericObjectRepository<Any>,
    SurrealHistoryRepository<Any>,
>;
pub type Habilitations = HabilitationService<SurrealHabilitationRepository<Any>>;
pub type Synthese = SyntheseService<SurrealGenericObjectRepository<Any>>;

#[derive(Clone)]
pub struct AppState {
    pub objects: Arc<Objects>,
    pub sub_objects: Arc<SubObjects>,
    pub suggestions: Arc<Suggestions>,
    pub habilitations: Arc<Habilitations>,
    pub synthese: Arc<Synthese>,
}

impl AppState {
    /// Wire every service onto one database handle.
    pub fn new(db: Surreal<Any>, config: ServiceConfig) -> Self {
        let objects = SurrealGenericObjectRepository::new(db.clone());
        let sub_objects = SurrealSubObjectRepository::new(db.clone());
        let history = SurrealHistoryRepository::new(db.clone());

        Self {
            objects: Arc::new(ObjectService::new(
                objects.clone(),
                sub_objects.clone(),
                history.clone(),
                config.clone(),
            )),
            sub_objects: Arc::new(SubObjectService::new(
                sub_objects,
                objects.clone(),
                config.clone(),
            )),
            suggestions: Arc::new(SuggestionService::new(
                SurrealSuggestionRepository::new(db.clone()),
                objects.clone(),
                history,
                config,
            )),
            habilitations: Arc::new(HabilitationService::new(
                SurrealHabilitationRepository::new(db),
            )),
            synthese: Arc::new(SyntheseService::new(objects)),
        }
    }
}
