//! OpenGeo services: access control, document editing with audit trail,
//! sub-object cascade, suggestion review, habilitations and the fiche de
//! synthèse.

pub mod access;
pub mod config;
pub mod error;
pub mod habilitations;
pub mod objects;
pub mod sub_objects;
pub mod suggestions;
pub mod synthese;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use habilitations::{HabilitationRequest, HabilitationService};
pub use objects::{ObjectService, UpdateOutcome};
pub use sub_objects::{CascadeOutcome, SubObjectService};
pub use suggestions::{ReviewOutcome, SubmitSuggestion, SuggestionQuery, SuggestionService};
pub use synthese::SyntheseService;
