//! SurrealDB repository implementations.

mod document;
mod generic_object;
mod habilitation;
mod history;
mod sub_object;
mod suggestion;

pub use generic_object::SurrealGenericObjectRepository;
pub use habilitation::SurrealHabilitationRepository;
pub use history::SurrealHistoryRepository;
pub use sub_object::SurrealSubObjectRepository;
pub use suggestion::SurrealSuggestionRepository;
