//! OpenGeo Server: REST API over the OpenGeo services.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use router::build_router;
pub use state::AppState;
