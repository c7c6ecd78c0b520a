//! OpenGeo Core: domain models, repository traits, the document diff
//! engine and document paths shared by every other crate.

pub mod diff;
pub mod error;
pub mod models;
pub mod path;
pub mod repository;
