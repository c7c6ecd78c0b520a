//! Domain models for OpenGeo.
//!
//! These are the core types shared across all crates.

pub mod document;
pub mod field;
pub mod generic_object;
pub mod habilitation;
pub mod history;
pub mod sub_object;
pub mod suggestion;
pub mod synthese;
