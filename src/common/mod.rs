//! Shared errors, domain types and collaborator traits

pub mod errors;
pub mod traits;
pub mod types;
