//! Shared types, errors, events and collaborator traits

pub mod channels;
pub mod errors;
pub mod events;
pub mod traits;
pub mod types;
