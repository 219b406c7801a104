//! Repository layer: entity-scoped database operations.

mod case_participant;
mod document;

pub use case_participant::*;
pub use document::*;
