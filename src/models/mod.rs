pub mod case_participant;
pub mod document;
pub mod enums;

pub use case_participant::*;
pub use document::*;
pub use enums::*;
