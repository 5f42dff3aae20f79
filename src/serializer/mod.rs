//! The document serializer state machine.

mod core;
mod inline;
mod list;
mod media;
mod table;

pub use self::core::SerializerState;
pub use self::inline::mark_format;
