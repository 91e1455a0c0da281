//! Domain models for the reminder engine.

mod pet;
mod record;
mod schedule;
mod template;

pub use pet::*;
pub use record::*;
pub use schedule::*;
pub use template::*;
