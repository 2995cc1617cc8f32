//! Alasco API model types.

mod document;
mod entity;

pub use document::*;
pub use entity::*;
