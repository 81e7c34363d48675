//! UI-facing state owned by the engine: form fields, cursors and list selection.

mod breakdown;
mod input;
mod setup;

pub use breakdown::BreakdownState;
pub use input::DraftInput;
pub use setup::{SetupField, SetupForm};
