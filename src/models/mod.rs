//! Domain entities shared across components.

pub mod event;
pub mod process;
pub mod status;
