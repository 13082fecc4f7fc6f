//! The menu tool handlers.

pub mod menu;

pub use menu::{MarkAvailable, MarkUnavailable, MenuLookup, menu_registry};
