//! Menu catalog port and adapters for the copper-ticket assistant.
//!
//! The catalog is owned by an external point-of-sale system; this crate
//! provides:
//!
//! - **CatalogPort**: the abstract capability (free-text search, image
//!   lookup, availability read/write)
//! - **SquareCatalog**: the HTTP adapter against a Square-style catalog API
//! - **InMemoryCatalog**: an in-process adapter for tests

pub mod error;
pub mod item;
pub mod memory;
pub mod port;
pub mod square;

pub use error::CatalogError;
pub use item::{CatalogItem, CatalogItemId};
pub use memory::InMemoryCatalog;
pub use port::CatalogPort;
pub use square::{SquareCatalog, SquareCatalogConfig};
