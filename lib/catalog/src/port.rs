//! The catalog port.

use crate::error::CatalogError;
use crate::item::{CatalogItem, CatalogItemId};
use async_trait::async_trait;

/// Abstract capability over the external menu catalog.
///
/// Implementations resolve credentials before the port is handed to
/// callers; a missing or rejected credential surfaces as
/// [`CatalogError::CredentialsMissing`].
#[async_trait]
pub trait CatalogPort: Send + Sync {
    /// Lists the whole catalog, availability included.
    async fn list(&self) -> Result<Vec<CatalogItem>, CatalogError>;

    /// Searches items by free text, best match first, at most `limit`
    /// results.
    async fn search_by_text(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError>;

    /// Returns the item's image URL, if it has one.
    async fn get_image(&self, item: &CatalogItemId) -> Result<Option<String>, CatalogError>;

    /// Reads an item with its current availability.
    async fn get_availability(&self, item: &CatalogItemId) -> Result<CatalogItem, CatalogError>;

    /// Sets an item's availability at all locations.
    ///
    /// Idempotent: repeating the call with the same target state is a
    /// no-op success.
    async fn set_availability(
        &self,
        item: &CatalogItemId,
        available: bool,
    ) -> Result<(), CatalogError>;
}
