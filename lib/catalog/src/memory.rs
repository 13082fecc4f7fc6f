//! In-memory catalog adapter for tests.

use crate::error::CatalogError;
use crate::item::{CatalogItem, CatalogItemId};
use crate::port::CatalogPort;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Catalog port backed by a process-local item list.
///
/// Search is case-insensitive substring matching over item names, in
/// insertion order. `without_credentials` builds an adapter whose every
/// call fails with [`CatalogError::CredentialsMissing`], for exercising
/// the fatal authentication path.
#[derive(Debug)]
pub struct InMemoryCatalog {
    items: RwLock<Vec<CatalogItem>>,
    credentialed: bool,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            credentialed: true,
        }
    }

    /// Creates a catalog pre-populated with the given items.
    #[must_use]
    pub fn with_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().collect()),
            credentialed: true,
        }
    }

    /// Creates a catalog that rejects every call for lack of credentials.
    #[must_use]
    pub fn without_credentials() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            credentialed: false,
        }
    }

    /// Adds an item.
    pub async fn insert(&self, item: CatalogItem) {
        self.items.write().await.push(item);
    }

    fn check_credentials(&self) -> Result<(), CatalogError> {
        if self.credentialed {
            Ok(())
        } else {
            Err(CatalogError::CredentialsMissing)
        }
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogPort for InMemoryCatalog {
    async fn list(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        self.check_credentials()?;
        Ok(self.items.read().await.clone())
    }

    async fn search_by_text(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.check_credentials()?;
        let needle = query.to_lowercase();
        Ok(self
            .items
            .read()
            .await
            .iter()
            .filter(|item| item.name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_image(&self, item: &CatalogItemId) -> Result<Option<String>, CatalogError> {
        self.check_credentials()?;
        self.items
            .read()
            .await
            .iter()
            .find(|candidate| &candidate.id == item)
            .map(|candidate| candidate.image.clone())
            .ok_or_else(|| CatalogError::NotFound { id: item.clone() })
    }

    async fn get_availability(&self, item: &CatalogItemId) -> Result<CatalogItem, CatalogError> {
        self.check_credentials()?;
        self.items
            .read()
            .await
            .iter()
            .find(|candidate| &candidate.id == item)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound { id: item.clone() })
    }

    async fn set_availability(
        &self,
        item: &CatalogItemId,
        available: bool,
    ) -> Result<(), CatalogError> {
        self.check_credentials()?;
        let mut items = self.items.write().await;
        let target = items
            .iter_mut()
            .find(|candidate| &candidate.id == item)
            .ok_or_else(|| CatalogError::NotFound { id: item.clone() })?;
        target.available = available;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InMemoryCatalog {
        InMemoryCatalog::with_items([
            CatalogItem::new("ITEM_1", "Smash Burger").with_image("https://img/burger"),
            CatalogItem::new("ITEM_2", "Veggie Burger"),
            CatalogItem::new("ITEM_3", "Caesar Salad").with_availability(false),
        ])
    }

    #[tokio::test]
    async fn search_matches_case_insensitively_and_caps_results() {
        let catalog = sample();
        let hits = catalog.search_by_text("burger", 5).await.expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id.as_str(), "ITEM_1");

        let capped = catalog.search_by_text("burger", 1).await.expect("search");
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn availability_toggle_is_idempotent() {
        let catalog = sample();
        let id = CatalogItemId::new("ITEM_1");

        catalog.set_availability(&id, false).await.expect("first write");
        catalog.set_availability(&id, false).await.expect("second write");
        assert!(!catalog.get_availability(&id).await.expect("read").available);

        catalog.set_availability(&id, true).await.expect("restore");
        catalog.set_availability(&id, true).await.expect("restore again");
        assert!(catalog.get_availability(&id).await.expect("read").available);
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let catalog = sample();
        let id = CatalogItemId::new("ITEM_404");
        let err = catalog.get_availability(&id).await.unwrap_err();
        assert_eq!(err, CatalogError::NotFound { id });
    }

    #[tokio::test]
    async fn credentialless_catalog_rejects_every_call() {
        let catalog = InMemoryCatalog::without_credentials();
        assert_eq!(catalog.list().await.unwrap_err(), CatalogError::CredentialsMissing);
        assert_eq!(
            catalog.search_by_text("burger", 5).await.unwrap_err(),
            CatalogError::CredentialsMissing
        );
    }
}
