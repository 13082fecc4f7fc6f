//! Catalog item types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a catalog item.
///
/// Minted by the external catalog system; the core assumes nothing about
/// its format beyond opaque-string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogItemId(String);

impl CatalogItemId {
    /// Wraps an external identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CatalogItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CatalogItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A menu item as seen through the catalog port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// External identifier.
    pub id: CatalogItemId,
    /// Display name.
    pub name: String,
    /// Description shown alongside the item.
    #[serde(default)]
    pub description: String,
    /// Image URL, when the item has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Whether the item is currently available at all locations.
    pub available: bool,
}

impl CatalogItem {
    /// Creates an available item with the given id and name.
    #[must_use]
    pub fn new(id: impl Into<CatalogItemId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            image: None,
            available: true,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the image URL.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Sets the availability flag.
    #[must_use]
    pub fn with_availability(mut self, available: bool) -> Self {
        self.available = available;
        self
    }
}
