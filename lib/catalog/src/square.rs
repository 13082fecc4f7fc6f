//! Square catalog adapter.
//!
//! Implements [`CatalogPort`] against the Square catalog API: free-text
//! item search, whole-catalog listing, image lookups, and availability
//! writes as full read-modify-write upserts.

use crate::error::CatalogError;
use crate::item::{CatalogItem, CatalogItemId};
use crate::port::CatalogPort;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ulid::Ulid;

/// Per-item image lookups run concurrently in batches of this size.
const ENRICH_BATCH: usize = 5;

/// Configuration for the Square catalog adapter.
#[derive(Debug, Clone)]
pub struct SquareCatalogConfig {
    /// Base URL of the catalog API.
    pub base_url: String,
    /// Bearer token; resolved per request by the calling layer.
    pub access_token: Option<String>,
}

impl SquareCatalogConfig {
    /// Creates a production configuration with the given access token.
    #[must_use]
    pub fn production(access_token: impl Into<String>) -> Self {
        Self {
            base_url: "https://connect.squareup.com".to_string(),
            access_token: Some(access_token.into()),
        }
    }

    /// Overrides the base URL (sandbox or test environments).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Catalog port implementation backed by the Square catalog API.
pub struct SquareCatalog {
    http: reqwest::Client,
    config: SquareCatalogConfig,
}

impl SquareCatalog {
    /// Creates an adapter with the given configuration.
    #[must_use]
    pub fn new(config: SquareCatalogConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn token(&self) -> Result<&str, CatalogError> {
        self.config
            .access_token
            .as_deref()
            .ok_or(CatalogError::CredentialsMissing)
    }

    async fn fetch_object(&self, id: &str) -> Result<Option<CatalogObject>, CatalogError> {
        let token = self.token()?;
        let url = format!("{}/v2/catalog/object/{}", self.config.base_url, id);
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(request_failed)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response)?;
        let body: RetrieveCatalogObjectResponse =
            response.json().await.map_err(parse_failed)?;
        Ok(body.object)
    }

    /// Resolves the first image of a catalog object to a URL.
    async fn image_url(&self, object: &CatalogObject) -> Option<String> {
        let image_id = object
            .item_data
            .as_ref()?
            .image_ids
            .as_ref()?
            .first()?
            .clone();
        match self.fetch_object(&image_id).await {
            Ok(Some(image)) if image.object_type == "IMAGE" => {
                image.image_data.and_then(|data| data.url)
            }
            Ok(_) => None,
            Err(error) => {
                warn!(%error, image_id, "image lookup failed");
                None
            }
        }
    }

    /// Converts item objects into [`CatalogItem`]s, resolving images in
    /// concurrent batches.
    async fn enrich(&self, objects: Vec<CatalogObject>) -> Vec<CatalogItem> {
        let items: Vec<_> = objects
            .into_iter()
            .filter(|object| object.object_type == "ITEM")
            .collect();

        let mut enriched = Vec::with_capacity(items.len());
        for batch in items.chunks(ENRICH_BATCH) {
            let images = join_all(batch.iter().map(|object| self.image_url(object))).await;
            for (object, image) in batch.iter().zip(images) {
                enriched.push(to_item(object, image));
            }
        }
        enriched
    }
}

#[async_trait]
impl CatalogPort for SquareCatalog {
    async fn list(&self) -> Result<Vec<CatalogItem>, CatalogError> {
        let token = self.token()?;
        let url = format!("{}/v2/catalog/list", self.config.base_url);
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(request_failed)?;
        let response = check_status(response)?;
        let body: ListCatalogResponse = response.json().await.map_err(parse_failed)?;

        debug!(objects = body.objects.len(), "listed catalog");
        Ok(self.enrich(body.objects).await)
    }

    async fn search_by_text(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let token = self.token()?;
        let url = format!("{}/v2/catalog/search-catalog-items", self.config.base_url);
        let request = SearchCatalogItemsRequest {
            text_filter: query,
            limit,
        };
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(request_failed)?;
        let response = check_status(response)?;
        let body: SearchCatalogItemsResponse = response.json().await.map_err(parse_failed)?;

        let mut items = self.enrich(body.items).await;
        items.truncate(limit);
        Ok(items)
    }

    async fn get_image(&self, item: &CatalogItemId) -> Result<Option<String>, CatalogError> {
        match self.fetch_object(item.as_str()).await? {
            Some(object) => Ok(self.image_url(&object).await),
            None => Err(CatalogError::NotFound { id: item.clone() }),
        }
    }

    async fn get_availability(&self, item: &CatalogItemId) -> Result<CatalogItem, CatalogError> {
        let object = self
            .fetch_object(item.as_str())
            .await?
            .filter(|object| object.object_type == "ITEM")
            .ok_or_else(|| CatalogError::NotFound { id: item.clone() })?;
        let image = self.image_url(&object).await;
        Ok(to_item(&object, image))
    }

    async fn set_availability(
        &self,
        item: &CatalogItemId,
        available: bool,
    ) -> Result<(), CatalogError> {
        let token = self.token()?.to_string();
        let mut object = self
            .fetch_object(item.as_str())
            .await?
            .filter(|object| object.object_type == "ITEM")
            .ok_or_else(|| CatalogError::NotFound { id: item.clone() })?;

        object.present_at_all_locations = Some(available);
        if !available {
            object.present_at_location_ids = Some(Vec::new());
        }
        if let Some(item_data) = object.item_data.as_mut()
            && let Some(variations) = item_data.variations.as_mut()
        {
            for variation in variations.iter_mut() {
                variation.present_at_all_locations = Some(available);
                if !available {
                    variation.present_at_location_ids = Some(Vec::new());
                }
            }
        }

        let url = format!("{}/v2/catalog/object", self.config.base_url);
        let request = UpsertCatalogObjectRequest {
            idempotency_key: Ulid::new().to_string(),
            object,
        };
        let response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(|e| CatalogError::WriteFailed {
                reason: e.to_string(),
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(CatalogError::CredentialsMissing)
            }
            status => Err(CatalogError::WriteFailed {
                reason: format!("catalog returned {status}"),
            }),
        }
    }
}

fn request_failed(error: reqwest::Error) -> CatalogError {
    CatalogError::RequestFailed {
        reason: error.to_string(),
    }
}

fn parse_failed(error: reqwest::Error) -> CatalogError {
    CatalogError::ParseFailed {
        reason: error.to_string(),
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CatalogError::CredentialsMissing),
        status => Err(CatalogError::RequestFailed {
            reason: format!("catalog returned {status}"),
        }),
    }
}

fn to_item(object: &CatalogObject, image: Option<String>) -> CatalogItem {
    let (name, description) = object
        .item_data
        .as_ref()
        .map(|data| {
            (
                data.name.clone().unwrap_or_default(),
                data.description.clone().unwrap_or_default(),
            )
        })
        .unwrap_or_default();

    let mut item = CatalogItem::new(object.id.clone(), name)
        .with_description(description)
        .with_availability(is_present(object));
    if let Some(image) = image {
        item = item.with_image(image);
    }
    item
}

/// An item counts as available when it is present at all locations or
/// explicitly present at at least one.
fn is_present(object: &CatalogObject) -> bool {
    object.present_at_all_locations.unwrap_or(false)
        || object
            .present_at_location_ids
            .as_ref()
            .is_some_and(|ids| !ids.is_empty())
}

#[derive(Debug, Serialize)]
struct SearchCatalogItemsRequest<'a> {
    text_filter: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct SearchCatalogItemsResponse {
    #[serde(default)]
    items: Vec<CatalogObject>,
}

#[derive(Debug, Deserialize)]
struct ListCatalogResponse {
    #[serde(default)]
    objects: Vec<CatalogObject>,
}

#[derive(Debug, Deserialize)]
struct RetrieveCatalogObjectResponse {
    object: Option<CatalogObject>,
}

#[derive(Debug, Serialize)]
struct UpsertCatalogObjectRequest {
    idempotency_key: String,
    object: CatalogObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogObject {
    id: String,
    #[serde(rename = "type")]
    object_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item_data: Option<CatalogItemData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_data: Option<CatalogImageData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    present_at_all_locations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    present_at_location_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogItemData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    variations: Option<Vec<CatalogObject>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogImageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_object(json: serde_json::Value) -> CatalogObject {
        serde_json::from_value(json).expect("catalog object")
    }

    #[test]
    fn presence_requires_a_location() {
        let absent = item_object(serde_json::json!({
            "id": "ITEM_1",
            "type": "ITEM",
            "present_at_all_locations": false,
            "present_at_location_ids": []
        }));
        assert!(!is_present(&absent));

        let everywhere = item_object(serde_json::json!({
            "id": "ITEM_2",
            "type": "ITEM",
            "present_at_all_locations": true
        }));
        assert!(is_present(&everywhere));

        let somewhere = item_object(serde_json::json!({
            "id": "ITEM_3",
            "type": "ITEM",
            "present_at_location_ids": ["LOC_1"]
        }));
        assert!(is_present(&somewhere));
    }

    #[test]
    fn item_conversion_keeps_name_description_and_image() {
        let object = item_object(serde_json::json!({
            "id": "ITEM_4",
            "type": "ITEM",
            "item_data": { "name": "Smash Burger", "description": "Two patties" },
            "present_at_all_locations": true
        }));

        let item = to_item(&object, Some("https://cdn.example.com/burger.png".to_string()));
        assert_eq!(item.id.as_str(), "ITEM_4");
        assert_eq!(item.name, "Smash Burger");
        assert_eq!(item.description, "Two patties");
        assert!(item.available);
        assert!(item.image.is_some());
    }

    #[test]
    fn missing_token_is_credentials_missing() {
        let adapter = SquareCatalog::new(SquareCatalogConfig {
            base_url: "http://localhost:1".to_string(),
            access_token: None,
        });
        assert_eq!(adapter.token().unwrap_err(), CatalogError::CredentialsMissing);
    }

    #[test]
    fn search_request_wire_shape() {
        let request = SearchCatalogItemsRequest {
            text_filter: "burger",
            limit: 5,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["text_filter"], "burger");
        assert_eq!(json["limit"], 5);
    }
}
