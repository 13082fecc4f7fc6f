//! Menu management tools.
//!
//! Three tool shapes: a lookup that returns the currently available menu,
//! and a symmetric pair that removes an item from all locations ("86")
//! or restores it. The state-change tools ignore the model's structured
//! arguments and extract their target from the latest raw user message.

use crate::tool::{ToolAbort, ToolContext, ToolHandler, ToolOutcome};
use async_trait::async_trait;
use copper_ticket_ai::ToolDeclaration;
use copper_ticket_catalog::CatalogError;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::resolver::ResolveFailure;

const LOOKUP_NAME: &str = "getMenuItem";
const REMOVE_NAME: &str = "markItem86";
const RESTORE_NAME: &str = "markItemUn86";

/// Failure payload when the target item cannot be resolved.
const COULD_NOT_FIND: &str = "Could not find menu item";
/// Failure payload when an availability write is rejected.
const COULD_NOT_UPDATE: &str = "Could not update menu item";
/// Failure payload when the menu itself cannot be read.
const COULD_NOT_LIST: &str = "Could not retrieve the menu";

/// Builds the registry holding the three menu tools.
#[must_use]
pub fn menu_registry() -> crate::tool::ToolRegistry {
    let mut registry = crate::tool::ToolRegistry::new();
    registry.register(Arc::new(MenuLookup));
    registry.register(Arc::new(MarkUnavailable));
    registry.register(Arc::new(MarkAvailable));
    registry
}

/// Lists the currently available menu items.
pub struct MenuLookup;

#[async_trait]
impl ToolHandler for MenuLookup {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration::new(
            LOOKUP_NAME,
            "Retrieves the list of menu items, including their ID, name, and image URL.",
        )
    }

    async fn execute(
        &self,
        _arguments: &JsonValue,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolOutcome, ToolAbort> {
        let items = match ctx.catalog.list().await {
            Ok(items) => items,
            Err(CatalogError::CredentialsMissing) => return Err(ToolAbort::CredentialsMissing),
            Err(error) => {
                warn!(%error, "menu listing failed");
                return Ok(ToolOutcome::result_text(LOOKUP_NAME, COULD_NOT_LIST));
            }
        };

        // Items 86'd at every location are deliberately not shown.
        let menu: Vec<_> = items
            .into_iter()
            .filter(|item| item.available)
            .map(|item| {
                json!({
                    "id": item.id,
                    "name": item.name,
                    "image": item.image,
                })
            })
            .collect();

        Ok(ToolOutcome::new(LOOKUP_NAME, json!({ "menuItems": menu })))
    }
}

/// Marks an item unavailable at all locations.
pub struct MarkUnavailable;

#[async_trait]
impl ToolHandler for MarkUnavailable {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration::new(
            REMOVE_NAME,
            "Finds the menu item the user is talking about and removes it from all \
             locations. Use this when the user wants to remove or 86 an item.",
        )
    }

    async fn execute(
        &self,
        _arguments: &JsonValue,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolOutcome, ToolAbort> {
        toggle_availability(REMOVE_NAME, false, ctx).await
    }
}

/// Restores an item to all locations.
pub struct MarkAvailable;

#[async_trait]
impl ToolHandler for MarkAvailable {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration::new(
            RESTORE_NAME,
            "Finds the menu item the user is talking about and makes it available at \
             all locations again. Use this when the user wants to re-add or un-86 an item.",
        )
    }

    async fn execute(
        &self,
        _arguments: &JsonValue,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolOutcome, ToolAbort> {
        toggle_availability(RESTORE_NAME, true, ctx).await
    }
}

/// Shared handler body for the two state-change tools: resolve the target
/// from the user's own words, then write the availability flag.
async fn toggle_availability(
    tool: &str,
    available: bool,
    ctx: &ToolContext<'_>,
) -> Result<ToolOutcome, ToolAbort> {
    let item = match ctx.resolver.resolve(ctx.user_message).await {
        Ok(Some(item)) => item,
        Ok(None) => {
            info!(tool, utterance = ctx.user_message, "no catalog item matched");
            return Ok(ToolOutcome::result_text(tool, COULD_NOT_FIND));
        }
        Err(ResolveFailure::CredentialsMissing) => return Err(ToolAbort::CredentialsMissing),
        Err(failure) => {
            warn!(tool, %failure, "entity resolution failed");
            return Ok(ToolOutcome::result_text(tool, COULD_NOT_FIND));
        }
    };

    match ctx.catalog.set_availability(&item.id, available).await {
        Ok(()) => {
            info!(tool, item = %item.id, item_name = %item.name, available, "availability updated");
            Ok(ToolOutcome::result_text(tool, "Success!"))
        }
        Err(CatalogError::CredentialsMissing) => Err(ToolAbort::CredentialsMissing),
        Err(error) => {
            error!(tool, item = %item.id, %error, "availability write failed");
            Ok(ToolOutcome::result_text(tool, COULD_NOT_UPDATE))
        }
    }
}
