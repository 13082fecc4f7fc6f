//! Entity resolution: free text → catalog item.
//!
//! A narrowly-prompted extraction call pulls the menu item name(s) out of
//! the user's utterance (comma-separated when multiple), then a catalog
//! free-text search ranks candidates. Only the first phrase and the first
//! hit are used; lower-ranked matches are discarded.

use copper_ticket_ai::{GenerateRequest, LlmBackend};
use copper_ticket_catalog::{CatalogError, CatalogItem, CatalogPort};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Search is capped at this many candidates.
const CANDIDATE_LIMIT: usize = 5;

/// System prompt for the extraction call.
const EXTRACTION_SYSTEM_PROMPT: &str = "\
You find which menu item names the user's message is talking about; there
may be more than one. Answer with only the item names, comma-separated.
For example:
  USER: Can you 86 chicken.
  ANSWER: chicken,";

/// Failures while resolving an utterance to a catalog item.
///
/// These belong to tool execution: except for missing credentials they
/// end up as failure payloads, not aborted turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    /// The catalog has no usable credentials.
    CredentialsMissing,
    /// The extraction model call failed.
    Extraction { reason: String },
    /// The catalog search failed.
    Search { reason: String },
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialsMissing => write!(f, "catalog credentials missing"),
            Self::Extraction { reason } => write!(f, "item extraction failed: {reason}"),
            Self::Search { reason } => write!(f, "catalog search failed: {reason}"),
        }
    }
}

impl std::error::Error for ResolveFailure {}

/// Resolves noisy free text to a concrete catalog item.
pub struct EntityResolver {
    backend: Arc<dyn LlmBackend>,
    catalog: Arc<dyn CatalogPort>,
}

impl EntityResolver {
    /// Creates a resolver over the given extraction backend and catalog.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, catalog: Arc<dyn CatalogPort>) -> Self {
        Self { backend, catalog }
    }

    /// Resolves the utterance to the best-matching catalog item, or
    /// `None` when nothing matches.
    pub async fn resolve(&self, utterance: &str) -> Result<Option<CatalogItem>, ResolveFailure> {
        let request = GenerateRequest::new(utterance).with_system(EXTRACTION_SYSTEM_PROMPT);
        let extraction =
            self.backend
                .generate(&request)
                .await
                .map_err(|e| ResolveFailure::Extraction {
                    reason: e.to_string(),
                })?;

        let Some(phrase) = first_phrase(&extraction.content) else {
            debug!(utterance, "extraction produced no candidate phrase");
            return Ok(None);
        };
        debug!(utterance, phrase, "extracted candidate phrase");

        let hits = self
            .catalog
            .search_by_text(&phrase, CANDIDATE_LIMIT)
            .await
            .map_err(|e| match e {
                CatalogError::CredentialsMissing => ResolveFailure::CredentialsMissing,
                other => ResolveFailure::Search {
                    reason: other.to_string(),
                },
            })?;

        Ok(hits.into_iter().next())
    }
}

/// Returns the first non-empty comma-separated phrase.
fn first_phrase(raw: &str) -> Option<String> {
    raw.split(',')
        .map(str::trim)
        .find(|phrase| !phrase.is_empty())
        .map(ToString::to_string)
}
