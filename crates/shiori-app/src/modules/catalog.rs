//! Remote catalog used to hydrate the signed-in account's collection.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::{ModuleError, ModuleResult};

/// Public `AniList` GraphQL endpoint.
pub const ANILIST_ENDPOINT: &str = "https://graphql.anilist.co";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const COLLECTION_QUERY: &str = r"
query ($userName: String) {
  MediaListCollection(userName: $userName, type: ANIME) {
    lists { entries { id } }
  }
}
";

/// Outcome of a collection refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    /// Number of lists in the collection.
    pub lists: usize,
    /// Number of entries across all lists.
    pub entries: usize,
}

/// Remote catalog seam.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Replace the API token used for subsequent requests.
    fn set_token(&self, token: Option<String>);

    /// Fetch the collection of `username`.
    async fn refresh_collection(&self, username: &str) -> ModuleResult<CollectionSummary>;
}

/// `AniList` GraphQL client.
#[derive(Debug)]
pub struct AnilistCatalog {
    http: Client,
    endpoint: Url,
    token: RwLock<Option<String>>,
}

#[derive(Deserialize)]
struct CollectionResponse {
    data: Option<CollectionData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CollectionData {
    media_list_collection: Option<Collection>,
}

#[derive(Deserialize)]
struct Collection {
    #[serde(default)]
    lists: Vec<CollectionList>,
}

#[derive(Deserialize)]
struct CollectionList {
    #[serde(default)]
    entries: Vec<serde_json::Value>,
}

impl AnilistCatalog {
    /// Client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: Url) -> ModuleResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| ModuleError::Catalog {
                operation: "client.build",
                source,
            })?;
        Ok(Self {
            http,
            endpoint,
            token: RwLock::new(None),
        })
    }

    /// Client for the public [`ANILIST_ENDPOINT`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn public() -> ModuleResult<Self> {
        let endpoint = Url::parse(ANILIST_ENDPOINT).map_err(|source| ModuleError::CatalogEndpoint {
            endpoint: ANILIST_ENDPOINT.to_string(),
            source,
        })?;
        Self::new(endpoint)
    }

    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RemoteCatalog for AnilistCatalog {
    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) =
            token.filter(|token| !token.is_empty());
    }

    async fn refresh_collection(&self, username: &str) -> ModuleResult<CollectionSummary> {
        let token = self.token().ok_or(ModuleError::CatalogTokenMissing)?;
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(token)
            .json(&json!({
                "query": COLLECTION_QUERY,
                "variables": { "userName": username },
            }))
            .send()
            .await
            .map_err(|source| ModuleError::Catalog {
                operation: "collection.fetch",
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ModuleError::CatalogStatus {
                operation: "collection.fetch",
                status: status.as_u16(),
            });
        }
        let body: CollectionResponse =
            response.json().await.map_err(|source| ModuleError::Catalog {
                operation: "collection.decode",
                source,
            })?;
        let collection = body
            .data
            .and_then(|data| data.media_list_collection)
            .ok_or(ModuleError::CatalogResponse {
                operation: "collection.decode",
            })?;
        let summary = CollectionSummary {
            lists: collection.lists.len(),
            entries: collection.lists.iter().map(|list| list.entries.len()).sum(),
        };
        debug!(username, lists = summary.lists, entries = summary.entries, "collection fetched");
        Ok(summary)
    }
}
