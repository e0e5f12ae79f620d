//! Jellyfin integration: turns web-UI item links into direct stream URLs.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use discarr_core::{CatalogResolver, DiscarrError, extract_item_id};

use crate::config::JellyfinConfig;

/// Jellyfin API client.
pub struct JellyfinClient {
    /// Server URL; `None` when unset or not a usable base.
    base_url: Option<Url>,
    api_key: String,
    user_id: Option<String>,
    http: Client,
}

impl JellyfinClient {
    pub fn new(config: &JellyfinConfig) -> Self {
        let user_id = config.user_id.trim();
        let server_url = config.server_url.trim();
        let base_url = match Url::parse(server_url) {
            Ok(url) if !url.cannot_be_a_base() => Some(url),
            _ if server_url.is_empty() => None,
            _ => {
                warn!(server_url, "ignoring unusable jellyfin server url");
                None
            }
        };
        Self {
            base_url,
            api_key: config.api_key.trim().to_string(),
            user_id: (!user_id.is_empty()).then(|| user_id.to_string()),
            http: Client::new(),
        }
    }

    /// `segments` appended to the server URL, each percent-encoded as a
    /// single path segment.
    fn endpoint(&self, segments: &[&str]) -> discarr_core::Result<Url> {
        let mut url = self
            .base_url
            .clone()
            .ok_or(DiscarrError::IntegrationNotConfigured("jellyfin"))?;
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// Direct-play endpoint for `item_id`.
    pub fn stream_url(&self, item_id: &str) -> discarr_core::Result<String> {
        let mut url = self.endpoint(&["Videos", item_id, "stream"])?;
        url.query_pairs_mut().append_pair("api_key", &self.api_key);
        Ok(url.into())
    }

    /// Ask the server whether the item exists. Only possible with a
    /// configured user id; `Ok(true)` otherwise.
    pub async fn item_exists(&self, item_id: &str) -> Result<bool, reqwest::Error> {
        let Some(user) = &self.user_id else {
            return Ok(true);
        };
        let Ok(url) = self.endpoint(&["Users", user, "Items", item_id]) else {
            return Ok(true);
        };
        let resp = self
            .http
            .get(url)
            .header("X-Emby-Token", &self.api_key)
            .send()
            .await?;
        debug!(item_id, status = resp.status().as_u16(), "jellyfin item lookup");
        Ok(resp.status().is_success())
    }
}

#[async_trait]
impl CatalogResolver for JellyfinClient {
    fn is_configured(&self) -> bool {
        self.base_url.is_some() && !self.api_key.is_empty()
    }

    async fn resolve(&self, catalog_url: &str) -> discarr_core::Result<String> {
        if !self.is_configured() {
            return Err(DiscarrError::IntegrationNotConfigured("jellyfin"));
        }
        let item_id = extract_item_id(catalog_url)
            .ok_or_else(|| DiscarrError::UnresolvableReference(catalog_url.to_string()))?;

        match self.item_exists(&item_id).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(DiscarrError::UnresolvableReference(format!(
                    "{catalog_url} (item {item_id} not found)"
                )));
            }
            // The stream URL is still usable; let the player report it.
            Err(e) => warn!("jellyfin item lookup failed: {e}"),
        }

        self.stream_url(&item_id)
    }
}

impl std::fmt::Debug for JellyfinClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JellyfinClient")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("configured", &self.is_configured())
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────
