//! Maps a play request to a single playable URI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::{DiscarrError, Result};

// ── PlayRequest ──────────────────────────────────────────────────

/// What to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayRequest {
    /// A file, relative to the media directory unless absolute.
    Local { path: String },
    /// A direct `http(s)` stream URL.
    RemoteUrl { url: String },
    /// An item page on the media server (e.g. a Jellyfin web URL).
    CatalogRef { catalog_url: String },
}

impl PlayRequest {
    pub fn local(path: impl Into<String>) -> Self {
        Self::Local { path: path.into() }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self::RemoteUrl { url: url.into() }
    }

    pub fn catalog(catalog_url: impl Into<String>) -> Self {
        Self::CatalogRef {
            catalog_url: catalog_url.into(),
        }
    }

    /// Reject empty paths and non-`http(s)` URLs.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Local { path } if path.trim().is_empty() => Err(DiscarrError::InvalidRequest(
                "path is required when source is local".into(),
            )),
            Self::Local { .. } => Ok(()),
            Self::RemoteUrl { url } => require_http("url", url),
            Self::CatalogRef { catalog_url } => require_http("jellyfinUrl", catalog_url),
        }
    }
}

fn require_http(field: &str, value: &str) -> Result<()> {
    let parsed = Url::parse(value)
        .map_err(|e| DiscarrError::InvalidRequest(format!("{field} is not a valid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(DiscarrError::InvalidRequest(format!(
            "{field} must use http or https, got {other}"
        ))),
    }
}

// ── CatalogResolver ──────────────────────────────────────────────

/// Turns a media-server item URL into a direct stream URL.
#[async_trait]
pub trait CatalogResolver: Send + Sync {
    /// Whether credentials are present. Unconfigured resolvers are
    /// treated as absent.
    fn is_configured(&self) -> bool;

    async fn resolve(&self, catalog_url: &str) -> Result<String>;
}

/// Pull the item id out of a catalog URL.
///
/// Looks at the `id` query parameter first, then at `?id=` / `&id=`
/// inside the fragment (`.../web/#!/details?id=abc`).
pub fn extract_item_id(catalog_url: &str) -> Option<String> {
    let url = Url::parse(catalog_url).ok()?;

    if let Some((_, id)) = url.query_pairs().find(|(k, v)| k == "id" && !v.is_empty()) {
        return Some(id.into_owned());
    }

    url.fragment()?
        .split(['?', '&'])
        .skip(1)
        .find_map(|pair| pair.strip_prefix("id="))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

// ── SourceResolver ───────────────────────────────────────────────

pub struct SourceResolver {
    base_dir: PathBuf,
    catalog: Option<Arc<dyn CatalogResolver>>,
}

impl SourceResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            catalog: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogResolver>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve `request` to a path or URL a feeder can open.
    ///
    /// Does not validate; callers run [`PlayRequest::validate`] first.
    pub async fn resolve(&self, request: &PlayRequest) -> Result<String> {
        let uri = match request {
            PlayRequest::Local { path } => self.local_path(path),
            PlayRequest::RemoteUrl { url } => url.clone(),
            PlayRequest::CatalogRef { catalog_url } => {
                if extract_item_id(catalog_url).is_none() {
                    return Err(DiscarrError::UnresolvableReference(catalog_url.clone()));
                }
                let catalog = self
                    .catalog
                    .as_ref()
                    .filter(|c| c.is_configured())
                    .ok_or(DiscarrError::IntegrationNotConfigured("jellyfin"))?;
                catalog.resolve(catalog_url).await?
            }
        };
        debug!(?request, %uri, "resolved source");
        Ok(uri)
    }

    fn local_path(&self, path: &str) -> String {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_string_lossy().into_owned()
        } else {
            self.base_dir.join(path).to_string_lossy().into_owned()
        }
    }
}

impl std::fmt::Debug for SourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceResolver")
            .field("base_dir", &self.base_dir)
            .field("catalog", &self.catalog.as_ref().map(|c| c.is_configured()))
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCatalog {
        configured: bool,
    }

    #[async_trait]
    impl CatalogResolver for FixedCatalog {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn resolve(&self, catalog_url: &str) -> Result<String> {
            let id = extract_item_id(catalog_url)
                .ok_or_else(|| DiscarrError::UnresolvableReference(catalog_url.into()))?;
            Ok(format!("https://h/Videos/{id}/stream?api_key=K"))
        }
    }

    fn resolver() -> SourceResolver {
        SourceResolver::new("/videos").with_catalog(Arc::new(FixedCatalog { configured: true }))
    }

    #[tokio::test]
    async fn local_paths_join_base_dir() {
        let r = resolver();
        assert_eq!(
            r.resolve(&PlayRequest::local("movie.mp4")).await.unwrap(),
            "/videos/movie.mp4"
        );
        assert_eq!(
            r.resolve(&PlayRequest::local("/abs/movie.mp4")).await.unwrap(),
            "/abs/movie.mp4"
        );
    }

    #[tokio::test]
    async fn remote_url_is_unchanged() {
        let uri = resolver()
            .resolve(&PlayRequest::remote("http://x/a.mp4"))
            .await
            .unwrap();
        assert_eq!(uri, "http://x/a.mp4");
    }

    #[tokio::test]
    async fn catalog_ref_delegates() {
        let uri = resolver()
            .resolve(&PlayRequest::catalog(
                "https://h/web#!/itemdetails.html?id=abc123",
            ))
            .await
            .unwrap();
        assert_eq!(uri, "https://h/Videos/abc123/stream?api_key=K");
    }

    #[tokio::test]
    async fn catalog_ref_without_id_is_unresolvable() {
        let err = resolver()
            .resolve(&PlayRequest::catalog("https://h/web#!/home.html"))
            .await
            .unwrap_err();
        assert!(matches!(err, DiscarrError::UnresolvableReference(_)));
    }

    #[tokio::test]
    async fn catalog_ref_needs_configured_integration() {
        let request = PlayRequest::catalog("https://h/web/index.html?id=abc");

        let none = SourceResolver::new("/videos");
        assert!(matches!(
            none.resolve(&request).await,
            Err(DiscarrError::IntegrationNotConfigured(_))
        ));

        let unconfigured = SourceResolver::new("/videos")
            .with_catalog(Arc::new(FixedCatalog { configured: false }));
        assert!(matches!(
            unconfigured.resolve(&request).await,
            Err(DiscarrError::IntegrationNotConfigured(_))
        ));
    }

    #[test]
    fn item_id_extraction() {
        assert_eq!(
            extract_item_id("https://h/web/index.html?id=q1").as_deref(),
            Some("q1")
        );
        assert_eq!(
            extract_item_id("https://h/web/index.html#!/details?serverId=s&id=f2").as_deref(),
            Some("f2")
        );
        assert_eq!(extract_item_id("https://h/web/index.html#!/details?serverId=s"), None);
        assert_eq!(extract_item_id("https://h/web/index.html?id="), None);
        assert_eq!(extract_item_id("not a url"), None);
    }

    #[test]
    fn validation() {
        assert!(PlayRequest::local("a.mp4").validate().is_ok());
        assert!(PlayRequest::remote("https://x/a.mp4").validate().is_ok());
        assert!(PlayRequest::catalog("http://h/web?id=1").validate().is_ok());

        for bad in [
            PlayRequest::local("  "),
            PlayRequest::remote("ftp://x/a.mp4"),
            PlayRequest::remote("a.mp4"),
            PlayRequest::catalog("file:///etc/passwd"),
        ] {
            assert!(
                matches!(bad.validate(), Err(DiscarrError::InvalidRequest(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
