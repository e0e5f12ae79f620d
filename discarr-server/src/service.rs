//! Service wiring and lifecycle.
//!
//! Builds the output backend, feeders and source resolver from the
//! configuration, serves the HTTP API, and tears the remote session
//! down once the stop signal fires.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use discarr_core::{
    CatalogResolver, FeederRegistry, SessionCoordinator, SourceResolver, create_backend,
};

use crate::api::{AppState, create_router};
use crate::config::ServerConfig;
use crate::jellyfin::JellyfinClient;
use crate::webdriver::WebDriverSession;

// ── DiscarrService ───────────────────────────────────────────────

pub struct DiscarrService {
    config: ServerConfig,
    coordinator: Arc<SessionCoordinator>,
}

impl DiscarrService {
    pub fn new(config: ServerConfig) -> Self {
        let coordinator = Arc::new(build_coordinator(&config));
        Self {
            config,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> Arc<SessionCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Serve until `stop` resolves, then shut the session down.
    pub async fn run<S>(&self, stop: S) -> Result<(), Box<dyn std::error::Error>>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let app = create_router(AppState {
            coordinator: self.coordinator(),
            platform: self.config.server.platform,
        });

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.server.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Discarr API listening on http://{addr}");

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(stop)
            .await;

        // Always release the player and the remote session, even if the
        // server stopped with an error.
        self.coordinator.shutdown().await;
        served?;
        info!("service stopped");
        Ok(())
    }
}

/// Assemble the coordinator described by `config`.
pub fn build_coordinator(config: &ServerConfig) -> SessionCoordinator {
    let mode = config.server.output_mode;
    let webdriver = config.to_webdriver_settings();
    let backend = create_backend(mode, config.to_screen_share_settings(), move || {
        Box::new(WebDriverSession::new(webdriver))
    });

    let mut resolver = SourceResolver::new(config.media.videos_path.clone());
    let jellyfin = JellyfinClient::new(&config.jellyfin);
    if jellyfin.is_configured() {
        info!(?jellyfin, "jellyfin integration enabled");
        resolver = resolver.with_catalog(Arc::new(jellyfin));
    }

    SessionCoordinator::new(
        backend,
        FeederRegistry::with_settings(&config.to_feeder_settings()),
        resolver,
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use discarr_core::{OutputMode, PlaybackState};

    use super::*;

    #[tokio::test]
    async fn builds_configured_mode() {
        let mut config = ServerConfig::default();
        config.server.output_mode = OutputMode::HardwareCapture;
        let coordinator = build_coordinator(&config);
        assert_eq!(coordinator.output_mode(), OutputMode::HardwareCapture);
        assert_eq!(coordinator.status().await.state, PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn run_stops_on_signal() {
        let mut config = ServerConfig::default();
        config.server.port = 0;
        config.server.output_mode = OutputMode::VirtualWebcam;
        let service = DiscarrService::new(config);

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            service
                .run(async {
                    rx.await.ok();
                })
                .await
                .map_err(|e| e.to_string())
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("service did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
