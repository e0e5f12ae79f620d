//! Session coordinator: sequences play / stop / pause / resume across
//! the output backend and the current feeder.
//!
//! All commands take one async mutex, so at most one is in flight. A
//! play that fails before the previous feeder is stopped leaves the slot
//! untouched; once the previous feeder is stopped the slot is emptied
//! until the new one starts playing.
//!
//! Every command publishes a [`Status`] snapshot on exit. `status` reads
//! the live slot when no command is running and the last snapshot
//! otherwise, so it never waits on a slow prepare or join.

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

use crate::backend::{OutputBackend, OutputMode};
use crate::error::{DiscarrError, Result};
use crate::feeder::{FeederRegistry, VideoFeeder};
use crate::resolver::{PlayRequest, SourceResolver};
use crate::state::PlaybackState;

/// Snapshot returned by [`SessionCoordinator::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub state: PlaybackState,
    pub output_mode: OutputMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl Status {
    fn stopped(output_mode: OutputMode) -> Self {
        Self {
            state: PlaybackState::Stopped,
            output_mode,
            source: None,
            pid: None,
        }
    }
}

struct Current {
    feeder: Box<dyn VideoFeeder>,
    source: String,
}

struct Inner {
    backend: Box<dyn OutputBackend>,
    current: Option<Current>,
}

// ── SessionCoordinator ───────────────────────────────────────────

pub struct SessionCoordinator {
    inner: Mutex<Inner>,
    published: watch::Sender<Status>,
    mode: OutputMode,
    feeders: FeederRegistry,
    resolver: SourceResolver,
}

impl SessionCoordinator {
    pub fn new(
        backend: Box<dyn OutputBackend>,
        feeders: FeederRegistry,
        resolver: SourceResolver,
    ) -> Self {
        let mode = backend.mode();
        let (published, _) = watch::channel(Status::stopped(mode));
        Self {
            mode,
            published,
            inner: Mutex::new(Inner {
                backend,
                current: None,
            }),
            feeders,
            resolver,
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        self.mode
    }

    /// Start playing `request`; returns the resolved URI.
    pub async fn play(&self, request: PlayRequest) -> Result<String> {
        request.validate()?;
        let mut inner = self.inner.lock().await;
        let result = self.play_locked(&mut inner, request).await;
        self.publish(&inner);
        result
    }

    async fn play_locked(&self, inner: &mut Inner, request: PlayRequest) -> Result<String> {
        let uri = self.resolver.resolve(&request).await?;
        inner.backend.prepare().await?;
        inner.backend.start_stream().await?;
        let target = inner.backend.target()?;
        let mut feeder = self.feeders.select(&target)?;

        // The previous feeder must let go of the surface first.
        if let Some(mut previous) = inner.current.take()
            && let Err(e) = previous.feeder.stop().await
        {
            warn!(feeder = previous.feeder.name(), "stopping previous feeder failed: {e}");
        }

        feeder.feed(&uri, &target).await?;
        info!(feeder = feeder.name(), %target, "now playing {uri}");
        inner.current = Some(Current {
            feeder,
            source: uri.clone(),
        });
        Ok(uri)
    }

    /// Stop playback and the remote stream. Safe with nothing playing.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let stopped = match inner.current.take() {
            Some(mut current) => current.feeder.stop().await,
            None => Ok(()),
        };
        let unstreamed = inner.backend.stop_stream().await;
        self.publish(&inner);
        stopped.and(unstreamed)?;
        info!("playback stopped");
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let current = inner.current.as_mut().ok_or(DiscarrError::NothingPlaying)?;
        let result = current.feeder.pause().await;
        self.publish(&inner);
        result
    }

    pub async fn resume(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let current = inner.current.as_mut().ok_or(DiscarrError::NothingPlaying)?;
        let result = current.feeder.resume().await;
        self.publish(&inner);
        result
    }

    /// Current playback state. Never mutates and never waits for a
    /// running command; while one is in flight the state it started from
    /// is reported.
    pub async fn status(&self) -> Status {
        match self.inner.try_lock() {
            Ok(inner) => self.snapshot(&inner),
            Err(_) => self.published.borrow().clone(),
        }
    }

    fn snapshot(&self, inner: &Inner) -> Status {
        let current = inner.current.as_ref();
        Status {
            state: current.map_or(PlaybackState::Stopped, |c| c.feeder.state()),
            output_mode: self.mode,
            source: current.map(|c| c.source.clone()),
            pid: current.and_then(|c| c.feeder.process_id()),
        }
    }

    fn publish(&self, inner: &Inner) {
        self.published.send_replace(self.snapshot(inner));
    }

    /// Stop the feeder and tear down the backend. Never fails.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(mut current) = inner.current.take()
            && let Err(e) = current.feeder.stop().await
        {
            warn!(feeder = current.feeder.name(), "stopping feeder during shutdown failed: {e}");
        }
        inner.backend.shutdown().await;
        self.publish(&inner);
        info!("session coordinator shut down");
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("mode", &self.mode)
            .field("feeders", &self.feeders)
            .field("resolver", &self.resolver)
            .finish()
    }
}
