//! Remote-session automation contract.
//!
//! The screen-share backend drives a third-party client (joining a
//! voice channel, toggling screen share) through a [`SessionDriver`].
//! Drivers live outside this crate; every call the backend makes is
//! bounded by a deadline from [`SessionTimeouts`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DiscarrError, Result};

/// Automation of the remote presentation client.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// Launch the client and open the presentation context (server /
    /// channel). Creates the underlying session on first use.
    async fn prepare(&mut self) -> Result<()>;

    /// Re-open the presentation context in an already running session.
    async fn navigate_back(&mut self) -> Result<()>;

    /// Join the context (e.g. connect to the voice channel).
    async fn join_presentation_context(&mut self) -> Result<()>;

    /// Begin presenting the shared surface.
    async fn start_presenting(&mut self) -> Result<()>;

    /// Stop presenting. Must tolerate presenting already being off.
    async fn stop_presenting(&mut self) -> Result<()>;

    /// Leave the context joined by `join_presentation_context`.
    async fn leave_context(&mut self) -> Result<()>;

    /// Tear the session down.
    async fn shutdown(&mut self) -> Result<()>;
}

// ── SessionTimeouts ──────────────────────────────────────────────

/// Deadlines applied to driver calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    /// `prepare` / `navigate_back`: client launch and page load.
    pub ready: Duration,
    /// join / start / stop / leave.
    pub action: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            ready: Duration::from_secs(45),
            action: Duration::from_secs(20),
        }
    }
}

/// Await `fut`, mapping expiry of `limit` to
/// [`DiscarrError::SessionTimeout`] for `step`.
pub async fn with_deadline<T, F>(step: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DiscarrError::SessionTimeout { step, after: limit }),
    }
}
