//! Screen-share backend: a desktop client shares the X display that the
//! feeder plays onto.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::backend::{OutputBackend, OutputMode};
use crate::error::{DiscarrError, Result};
use crate::session::{SessionDriver, SessionTimeouts, with_deadline};
use crate::state::BackendPhase;
use crate::target::Target;

const FALLBACK_DISPLAY: &str = ":99";

/// Identifiers and deadlines for the screen-share session.
#[derive(Debug, Clone, Default)]
pub struct ScreenShareSettings {
    pub server_id: Option<String>,
    pub channel_id: Option<String>,
    /// Display override. Falls back to `$DISPLAY`, then `:99`.
    pub display: Option<String>,
    pub timeouts: SessionTimeouts,
}

impl ScreenShareSettings {
    /// The X display the feeder should play onto.
    pub fn resolved_display(&self) -> String {
        non_empty(self.display.clone())
            .or_else(|| non_empty(std::env::var("DISPLAY").ok()))
            .unwrap_or_else(|| FALLBACK_DISPLAY.to_string())
    }

    fn ids(&self) -> Option<(&str, &str)> {
        let server = self.server_id.as_deref().filter(|s| !s.is_empty())?;
        let channel = self.channel_id.as_deref().filter(|s| !s.is_empty())?;
        Some((server, channel))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ── ScreenShareBackend ───────────────────────────────────────────

pub struct ScreenShareBackend {
    driver: Box<dyn SessionDriver>,
    settings: ScreenShareSettings,
    display: String,
    phase: BackendPhase,
    /// Set once `driver.prepare` has succeeded; later preparations
    /// reuse the session via `navigate_back`.
    session_started: bool,
}

impl ScreenShareBackend {
    pub fn new(settings: ScreenShareSettings, driver: Box<dyn SessionDriver>) -> Self {
        let display = settings.resolved_display();
        Self {
            driver,
            settings,
            display,
            phase: BackendPhase::default(),
            session_started: false,
        }
    }

    pub fn phase(&self) -> &BackendPhase {
        &self.phase
    }

    pub fn display(&self) -> &str {
        &self.display
    }
}

#[async_trait]
impl OutputBackend for ScreenShareBackend {
    fn mode(&self) -> OutputMode {
        OutputMode::ScreenShare
    }

    async fn prepare(&mut self) -> Result<()> {
        self.phase.ensure_usable()?;
        if self.phase.is_prepared() {
            return Ok(());
        }

        let Some((server, channel)) = self.settings.ids() else {
            return Err(DiscarrError::SessionUnavailable(
                "server and voice channel ids must be configured".into(),
            ));
        };
        info!(server, channel, "preparing screen-share session");

        let timeouts = self.settings.timeouts;
        if self.session_started {
            with_deadline("navigate_back", timeouts.ready, self.driver.navigate_back()).await?;
        } else {
            with_deadline("prepare", timeouts.ready, self.driver.prepare()).await?;
            self.session_started = true;
        }
        with_deadline(
            "join_presentation_context",
            timeouts.action,
            self.driver.join_presentation_context(),
        )
        .await?;

        self.phase.mark_prepared()?;
        info!(display = %self.display, "screen-share session ready");
        Ok(())
    }

    fn target(&self) -> Result<Target> {
        self.phase.ensure_usable()?;
        if !self.phase.is_prepared() {
            return Err(DiscarrError::SessionUnavailable(
                "no target before the session is prepared".into(),
            ));
        }
        Ok(Target::display(self.display.clone()))
    }

    async fn start_stream(&mut self) -> Result<()> {
        self.prepare().await?;
        if self.phase.is_streaming() {
            return Ok(());
        }
        with_deadline(
            "start_presenting",
            self.settings.timeouts.action,
            self.driver.start_presenting(),
        )
        .await?;
        self.phase.mark_streaming()?;
        info!("screen share started");
        Ok(())
    }

    async fn stop_stream(&mut self) -> Result<()> {
        self.phase.ensure_usable()?;
        if !self.phase.is_streaming() {
            return Ok(());
        }
        with_deadline(
            "stop_presenting",
            self.settings.timeouts.action,
            self.driver.stop_presenting(),
        )
        .await?;
        let streamed = self.phase.streaming_duration();
        self.phase.mark_stream_stopped();
        info!(?streamed, "screen share stopped");
        Ok(())
    }

    async fn shutdown(&mut self) {
        if self.phase.is_shut_down() {
            return;
        }
        let action = self.settings.timeouts.action;

        if self.phase.is_streaming()
            && let Err(e) =
                with_deadline("stop_presenting", action, self.driver.stop_presenting()).await
        {
            warn!("stop presenting during shutdown failed: {e}");
        }
        if self.phase.is_prepared()
            && let Err(e) =
                with_deadline("leave_context", action, self.driver.leave_context()).await
        {
            warn!("leaving voice channel during shutdown failed: {e}");
        }
        if self.session_started
            && let Err(e) = with_deadline("shutdown", action, self.driver.shutdown()).await
        {
            warn!("session shutdown failed: {e}");
        }

        self.phase.mark_shut_down();
        debug!("screen-share backend shut down");
    }
}

// ── Tests ─────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;

    /// Records every driver call; can fail the next join or hang
    /// `prepare`, `start_presenting` or `stop_presenting`.
    #[derive(Default, Clone)]
    pub(crate) struct ScriptedDriver {
        pub calls: Arc<Mutex<Vec<&'static str>>>,
        pub fail_next_join: Arc<Mutex<bool>>,
        pub hang_prepare: bool,
        pub hang_start: bool,
        pub hang_stop: bool,
        pub fail_teardown: bool,
    }

    impl ScriptedDriver {
        pub fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl SessionDriver for ScriptedDriver {
        async fn prepare(&mut self) -> Result<()> {
            self.record("prepare");
            if self.hang_prepare {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(())
        }

        async fn navigate_back(&mut self) -> Result<()> {
            self.record("navigate_back");
            Ok(())
        }

        async fn join_presentation_context(&mut self) -> Result<()> {
            self.record("join");
            let mut fail = self.fail_next_join.lock().unwrap();
            if std::mem::take(&mut *fail) {
                return Err(DiscarrError::SessionError("voice channel not found".into()));
            }
            Ok(())
        }

        async fn start_presenting(&mut self) -> Result<()> {
            self.record("start");
            if self.hang_start {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(())
        }

        async fn stop_presenting(&mut self) -> Result<()> {
            self.record("stop");
            if self.hang_stop {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(())
        }

        async fn leave_context(&mut self) -> Result<()> {
            self.record("leave");
            if self.fail_teardown {
                return Err(DiscarrError::SessionError("already gone".into()));
            }
            Ok(())
        }

        async fn shutdown(&mut self) -> Result<()> {
            self.record("shutdown");
            if self.fail_teardown {
                return Err(DiscarrError::SessionError("browser crashed".into()));
            }
            Ok(())
        }
    }

    fn settings() -> ScreenShareSettings {
        ScreenShareSettings {
            server_id: Some("111".into()),
            channel_id: Some("222".into()),
            display: Some(":42".into()),
            timeouts: SessionTimeouts::default(),
        }
    }

    fn backend(driver: &ScriptedDriver) -> ScreenShareBackend {
        ScreenShareBackend::new(settings(), Box::new(driver.clone()))
    }

    #[tokio::test]
    async fn prepare_is_idempotent() {
        let driver = ScriptedDriver::default();
        let mut b = backend(&driver);

        b.prepare().await.unwrap();
        b.prepare().await.unwrap();

        assert!(b.phase().is_prepared());
        assert_eq!(driver.calls(), vec!["prepare", "join"]);
        assert_eq!(b.target().unwrap(), Target::display(":42"));
    }

    #[tokio::test]
    async fn missing_ids_make_session_unavailable() {
        let driver = ScriptedDriver::default();
        let mut b = ScreenShareBackend::new(
            ScreenShareSettings {
                channel_id: None,
                ..settings()
            },
            Box::new(driver.clone()),
        );

        let err = b.prepare().await.unwrap_err();
        assert!(matches!(err, DiscarrError::SessionUnavailable(_)));
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_join_reuses_session_on_retry() {
        let driver = ScriptedDriver::default();
        *driver.fail_next_join.lock().unwrap() = true;
        let mut b = backend(&driver);

        assert!(matches!(
            b.prepare().await,
            Err(DiscarrError::SessionError(_))
        ));
        assert!(!b.phase().is_prepared());
        assert!(b.target().is_err());

        b.prepare().await.unwrap();
        assert_eq!(driver.calls(), vec!["prepare", "join", "navigate_back", "join"]);
    }

    #[tokio::test]
    async fn start_stream_prepares_and_is_idempotent() {
        let driver = ScriptedDriver::default();
        let mut b = backend(&driver);

        b.start_stream().await.unwrap();
        b.start_stream().await.unwrap();
        assert!(b.phase().is_streaming());

        b.stop_stream().await.unwrap();
        b.stop_stream().await.unwrap();
        assert!(b.phase().is_prepared());
        assert!(!b.phase().is_streaming());

        assert_eq!(driver.calls(), vec!["prepare", "join", "start", "stop"]);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_prepare_times_out() {
        let driver = ScriptedDriver {
            hang_prepare: true,
            ..Default::default()
        };
        let mut b = backend(&driver);

        let err = b.prepare().await.unwrap_err();
        assert!(matches!(
            err,
            DiscarrError::SessionTimeout { step: "prepare", .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_start_presenting_times_out() {
        let driver = ScriptedDriver {
            hang_start: true,
            ..Default::default()
        };
        let mut b = backend(&driver);

        let err = b.start_stream().await.unwrap_err();
        assert!(matches!(
            err,
            DiscarrError::SessionTimeout { step: "start_presenting", .. }
        ));
        assert!(b.phase().is_prepared());
        assert!(!b.phase().is_streaming());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_stop_presenting_times_out() {
        let driver = ScriptedDriver {
            hang_stop: true,
            ..Default::default()
        };
        let mut b = backend(&driver);
        b.start_stream().await.unwrap();

        let err = b.stop_stream().await.unwrap_err();
        assert!(matches!(
            err,
            DiscarrError::SessionTimeout { step: "stop_presenting", .. }
        ));
        assert!(b.phase().is_streaming());
    }

    #[tokio::test]
    async fn shutdown_swallows_failures_and_is_terminal() {
        let driver = ScriptedDriver {
            fail_teardown: true,
            ..Default::default()
        };
        let mut b = backend(&driver);
        b.start_stream().await.unwrap();

        b.shutdown().await;
        b.shutdown().await;

        assert!(b.phase().is_shut_down());
        assert_eq!(
            driver.calls(),
            vec!["prepare", "join", "start", "stop", "leave", "shutdown"]
        );
        assert!(matches!(
            b.prepare().await,
            Err(DiscarrError::SessionUnavailable(_))
        ));
        assert!(matches!(
            b.start_stream().await,
            Err(DiscarrError::SessionUnavailable(_))
        ));
        assert!(b.target().is_err());
    }

    #[tokio::test]
    async fn shutdown_before_prepare_skips_driver() {
        let driver = ScriptedDriver::default();
        let mut b = backend(&driver);
        b.shutdown().await;
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn display_override_wins() {
        assert_eq!(settings().resolved_display(), ":42");
        let blank = ScreenShareSettings {
            display: Some("  ".into()),
            ..settings()
        };
        assert!(!blank.resolved_display().is_empty());
    }
}
