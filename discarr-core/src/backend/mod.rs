//! Output backends: how the remote platform receives the video.
//!
//! One backend is built at startup from the configured [`OutputMode`]
//! and lives until process shutdown.
//!
//! | Mode               | Backend                   | Target           |
//! |--------------------|---------------------------|------------------|
//! | `screen_share`     | [`ScreenShareBackend`]    | `Display`        |
//! | `virtual_webcam`   | [`VirtualWebcamBackend`]  | not implemented  |
//! | `hardware_capture` | [`HardwareCaptureBackend`]| not implemented  |

pub mod hardware_capture;
pub mod screen_share;
pub mod virtual_webcam;

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DiscarrError, Result};
use crate::session::SessionDriver;
use crate::target::Target;

pub use hardware_capture::HardwareCaptureBackend;
pub use screen_share::{ScreenShareBackend, ScreenShareSettings};
pub use virtual_webcam::VirtualWebcamBackend;

// ── OutputBackend ────────────────────────────────────────────────

/// Owns the remote session that presents the video.
///
/// State machine: `Unprepared → Prepared ⇄ Streaming`, any state →
/// shut down (terminal).
#[async_trait]
pub trait OutputBackend: Send + Sync {
    fn mode(&self) -> OutputMode;

    /// Establish or re-validate the remote session. Idempotent.
    async fn prepare(&mut self) -> Result<()>;

    /// The surface feeders must write to. Valid once prepared.
    fn target(&self) -> Result<Target>;

    /// Begin presenting; prepares first if needed. Idempotent.
    async fn start_stream(&mut self) -> Result<()>;

    /// End presenting but keep the session. Idempotent.
    async fn stop_stream(&mut self) -> Result<()>;

    /// Tear the session down. Best-effort: cleanup failures are logged
    /// and discarded. The backend is unusable afterwards.
    async fn shutdown(&mut self);
}

// ── OutputMode ───────────────────────────────────────────────────

/// Remote presentation mode, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    ScreenShare,
    VirtualWebcam,
    HardwareCapture,
}

impl OutputMode {
    pub const ALL: [OutputMode; 3] = [
        OutputMode::ScreenShare,
        OutputMode::VirtualWebcam,
        OutputMode::HardwareCapture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScreenShare => "screen_share",
            Self::VirtualWebcam => "virtual_webcam",
            Self::HardwareCapture => "hardware_capture",
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = DiscarrError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s.trim())
            .ok_or_else(|| DiscarrError::InvalidRequest(format!("unknown output mode: {s}")))
    }
}

// ── Registry ─────────────────────────────────────────────────────

/// Build the backend for `mode`.
///
/// `driver` is only invoked for modes that automate a remote client.
pub fn create_backend<D>(
    mode: OutputMode,
    screen_share: ScreenShareSettings,
    driver: D,
) -> Box<dyn OutputBackend>
where
    D: FnOnce() -> Box<dyn SessionDriver>,
{
    match mode {
        OutputMode::ScreenShare => Box::new(ScreenShareBackend::new(screen_share, driver())),
        OutputMode::VirtualWebcam => Box::new(VirtualWebcamBackend::new()),
        OutputMode::HardwareCapture => Box::new(HardwareCaptureBackend::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_and_prints() {
        for mode in OutputMode::ALL {
            assert_eq!(mode.as_str().parse::<OutputMode>().unwrap(), mode);
        }
        assert!(matches!(
            "carrier_pigeon".parse::<OutputMode>(),
            Err(DiscarrError::InvalidRequest(_))
        ));
        assert_eq!(OutputMode::default(), OutputMode::ScreenShare);
    }

    #[test]
    fn registry_builds_requested_mode() {
        for mode in OutputMode::ALL {
            let backend = create_backend(mode, ScreenShareSettings::default(), || {
                Box::new(screen_share::tests::ScriptedDriver::default())
            });
            assert_eq!(backend.mode(), mode);
        }
    }
}
