//! Video feeders: local processes that produce the video signal.
//!
//! | Module     | Purpose                                              |
//! |------------|------------------------------------------------------|
//! | `process`  | Spawn / signal / reap primitive with exit callback    |
//! | `launcher` | [`ProcessFeeder`], generic over a command [`Launcher`] |
//! | `mpv`      | mpv onto an X display                                 |
//! | `ffmpeg`   | ffmpeg into a v4l2loopback (+ ALSA) device            |
//! | `registry` | Selects a fresh feeder for a [`Target`]               |

pub mod ffmpeg;
pub mod launcher;
pub mod mpv;
pub mod process;
pub mod registry;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::state::PlaybackState;
use crate::target::Target;

pub use ffmpeg::{FfmpegLauncher, FfmpegLoopbackFeeder};
pub use launcher::{Launcher, ProcessFeeder};
pub use mpv::{MpvDisplayFeeder, MpvLauncher};
pub use process::{LaunchCommand, ManagedProcess, Signal};
pub use registry::FeederRegistry;

// ── VideoFeeder ──────────────────────────────────────────────────

/// Owns the local process that writes video to a [`Target`].
///
/// A feeder instance is created fresh for every play command and owns
/// at most one live process at a time.
#[async_trait]
pub trait VideoFeeder: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether this feeder can drive `target`. Pure.
    fn supports_target(&self, target: &Target) -> bool;

    /// Start playing `source` into `target`, replacing any playback this
    /// instance already owns.
    async fn feed(&mut self, source: &str, target: &Target) -> Result<()>;

    /// Stop playback and release the process. Idempotent.
    async fn stop(&mut self) -> Result<()>;

    /// Suspend playback. No-op unless `Playing`.
    async fn pause(&mut self) -> Result<()>;

    /// Continue playback. No-op unless `Paused`.
    async fn resume(&mut self) -> Result<()>;

    fn state(&self) -> PlaybackState;

    /// Pid of the live process, if any.
    fn process_id(&self) -> Option<u32> {
        None
    }
}

// ── FeederSettings ───────────────────────────────────────────────

/// Programs and tuning shared by the built-in feeders.
#[derive(Debug, Clone)]
pub struct FeederSettings {
    /// mpv executable.
    pub mpv_program: String,
    /// Extra arguments placed before the source on the mpv command line.
    pub mpv_args: Vec<String>,
    /// ffmpeg executable.
    pub ffmpeg_program: String,
    /// How long a process may take to honour SIGTERM before it is killed.
    pub stop_grace: Duration,
}

impl Default for FeederSettings {
    fn default() -> Self {
        Self {
            mpv_program: "mpv".into(),
            mpv_args: Vec::new(),
            ffmpeg_program: "ffmpeg".into(),
            stop_grace: Duration::from_secs(3),
        }
    }
}
