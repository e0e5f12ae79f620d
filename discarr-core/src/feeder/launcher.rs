//! Process-backed feeder, generic over the command line it launches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{DiscarrError, Result};
use crate::feeder::VideoFeeder;
use crate::feeder::process::{LaunchCommand, ManagedProcess, Signal};
use crate::state::{PlaybackCell, PlaybackState};
use crate::target::Target;

/// Describes which targets a player supports and how to invoke it.
pub trait Launcher: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn supports(&self, target: &Target) -> bool;

    /// Build the command that plays `source` into `target`.
    ///
    /// Only called with targets for which [`supports`](Self::supports)
    /// returned `true`.
    fn command(&self, source: &str, target: &Target) -> Result<LaunchCommand>;
}

// ── ProcessFeeder ────────────────────────────────────────────────

/// A [`VideoFeeder`] that plays through one child process at a time.
pub struct ProcessFeeder<L> {
    launcher: L,
    cell: Arc<PlaybackCell>,
    process: Option<ManagedProcess>,
    stop_grace: Duration,
}

impl<L: Launcher> ProcessFeeder<L> {
    pub fn new(launcher: L, stop_grace: Duration) -> Self {
        Self {
            launcher,
            cell: Arc::new(PlaybackCell::new()),
            process: None,
            stop_grace,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Terminate and drop the owned process, if any.
    async fn release(&mut self) {
        if let Some(process) = self.process.take() {
            debug!(feeder = self.launcher.name(), pid = ?process.pid(), "terminating process");
            process.terminate(self.stop_grace).await;
        }
        self.cell.reset();
    }

    /// Deliver `signal` and move `from → to` if the process is still live.
    fn signal_transition(
        &self,
        signal: Signal,
        from: PlaybackState,
        to: PlaybackState,
    ) -> Result<()> {
        if self.cell.get() != from {
            return Ok(());
        }
        let Some(process) = &self.process else {
            self.cell.reset();
            return Ok(());
        };
        process.signal(signal)?;
        if !self.cell.transition(from, to) {
            debug!(feeder = self.launcher.name(), "process exited before {signal:?} took effect");
        }
        Ok(())
    }
}

#[async_trait]
impl<L: Launcher> VideoFeeder for ProcessFeeder<L> {
    fn name(&self) -> &'static str {
        self.launcher.name()
    }

    fn supports_target(&self, target: &Target) -> bool {
        self.launcher.supports(target)
    }

    async fn feed(&mut self, source: &str, target: &Target) -> Result<()> {
        if !self.supports_target(target) {
            return Err(DiscarrError::UnsupportedTarget {
                feeder: self.name(),
                target: target.kind(),
            });
        }

        self.release().await;

        let command = self.launcher.command(source, target)?;
        let generation = self.cell.begin();
        let cell = Arc::clone(&self.cell);
        let name = self.name();

        let spawned = ManagedProcess::spawn(&command, move |status| {
            if cell.process_exited(generation) {
                info!(feeder = name, ?status, "playback process ended");
            }
        });

        match spawned {
            Ok(process) => {
                info!(
                    feeder = name,
                    pid = ?process.pid(),
                    %target,
                    "playing {source}"
                );
                self.process = Some(process);
                Ok(())
            }
            Err(e) => {
                self.cell.process_exited(generation);
                Err(e)
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.release().await;
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.signal_transition(Signal::Suspend, PlaybackState::Playing, PlaybackState::Paused)
    }

    async fn resume(&mut self) -> Result<()> {
        self.signal_transition(Signal::Continue, PlaybackState::Paused, PlaybackState::Playing)
    }

    fn state(&self) -> PlaybackState {
        self.cell.get()
    }

    fn process_id(&self) -> Option<u32> {
        self.process
            .as_ref()
            .filter(|p| !p.has_exited())
            .and_then(ManagedProcess::pid)
    }
}

// ── Tests ─────────────────────────────────────────────────────────

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Plays nothing: `sleep` for display targets, `true` (exits at
    /// once) for loopback targets.
    struct ScriptLauncher;

    impl Launcher for ScriptLauncher {
        fn name(&self) -> &'static str {
            "script"
        }

        fn supports(&self, target: &Target) -> bool {
            !matches!(target, Target::HardwareDevice { .. })
        }

        fn command(&self, _source: &str, target: &Target) -> Result<LaunchCommand> {
            Ok(match target {
                Target::Display { display } => {
                    LaunchCommand::new("sleep").arg("30").env("DISPLAY", display.clone())
                }
                _ => LaunchCommand::new("true"),
            })
        }
    }

    fn feeder() -> ProcessFeeder<ScriptLauncher> {
        ProcessFeeder::new(ScriptLauncher, Duration::from_secs(2))
    }

    fn is_alive(pid: u32) -> bool {
        // SAFETY: probing with signal 0.
        unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
    }

    async fn wait_for_state(feeder: &ProcessFeeder<ScriptLauncher>, want: PlaybackState) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while feeder.state() != want {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("state never reached");
    }

    #[tokio::test]
    async fn feed_twice_replaces_process() {
        let mut f = feeder();
        let target = Target::display(":99");

        f.feed("a.mp4", &target).await.unwrap();
        let first = f.process_id().unwrap();
        f.feed("b.mp4", &target).await.unwrap();
        let second = f.process_id().unwrap();

        assert_ne!(first, second);
        assert!(!is_alive(first));
        assert!(is_alive(second));
        assert_eq!(f.state(), PlaybackState::Playing);

        f.stop().await.unwrap();
    }

    #[tokio::test]
    async fn pause_resume_keeps_process() {
        let mut f = feeder();
        f.feed("a.mp4", &Target::display(":99")).await.unwrap();
        let pid = f.process_id().unwrap();

        f.pause().await.unwrap();
        assert_eq!(f.state(), PlaybackState::Paused);
        assert_eq!(f.process_id(), Some(pid));

        f.resume().await.unwrap();
        assert_eq!(f.state(), PlaybackState::Playing);
        assert_eq!(f.process_id(), Some(pid));

        f.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_from_every_state() {
        let target = Target::display(":99");

        let mut f = feeder();
        f.stop().await.unwrap();
        assert_eq!(f.state(), PlaybackState::Stopped);
        assert!(f.process_id().is_none());

        f.feed("a.mp4", &target).await.unwrap();
        let pid = f.process_id().unwrap();
        f.stop().await.unwrap();
        assert_eq!(f.state(), PlaybackState::Stopped);
        assert!(f.process_id().is_none());
        assert!(!is_alive(pid));

        f.feed("a.mp4", &target).await.unwrap();
        let pid = f.process_id().unwrap();
        f.pause().await.unwrap();
        f.stop().await.unwrap();
        assert_eq!(f.state(), PlaybackState::Stopped);
        assert!(f.process_id().is_none());
        assert!(!is_alive(pid));
    }

    #[tokio::test]
    async fn pause_and_resume_from_other_states_are_noops() {
        let mut f = feeder();
        f.pause().await.unwrap();
        f.resume().await.unwrap();
        assert_eq!(f.state(), PlaybackState::Stopped);

        f.feed("a.mp4", &Target::display(":99")).await.unwrap();
        f.resume().await.unwrap();
        assert_eq!(f.state(), PlaybackState::Playing);
        f.pause().await.unwrap();
        f.pause().await.unwrap();
        assert_eq!(f.state(), PlaybackState::Paused);

        f.stop().await.unwrap();
    }

    #[tokio::test]
    async fn process_exit_drives_state_to_stopped() {
        let mut f = feeder();
        f.feed("a.mp4", &Target::loopback("/dev/video10", None))
            .await
            .unwrap();

        wait_for_state(&f, PlaybackState::Stopped).await;
        assert!(f.process_id().is_none());

        // Nothing left to pause.
        f.pause().await.unwrap();
        assert_eq!(f.state(), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn unsupported_target_is_rejected() {
        let mut f = feeder();
        let err = f.feed("a.mp4", &Target::hardware("/dev/video2")).await.unwrap_err();
        assert!(matches!(err, DiscarrError::UnsupportedTarget { feeder: "script", .. }));
        assert_eq!(f.state(), PlaybackState::Stopped);
    }
}
