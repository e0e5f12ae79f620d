//! mpv onto an X display.
//!
//! The screen-share backend presents a virtual display; mpv plays the
//! source fullscreen on it with every on-screen control disabled.

use crate::error::{DiscarrError, Result};
use crate::feeder::FeederSettings;
use crate::feeder::launcher::{Launcher, ProcessFeeder};
use crate::feeder::process::LaunchCommand;
use crate::target::Target;

/// Flags that keep mpv's own UI off the shared display.
const MPV_FLAGS: &[&str] = &[
    "--no-osc",
    "--no-input-default-bindings",
    "--fs",
    "--no-audio-display",
];

/// Builds mpv command lines for [`Target::Display`].
#[derive(Debug, Clone)]
pub struct MpvLauncher {
    program: String,
    extra_args: Vec<String>,
}

impl MpvLauncher {
    pub fn new(program: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            extra_args,
        }
    }
}

impl Default for MpvLauncher {
    fn default() -> Self {
        Self::new("mpv", Vec::new())
    }
}

impl Launcher for MpvLauncher {
    fn name(&self) -> &'static str {
        "mpv-display"
    }

    fn supports(&self, target: &Target) -> bool {
        matches!(target, Target::Display { .. })
    }

    fn command(&self, source: &str, target: &Target) -> Result<LaunchCommand> {
        let Target::Display { display } = target else {
            return Err(DiscarrError::UnsupportedTarget {
                feeder: self.name(),
                target: target.kind(),
            });
        };

        Ok(LaunchCommand::new(&self.program)
            .args(MPV_FLAGS.iter().copied())
            .args(self.extra_args.iter().cloned())
            .arg("--")
            .arg(source)
            .env("DISPLAY", display.clone()))
    }
}

/// Plays video with mpv on a (virtual) X display.
pub type MpvDisplayFeeder = ProcessFeeder<MpvLauncher>;

impl MpvDisplayFeeder {
    pub fn from_settings(settings: &FeederSettings) -> Self {
        ProcessFeeder::new(
            MpvLauncher::new(&settings.mpv_program, settings.mpv_args.clone()),
            settings.stop_grace,
        )
    }
}
