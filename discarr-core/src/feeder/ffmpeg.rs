//! ffmpeg into a v4l2loopback device.
//!
//! The virtual-webcam presentation reads a loopback camera; ffmpeg
//! decodes the source in real time (`-re`) and writes raw yuv420p
//! frames to it, plus audio to an ALSA loopback when one is paired.

use crate::error::{DiscarrError, Result};
use crate::feeder::FeederSettings;
use crate::feeder::launcher::{Launcher, ProcessFeeder};
use crate::feeder::process::LaunchCommand;
use crate::target::Target;

/// Builds ffmpeg command lines for [`Target::LoopbackDevice`].
#[derive(Debug, Clone)]
pub struct FfmpegLauncher {
    program: String,
}

impl FfmpegLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegLauncher {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Launcher for FfmpegLauncher {
    fn name(&self) -> &'static str {
        "ffmpeg-v4l2"
    }

    fn supports(&self, target: &Target) -> bool {
        matches!(target, Target::LoopbackDevice { .. })
    }

    fn command(&self, source: &str, target: &Target) -> Result<LaunchCommand> {
        let Target::LoopbackDevice {
            device,
            audio_device,
        } = target
        else {
            return Err(DiscarrError::UnsupportedTarget {
                feeder: self.name(),
                target: target.kind(),
            });
        };

        let mut cmd = LaunchCommand::new(&self.program)
            .args(["-hide_banner", "-loglevel", "error", "-re", "-i"])
            .arg(source)
            .args(["-map", "0:v:0", "-vf", "format=yuv420p", "-f", "v4l2"])
            .arg(device.clone());

        if let Some(audio) = audio_device {
            cmd = cmd
                .args(["-map", "0:a:0?", "-f", "alsa"])
                .arg(audio.clone());
        }

        Ok(cmd)
    }
}

/// Pipes video into a v4l2loopback camera with ffmpeg.
pub type FfmpegLoopbackFeeder = ProcessFeeder<FfmpegLauncher>;

impl FfmpegLoopbackFeeder {
    pub fn from_settings(settings: &FeederSettings) -> Self {
        ProcessFeeder::new(
            FfmpegLauncher::new(&settings.ffmpeg_program),
            settings.stop_grace,
        )
    }
}
