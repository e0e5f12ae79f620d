//! Configuration for the Discarr service.
//!
//! Loaded from TOML, then overridden by environment variables so that
//! container deployments can stay file-less.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use discarr_core::{FeederSettings, OutputMode, ScreenShareSettings, SessionTimeouts};

use crate::webdriver::WebDriverSettings;

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub discord: DiscordConfig,
    pub jellyfin: JellyfinConfig,
    pub media: MediaConfig,
    pub player: PlayerConfig,
    pub timeouts: TimeoutConfig,
    pub logging: LoggingConfig,
}

/// Host platform reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Linux,
    Windows,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }
}

/// HTTP listener and output mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// TCP port for the control API.
    pub port: u16,
    /// How the remote platform receives the video.
    pub output_mode: OutputMode,
    pub platform: Platform,
}

/// Discord client automation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Guild to open. Empty means unset.
    pub server_id: String,
    /// Voice channel to join. Empty means unset.
    pub voice_channel_id: String,
    /// Persistent browser profile, so the login survives restarts.
    pub profile_path: PathBuf,
    /// W3C WebDriver endpoint (geckodriver).
    pub webdriver_url: String,
    /// X display to play onto. Empty: `$DISPLAY`, then `:99`.
    pub display: String,
}

/// Jellyfin integration. Disabled unless both URL and key are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JellyfinConfig {
    pub server_url: String,
    pub api_key: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Base directory for relative local paths.
    pub videos_path: PathBuf,
}

/// Local player programs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub mpv_program: String,
    pub mpv_args: Vec<String>,
    pub ffmpeg_program: String,
    /// Seconds a player gets to exit after SIGTERM.
    pub stop_grace_secs: u64,
}

/// Bounded waits on the remote session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Client launch / page load.
    pub ready_secs: u64,
    /// Join, start and stop actions.
    pub action_secs: u64,
    /// How long to poll for a single page element.
    pub element_wait_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: 3000,
            output_mode: OutputMode::default(),
            platform: Platform::default(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            server_id: String::new(),
            voice_channel_id: String::new(),
            profile_path: PathBuf::from("./discord-profile"),
            webdriver_url: "http://localhost:4444".into(),
            display: String::new(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            videos_path: PathBuf::from("/videos"),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let feeder = FeederSettings::default();
        Self {
            mpv_program: feeder.mpv_program,
            mpv_args: feeder.mpv_args,
            ffmpeg_program: feeder.ffmpeg_program,
            stop_grace_secs: feeder.stop_grace.as_secs(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        let session = SessionTimeouts::default();
        Self {
            ready_secs: session.ready.as_secs(),
            action_secs: session.action.as_secs(),
            element_wait_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ServerConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by the historical
    /// environment variable names. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OUTPUT_MODE") {
            self.server.output_mode = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "OUTPUT_MODE",
                reason: "expected screen_share, virtual_webcam or hardware_capture".into(),
                value: v,
            })?;
        }
        if let Some(v) = get("PLATFORM") {
            self.server.platform = match v.trim() {
                "linux" => Platform::Linux,
                "windows" => Platform::Windows,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "PLATFORM",
                        value: v,
                        reason: "expected linux or windows".into(),
                    });
                }
            };
        }
        if let Some(v) = get("PORT") {
            self.server.port = v.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "PORT",
                reason: format!("{e}"),
                value: v,
            })?;
        }

        let strings: [(&str, &mut String); 7] = [
            ("DISCORD_SERVER_ID", &mut self.discord.server_id),
            ("DISCORD_VOICE_CHANNEL_ID", &mut self.discord.voice_channel_id),
            ("JELLYFIN_SERVER_URL", &mut self.jellyfin.server_url),
            ("JELLYFIN_API_KEY", &mut self.jellyfin.api_key),
            ("JELLYFIN_USER_ID", &mut self.jellyfin.user_id),
            ("WEBDRIVER_URL", &mut self.discord.webdriver_url),
            ("DISPLAY_OVERRIDE", &mut self.discord.display),
        ];
        for (key, slot) in strings {
            if let Some(v) = get(key) {
                *slot = v;
            }
        }

        if let Some(v) = get("DISCORD_PROFILE_PATH") {
            self.discord.profile_path = PathBuf::from(v);
        }
        if let Some(v) = get("VIDEOS_PATH") {
            self.media.videos_path = PathBuf::from(v);
        }
        Ok(())
    }

    // ── Conversions ──────────────────────────────────────────────

    pub fn session_timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            ready: Duration::from_secs(self.timeouts.ready_secs.max(1)),
            action: Duration::from_secs(self.timeouts.action_secs.max(1)),
        }
    }

    pub fn to_screen_share_settings(&self) -> ScreenShareSettings {
        ScreenShareSettings {
            server_id: non_empty(&self.discord.server_id),
            channel_id: non_empty(&self.discord.voice_channel_id),
            display: non_empty(&self.discord.display),
            timeouts: self.session_timeouts(),
        }
    }

    pub fn to_feeder_settings(&self) -> FeederSettings {
        FeederSettings {
            mpv_program: self.player.mpv_program.clone(),
            mpv_args: self.player.mpv_args.clone(),
            ffmpeg_program: self.player.ffmpeg_program.clone(),
            stop_grace: Duration::from_secs(self.player.stop_grace_secs),
        }
    }

    pub fn to_webdriver_settings(&self) -> WebDriverSettings {
        WebDriverSettings {
            endpoint: self.discord.webdriver_url.trim_end_matches('/').to_string(),
            profile_path: self.discord.profile_path.clone(),
            server_id: self.discord.server_id.clone(),
            channel_id: self.discord.voice_channel_id.clone(),
            element_wait: Duration::from_secs(self.timeouts.element_wait_secs.max(1)),
            ..WebDriverSettings::default()
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&ServerConfig::default()).unwrap();
        assert!(text.contains("output_mode = \"screen_share\""));
        assert!(text.contains("videos_path"));
        assert!(text.contains("webdriver_url"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: ServerConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [discord]
            server_id = "111"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.output_mode, OutputMode::ScreenShare);
        assert_eq!(cfg.discord.server_id, "111");
        assert_eq!(cfg.media.videos_path, PathBuf::from("/videos"));
        assert_eq!(cfg.player.stop_grace_secs, 3);
    }

    #[test]
    fn environment_overrides_file() {
        let mut cfg = ServerConfig::default();
        cfg.apply_overrides(env(&[
            ("OUTPUT_MODE", "virtual_webcam"),
            ("PLATFORM", "windows"),
            ("PORT", "4000"),
            ("DISCORD_SERVER_ID", "111"),
            ("DISCORD_VOICE_CHANNEL_ID", "222"),
            ("JELLYFIN_SERVER_URL", "https://jf.example"),
            ("JELLYFIN_API_KEY", "K"),
            ("VIDEOS_PATH", "/srv/media"),
            ("DISPLAY_OVERRIDE", ":5"),
        ]))
        .unwrap();

        assert_eq!(cfg.server.output_mode, OutputMode::VirtualWebcam);
        assert_eq!(cfg.server.platform, Platform::Windows);
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.jellyfin.api_key, "K");
        assert_eq!(cfg.media.videos_path, PathBuf::from("/srv/media"));

        let share = cfg.to_screen_share_settings();
        assert_eq!(share.server_id.as_deref(), Some("111"));
        assert_eq!(share.channel_id.as_deref(), Some("222"));
        assert_eq!(share.display.as_deref(), Some(":5"));
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut cfg = ServerConfig::default();
        cfg.apply_overrides(env(&[("PORT", ""), ("VIDEOS_PATH", "  ")]))
            .unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.media.videos_path, PathBuf::from("/videos"));
        assert!(cfg.to_screen_share_settings().server_id.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (key, value) in [
            ("OUTPUT_MODE", "hologram"),
            ("PLATFORM", "beos"),
            ("PORT", "eighty"),
        ] {
            let mut cfg = ServerConfig::default();
            let err = cfg.apply_overrides(env(&[(key, value)])).unwrap_err();
            assert!(err.to_string().contains(key));
        }
    }

    #[test]
    fn write_default_then_load() {
        let path = std::env::temp_dir().join(format!("discarr-{}.toml", std::process::id()));
        ServerConfig::write_default(&path).unwrap();
        let loaded = ServerConfig::load(&path);
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.server.port, 3000);
        assert_eq!(loaded.discord.webdriver_url, "http://localhost:4444");

        let missing = ServerConfig::load(Path::new("/nonexistent/discarr.toml"));
        assert_eq!(missing.server.port, 3000);
    }

    #[test]
    fn conversions_clamp_zero_timeouts() {
        let mut cfg = ServerConfig::default();
        cfg.timeouts.ready_secs = 0;
        cfg.player.stop_grace_secs = 7;
        assert_eq!(cfg.session_timeouts().ready, Duration::from_secs(1));
        assert_eq!(cfg.to_feeder_settings().stop_grace, Duration::from_secs(7));
    }
}
