//! Delivery surfaces a feeder writes video to.
//!
//! A [`Target`] says *where* the signal must appear, never *how* it is
//! produced. Each output backend exposes exactly one target once its
//! remote session is prepared.

use serde::{Deserialize, Serialize};

/// The surface a [`VideoFeeder`](crate::feeder::VideoFeeder) must write to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    /// An X display (e.g. `:99`) that the remote client shares.
    Display { display: String },

    /// A v4l2loopback video device, optionally paired with an ALSA
    /// loopback device for audio.
    LoopbackDevice {
        device: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_device: Option<String>,
    },

    /// A physical capture device the remote client selects as camera.
    HardwareDevice { device: String },
}

/// Fieldless discriminant of [`Target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Display,
    LoopbackDevice,
    HardwareDevice,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Display => write!(f, "display"),
            Self::LoopbackDevice => write!(f, "loopback_device"),
            Self::HardwareDevice => write!(f, "hardware_device"),
        }
    }
}

impl Target {
    pub fn display(display: impl Into<String>) -> Self {
        Self::Display {
            display: display.into(),
        }
    }

    pub fn loopback(device: impl Into<String>, audio_device: Option<String>) -> Self {
        Self::LoopbackDevice {
            device: device.into(),
            audio_device,
        }
    }

    pub fn hardware(device: impl Into<String>) -> Self {
        Self::HardwareDevice {
            device: device.into(),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Display { .. } => TargetKind::Display,
            Self::LoopbackDevice { .. } => TargetKind::LoopbackDevice,
            Self::HardwareDevice { .. } => TargetKind::HardwareDevice,
        }
    }

    /// The primary identifier of the surface (display name or device path).
    pub fn identifier(&self) -> &str {
        match self {
            Self::Display { display } => display,
            Self::LoopbackDevice { device, .. } | Self::HardwareDevice { device } => device,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Display { display } => write!(f, "display {display}"),
            Self::LoopbackDevice {
                device,
                audio_device: Some(audio),
            } => write!(f, "loopback {device} (audio {audio})"),
            Self::LoopbackDevice { device, .. } => write!(f, "loopback {device}"),
            Self::HardwareDevice { device } => write!(f, "hardware {device}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_identifier() {
        let t = Target::display(":99");
        assert_eq!(t.kind(), TargetKind::Display);
        assert_eq!(t.identifier(), ":99");

        let t = Target::loopback("/dev/video10", Some("hw:Loopback,0".into()));
        assert_eq!(t.kind(), TargetKind::LoopbackDevice);
        assert_eq!(t.identifier(), "/dev/video10");
        assert_eq!(t.to_string(), "loopback /dev/video10 (audio hw:Loopback,0)");
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(Target::hardware("/dev/video2")).unwrap();
        assert_eq!(json["type"], "hardware_device");
        assert_eq!(json["device"], "/dev/video2");

        let json = serde_json::to_value(Target::loopback("/dev/video10", None)).unwrap();
        assert!(json.get("audio_device").is_none());
    }
}
