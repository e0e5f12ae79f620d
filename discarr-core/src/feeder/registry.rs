//! Feeder selection.
//!
//! The registry holds one factory per feeder implementation. Selection
//! builds a fresh instance from each factory in registration order and
//! returns the first one whose `supports_target` accepts the target.

use tracing::debug;

use crate::error::{DiscarrError, Result};
use crate::feeder::{FeederSettings, FfmpegLoopbackFeeder, MpvDisplayFeeder, VideoFeeder};
use crate::target::Target;

type FeederFactory = Box<dyn Fn() -> Box<dyn VideoFeeder> + Send + Sync>;

/// Ordered set of feeder factories.
pub struct FeederRegistry {
    factories: Vec<FeederFactory>,
}

impl FeederRegistry {
    /// A registry with no feeders; every selection fails.
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// The built-in feeders (mpv for displays, ffmpeg for loopback
    /// devices) configured from `settings`.
    pub fn with_settings(settings: &FeederSettings) -> Self {
        let mpv = settings.clone();
        let ffmpeg = settings.clone();
        Self::empty()
            .register(move || Box::new(MpvDisplayFeeder::from_settings(&mpv)))
            .register(move || Box::new(FfmpegLoopbackFeeder::from_settings(&ffmpeg)))
    }

    /// Append a factory. Earlier registrations win ties.
    pub fn register<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn VideoFeeder> + Send + Sync + 'static,
    {
        self.factories.push(Box::new(factory));
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Build a fresh feeder that supports `target`.
    pub fn select(&self, target: &Target) -> Result<Box<dyn VideoFeeder>> {
        let feeder = self
            .factories
            .iter()
            .map(|factory| factory())
            .find(|feeder| feeder.supports_target(target))
            .ok_or(DiscarrError::NoFeederForTarget(target.kind()))?;
        debug!(feeder = feeder.name(), %target, "selected feeder");
        Ok(feeder)
    }
}

impl Default for FeederRegistry {
    fn default() -> Self {
        Self::with_settings(&FeederSettings::default())
    }
}

impl std::fmt::Debug for FeederRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeederRegistry")
            .field("factories", &self.factories.len())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetKind;

    fn all_targets() -> Vec<Target> {
        vec![
            Target::display(":99"),
            Target::loopback("/dev/video10", None),
            Target::loopback("/dev/video10", Some("hw:Loopback,0".into())),
            Target::hardware("/dev/video2"),
        ]
    }

    #[test]
    fn selected_feeder_supports_target() {
        let registry = FeederRegistry::default();
        for target in all_targets() {
            match registry.select(&target) {
                Ok(feeder) => assert!(feeder.supports_target(&target)),
                Err(DiscarrError::NoFeederForTarget(kind)) => {
                    assert_eq!(kind, target.kind());
                    assert_eq!(kind, TargetKind::HardwareDevice);
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn picks_by_shape() {
        let registry = FeederRegistry::default();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.select(&Target::display(":1")).unwrap().name(), "mpv-display");
        assert_eq!(
            registry
                .select(&Target::loopback("/dev/video10", None))
                .unwrap()
                .name(),
            "ffmpeg-v4l2"
        );
    }

    #[test]
    fn empty_registry_never_matches() {
        let registry = FeederRegistry::empty();
        assert!(registry.is_empty());
        for target in all_targets() {
            assert!(matches!(
                registry.select(&target),
                Err(DiscarrError::NoFeederForTarget(_))
            ));
        }
    }

    #[test]
    fn fresh_instance_per_selection() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let registry = FeederRegistry::empty().register(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(MpvDisplayFeeder::from_settings(&FeederSettings::default()))
        });

        registry.select(&Target::display(":99")).unwrap();
        registry.select(&Target::display(":99")).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }
}
