//! Feeder playback state and the shared cell it lives in.
//!
//! The cell is written from two sides: the feeder's own methods and the
//! exit watcher of the process the feeder spawned. Every spawn opens a
//! new *generation*; exit notifications carry the generation they were
//! registered for and are ignored once a newer process has replaced it.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

// ── PlaybackState ────────────────────────────────────────────────

/// Playback state of a single feeder.
///
/// ```text
///            feed              pause
///  Stopped ───────► Playing ─────────► Paused
///     ▲                │  ◄─────────     │
///     │                │     resume      │
///     └──── stop / process exit ─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

// ── PlaybackCell ─────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CellInner {
    state: PlaybackState,
    generation: u64,
}

/// Thread-safe playback state shared between a feeder and the exit
/// watcher of its process.
#[derive(Debug, Default)]
pub struct PlaybackCell {
    inner: Mutex<CellInner>,
}

impl PlaybackCell {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CellInner> {
        // Poisoning cannot leave the (Copy) fields half-written.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state.
    pub fn get(&self) -> PlaybackState {
        self.lock().state
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Open a new generation in the `Playing` state and return it.
    ///
    /// Called right before a process is spawned so that an immediate
    /// exit is still reported against the right generation.
    pub fn begin(&self) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = PlaybackState::Playing;
        inner.generation
    }

    /// Move `from → to` only if the current state is `from`.
    ///
    /// Returns `false` (and leaves the state alone) when another writer,
    /// typically the exit watcher, got there first.
    pub fn transition(&self, from: PlaybackState, to: PlaybackState) -> bool {
        let mut inner = self.lock();
        if inner.state == from {
            inner.state = to;
            true
        } else {
            false
        }
    }

    /// Force `Stopped` regardless of state or generation.
    pub fn reset(&self) {
        self.lock().state = PlaybackState::Stopped;
    }

    /// Record that the process of `generation` exited.
    ///
    /// Returns `true` if the notification applied to the live generation.
    pub fn process_exited(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.state = PlaybackState::Stopped;
            true
        } else {
            false
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────
