//! Output backend lifecycle.
//!
//! Provides a `BackendPhase` enum with validated transitions that return
//! `Result` instead of panicking.

use std::time::Instant;

use crate::error::{DiscarrError, Result};

// ── BackendPhase ─────────────────────────────────────────────────

/// The phase of an output backend's remote session.
///
/// ```text
///  Unprepared ──► Prepared ──► Streaming
///                    ▲             │
///                    └─────────────┘
///        (any) ──► ShutDown   (terminal)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendPhase {
    /// No remote session joined yet. Initial state.
    #[default]
    Unprepared,

    /// Session established and joined; nothing presented.
    Prepared,

    /// The remote client is presenting the signal.
    Streaming {
        /// When presenting started.
        since: Instant,
    },

    /// The session was torn down; the backend is unusable.
    ShutDown,
}

impl std::fmt::Display for BackendPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unprepared => write!(f, "Unprepared"),
            Self::Prepared => write!(f, "Prepared"),
            Self::Streaming { .. } => write!(f, "Streaming"),
            Self::ShutDown => write!(f, "ShutDown"),
        }
    }
}

impl BackendPhase {
    /// `true` once the session is joined (`Prepared` or `Streaming`).
    pub fn is_prepared(&self) -> bool {
        matches!(self, Self::Prepared | Self::Streaming { .. })
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming { .. })
    }

    pub fn is_shut_down(&self) -> bool {
        matches!(self, Self::ShutDown)
    }

    /// How long the backend has been streaming, if it is.
    pub fn streaming_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Streaming { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    /// Fail if the backend was shut down.
    pub fn ensure_usable(&self) -> Result<()> {
        if self.is_shut_down() {
            Err(DiscarrError::SessionUnavailable("backend has been shut down".into()))
        } else {
            Ok(())
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Prepared`.
    ///
    /// Valid from: `Unprepared`. No-op from `Prepared` / `Streaming`.
    pub fn mark_prepared(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if let Self::Unprepared = self {
            *self = Self::Prepared;
        }
        Ok(())
    }

    /// Transition to `Streaming`.
    ///
    /// Valid from: `Prepared`. No-op from `Streaming`.
    pub fn mark_streaming(&mut self) -> Result<()> {
        match self {
            Self::Prepared => {
                *self = Self::Streaming {
                    since: Instant::now(),
                };
                Ok(())
            }
            Self::Streaming { .. } => Ok(()),
            Self::Unprepared => Err(DiscarrError::SessionUnavailable(
                "cannot stream: session not prepared".into(),
            )),
            Self::ShutDown => self.ensure_usable(),
        }
    }

    /// Transition `Streaming → Prepared`. No-op otherwise.
    pub fn mark_stream_stopped(&mut self) {
        if let Self::Streaming { .. } = self {
            *self = Self::Prepared;
        }
    }

    /// Force the terminal state.
    pub fn mark_shut_down(&mut self) {
        *self = Self::ShutDown;
    }
}

// ── Tests ─────────────────────────────────────────────────────────
