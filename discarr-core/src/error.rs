//! Domain-specific error types for playback orchestration.
//!
//! All fallible operations return `Result<T, DiscarrError>`. Every
//! variant maps to a stable [`ErrorKind`] so that callers (the HTTP
//! surface, logs) can report failures without parsing messages.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::target::TargetKind;

/// Convenience alias used across the crate.
pub type Result<T, E = DiscarrError> = std::result::Result<T, E>;

/// The canonical error type for Discarr.
#[derive(Debug, Error)]
pub enum DiscarrError {
    // ── Feeder Errors ────────────────────────────────────────────
    /// A feeder was asked to write to a target shape it cannot drive.
    #[error("{feeder} does not support {target} targets")]
    UnsupportedTarget {
        feeder: &'static str,
        target: TargetKind,
    },

    /// No registered feeder supports the backend's target.
    #[error("no feeder supports target type: {0}")]
    NoFeederForTarget(TargetKind),

    /// Spawning or signalling the local media process failed.
    #[error("process error ({program}): {source}")]
    Process {
        program: String,
        #[source]
        source: std::io::Error,
    },

    // ── Session Errors ───────────────────────────────────────────
    /// The remote session cannot be used (missing identifiers, not
    /// prepared, or already shut down).
    #[error("session unavailable: {0}")]
    SessionUnavailable(String),

    /// The remote session reported a failure.
    #[error("session error: {0}")]
    SessionError(String),

    /// A bounded wait on the remote session expired.
    #[error("session step '{step}' timed out after {after:?}")]
    SessionTimeout { step: &'static str, after: Duration },

    /// The selected backend or primitive has no implementation yet.
    #[error("{0} is not yet implemented")]
    NotImplemented(&'static str),

    // ── Command Errors ───────────────────────────────────────────
    /// pause / resume issued while no feeder is held.
    #[error("nothing is playing")]
    NothingPlaying,

    /// A catalog reference carried no usable item identifier.
    #[error("could not parse item ID from URL: {0}")]
    UnresolvableReference(String),

    /// The media-server integration is absent or unconfigured.
    #[error("{0} integration not configured")]
    IntegrationNotConfigured(&'static str),

    /// The play request failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

// ── ErrorKind ─────────────────────────────────────────────────────

/// Stable, machine-readable classification of a [`DiscarrError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedTarget,
    NoFeederForTarget,
    ProcessError,
    SessionUnavailable,
    SessionError,
    SessionTimeout,
    NotImplemented,
    NothingPlaying,
    UnresolvableReference,
    IntegrationNotConfigured,
    InvalidRequest,
}

impl ErrorKind {
    /// The snake_case code used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedTarget => "unsupported_target",
            Self::NoFeederForTarget => "no_feeder_for_target",
            Self::ProcessError => "process_error",
            Self::SessionUnavailable => "session_unavailable",
            Self::SessionError => "session_error",
            Self::SessionTimeout => "session_timeout",
            Self::NotImplemented => "not_implemented",
            Self::NothingPlaying => "nothing_playing",
            Self::UnresolvableReference => "unresolvable_reference",
            Self::IntegrationNotConfigured => "integration_not_configured",
            Self::InvalidRequest => "invalid_request",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DiscarrError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedTarget { .. } => ErrorKind::UnsupportedTarget,
            Self::NoFeederForTarget(_) => ErrorKind::NoFeederForTarget,
            Self::Process { .. } => ErrorKind::ProcessError,
            Self::SessionUnavailable(_) => ErrorKind::SessionUnavailable,
            Self::SessionError(_) => ErrorKind::SessionError,
            Self::SessionTimeout { .. } => ErrorKind::SessionTimeout,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
            Self::NothingPlaying => ErrorKind::NothingPlaying,
            Self::UnresolvableReference(_) => ErrorKind::UnresolvableReference,
            Self::IntegrationNotConfigured(_) => ErrorKind::IntegrationNotConfigured,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    /// Wrap an I/O failure of the named program.
    pub fn process(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Process {
            program: program.into(),
            source,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────
