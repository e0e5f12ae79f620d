//! # discarr-core
//!
//! Playback orchestration for Discarr: plays local or remote video into a
//! surface that a remote platform (a Discord screen share) presents.
//!
//! This crate contains:
//! - **Target**: where a feeder writes video (`Display`, `LoopbackDevice`, `HardwareDevice`)
//! - **Feeder**: `VideoFeeder` trait, process-backed mpv / ffmpeg feeders, `FeederRegistry`
//! - **Backend**: `OutputBackend` trait, `ScreenShareBackend`, stub backends, `create_backend`
//! - **Session**: `SessionDriver` contract for remote-client automation, with deadlines
//! - **Resolver**: `PlayRequest` and `SourceResolver` (local / URL / catalog reference)
//! - **Coordinator**: `SessionCoordinator`, the serialized command entry point
//! - **State**: `PlaybackState` cell and `BackendPhase` state machine
//! - **Error**: `DiscarrError` with stable `ErrorKind`s

pub mod backend;
pub mod coordinator;
pub mod error;
pub mod feeder;
pub mod resolver;
pub mod session;
pub mod state;
pub mod target;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use backend::{
    HardwareCaptureBackend, OutputBackend, OutputMode, ScreenShareBackend, ScreenShareSettings,
    VirtualWebcamBackend, create_backend,
};
pub use coordinator::{SessionCoordinator, Status};
pub use error::{DiscarrError, ErrorKind, Result};
pub use feeder::{
    FeederRegistry, FeederSettings, FfmpegLoopbackFeeder, LaunchCommand, Launcher,
    MpvDisplayFeeder, ProcessFeeder, VideoFeeder,
};
pub use resolver::{CatalogResolver, PlayRequest, SourceResolver, extract_item_id};
pub use session::{SessionDriver, SessionTimeouts};
pub use state::{BackendPhase, PlaybackCell, PlaybackState};
pub use target::{Target, TargetKind};
