//! # discarr-server: Discarr control service
//!
//! Exposes the playback coordinator over a small JSON HTTP API and
//! wires it to the outside world:
//!
//! - **config**: TOML configuration with environment overrides
//! - **api**: axum router (`/health`, `/status`, `/play`, `/stop`, `/pause`, `/resume`)
//! - **jellyfin**: resolves Jellyfin item links to stream URLs
//! - **webdriver**: drives the Discord web client through geckodriver
//! - **service**: assembles the pieces and runs until signalled

pub mod api;
pub mod config;
pub mod jellyfin;
pub mod service;
pub mod webdriver;
