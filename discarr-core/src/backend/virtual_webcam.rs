//! Virtual-webcam backend: the remote client would select a v4l2loopback
//! device as its camera. Not implemented yet.

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{OutputBackend, OutputMode};
use crate::error::{DiscarrError, Result};
use crate::target::Target;

const WHAT: &str = "virtual webcam output";

#[derive(Debug, Default)]
pub struct VirtualWebcamBackend;

impl VirtualWebcamBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutputBackend for VirtualWebcamBackend {
    fn mode(&self) -> OutputMode {
        OutputMode::VirtualWebcam
    }

    async fn prepare(&mut self) -> Result<()> {
        Err(DiscarrError::NotImplemented(WHAT))
    }

    fn target(&self) -> Result<Target> {
        Err(DiscarrError::NotImplemented(WHAT))
    }

    async fn start_stream(&mut self) -> Result<()> {
        Err(DiscarrError::NotImplemented(WHAT))
    }

    async fn stop_stream(&mut self) -> Result<()> {
        Err(DiscarrError::NotImplemented(WHAT))
    }

    async fn shutdown(&mut self) {
        debug!("virtual webcam backend: nothing to shut down");
    }
}
