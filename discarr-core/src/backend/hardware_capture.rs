//! Hardware-capture backend: video leaves through a physical output and
//! comes back through a capture card. Not implemented yet.

use async_trait::async_trait;

use crate::backend::{OutputBackend, OutputMode};
use crate::error::{DiscarrError, Result};
use crate::target::Target;

const WHAT: &str = "hardware capture output";

#[derive(Debug, Default)]
pub struct HardwareCaptureBackend;

impl HardwareCaptureBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutputBackend for HardwareCaptureBackend {
    fn mode(&self) -> OutputMode {
        OutputMode::HardwareCapture
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

    async fn shutdown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_reports_not_implemented() {
        let mut b = HardwareCaptureBackend::new();
        let err = b.start_stream().await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotImplemented);
        assert!(b.target().is_err());
        b.shutdown().await;
        b.shutdown().await;
    }
}
