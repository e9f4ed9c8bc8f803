pub mod driver;
pub mod simulated;

use photosphere_guidance::{CaptureAck, CaptureRequest};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Photo directory unavailable: {0}")]
    PhotoDir(#[from] std::io::Error),
}

/// Platform camera collaborator.
///
/// Exposing and encoding a photo takes visible time, so `capture` only starts
/// the work. The camera answers later on `acks` with either the saved path or
/// a failure reason.
pub trait Camera: Send {
    fn capture(&mut self, request: CaptureRequest, acks: mpsc::UnboundedSender<CaptureAck>);
}
