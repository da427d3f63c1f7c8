//! Common capture source types and traits.

use fusor_data::{Frame, FrameError, FrameGeometry};
use thiserror::Error;

/// Errors that can occur during capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open source: {0}")]
    OpenFailed(String),

    #[error("Failed to capture frame: {0}")]
    CaptureFailed(String),

    #[error("Stream ended")]
    StreamEnded,

    #[error(transparent)]
    Geometry(#[from] FrameError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for sources that produce synchronized depth + color frame pairs.
///
/// `acquire` returns `Ok(None)` when no new synchronized pair is available;
/// that tick is simply a no-op for the caller, not an error. The geometry
/// advertised at open time must stay constant for the whole session; frames
/// that disagree with it are rejected with [`CaptureError::Geometry`] and
/// leave the previously acquired buffers untouched.
pub trait FrameSource {
    /// Get the next synchronized frame, if one is ready.
    fn acquire(&mut self) -> Result<Option<&Frame>, CaptureError>;

    /// The fixed color/depth geometry of this session.
    fn geometry(&self) -> FrameGeometry;

    /// Check if the source is still producing frames.
    fn is_active(&self) -> bool;

    /// Stop capturing and release the underlying device or file.
    fn stop(&mut self);
}
