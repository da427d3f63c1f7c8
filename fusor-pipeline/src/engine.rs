//! Contract the pipeline requires from the volumetric reconstruction engine.
//!
//! The engine owns the voxel volume and all fusion arithmetic; the pipeline
//! drives it with caller-owned output buffers so per-frame processing stays
//! allocation free.

use fusor_data::{ColorBuffer, DepthFloatFrame, PointCloudFrame, Transform};
use thiserror::Error;

/// Errors reported by a reconstruction engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A per-frame operation the engine could not complete. Callers log it
    /// and skip the frame; the pipeline keeps running.
    #[error("engine operation failed: {0}")]
    InvalidOperation(String),

    /// No compatible compute device is available. Fatal at pipeline
    /// construction; never raised per frame.
    #[error("no compatible reconstruction device: {0}")]
    DeviceUnavailable(String),
}

/// Result of one point-cloud alignment pass.
#[derive(Debug, Clone, Copy)]
pub struct Alignment {
    /// Whether the solver converged. A numerical failure reports `false`
    /// here rather than an [`EngineError`].
    pub converged: bool,
    /// Residual alignment energy; lower means better geometric agreement.
    pub energy: f32,
    /// The updated camera pose candidate.
    pub pose: Transform,
}

/// The volumetric reconstruction engine the pipeline drives.
pub trait ReconstructionEngine {
    /// The fixed world-to-volume transform captured at volume creation.
    fn world_to_volume(&self) -> Transform;

    /// Default iteration bound for [`Self::align_point_clouds`].
    fn default_align_iterations(&self) -> u32;

    /// Convert raw millimeter depth into a clipped meter depth-float image.
    /// Values outside `[min_clip, max_clip]` become invalid (0.0).
    fn depth_to_float(
        &mut self,
        depth: &[u16],
        min_clip: f32,
        max_clip: f32,
        out: &mut DepthFloatFrame,
    ) -> Result<(), EngineError>;

    /// Box-smooth a depth-float image with the given kernel half-width,
    /// rejecting neighbors farther than `distance_threshold` meters from
    /// the center pixel.
    fn smooth(
        &mut self,
        input: &DepthFloatFrame,
        kernel_width: u32,
        distance_threshold: f32,
        out: &mut DepthFloatFrame,
    ) -> Result<(), EngineError>;

    /// Back-project a depth-float image into a per-pixel point cloud.
    fn point_cloud_from_depth(
        &mut self,
        depth: &DepthFloatFrame,
        out: &mut PointCloudFrame,
    ) -> Result<(), EngineError>;

    /// Raycast the current volume state from `pose` into `out`.
    fn raycast_point_cloud(
        &mut self,
        pose: &Transform,
        out: &mut PointCloudFrame,
    ) -> Result<(), EngineError>;

    /// Align `observed` to `model`, starting the solve from `pose`. When
    /// `delta` is supplied the engine also renders the per-pixel alignment
    /// residuals into it.
    fn align_point_clouds(
        &mut self,
        model: &PointCloudFrame,
        observed: &PointCloudFrame,
        max_iterations: u32,
        pose: &Transform,
        delta: Option<&mut ColorBuffer>,
    ) -> Result<Alignment, EngineError>;

    /// Fuse a depth-float frame into the volume at `pose` with the given
    /// integration weight.
    fn integrate(
        &mut self,
        depth: &DepthFloatFrame,
        weight: u16,
        pose: &Transform,
    ) -> Result<(), EngineError>;

    /// Reset the volume, re-homing it with the given camera pose and
    /// world-to-volume transform.
    fn reset(&mut self, pose: &Transform, world_to_volume: &Transform) -> Result<(), EngineError>;
}
