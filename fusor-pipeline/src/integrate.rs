//! Depth integration gating.
//!
//! Fusing a badly-posed frame corrupts the volume permanently, so
//! integration is withheld until tracking has been stable for long enough
//! after any failure.

use fusor_data::Transform;
use tracing::debug;

use crate::buffers::FrameBuffers;
use crate::engine::{EngineError, ReconstructionEngine};
use crate::preferences::VolumeBuilderPreferences;
use crate::tracking::TrackingHealth;

/// Whether the current frame is trusted enough to fuse into the volume.
pub fn should_integrate(
    health: &TrackingHealth,
    preferences: &VolumeBuilderPreferences,
) -> bool {
    if health.is_lost() {
        return false;
    }
    if health.has_failed_previously()
        && health.consecutive_successes() < preferences.min_successful_frames_after_failure
    {
        return false;
    }
    true
}

/// Fuse the current depth frame into the volume if tracking is trusted.
///
/// Returns whether the frame was integrated. On the first integration after
/// a recovery the failure history is cleared.
pub fn integrate_frame<E>(
    engine: &mut E,
    health: &mut TrackingHealth,
    pose: &Transform,
    buffers: &FrameBuffers,
    preferences: &VolumeBuilderPreferences,
) -> Result<bool, EngineError>
where
    E: ReconstructionEngine,
{
    if !should_integrate(health, preferences) {
        debug!(
            successes = health.consecutive_successes(),
            "Withholding integration until tracking stabilizes"
        );
        return Ok(false);
    }

    if health.has_failed_previously() {
        health.clear_failure_history();
    }

    engine.integrate(&buffers.depth_float, preferences.integration_weight, pose)?;
    Ok(true)
}
