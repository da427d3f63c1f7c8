//! Keyframe-based camera relocalization.
//!
//! When frame-to-model tracking fails, the stored keyframes are queried for
//! poses that look like the current frame, and each candidate is verified by
//! raycasting the volume from it and aligning the observed cloud against
//! that view.

use fusor_data::{Frame, Transform};
use tracing::{debug, info, warn};

use crate::buffers::FrameBuffers;
use crate::engine::{EngineError, ReconstructionEngine};
use crate::posedb::PoseKeyframeDatabase;
use crate::preferences::VolumeBuilderPreferences;
use crate::resample;

/// Outcome of one relocalization attempt.
#[derive(Debug, Clone, Copy)]
pub struct Relocalization {
    /// The pose to adopt, if any candidate aligned at all. Adopted even when
    /// `recovered` is false so the next attempt starts from a better guess.
    pub pose: Option<Transform>,
    /// Whether the adopted pose aligned inside the trusted energy window.
    pub recovered: bool,
}

impl Relocalization {
    fn failed() -> Self {
        Self {
            pose: None,
            recovered: false,
        }
    }
}

/// Try to recover the camera pose from the keyframe database.
pub fn relocalize<E, D>(
    engine: &mut E,
    database: &mut D,
    frame: &Frame,
    buffers: &mut FrameBuffers,
    preferences: &VolumeBuilderPreferences,
) -> Result<Relocalization, EngineError>
where
    E: ReconstructionEngine,
    D: PoseKeyframeDatabase,
{
    let geometry = frame.geometry();
    resample::resample_color_to_depth(
        frame.color_data(),
        geometry.color_width,
        geometry.color_height,
        &mut buffers.resampled_color,
    );

    let Some(candidates) = database.find_pose(&buffers.depth_float, &buffers.resampled_color)
    else {
        debug!("Pose finder returned no candidates");
        return Ok(Relocalization::failed());
    };

    if candidates.count() == 0 {
        debug!("Pose finder returned an empty candidate set");
        return Ok(Relocalization::failed());
    }
    if candidates.min_distance >= preferences.pose_finder_distance_threshold_reject {
        debug!(
            min_distance = candidates.min_distance,
            "No stored keyframe is similar enough to relocalize against"
        );
        return Ok(Relocalization::failed());
    }

    let tests = candidates
        .count()
        .min(preferences.max_pose_finder_pose_tests as usize);
    let max_iterations = engine.default_align_iterations();

    let mut best_valid: Option<(Transform, f32)> = None;
    let mut best_any: Option<(Transform, f32)> = None;

    for candidate in &candidates.poses[..tests] {
        engine.raycast_point_cloud(candidate, &mut buffers.reference_cloud)?;
        let alignment = engine.align_point_clouds(
            &buffers.reference_cloud,
            &buffers.observed_cloud,
            max_iterations,
            candidate,
            None,
        )?;

        if best_any.is_none_or(|(_, energy)| alignment.energy < energy) {
            best_any = Some((alignment.pose, alignment.energy));
        }

        // Energies at or below the floor are degenerate solves.
        if alignment.converged
            && alignment.energy > preferences.min_align_energy_for_success
            && alignment.energy < preferences.max_align_energy_for_success
            && best_valid.is_none_or(|(_, energy)| alignment.energy < energy)
        {
            best_valid = Some((alignment.pose, alignment.energy));
        }
    }

    if let Some((pose, energy)) = best_valid {
        info!(energy, "Relocalization recovered the camera pose");
        engine.raycast_point_cloud(&pose, &mut buffers.reference_cloud)?;
        return Ok(Relocalization {
            pose: Some(pose),
            recovered: true,
        });
    }

    // Nothing inside the trusted window; adopt the lowest-energy solve as
    // the starting point for the next attempt, but report failure.
    warn!(
        candidates = tests,
        "Relocalization candidates aligned but none within the energy window"
    );
    let pose = best_any.map(|(pose, _)| pose);
    if let Some(pose) = &pose {
        engine.raycast_point_cloud(pose, &mut buffers.reference_cloud)?;
    }
    Ok(Relocalization {
        pose,
        recovered: false,
    })
}
