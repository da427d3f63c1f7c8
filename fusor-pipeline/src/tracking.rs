//! Frame-to-model camera tracking.
//!
//! The tracker owns the one live camera pose of the session. Each frame it
//! aligns the observed point cloud against a raycast of the volume, accepts
//! or rejects the resulting pose, and falls back to keyframe relocalization
//! when tracking is lost.

use fusor_data::{Frame, Transform};
use tracing::{debug, trace, warn};

use crate::buffers::FrameBuffers;
use crate::engine::{EngineError, ReconstructionEngine};
use crate::posedb::PoseKeyframeDatabase;
use crate::preferences::VolumeBuilderPreferences;
use crate::relocalize;
use crate::resample;

/// Coarse tracking condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    /// Frame-to-model tracking is healthy.
    Tracking,
    /// Tracking failed and no keyframes are available to recover from.
    Lost,
    /// Tracking failed; relocalization against the keyframe database is
    /// being attempted each frame.
    Relocalizing,
}

/// Per-frame tracking verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Frame-to-model alignment accepted.
    Tracked,
    /// Alignment failed but relocalization recovered a pose.
    Recovered,
    /// Tracking lost this frame.
    Lost,
}

/// Tracking health counters.
///
/// Exactly one of `consecutive_failures` / `consecutive_successes` is
/// non-zero at any time; both are zero only before the first frame (or
/// after a reset). The sticky `has_failed_previously` flag survives a
/// recovery and keeps integration gated until enough consecutive successes
/// accumulate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingHealth {
    consecutive_failures: u32,
    consecutive_successes: u32,
    has_failed_previously: bool,
    has_ever_tracked: bool,
}

impl TrackingHealth {
    pub fn record_success(&mut self) {
        self.consecutive_successes += 1;
        self.consecutive_failures = 0;
        self.has_ever_tracked = true;
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.consecutive_successes = 0;
        self.has_failed_previously = true;
    }

    /// Forget the sticky failure flag once the pose is trusted again.
    pub fn clear_failure_history(&mut self) {
        self.has_failed_previously = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn has_failed_previously(&self) -> bool {
        self.has_failed_previously
    }

    /// Whether any frame has been successfully tracked since the last
    /// reset.
    pub fn has_ever_tracked(&self) -> bool {
        self.has_ever_tracked
    }

    pub fn is_lost(&self) -> bool {
        self.consecutive_failures > 0
    }
}

/// Drives per-frame pose estimation.
#[derive(Debug, Default)]
pub struct Tracker {
    pose: Transform,
    health: TrackingHealth,
    processed_frames: u64,
    relocalization_available: bool,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current best-estimate world-to-camera pose.
    pub fn pose(&self) -> &Transform {
        &self.pose
    }

    pub fn health(&self) -> &TrackingHealth {
        &self.health
    }

    pub(crate) fn health_mut(&mut self) -> &mut TrackingHealth {
        &mut self.health
    }

    /// Frames accepted so far; lost frames do not advance this counter.
    pub fn processed_frames(&self) -> u64 {
        self.processed_frames
    }

    pub fn state(&self) -> TrackingState {
        if !self.health.is_lost() {
            TrackingState::Tracking
        } else if self.relocalization_available {
            TrackingState::Relocalizing
        } else {
            TrackingState::Lost
        }
    }

    /// Zero all counters and return the pose to identity.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[cfg(test)]
    pub(crate) fn force_progress(&mut self, processed_frames: u64) {
        self.processed_frames = processed_frames;
    }

    /// Estimate the pose for the frame just captured and classify it.
    ///
    /// Engine-level errors propagate to the caller, which logs them and
    /// skips the frame; the previous pose stays in effect.
    pub fn track_frame<E, D>(
        &mut self,
        engine: &mut E,
        database: &mut D,
        frame: &Frame,
        buffers: &mut FrameBuffers,
        preferences: &VolumeBuilderPreferences,
    ) -> Result<TrackOutcome, EngineError>
    where
        E: ReconstructionEngine,
        D: PoseKeyframeDatabase,
    {
        // Clip raw depth into the full-resolution float frame used for
        // integration and keyframe queries.
        engine.depth_to_float(
            frame.depth_data(),
            preferences.min_depth_clip,
            preferences.max_depth_clip,
            &mut buffers.depth_float,
        )?;

        // Downsample and smooth for alignment.
        resample::downsample_depth_flipped(
            frame.depth_data(),
            frame.geometry().depth_width,
            preferences.downsample_factor,
            &mut buffers.downsampled_depth,
        );
        engine.smooth(
            &buffers.downsampled_depth,
            preferences.smoothing_kernel_width,
            preferences.smoothing_distance_threshold,
            &mut buffers.smoothed_depth,
        )?;

        buffers.swap_clouds();
        engine.point_cloud_from_depth(&buffers.smoothed_depth, &mut buffers.observed_cloud)?;

        // Model cloud raycast from the current pose estimate.
        engine.raycast_point_cloud(&self.pose, &mut buffers.reference_cloud)?;

        let calculate_delta = self.processed_frames
            % u64::from(preferences.delta_frame_calculation_interval)
            == 0;
        let max_iterations = engine.default_align_iterations();
        let alignment = engine.align_point_clouds(
            &buffers.reference_cloud,
            &buffers.observed_cloud,
            max_iterations,
            &self.pose,
            calculate_delta.then_some(&mut buffers.delta_map),
        )?;

        let accepted = alignment.converged
            && Transform::within_motion_limits(
                &self.pose,
                &alignment.pose,
                preferences.max_translation_delta,
                preferences.max_rotation_delta_degrees,
            );

        if accepted {
            if calculate_delta {
                resample::upsample_color_nearest(
                    &buffers.delta_map,
                    preferences.downsample_factor,
                    &mut buffers.delta_full,
                );
            }
            self.pose = alignment.pose;
            self.health.record_success();
            self.processed_frames += 1;
            trace!(energy = alignment.energy, "Frame tracked");
            return Ok(TrackOutcome::Tracked);
        }

        // Never mark the session lost before anything has tracked at all;
        // there is no model to relocalize against yet.
        if !self.health.has_ever_tracked() {
            debug!("Alignment rejected on the first frame; keeping the initial pose");
            return Ok(TrackOutcome::Lost);
        }

        self.health.record_failure();
        warn!(
            failures = self.health.consecutive_failures(),
            "Camera tracking lost"
        );

        self.relocalization_available = database.stored_count() > 0;
        if !self.relocalization_available {
            return Ok(TrackOutcome::Lost);
        }

        let relocalization =
            relocalize::relocalize(engine, database, frame, buffers, preferences)?;
        if let Some(pose) = relocalization.pose {
            // Adopted even when the recovery is not trusted, to keep the
            // pipeline moving; integration gating protects the volume.
            self.pose = pose;
        }

        if relocalization.recovered {
            self.health.record_success();
            self.processed_frames += 1;
            Ok(TrackOutcome::Recovered)
        } else {
            Ok(TrackOutcome::Lost)
        }
    }
}
