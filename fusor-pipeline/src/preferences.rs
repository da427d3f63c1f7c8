//! Volume builder configuration.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse preferences: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid preferences: {0}")]
    Invalid(String),
}

/// Immutable configuration bundle for the scanning pipeline.
///
/// Read-only after construction; every numeric threshold the tracker,
/// integrator, and keyframe updater consult lives here. Defaults suit a
/// desk-scale scan with a consumer depth camera.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VolumeBuilderPreferences {
    /// Reconstruction volume voxel density in voxels per meter.
    /// 1000mm / 256vpm = ~3.9mm per voxel.
    pub voxels_per_meter: f32,

    /// Volume voxel resolution along X. At 256vpm, 384 voxels span 1.5m.
    pub voxels_x: u32,

    /// Volume voxel resolution along Y.
    pub voxels_y: u32,

    /// Volume voxel resolution along Z.
    pub voxels_z: u32,

    /// Minimum depth distance threshold in meters. Depth pixels below this
    /// become invalid (0). Must not be negative.
    pub min_depth_clip: f32,

    /// Maximum depth distance threshold in meters. Depth pixels above this
    /// become invalid (0). Must be greater than the minimum.
    pub max_depth_clip: f32,

    /// Frame interval on which the per-pixel alignment residual map is
    /// rendered during tracking.
    pub delta_frame_calculation_interval: u32,

    /// Integer factor the depth image is downsampled by for alignment.
    pub downsample_factor: u32,

    /// Smoothing kernel half-width: 0 = copy, 1 = 3x3, 2 = 5x5.
    pub smoothing_kernel_width: u32,

    /// Neighbor rejection distance for smoothing, in meters.
    pub smoothing_distance_threshold: f32,

    /// Maximum per-axis translation between successive poses, in meters.
    /// 0.15 - 0.3m per frame is typical camera motion.
    pub max_translation_delta: f32,

    /// Maximum per-axis rotation between successive poses, in degrees.
    /// 10 - 20 degrees per frame is typical camera motion.
    pub max_rotation_delta_degrees: f32,

    /// Minimum-distance ceiling for running the pose finder at all: the
    /// query frame must score below this against the database for a match
    /// to be plausible. 1.0 disables the rejection.
    pub pose_finder_distance_threshold_reject: f32,

    /// Minimum distance a frame must have from everything stored for it to
    /// be inserted as a new keyframe, keeping the database spread out.
    pub pose_finder_distance_threshold_accept: f32,

    /// Residual alignment energy ceiling under which a relocalization
    /// candidate counts as a true recovery. Typically 0.005 - 0.006.
    pub max_align_energy_for_success: f32,

    /// Residual alignment energy floor; candidates at or below it are
    /// treated as degenerate solves, not successes.
    pub min_align_energy_for_success: f32,

    /// How many top-ranked pose candidates to test during relocalization.
    /// More tests raise the recovery chance but cost time; past ~5 it is
    /// usually better to retry with the next depth frame.
    pub max_pose_finder_pose_tests: u32,

    /// Consecutive successful frames required after a tracking failure
    /// before integration resumes (~7s at 30Hz).
    pub min_successful_frames_after_failure: u32,

    /// Consecutive successful frames required before keyframes start being
    /// stored (~1.5s at 30Hz).
    pub min_successful_frames_for_keyframes: u32,

    /// Frame interval on which a new keyframe is proposed to the database.
    pub keyframe_process_frame_interval: u32,

    /// Depth integration weight handed to the engine per fused frame.
    pub integration_weight: u16,

    /// Shift the volume forward along +Z by the minimum depth clip on
    /// reset. Small volumes should be shifted: inside the sensor's minimum
    /// sensing distance no valid depth is returned, so a volume hugging the
    /// camera is hard to initialize and track.
    pub translate_reset_pose_by_min_depth_threshold: bool,
}

impl Default for VolumeBuilderPreferences {
    fn default() -> Self {
        Self {
            voxels_per_meter: 256.0,
            voxels_x: 384,
            voxels_y: 384,
            voxels_z: 384,
            min_depth_clip: 0.35,
            max_depth_clip: 8.0,
            delta_frame_calculation_interval: 2,
            downsample_factor: 2,
            smoothing_kernel_width: 1,
            smoothing_distance_threshold: 0.04,
            max_translation_delta: 0.3,
            max_rotation_delta_degrees: 20.0,
            pose_finder_distance_threshold_reject: 1.0,
            pose_finder_distance_threshold_accept: 0.1,
            max_align_energy_for_success: 0.006,
            min_align_energy_for_success: 0.0,
            max_pose_finder_pose_tests: 5,
            min_successful_frames_after_failure: 200,
            min_successful_frames_for_keyframes: 45,
            keyframe_process_frame_interval: 5,
            integration_weight: 200,
            translate_reset_pose_by_min_depth_threshold: true,
        }
    }
}

impl VolumeBuilderPreferences {
    /// Load preferences from a JSON file. Missing fields keep their
    /// defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let text = std::fs::read_to_string(path)?;
        let preferences: Self = serde_json::from_str(&text)?;
        preferences.validate()?;
        Ok(preferences)
    }

    /// Check the numeric constraints the pipeline relies on.
    pub fn validate(&self) -> Result<(), PreferencesError> {
        let invalid = |message: &str| Err(PreferencesError::Invalid(message.to_string()));

        if self.min_depth_clip < 0.0 {
            return invalid("min_depth_clip must not be negative");
        }
        if self.max_depth_clip <= self.min_depth_clip {
            return invalid("max_depth_clip must be greater than min_depth_clip");
        }
        if self.voxels_per_meter <= 0.0 {
            return invalid("voxels_per_meter must be positive");
        }
        if self.voxels_x == 0 || self.voxels_y == 0 || self.voxels_z == 0 {
            return invalid("volume voxel resolution must be positive on every axis");
        }
        if self.downsample_factor == 0 {
            return invalid("downsample_factor must be at least 1");
        }
        if self.delta_frame_calculation_interval == 0 {
            return invalid("delta_frame_calculation_interval must be at least 1");
        }
        if self.keyframe_process_frame_interval == 0 {
            return invalid("keyframe_process_frame_interval must be at least 1");
        }
        if self.max_pose_finder_pose_tests == 0 {
            return invalid("max_pose_finder_pose_tests must be at least 1");
        }
        if self.integration_weight == 0 {
            return invalid("integration_weight must be at least 1");
        }
        if self.max_align_energy_for_success <= self.min_align_energy_for_success {
            return invalid("alignment energy window is empty");
        }

        Ok(())
    }
}
