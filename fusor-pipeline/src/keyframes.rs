//! Keyframe collection during stable tracking.

use fusor_data::Frame;
use tracing::debug;

use crate::buffers::FrameBuffers;
use crate::posedb::PoseKeyframeDatabase;
use crate::preferences::VolumeBuilderPreferences;
use crate::resample;
use crate::tracking::Tracker;

/// Offer the current frame to the keyframe database if tracking has been
/// stable for long enough.
///
/// Keyframes are only collected while the pose is trusted: a sticky failure
/// history or a short success streak skips the frame, and only every
/// `keyframe_process_frame_interval`-th accepted frame is proposed. Returns
/// whether a keyframe was stored.
pub fn maybe_store_keyframe<D>(
    database: &mut D,
    frame: &Frame,
    buffers: &mut FrameBuffers,
    tracker: &Tracker,
    preferences: &VolumeBuilderPreferences,
) -> bool
where
    D: PoseKeyframeDatabase,
{
    let health = tracker.health();
    if health.has_failed_previously() {
        return false;
    }
    if health.consecutive_successes() <= preferences.min_successful_frames_for_keyframes {
        return false;
    }
    if tracker.processed_frames() % u64::from(preferences.keyframe_process_frame_interval) != 0 {
        return false;
    }

    let geometry = frame.geometry();
    resample::resample_color_to_depth(
        frame.color_data(),
        geometry.color_width,
        geometry.color_height,
        &mut buffers.resampled_color,
    );

    let stored = database.try_insert(
        &buffers.depth_float,
        &buffers.resampled_color,
        tracker.pose(),
        preferences.pose_finder_distance_threshold_accept,
    );
    if stored {
        debug!(total = database.stored_count(), "Stored keyframe");
    }
    stored
}
