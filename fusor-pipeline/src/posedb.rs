//! Contract the pipeline requires from the pose-keyframe database.

use fusor_data::{ColorBuffer, DepthFloatFrame, Transform};

/// Ranked relocalization candidates for one query frame.
#[derive(Debug, Clone)]
pub struct PoseCandidates {
    /// Distance score of the closest stored keyframe, in `[0, 1]`; lower
    /// means more similar.
    pub min_distance: f32,
    /// Candidate poses, best match first.
    pub poses: Vec<Transform>,
}

impl PoseCandidates {
    pub fn count(&self) -> usize {
        self.poses.len()
    }
}

/// A database of (pose, depth, color) keyframes supporting nearest-neighbor
/// pose queries.
///
/// Stored keyframes are owned by the database; the pipeline only proposes
/// insertions and reads matches, and never mutates a stored keyframe.
pub trait PoseKeyframeDatabase {
    /// Number of keyframes currently stored.
    fn stored_count(&self) -> usize;

    /// Query ranked candidates for the given frame. `None` when the
    /// database has nothing to offer.
    fn find_pose(
        &mut self,
        depth: &DepthFloatFrame,
        color: &ColorBuffer,
    ) -> Option<PoseCandidates>;

    /// Insert a keyframe if its minimum distance to everything stored is at
    /// least `accept_threshold`, preventing near-duplicate keyframes.
    /// Returns whether the keyframe was stored.
    fn try_insert(
        &mut self,
        depth: &DepthFloatFrame,
        color: &ColorBuffer,
        pose: &Transform,
        accept_threshold: f32,
    ) -> bool;

    /// Drop every stored keyframe.
    fn reset(&mut self);
}
