//! Per-frame working buffers.
//!
//! Everything the pipeline writes per frame is allocated here once at
//! construction and reused; the observed point cloud is double-buffered so
//! the previous frame's cloud stays available across the swap.

use fusor_data::{ColorBuffer, DepthFloatFrame, FrameGeometry, PointCloudFrame};

/// All per-frame image and point-cloud buffers of one pipeline session.
#[derive(Debug, Clone)]
pub struct FrameBuffers {
    /// Clipped depth in meters at full depth resolution; what gets
    /// integrated and what keyframe queries use.
    pub depth_float: DepthFloatFrame,
    /// Nearest-neighbor downsampled (and flipped) depth in meters.
    pub downsampled_depth: DepthFloatFrame,
    /// Smoothed downsampled depth, input to point-cloud generation.
    pub smoothed_depth: DepthFloatFrame,
    /// Point cloud of the current frame, downsampled resolution.
    pub observed_cloud: PointCloudFrame,
    /// Last frame's observed cloud, kept across the per-frame swap.
    pub previous_cloud: PointCloudFrame,
    /// Raycast of the volume used as the alignment model, downsampled
    /// resolution.
    pub reference_cloud: PointCloudFrame,
    /// Raycast of the volume at full depth resolution for the visualizer.
    pub raycast_cloud: PointCloudFrame,
    /// Color image resampled into depth geometry for keyframe queries.
    pub resampled_color: ColorBuffer,
    /// Per-pixel alignment residual map, downsampled resolution.
    pub delta_map: ColorBuffer,
    /// The residual map upsampled back to full depth resolution.
    pub delta_full: ColorBuffer,
    /// Shaded raycast surface for display.
    pub shaded_surface: ColorBuffer,
}

impl FrameBuffers {
    pub fn new(geometry: FrameGeometry, downsample_factor: u32) -> Self {
        let width = geometry.depth_width;
        let height = geometry.depth_height;
        let down_width = width / downsample_factor;
        let down_height = height / downsample_factor;

        Self {
            depth_float: DepthFloatFrame::new(width, height),
            downsampled_depth: DepthFloatFrame::new(down_width, down_height),
            smoothed_depth: DepthFloatFrame::new(down_width, down_height),
            observed_cloud: PointCloudFrame::new(down_width, down_height),
            previous_cloud: PointCloudFrame::new(down_width, down_height),
            reference_cloud: PointCloudFrame::new(down_width, down_height),
            raycast_cloud: PointCloudFrame::new(width, height),
            resampled_color: ColorBuffer::new(width, height),
            delta_map: ColorBuffer::new(down_width, down_height),
            delta_full: ColorBuffer::new(width, height),
            shaded_surface: ColorBuffer::new(width, height),
        }
    }

    /// Rotate the observed cloud into the previous slot ahead of filling it
    /// for a new frame.
    pub fn swap_clouds(&mut self) {
        std::mem::swap(&mut self.observed_cloud, &mut self.previous_cloud);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_buffer_resolutions() {
        let geometry = FrameGeometry::new(64, 48, 16, 12);
        let buffers = FrameBuffers::new(geometry, 2);

        assert_eq!(buffers.depth_float.len(), 16 * 12);
        assert_eq!(buffers.downsampled_depth.len(), 8 * 6);
        assert_eq!(buffers.observed_cloud.len(), 8 * 6);
        assert_eq!(buffers.raycast_cloud.len(), 16 * 12);
        assert_eq!(buffers.delta_map.len(), 8 * 6);
        assert_eq!(buffers.delta_full.len(), 16 * 12);
    }

    #[test]
    fn test_swap_clouds_preserves_previous_frame() {
        let geometry = FrameGeometry::new(8, 8, 4, 4);
        let mut buffers = FrameBuffers::new(geometry, 2);

        buffers.observed_cloud.points[0] = Vec3::splat(1.0);
        buffers.swap_clouds();
        assert_eq!(buffers.previous_cloud.points[0], Vec3::splat(1.0));
        assert_eq!(buffers.observed_cloud.points[0], Vec3::ZERO);
    }
}
