//! Raycast surface shading for display.

use fusor_data::{ColorBuffer, PointCloudFrame, Transform};
use glam::Vec3;
use rayon::prelude::*;

use crate::buffers::FrameBuffers;
use crate::engine::{EngineError, ReconstructionEngine};

/// Fixed view-space light direction for the shaded surface.
const LIGHT_DIR: Vec3 = Vec3::new(0.3, -0.4, -1.0);

/// Raycast the volume from the current pose and shade it for display.
pub fn render<E>(
    engine: &mut E,
    pose: &Transform,
    buffers: &mut FrameBuffers,
) -> Result<(), EngineError>
where
    E: ReconstructionEngine,
{
    engine.raycast_point_cloud(pose, &mut buffers.raycast_cloud)?;
    shade_point_cloud(&buffers.raycast_cloud, &mut buffers.shaded_surface);
    Ok(())
}

/// Lambertian grayscale shading of a raycast point cloud.
///
/// Pixels whose normal is zero (ray missed the surface) render black with
/// full alpha.
pub fn shade_point_cloud(cloud: &PointCloudFrame, out: &mut ColorBuffer) {
    let width = cloud.width as usize;
    debug_assert_eq!(cloud.len(), out.pixels.len());

    let light = LIGHT_DIR.normalize();

    out.pixels
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = y * width;
            for (x, pixel) in row.iter_mut().enumerate() {
                let normal = cloud.normals[src_row + x];
                let gray = if normal == Vec3::ZERO {
                    0u32
                } else {
                    let intensity = normal.normalize().dot(-light).clamp(0.0, 1.0);
                    (intensity * 255.0) as u32
                };
                *pixel = 0xFF00_0000 | gray << 16 | gray << 8 | gray;
            }
        });
}
