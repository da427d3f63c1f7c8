//! Image and point-cloud buffer types used by the pipeline kernels.
//!
//! These are CPU-side working buffers, allocated once per session and
//! refilled every frame by the resampling kernels and the reconstruction
//! engine.

use glam::Vec3;

/// A depth image in meters. `0.0` marks an invalid pixel (clipped or never
/// observed).
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFloatFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<f32>,
}

impl DepthFloatFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// A per-pixel point cloud with normals, as produced by depth back-projection
/// or by raycasting the volume. A zero normal marks an invalid pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudFrame {
    pub width: u32,
    pub height: u32,
    pub points: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

impl PointCloudFrame {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            points: vec![Vec3::ZERO; len],
            normals: vec![Vec3::ZERO; len],
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A packed BGRA color image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl ColorBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// The pixel data viewed as raw bytes, for display and recording sinks.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffers_allocate_zeroed() {
        let depth = DepthFloatFrame::new(4, 2);
        assert_eq!(depth.len(), 8);
        assert!(depth.pixels.iter().all(|&p| p == 0.0));

        let cloud = PointCloudFrame::new(4, 2);
        assert_eq!(cloud.len(), 8);
        assert_eq!(cloud.normals.len(), 8);

        let color = ColorBuffer::new(4, 2);
        assert_eq!(color.len(), 8);
        assert_eq!(color.as_bytes().len(), 32);
    }

    #[test]
    fn test_color_buffer_byte_view_is_little_endian_pixels() {
        let mut color = ColorBuffer::new(1, 1);
        color.pixels[0] = 0xAABBCCDD;
        assert_eq!(color.as_bytes(), &[0xDD, 0xCC, 0xBB, 0xAA]);
    }
}
