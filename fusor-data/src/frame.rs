//! Synchronized depth + color camera frames.

use thiserror::Error;
use tracing::trace;

/// Errors raised while updating a frame from a capture source.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame geometry mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    GeometryMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("frame buffer size mismatch: expected {expected} elements, got {actual}")]
    BufferSize { expected: usize, actual: usize },
}

/// Image dimensions of the color and depth streams of one session.
///
/// Advertised once when a source opens; a source must keep its geometry
/// constant for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub color_width: u32,
    pub color_height: u32,
    pub depth_width: u32,
    pub depth_height: u32,
}

impl FrameGeometry {
    pub fn new(color_width: u32, color_height: u32, depth_width: u32, depth_height: u32) -> Self {
        Self {
            color_width,
            color_height,
            depth_width,
            depth_height,
        }
    }

    /// Length of the packed BGRA color buffer in bytes.
    pub fn color_len(&self) -> usize {
        self.color_width as usize * self.color_height as usize * 4
    }

    /// Length of the depth buffer in pixels.
    pub fn depth_len(&self) -> usize {
        self.depth_width as usize * self.depth_height as usize
    }
}

/// One synchronized depth + color frame.
///
/// A source holds exactly one current frame and mutates it in place on each
/// capture tick; no history is retained. Updates that disagree with the
/// session geometry are rejected and leave the prior buffers untouched.
#[derive(Debug, Clone)]
pub struct Frame {
    geometry: FrameGeometry,
    color_data: Vec<u8>,
    depth_data: Vec<u16>,
    timestamp_ms: u32,
}

impl Frame {
    /// Allocate a zeroed frame for the given geometry.
    pub fn new(geometry: FrameGeometry) -> Self {
        Self {
            geometry,
            color_data: vec![0; geometry.color_len()],
            depth_data: vec![0; geometry.depth_len()],
            timestamp_ms: 0,
        }
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Packed BGRA color bytes, `4 * color_width * color_height` long.
    pub fn color_data(&self) -> &[u8] {
        &self.color_data
    }

    /// Raw depth in millimeters, `depth_width * depth_height` long.
    pub fn depth_data(&self) -> &[u16] {
        &self.depth_data
    }

    pub fn timestamp_ms(&self) -> u32 {
        self.timestamp_ms
    }

    pub fn set_timestamp_ms(&mut self, timestamp_ms: u32) {
        self.timestamp_ms = timestamp_ms;
    }

    /// Replace the color buffer with data reported at `width` x `height`.
    /// A geometry or size mismatch rejects the update.
    pub fn update_color(&mut self, width: u32, height: u32, data: &[u8]) -> Result<(), FrameError> {
        if width != self.geometry.color_width || height != self.geometry.color_height {
            return Err(FrameError::GeometryMismatch {
                expected_width: self.geometry.color_width,
                expected_height: self.geometry.color_height,
                width,
                height,
            });
        }
        if data.len() != self.color_data.len() {
            return Err(FrameError::BufferSize {
                expected: self.color_data.len(),
                actual: data.len(),
            });
        }
        self.color_data.copy_from_slice(data);
        trace!("Color frame updated");
        Ok(())
    }

    /// Replace the depth buffer with data reported at `width` x `height`.
    /// A geometry or size mismatch rejects the update.
    pub fn update_depth(&mut self, width: u32, height: u32, data: &[u16]) -> Result<(), FrameError> {
        if width != self.geometry.depth_width || height != self.geometry.depth_height {
            return Err(FrameError::GeometryMismatch {
                expected_width: self.geometry.depth_width,
                expected_height: self.geometry.depth_height,
                width,
                height,
            });
        }
        if data.len() != self.depth_data.len() {
            return Err(FrameError::BufferSize {
                expected: self.depth_data.len(),
                actual: data.len(),
            });
        }
        self.depth_data.copy_from_slice(data);
        trace!("Depth frame updated");
        Ok(())
    }

    /// The depth image mapped to 8-bit gray for display, using the given
    /// reliable range in millimeters.
    pub fn depth_to_gray(&self, min_mm: u16, max_mm: u16) -> Vec<u8> {
        self.depth_data
            .iter()
            .map(|&depth| map_depth_to_byte(depth, min_mm, max_mm))
            .collect()
    }
}

/// Map a millimeter depth value into an 8-bit display intensity: 255 at or
/// beyond `max`, 0 at or below `min`, linear in between.
pub fn map_depth_to_byte(depth: u16, min: u16, max: u16) -> u8 {
    if depth >= max {
        return u8::MAX;
    }

    if depth <= min {
        return u8::MIN;
    }

    let t = f32::from(depth - min) / f32::from(max - min);
    (t * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> FrameGeometry {
        FrameGeometry::new(8, 6, 4, 4)
    }

    #[test]
    fn test_map_depth_to_byte_bounds() {
        assert_eq!(map_depth_to_byte(8000, 500, 4500), 255);
        assert_eq!(map_depth_to_byte(4500, 500, 4500), 255);
        assert_eq!(map_depth_to_byte(500, 500, 4500), 0);
        assert_eq!(map_depth_to_byte(0, 500, 4500), 0);
    }

    #[test]
    fn test_map_depth_to_byte_monotone() {
        let mut previous = 0;
        for depth in 500..=4500 {
            let value = map_depth_to_byte(depth, 500, 4500);
            assert!(value >= previous, "not monotone at {depth}");
            previous = value;
        }
    }

    #[test]
    fn test_map_depth_to_byte_midpoint() {
        let mid = map_depth_to_byte(2500, 500, 4500);
        assert!((i32::from(mid) - 128).abs() <= 1);
    }

    #[test]
    fn test_update_depth_ok() {
        let mut frame = Frame::new(geometry());
        let data = vec![123u16; 16];
        frame.update_depth(4, 4, &data).unwrap();
        assert_eq!(frame.depth_data()[0], 123);
    }

    #[test]
    fn test_update_depth_geometry_mismatch_leaves_buffer_untouched() {
        let mut frame = Frame::new(geometry());
        frame.update_depth(4, 4, &vec![7u16; 16]).unwrap();

        // One column too wide against the configured geometry.
        let bad = vec![9u16; 20];
        let err = frame.update_depth(5, 4, &bad).unwrap_err();
        assert!(matches!(err, FrameError::GeometryMismatch { width: 5, .. }));
        assert!(frame.depth_data().iter().all(|&d| d == 7));
    }

    #[test]
    fn test_update_color_size_mismatch_rejected() {
        let mut frame = Frame::new(geometry());
        let short = vec![0u8; 10];
        let err = frame.update_color(8, 6, &short).unwrap_err();
        assert!(matches!(err, FrameError::BufferSize { .. }));
    }

    #[test]
    fn test_depth_to_gray_maps_every_pixel() {
        let mut frame = Frame::new(geometry());
        frame.update_depth(4, 4, &vec![4500u16; 16]).unwrap();
        let gray = frame.depth_to_gray(500, 4500);
        assert_eq!(gray.len(), 16);
        assert!(gray.iter().all(|&g| g == 255));
    }
}
