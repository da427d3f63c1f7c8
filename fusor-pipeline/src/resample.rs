//! Row-parallel image resampling kernels.
//!
//! Every kernel here is data-parallel over destination rows: each row's
//! output depends only on the source image, so rayon splits the work with
//! no locking.

use fusor_data::{ColorBuffer, DepthFloatFrame};
use rayon::prelude::*;

/// Nearest-neighbor depth downsample with a horizontal flip.
///
/// Depth arrives in raw millimeters and lands in meters. The flip
/// compensates for the mirrored visualization convention, so the
/// downsampled image lines up with the raycast view.
pub fn downsample_depth_flipped(
    depth: &[u16],
    full_width: u32,
    factor: u32,
    out: &mut DepthFloatFrame,
) {
    let down_width = out.width as usize;
    let full_width = full_width as usize;
    let factor = factor as usize;
    debug_assert_eq!(down_width * factor, full_width);
    debug_assert!(out.height as usize * factor * full_width <= depth.len());

    out.pixels
        .par_chunks_mut(down_width)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = y * full_width * factor;
            for x in 0..down_width {
                let value = depth[src_row + x * factor];
                row[down_width - 1 - x] = f32::from(value) * 0.001;
            }
        });
}

/// Nearest-neighbor upsample by pixel replication.
///
/// Each source pixel becomes a `factor x factor` destination block. Only
/// the first row of each block is computed directly; the remaining
/// `factor - 1` rows are bulk copies of it.
pub fn upsample_color_nearest(src: &ColorBuffer, factor: u32, out: &mut ColorBuffer) {
    let factor = factor as usize;
    let src_width = src.width as usize;
    let dst_width = out.width as usize;
    debug_assert_eq!(src_width * factor, dst_width);
    debug_assert_eq!(src.height as usize * factor, out.height as usize);

    out.pixels
        .par_chunks_mut(dst_width * factor)
        .enumerate()
        .for_each(|(src_y, block)| {
            let src_row = src_y * src_width;
            for src_x in 0..src_width {
                let value = src.pixels[src_row + src_x];
                let start = src_x * factor;
                block[start..start + factor].fill(value);
            }

            let (first, rest) = block.split_at_mut(dst_width);
            for row in rest.chunks_exact_mut(dst_width) {
                row.copy_from_slice(first);
            }
        });
}

/// Nearest-neighbor resample of the raw BGRA color image into depth
/// geometry.
///
/// The color image has a wider aspect than the depth image: a centered band
/// of `depth_width * 3 / 4` destination rows samples the source with a
/// uniform ratio, and the margin rows above and below stay zero.
pub fn resample_color_to_depth(
    color: &[u8],
    color_width: u32,
    color_height: u32,
    out: &mut ColorBuffer,
) {
    let depth_width = out.width as usize;
    let depth_height = out.height as usize;
    let color_width = color_width as usize;

    let band_height = depth_width * 3 / 4;
    let margin = depth_height.saturating_sub(band_height) / 2;
    let factor = color_width as f32 / band_height as f32;
    let max_x = color_width - 1;
    let max_y = color_height as usize - 1;

    out.pixels
        .par_chunks_mut(depth_width)
        .enumerate()
        .for_each(|(y, row)| {
            if y < margin || y >= depth_height - margin {
                row.fill(0);
                return;
            }

            let src_y = (((y - margin) as f32 * factor) as usize).min(max_y);
            let src_row = src_y * color_width;
            for (x, dst) in row.iter_mut().enumerate() {
                let src_x = ((x as f32 * factor) as usize).min(max_x);
                let index = (src_row + src_x) * 4;
                *dst = u32::from_le_bytes([
                    color[index],
                    color[index + 1],
                    color[index + 2],
                    color[index + 3],
                ]);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsample_flips_and_scales_to_meters() {
        // 4x2 depth, factor 2 -> 2x1. Values in millimeters.
        let depth: Vec<u16> = vec![
            1000, 1100, 2000, 2100, //
            9000, 9100, 9200, 9300,
        ];
        let mut out = DepthFloatFrame::new(2, 1);
        downsample_depth_flipped(&depth, 4, 2, &mut out);

        // Source columns 0 and 2 are sampled and written flipped.
        assert_eq!(out.pixels, vec![2.0, 1.0]);
    }

    #[test]
    fn test_downsample_factor_one_only_flips() {
        let depth: Vec<u16> = vec![1000, 2000, 3000];
        let mut out = DepthFloatFrame::new(3, 1);
        downsample_depth_flipped(&depth, 3, 1, &mut out);
        assert_eq!(out.pixels, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_upsample_replicates_blocks() {
        let mut src = ColorBuffer::new(2, 1);
        src.pixels.copy_from_slice(&[0xAA, 0xBB]);

        let mut out = ColorBuffer::new(4, 2);
        upsample_color_nearest(&src, 2, &mut out);

        assert_eq!(
            out.pixels,
            vec![
                0xAA, 0xAA, 0xBB, 0xBB, //
                0xAA, 0xAA, 0xBB, 0xBB,
            ]
        );
    }

    #[test]
    fn test_downsample_then_upsample_round_trip() {
        // A uniform-color synthetic frame survives the downsample + flip
        // and comes back as exact factor x factor blocks at the flipped
        // column, for every supported factor.
        for factor in [2u32, 4, 8] {
            let width = 16u32;
            let height = 8u32;
            let down_width = width / factor;
            let down_height = height / factor;

            let depth = vec![1500u16; (width * height) as usize];
            let mut down = DepthFloatFrame::new(down_width, down_height);
            downsample_depth_flipped(&depth, width, factor, &mut down);
            assert!(down.pixels.iter().all(|&d| (d - 1.5).abs() < 1e-6));

            let mut colored = ColorBuffer::new(down_width, down_height);
            for (i, pixel) in colored.pixels.iter_mut().enumerate() {
                *pixel = i as u32;
            }

            let mut up = ColorBuffer::new(width, height);
            upsample_color_nearest(&colored, factor, &mut up);

            for y in 0..height as usize {
                for x in 0..width as usize {
                    let src_y = y / factor as usize;
                    let src_x = x / factor as usize;
                    let expected = colored.pixels[src_y * down_width as usize + src_x];
                    assert_eq!(up.pixels[y * width as usize + x], expected);
                }
            }
        }
    }

    #[test]
    fn test_color_resample_zero_fills_margins() {
        // Depth 8x8: band height = 8 * 3/4 = 6, margin = 1 row each side.
        let color = vec![0xFFu8; 16 * 8 * 4];
        let mut out = ColorBuffer::new(8, 8);
        out.pixels.fill(0xDEAD);
        resample_color_to_depth(&color, 16, 8, &mut out);

        assert!(out.pixels[..8].iter().all(|&p| p == 0));
        assert!(out.pixels[7 * 8..].iter().all(|&p| p == 0));
        assert!(out.pixels[8..7 * 8].iter().all(|&p| p == 0xFFFF_FFFF));
    }

    #[test]
    fn test_color_resample_samples_nearest_source_pixel() {
        // 4x4 color, depth 4x4: band height = 3, margin = 0 (integer
        // division), factor = 4/3.
        let mut color = vec![0u8; 4 * 4 * 4];
        // Pixel (x=3, y=0) = 0x04030201 in little-endian bytes.
        color[3 * 4..4 * 4].copy_from_slice(&[0x01, 0x02, 0x03, 0x04]);

        let mut out = ColorBuffer::new(4, 4);
        resample_color_to_depth(&color, 4, 4, &mut out);

        // Destination x=3 samples source x = (3 * 4/3) as usize = 4 -> clamped to 3.
        assert_eq!(out.pixels[3], 0x0403_0201);
    }
}
