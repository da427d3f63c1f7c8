//! 4x4 rigid transforms for camera pose tracking.

use std::f32::consts::PI;
use std::ops::Mul;

use glam::{Mat4, Vec3};

/// A 4x4 world-to-camera (or world-to-volume) transform.
///
/// Thin wrapper over [`glam::Mat4`] adding the pose bookkeeping the tracker
/// needs: Euler angle and translation extraction, and the frame-to-frame
/// motion plausibility check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(pub Mat4);

impl Transform {
    pub const IDENTITY: Self = Self(Mat4::IDENTITY);

    pub fn from_mat4(mat: Mat4) -> Self {
        Self(mat)
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self(Mat4::from_translation(translation))
    }

    /// The translation component.
    pub fn translation(&self) -> Vec3 {
        self.0.w_axis.truncate()
    }

    /// Euler angles (rotation about x, y, z) extracted from the rotation
    /// part of the transform.
    pub fn euler_angles(&self) -> Vec3 {
        let m = &self.0;
        let phi = m.y_axis.z.atan2(m.z_axis.z);
        let theta = (-m.x_axis.z).asin();
        let psi = m.x_axis.y.atan2(m.x_axis.x);
        Vec3::new(phi, theta, psi)
    }

    /// This transform with `delta` added to its translation.
    pub fn translated(&self, delta: Vec3) -> Self {
        let mut mat = self.0;
        mat.w_axis += delta.extend(0.0);
        Self(mat)
    }

    /// Test whether the camera moved a plausible amount between two
    /// successive poses. Rotation (in degrees) and translation (in meters)
    /// are checked independently on each of the three axes; exceeding any
    /// single axis fails the whole check. Angle pairs straddling the +/-PI
    /// wrap are unwrapped by 2*PI before differencing.
    ///
    /// Returns true when the motion is within limits. Note that if the
    /// processing frame rate drops, frames get skipped and the per-frame
    /// motion grows, so these limits may need widening on slow machines.
    pub fn within_motion_limits(
        initial: &Transform,
        updated: &Transform,
        max_translation: f32,
        max_rotation_degrees: f32,
    ) -> bool {
        let max_rotation = max_rotation_degrees.to_radians();

        let mut euler_initial = initial.euler_angles().to_array();
        let mut euler_updated = updated.euler_angles().to_array();
        let translation_initial = initial.translation().to_array();
        let translation_updated = updated.translation().to_array();

        for i in 0..3 {
            // Handle when one angle is near PI and the other near -PI.
            if euler_initial[i] >= PI - max_rotation && euler_updated[i] < max_rotation - PI {
                euler_initial[i] -= 2.0 * PI;
            } else if euler_updated[i] >= PI - max_rotation && euler_initial[i] < max_rotation - PI {
                euler_updated[i] -= 2.0 * PI;
            }

            if (euler_initial[i] - euler_updated[i]).abs() > max_rotation {
                return false;
            }

            if (translation_initial[i] - translation_updated[i]).abs() > max_translation {
                return false;
            }
        }

        true
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}
