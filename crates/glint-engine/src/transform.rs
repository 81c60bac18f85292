//! 4x4 transform matrices for model-view and projection.

use glam::{Mat4, Vec3};

/// Column-major 4x4 `f32` matrix with value semantics.
///
/// Operations multiply onto the right of the accumulated matrix, so
/// `Transform::identity().translate(t).rotate(a, axis)` moves a vertex by the
/// rotation first and the translation second.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform(Mat4);

impl Transform {
    pub const IDENTITY: Self = Self(Mat4::IDENTITY);

    #[inline]
    pub const fn identity() -> Self {
        Self::IDENTITY
    }

    #[inline]
    pub fn from_translation(v: Vec3) -> Self {
        Self(Mat4::from_translation(v))
    }

    #[inline]
    pub const fn from_mat4(m: Mat4) -> Self {
        Self(m)
    }

    /// Right-handed perspective projection with a `[0, 1]` depth range.
    #[inline]
    pub fn perspective(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self(Mat4::perspective_rh(fov_y_radians, aspect, near, far))
    }

    #[inline]
    pub fn translate(self, v: Vec3) -> Self {
        Self(self.0 * Mat4::from_translation(v))
    }

    /// Rotates by `angle_radians` around `axis`.
    ///
    /// The axis is normalized; a zero-length axis leaves the transform unchanged.
    #[inline]
    pub fn rotate(self, angle_radians: f32, axis: Vec3) -> Self {
        match axis.try_normalize() {
            Some(axis) => Self(self.0 * Mat4::from_axis_angle(axis, angle_radians)),
            None => self,
        }
    }

    /// Returns `self * other`.
    #[inline]
    pub fn then(self, other: Transform) -> Self {
        Self(self.0 * other.0)
    }

    #[inline]
    pub fn transform_point(self, p: Vec3) -> Vec3 {
        self.0.transform_point3(p)
    }

    #[inline]
    pub fn matrix(self) -> Mat4 {
        self.0
    }

    /// Column-major array, the layout uniforms are uploaded in.
    #[inline]
    pub fn to_cols_array(self) -> [f32; 16] {
        self.0.to_cols_array()
    }

    #[inline]
    pub fn abs_diff_eq(self, other: Transform, max_abs_diff: f32) -> bool {
        self.0.abs_diff_eq(other.0, max_abs_diff)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Mat4> for Transform {
    fn from(m: Mat4) -> Self {
        Self(m)
    }
}
