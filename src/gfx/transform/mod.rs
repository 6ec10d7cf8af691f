// src/gfx/transform/mod.rs
//! # Transforms
//!
//! Local transforms (position, Euler rotation, scale), the elementary matrix
//! builders shared by the scene hierarchy and the matrix stack, and the
//! projection helpers.
//!
//! All matrices are column-major `cgmath::Matrix4<f32>` and act on column
//! vectors, so `A * B` applies `B` first.

pub mod matrix_stack;

pub use matrix_stack::{MatrixMode, MatrixStack};

use cgmath::{Matrix4, Rad, Vector3};

/// Position, rotation and scale of an object relative to its parent.
///
/// `rotation` holds Euler angles in radians around X, Y and Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn new(position: Vector3<f32>, rotation: Vector3<f32>, scale: Vector3<f32>) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Transform with only a translation
    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: Vector3<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vector3::new(scale, scale, scale);
        self
    }

    /// Local matrix, `translate * rotate * scale`.
    pub fn local_matrix(&self) -> Matrix4<f32> {
        translation_matrix(self.position) * rotation_matrix(self.rotation) * scale_matrix(self.scale)
    }
}

pub fn translation_matrix(translation: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_translation(translation)
}

/// Rotation matrix for Euler angles in radians.
///
/// Composed as `Rz * Ry * Rx`: a vector is rotated around X first, then Y,
/// then Z.
pub fn rotation_matrix(euler: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_angle_z(Rad(euler.z))
        * Matrix4::from_angle_y(Rad(euler.y))
        * Matrix4::from_angle_x(Rad(euler.x))
}

pub fn scale_matrix(scale: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
}

/// Right-handed perspective projection, `fov_y` in radians.
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    cgmath::perspective(Rad(fov_y), aspect, near, far)
}

pub fn orthographic(
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    near: f32,
    far: f32,
) -> Matrix4<f32> {
    cgmath::ortho(left, right, bottom, top, near, far)
}

/// Flattens a matrix into the column arrays uploaded as a `mat4` uniform.
pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}

#[cfg(test)]
pub(crate) fn assert_matrix_near(actual: Matrix4<f32>, expected: Matrix4<f32>) {
    for c in 0..4 {
        for r in 0..4 {
            assert!(
                (actual[c][r] - expected[c][r]).abs() < 1e-5,
                "matrices differ at [{}][{}]:\n{:?}\n{:?}",
                c,
                r,
                actual,
                expected
            );
        }
    }
}
