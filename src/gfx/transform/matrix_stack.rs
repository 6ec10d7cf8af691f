//! Model / view / projection matrix stacks.
//!
//! Each [`MatrixMode`] owns an independent stack whose bottom entry is an
//! identity sentinel. Stack operations act on the stack selected with
//! [`MatrixStack::set_mode`]; composition right-multiplies the top matrix, so
//! chaining `translate`, `rotate`, `scale` yields `T * R * S` in object-local
//! order.

use cgmath::{Matrix4, SquareMatrix, Vector3};

use super::{orthographic, perspective, rotation_matrix, scale_matrix, translation_matrix};

/// Which of the three stacks stack operations act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatrixMode {
    #[default]
    Model,
    View,
    Projection,
}

impl MatrixMode {
    pub const ALL: [MatrixMode; 3] = [MatrixMode::Model, MatrixMode::View, MatrixMode::Projection];

    fn index(self) -> usize {
        match self {
            MatrixMode::Model => 0,
            MatrixMode::View => 1,
            MatrixMode::Projection => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatrixStack {
    mode: MatrixMode,
    stacks: [Vec<Matrix4<f32>>; 3],
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixStack {
    /// Three stacks, each holding only its identity sentinel, with
    /// [`MatrixMode::Model`] active.
    pub fn new() -> Self {
        Self {
            mode: MatrixMode::Model,
            stacks: [
                vec![Matrix4::identity()],
                vec![Matrix4::identity()],
                vec![Matrix4::identity()],
            ],
        }
    }

    pub fn set_mode(&mut self, mode: MatrixMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> MatrixMode {
        self.mode
    }

    fn top_mut(&mut self) -> &mut Matrix4<f32> {
        self.stacks[self.mode.index()]
            .last_mut()
            .expect("matrix stacks always hold their sentinel")
    }

    /// Replaces the active top matrix with the identity.
    pub fn load_identity(&mut self) {
        *self.top_mut() = Matrix4::identity();
    }

    /// Replaces the active top matrix.
    pub fn load_matrix(&mut self, matrix: Matrix4<f32>) {
        *self.top_mut() = matrix;
    }

    /// `top = top * matrix`
    pub fn multiply_matrix(&mut self, matrix: Matrix4<f32>) {
        let top = self.top_mut();
        *top = *top * matrix;
    }

    pub fn translate(&mut self, translation: Vector3<f32>) {
        self.multiply_matrix(translation_matrix(translation));
    }

    /// Composes an Euler rotation (radians), see [`rotation_matrix`].
    pub fn rotate(&mut self, euler: Vector3<f32>) {
        self.multiply_matrix(rotation_matrix(euler));
    }

    pub fn scale(&mut self, scale: Vector3<f32>) {
        self.multiply_matrix(scale_matrix(scale));
    }

    /// Loads a perspective projection into the active top matrix.
    pub fn load_perspective(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.load_matrix(perspective(fov_y, aspect, near, far));
    }

    pub fn load_orthographic(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) {
        self.load_matrix(orthographic(left, right, bottom, top, near, far));
    }

    /// Duplicates the active top matrix.
    pub fn push(&mut self) {
        let stack = &mut self.stacks[self.mode.index()];
        let top = stack[stack.len() - 1];
        stack.push(top);
    }

    /// Discards the active top matrix.
    ///
    /// # Panics
    ///
    /// Panics when the active stack holds only its sentinel, i.e. the call
    /// has no matching [`push`](Self::push).
    pub fn pop(&mut self) {
        let mode = self.mode;
        let stack = &mut self.stacks[mode.index()];
        if stack.len() == 1 {
            panic!("pop on the {:?} matrix stack without a matching push", mode);
        }
        stack.pop();
    }

    /// Top matrix of `mode`.
    pub fn current(&self, mode: MatrixMode) -> Matrix4<f32> {
        let stack = &self.stacks[mode.index()];
        stack[stack.len() - 1]
    }

    /// Number of matrices on `mode`'s stack, sentinel included.
    pub fn depth(&self, mode: MatrixMode) -> usize {
        self.stacks[mode.index()].len()
    }

    /// `projection * view * model`, computed from the current tops.
    pub fn model_view_projection(&self) -> Matrix4<f32> {
        self.current(MatrixMode::Projection)
            * self.current(MatrixMode::View)
            * self.current(MatrixMode::Model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::transform::assert_matrix_near;
    use cgmath::Vector4;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_vector(rng: &mut StdRng) -> Vector3<f32> {
        Vector3::new(
            rng.random_range(-3.0..3.0),
            rng.random_range(-3.0..3.0),
            rng.random_range(-3.0..3.0),
        )
    }

    fn random_op(stack: &mut MatrixStack, rng: &mut StdRng) {
        match rng.random_range(0..4) {
            0 => stack.translate(random_vector(rng)),
            1 => stack.rotate(random_vector(rng)),
            2 => stack.scale(random_vector(rng)),
            _ => stack.load_identity(),
        }
    }

    #[test]
    fn test_new_stacks_hold_identity() {
        let stack = MatrixStack::new();
        for mode in MatrixMode::ALL {
            assert_eq!(stack.current(mode), Matrix4::identity());
            assert_eq!(stack.depth(mode), 1);
        }
        assert_eq!(stack.mode(), MatrixMode::Model);
    }

    #[test]
    fn test_chained_calls_compose_in_local_order() {
        let mut stack = MatrixStack::new();
        let t = Vector3::new(1.0, 2.0, 3.0);
        let r = Vector3::new(0.3, -0.2, 0.9);
        let s = Vector3::new(2.0, 0.5, 1.5);
        stack.translate(t);
        stack.rotate(r);
        stack.scale(s);

        let expected = translation_matrix(t) * rotation_matrix(r) * scale_matrix(s);
        assert_matrix_near(stack.current(MatrixMode::Model), expected);
    }

    #[test]
    fn test_modes_are_independent() {
        let mut stack = MatrixStack::new();
        stack.set_mode(MatrixMode::View);
        stack.translate(Vector3::new(0.0, 0.0, -5.0));
        stack.push();

        assert_eq!(stack.current(MatrixMode::Model), Matrix4::identity());
        assert_eq!(stack.current(MatrixMode::Projection), Matrix4::identity());
        assert_eq!(stack.depth(MatrixMode::View), 2);
        assert_eq!(stack.depth(MatrixMode::Model), 1);
    }

    #[test]
    fn test_push_copies_top() {
        let mut stack = MatrixStack::new();
        stack.translate(Vector3::new(4.0, 0.0, 0.0));
        let before = stack.current(MatrixMode::Model);

        stack.push();
        assert_eq!(stack.current(MatrixMode::Model), before);
        stack.scale(Vector3::new(3.0, 3.0, 3.0));
        assert_ne!(stack.current(MatrixMode::Model), before);
    }

    #[test]
    fn test_balanced_push_pop_restores_top() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..200 {
            let mut stack = MatrixStack::new();
            let mode = MatrixMode::ALL[rng.random_range(0..3)];
            stack.set_mode(mode);
            for _ in 0..rng.random_range(0..4) {
                random_op(&mut stack, &mut rng);
            }

            let before = stack.current(mode);
            let depth = stack.depth(mode);
            stack.push();
            for _ in 0..rng.random_range(0..8) {
                if rng.random_range(0..5) == 0 {
                    stack.push();
                    random_op(&mut stack, &mut rng);
                    stack.pop();
                } else {
                    random_op(&mut stack, &mut rng);
                }
            }
            stack.pop();

            assert_eq!(stack.current(mode), before);
            assert_eq!(stack.depth(mode), depth);
        }
    }

    #[test]
    #[should_panic(expected = "without a matching push")]
    fn test_pop_on_sentinel_panics() {
        let mut stack = MatrixStack::new();
        stack.set_mode(MatrixMode::Projection);
        stack.pop();
    }

    #[test]
    fn test_model_view_projection_order() {
        let mut stack = MatrixStack::new();
        stack.set_mode(MatrixMode::Projection);
        stack.load_perspective(1.13, 1.0, 0.1, 100.0);
        stack.set_mode(MatrixMode::View);
        stack.translate(Vector3::new(0.0, -1.0, -6.0));
        stack.set_mode(MatrixMode::Model);
        stack.rotate(Vector3::new(0.0, 0.7, 0.0));

        let expected = stack.current(MatrixMode::Projection)
            * stack.current(MatrixMode::View)
            * stack.current(MatrixMode::Model);
        assert_matrix_near(stack.model_view_projection(), expected);

        // Recomputed after every mutation.
        stack.scale(Vector3::new(2.0, 2.0, 2.0));
        let p = stack.model_view_projection() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let q = expected * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!((p.w - q.w).abs() < 1e-5);
        assert_ne!(stack.model_view_projection(), expected);
    }

    #[test]
    fn test_current_does_not_mutate() {
        let mut stack = MatrixStack::new();
        stack.translate(Vector3::new(1.0, 0.0, 0.0));
        let a = stack.current(MatrixMode::Model);
        let b = stack.current(MatrixMode::Model);
        assert_eq!(a, b);
        assert_eq!(stack.depth(MatrixMode::Model), 1);
    }
}
