//! # Vertex Data Structures
//!
//! The interleaved vertex record uploaded for every geometry.

use crate::gfx::device::AttributeLayout;

/// A vertex with position, normal, color and texture coordinates.
///
/// # Memory Layout
///
/// Twelve tightly packed `f32`s, `#[repr(C)]` so the record can be cast to
/// bytes for upload:
///
/// | floats | field    |
/// |--------|----------|
/// | 0..3   | position |
/// | 3..6   | normal   |
/// | 6..10  | color    |
/// | 10..12 | uv       |
///
/// # Examples
///
/// ```
/// use tartan::gfx::geometry::Vertex;
///
/// let vertex = Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0; 4], [0.5, 0.5]);
/// assert_eq!(bytemuck::bytes_of(&vertex).len(), Vertex::FLOATS * 4);
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position [x, y, z]
    pub position: [f32; 3],
    /// Normal [nx, ny, nz]
    pub normal: [f32; 3],
    /// Color [r, g, b, a]
    pub color: [f32; 4],
    /// Texture coordinates [s, t]
    pub uv: [f32; 2],
}

/// Shader attribute fed from one field of [`Vertex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: &'static str,
    pub layout: AttributeLayout,
}

impl Vertex {
    /// Floats per vertex record.
    pub const FLOATS: usize = 12;

    pub const POSITION: &'static str = "position";
    pub const NORMAL: &'static str = "normal";
    pub const COLOR: &'static str = "color";
    pub const TEXTURE_COORDINATES: &'static str = "texture_coordinates";

    pub fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 4], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            color,
            uv,
        }
    }

    /// Attribute names and their placement inside the record.
    ///
    /// Attributes are matched to shader inputs by name when a geometry is
    /// bound.
    pub fn attributes() -> [VertexAttribute; 4] {
        let stride = Self::FLOATS as u32;
        let attribute = |name: &'static str, components: u32, offset: u32| VertexAttribute {
            name,
            layout: AttributeLayout {
                components,
                stride,
                offset,
            },
        };
        [
            attribute(Self::POSITION, 3, 0),
            attribute(Self::NORMAL, 3, 3),
            attribute(Self::COLOR, 4, 6),
            attribute(Self::TEXTURE_COORDINATES, 2, 10),
        ]
    }
}
