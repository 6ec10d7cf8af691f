//! # Geometry
//!
//! Indexed vertex buffers tagged with a primitive topology, plus procedural
//! generators for common shapes.
//!
//! ## Usage
//!
//! ```
//! use std::rc::Rc;
//! use tartan::gfx::device::{HeadlessDevice, PrimitiveTopology, SharedDevice};
//! use tartan::gfx::geometry::{generate_rectangle_surface, Geometry};
//!
//! let device: SharedDevice = Rc::new(HeadlessDevice::new());
//! let data = generate_rectangle_surface(1.0, 1.0, 5, 5);
//! let geometry = Geometry::from_data(&device, PrimitiveTopology::Triangles, &data);
//! assert_eq!(geometry.index_count(), 150);
//! ```

pub mod primitives;
pub mod vertex;

pub use primitives::*;
pub use vertex::{Vertex, VertexAttribute};

use crate::gfx::device::{BufferHandle, PrimitiveTopology, SharedDevice};
use crate::gfx::resources::ShaderProgram;

slotmap::new_key_type! {
    /// Key of a geometry owned by the renderer.
    pub struct GeometryId;
}

/// CPU-side vertex and index lists ready for upload
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl GeometryData {
    /// Create a new empty geometry data structure
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Shifts every vertex along Z, e.g. to keep overlaid wireframes off a surface.
    pub fn offset_z(mut self, dz: f32) -> Self {
        for vertex in &mut self.vertices {
            vertex.position[2] += dz;
        }
        self
    }

    /// Paints every vertex with one color.
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        for vertex in &mut self.vertices {
            vertex.color = color;
        }
        self
    }
}

/// Vertex and index buffers living on the device.
///
/// Buffers are uploaded once at creation and released when the geometry is
/// dropped. Indices are not validated against the vertex count.
pub struct Geometry {
    device: SharedDevice,
    topology: PrimitiveTopology,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    vertex_count: u32,
    index_count: u32,
}

impl Geometry {
    pub fn new(
        device: &SharedDevice,
        topology: PrimitiveTopology,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Self {
        let vertex_buffer = device.create_vertex_buffer(bytemuck::cast_slice(vertices));
        let index_buffer = device.create_index_buffer(indices);
        log::debug!(
            "uploaded {:?} geometry: {} vertices, {} indices",
            topology,
            vertices.len(),
            indices.len()
        );

        Self {
            device: device.clone(),
            topology,
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
        }
    }

    pub fn from_data(device: &SharedDevice, topology: PrimitiveTopology, data: &GeometryData) -> Self {
        Self::new(device, topology, &data.vertices, &data.indices)
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Whole primitives described by the index list.
    pub fn primitive_count(&self) -> u32 {
        self.index_count / self.topology.indices_per_primitive() as u32
    }

    /// Binds the buffers and points every vertex attribute the program
    /// actually uses at its slice of the vertex record.
    pub(crate) fn bind(&self, program: &ShaderProgram) {
        self.device.bind_buffers(self.vertex_buffer, self.index_buffer);
        for attribute in Vertex::attributes() {
            if let Some(location) = program.attribute_location(attribute.name).index() {
                self.device.bind_vertex_attribute(location, attribute.layout);
            }
        }
    }
}

impl Drop for Geometry {
    fn drop(&mut self) {
        self.device.delete_buffer(self.vertex_buffer);
        self.device.delete_buffer(self.index_buffer);
    }
}
