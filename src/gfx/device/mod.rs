// src/gfx/device/mod.rs
//! # Graphics Device Seam
//!
//! The renderer never talks to a graphics API directly. Everything it needs
//! from the device (compiling shader stages, linking programs, uploading
//! buffers and textures, toggling render state and issuing draws) goes
//! through the [`GraphicsDevice`] trait.
//!
//! Devices are shared between the resources that own device objects
//! (programs, buffers, textures) so each resource can release its handle
//! when it is dropped. Rendering is single threaded, so the shared form is
//! an `Rc<dyn GraphicsDevice>` and implementations use interior mutability.
//!
//! ## Implementations
//!
//! - [`HeadlessDevice`] - an in-memory device that validates shader sources,
//!   tracks every live resource and records each state change. It backs the
//!   demos and the test-suite.

pub mod headless;

use std::fmt;
use std::rc::Rc;

pub use headless::{DeviceCommand, HeadlessDevice};

/// Shared handle to the device owned by the rendering thread.
pub type SharedDevice = Rc<dyn GraphicsDevice>;

/// Pipeline stage a shader source is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Device-side compiled shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Device-side linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Device-side vertex or index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Device-side texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// How the device interprets the bound index list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    Points,
    Lines,
    #[default]
    Triangles,
}

impl PrimitiveTopology {
    /// Number of indices consumed per primitive.
    pub fn indices_per_primitive(self) -> usize {
        match self {
            PrimitiveTopology::Points => 1,
            PrimitiveTopology::Lines => 2,
            PrimitiveTopology::Triangles => 3,
        }
    }
}

/// Device render-state switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    FaceCulling,
    DepthTest,
}

/// A value written to a resolved uniform location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Mat4([[f32; 4]; 4]),
}

/// Where one vertex attribute lives inside an interleaved vertex record.
///
/// All quantities are in `f32` units, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLayout {
    pub components: u32,
    pub stride: u32,
    pub offset: u32,
}

/// Operations the renderer consumes from the underlying graphics device.
///
/// Handles returned by the `create_*`, `compile_*` and `link_*` methods are
/// exclusively owned by the caller, which must hand each one back to the
/// matching `delete_*` method exactly once.
pub trait GraphicsDevice {
    /// Compiles one shader stage. On failure the device keeps nothing and the
    /// error carries the compiler's info log.
    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String>;

    fn delete_shader(&self, shader: ShaderHandle);

    /// Links a vertex and a fragment stage into a program. A failed link
    /// releases the program object it created and returns the linker log.
    /// The stages stay owned by the caller either way.
    fn link_program(
        &self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String>;

    fn delete_program(&self, program: ProgramHandle);

    /// Location of an active vertex attribute, `None` if the program has no
    /// attribute by that name.
    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    /// Location of an active uniform, `None` if the program has no uniform by
    /// that name.
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    fn use_program(&self, program: Option<ProgramHandle>);

    /// Writes a uniform of the program currently in use.
    fn set_uniform(&self, location: u32, value: UniformValue);

    fn create_vertex_buffer(&self, data: &[u8]) -> BufferHandle;

    fn create_index_buffer(&self, indices: &[u32]) -> BufferHandle;

    fn delete_buffer(&self, buffer: BufferHandle);

    fn bind_buffers(&self, vertex: BufferHandle, index: BufferHandle);

    fn bind_vertex_attribute(&self, location: u32, layout: AttributeLayout);

    /// Uploads tightly packed RGBA8 pixels.
    fn create_texture(&self, width: u32, height: u32, rgba: &[u8], mipmaps: bool)
        -> TextureHandle;

    fn bind_texture(&self, texture: Option<TextureHandle>);

    fn delete_texture(&self, texture: TextureHandle);

    fn set_capability(&self, capability: Capability, enabled: bool);

    fn set_line_width(&self, width: f32);

    fn set_point_size(&self, size: f32);

    fn set_clear_color(&self, color: [f32; 4]);

    /// Clears the color and depth attachments.
    fn clear(&self);

    /// Draws `index_count` indices from the bound index buffer. Indices are
    /// not range checked.
    fn draw_indexed(&self, topology: PrimitiveTopology, index_count: u32);

    /// Presents the finished frame.
    fn present(&self);
}
