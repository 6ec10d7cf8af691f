// src/gfx/resources/mod.rs
//! Device resource management
//!
//! Shader programs, materials and textures. Each wrapper exclusively owns its
//! device handle and releases it exactly once, when dropped.

pub mod material;
pub mod shader;
pub mod texture_resource;

// Re-export main types
pub use material::{Material, TexturingMode, DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER};
pub use shader::{Location, ProgramState, ShaderProgram};
pub use texture_resource::{Image, Texture};

slotmap::new_key_type! {
    /// Key of a material owned by the renderer.
    pub struct MaterialId;

    /// Key of a texture owned by the renderer.
    pub struct TextureId;
}
