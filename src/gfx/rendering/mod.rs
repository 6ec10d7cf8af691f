// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Binds materials and geometry, composes the model-view-projection matrix
//! and issues draw calls.

pub mod render_engine;

// Re-export main types
pub use render_engine::{FrameStats, Renderer, RendererConfig};
