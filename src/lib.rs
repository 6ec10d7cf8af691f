// src/lib.rs
//! Tartan
//!
//! A minimal real-time 3D rendering layer: a model/view/projection matrix
//! stack, hierarchical scene objects, shader programs with an explicit
//! lifecycle, materials, indexed geometry and a renderer issuing draw calls
//! against a pluggable graphics device.

pub mod app;
pub mod error;
pub mod gfx;
pub mod logging;
pub mod prelude;

// Re-export main types for convenience
pub use app::{AppConfig, TartanApp};
pub use error::{GfxError, GfxResult};

/// Creates a headless application with default settings
pub fn default() -> TartanApp {
    TartanApp::headless(AppConfig::default())
}
