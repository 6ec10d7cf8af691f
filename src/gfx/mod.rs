//! # Graphics Module
//!
//! Everything between a scene description and the graphics device.
//!
//! ## Architecture Overview
//!
//! - **Device** ([`device`]) - the [`GraphicsDevice`](device::GraphicsDevice) seam and an in-memory implementation
//! - **Transforms** ([`transform`]) - Euler transforms and the per-mode matrix stack
//! - **Scene Management** ([`scene`]) - objects with upward-only parent keys
//! - **Resources** ([`resources`]) - shader programs, materials and textures
//! - **Geometry** ([`geometry`]) - indexed vertex buffers and shape generators
//! - **Rendering** ([`rendering`]) - the [`Renderer`] draw path
//!
//! ## Usage
//!
//! ```
//! use std::rc::Rc;
//! use tartan::gfx::device::{HeadlessDevice, PrimitiveTopology};
//! use tartan::gfx::geometry::generate_rectangle_surface;
//! use tartan::gfx::{Renderer, RendererConfig};
//!
//! let mut renderer = Renderer::new(Rc::new(HeadlessDevice::new()), RendererConfig::default());
//! let material = renderer.create_standard_material();
//! let surface = renderer.create_geometry_from_data(
//!     PrimitiveTopology::Triangles,
//!     &generate_rectangle_surface(1.0, 1.0, 5, 5),
//! );
//!
//! renderer.prepare_for_rendering();
//! renderer.prepare_to_render_frame();
//! renderer.set_material_current(Some(material));
//! renderer.set_geometry_current(Some(surface));
//! renderer.render_current_geometry().unwrap();
//! assert_eq!(renderer.finish_frame_rendering().draw_calls, 1);
//! ```

pub mod device;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use rendering::{FrameStats, Renderer, RendererConfig};
