//! # Tartan Prelude
//!
//! Commonly used types in one import.
//!
//! ```
//! use tartan::prelude::*;
//!
//! let mut app = TartanApp::headless(AppConfig::default().with_frame_budget(Some(1)));
//! let material = app.renderer_mut().create_standard_material();
//! let rectangle = app.renderer_mut().create_geometry_from_data(
//!     PrimitiveTopology::Triangles,
//!     &generate_rectangle_surface(1.0, 1.0, 5, 5),
//! );
//!
//! let frames = app
//!     .run(|renderer, _dt| {
//!         renderer.set_material_current(Some(material));
//!         renderer.set_geometry_current(Some(rectangle));
//!         renderer.render_current_geometry()
//!     })
//!     .unwrap();
//! assert_eq!(frames, 1);
//! ```

// Re-export core application types
pub use crate::app::{AppConfig, HeadlessWindow, TartanApp, Window};
#[cfg(not(any(target_family = "wasm", target_os = "ios")))]
pub use crate::app::WinitWindow;
pub use crate::error::{GfxError, GfxResult};
pub use crate::logging::{init_logging, LoggingConfig};

// Re-export graphics and scene types
pub use crate::gfx::device::{GraphicsDevice, HeadlessDevice, PrimitiveTopology, SharedDevice};
pub use crate::gfx::geometry::{
    generate_rectangle_edges, generate_rectangle_points, generate_rectangle_surface,
    generate_sphere, GeometryData, GeometryId, Vertex,
};
pub use crate::gfx::resources::{
    Image, Material, MaterialId, ProgramState, ShaderProgram, TextureId, TexturingMode,
};
pub use crate::gfx::scene::{ObjectId, Scene, SceneObject};
pub use crate::gfx::transform::{MatrixMode, MatrixStack, Transform};
pub use crate::gfx::{FrameStats, Renderer, RendererConfig};

pub use winit::keyboard::KeyCode;
