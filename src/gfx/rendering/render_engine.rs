//! Draw path and render context
//!
//! The [`Renderer`] owns every material, geometry and texture in slot-map
//! tables, the [`MatrixStack`], and the current material/geometry/texture
//! bindings read by [`Renderer::render_current_geometry`].

use cgmath::Matrix4;
use slotmap::SlotMap;

use crate::error::{GfxError, GfxResult};
use crate::gfx::device::{PrimitiveTopology, SharedDevice, UniformValue};
use crate::gfx::geometry::{Geometry, GeometryData, GeometryId, Vertex};
use crate::gfx::resources::{Image, Material, MaterialId, Texture, TextureId, TexturingMode};
use crate::gfx::scene::{ObjectId, Scene};
use crate::gfx::transform::{convert_matrix4_to_array, MatrixMode, MatrixStack};

/// Renderer settings
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub clear_color: [f32; 4],
    /// Line width given to newly created materials.
    pub line_width: f32,
    /// Point size given to newly created materials.
    pub point_size: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            line_width: 1.0,
            point_size: 1.0,
        }
    }
}

impl RendererConfig {
    /// Builder pattern: sets the color frames are cleared to
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Builder pattern: sets the default line width
    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }

    /// Builder pattern: sets the default point size
    pub fn with_point_size(mut self, size: f32) -> Self {
        self.point_size = size;
        self
    }
}

/// Per-frame counters, reset by [`Renderer::prepare_to_render_frame`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub draw_calls: usize,
    pub indices_submitted: usize,
    pub skipped_draws: usize,
}

/// The "currently bound" pointers.
#[derive(Debug, Clone, Copy, Default)]
struct RenderBindings {
    material: Option<MaterialId>,
    geometry: Option<GeometryId>,
    texture: Option<TextureId>,
}

pub struct Renderer {
    device: SharedDevice,
    config: RendererConfig,
    matrix_stack: MatrixStack,
    materials: SlotMap<MaterialId, Material>,
    geometries: SlotMap<GeometryId, Geometry>,
    textures: SlotMap<TextureId, Texture>,
    current: RenderBindings,
    stats: FrameStats,
    frames: u64,
}

impl Renderer {
    pub fn new(device: SharedDevice, config: RendererConfig) -> Self {
        Self {
            device,
            config,
            matrix_stack: MatrixStack::new(),
            materials: SlotMap::with_key(),
            geometries: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            current: RenderBindings::default(),
            stats: FrameStats::default(),
            frames: 0,
        }
    }

    pub fn device(&self) -> &SharedDevice {
        &self.device
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn matrix_stack(&self) -> &MatrixStack {
        &self.matrix_stack
    }

    pub fn matrix_stack_mut(&mut self) -> &mut MatrixStack {
        &mut self.matrix_stack
    }

    /// Top of the View stack.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.matrix_stack.current(MatrixMode::View)
    }

    // ---- resources ----

    /// Creates and compiles a material.
    ///
    /// A compile or link failure is logged and the material is kept in the
    /// `Dead` state; draws with it are skipped until it is recompiled.
    /// Creates a material with the configured line width and point size.
    pub fn create_material(
        &mut self,
        vertex_source: impl Into<String>,
        fragment_source: impl Into<String>,
    ) -> MaterialId {
        let material = Material::new(&self.device, vertex_source, fragment_source)
            .with_line_width(self.config.line_width)
            .with_point_size(self.config.point_size);
        self.insert_material(material)
    }

    /// Creates a material running the default shaders.
    pub fn create_standard_material(&mut self) -> MaterialId {
        let material = Material::standard(&self.device)
            .with_line_width(self.config.line_width)
            .with_point_size(self.config.point_size);
        self.insert_material(material)
    }

    /// Stores a material built by the caller as is, compiling it first if
    /// needed.
    pub fn insert_material(&mut self, mut material: Material) -> MaterialId {
        if !material.is_ready() {
            if let Err(error) = material.compile() {
                log::warn!("material '{}' kept unusable: {}", material.name, error);
            }
        }
        self.materials.insert(material)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    /// Releases a material now. Returns `false` for a stale key.
    pub fn destroy_material(&mut self, id: MaterialId) -> bool {
        self.materials.remove(id).is_some()
    }

    pub fn create_geometry(
        &mut self,
        topology: PrimitiveTopology,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> GeometryId {
        let geometry = Geometry::new(&self.device, topology, vertices, indices);
        self.geometries.insert(geometry)
    }

    pub fn create_geometry_from_data(
        &mut self,
        topology: PrimitiveTopology,
        data: &GeometryData,
    ) -> GeometryId {
        self.create_geometry(topology, &data.vertices, &data.indices)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id)
    }

    /// Releases a geometry's buffers now. Returns `false` for a stale key.
    pub fn destroy_geometry(&mut self, id: GeometryId) -> bool {
        self.geometries.remove(id).is_some()
    }

    pub fn create_texture(&mut self, image: &Image, generate_mipmaps: bool) -> TextureId {
        let texture = Texture::new(&self.device, image, generate_mipmaps);
        self.textures.insert(texture)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id)
    }

    pub fn texture_mut(&mut self, id: TextureId) -> Option<&mut Texture> {
        self.textures.get_mut(id)
    }

    /// Releases a texture now. Returns `false` for a stale key.
    pub fn destroy_texture(&mut self, id: TextureId) -> bool {
        self.textures.remove(id).is_some()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    // ---- current bindings ----

    pub fn set_material_current(&mut self, material: Option<MaterialId>) {
        self.current.material = material;
    }

    pub fn set_geometry_current(&mut self, geometry: Option<GeometryId>) {
        self.current.geometry = geometry;
    }

    /// Texture for the next draws. Without one, a material's own texture
    /// is used.
    pub fn set_texture_current(&mut self, texture: Option<TextureId>) {
        self.current.texture = texture;
    }

    pub fn current_material(&self) -> Option<MaterialId> {
        self.current.material
    }

    pub fn current_geometry(&self) -> Option<GeometryId> {
        self.current.geometry
    }

    pub fn current_texture(&self) -> Option<TextureId> {
        self.current.texture
    }

    fn current_material_mut(&mut self) -> GfxResult<&mut Material> {
        let id = self.current.material.ok_or(GfxError::NothingBound("material"))?;
        self.materials
            .get_mut(id)
            .ok_or(GfxError::StaleKey("material"))
    }

    pub fn set_material_line_width(&mut self, width: f32) -> GfxResult<()> {
        self.current_material_mut()?.line_width = width;
        Ok(())
    }

    pub fn set_material_point_size(&mut self, size: f32) -> GfxResult<()> {
        self.current_material_mut()?.point_size = size;
        Ok(())
    }

    pub fn set_material_face_culling_enabled(&mut self, enabled: bool) -> GfxResult<()> {
        self.current_material_mut()?.face_culling = enabled;
        Ok(())
    }

    pub fn set_material_depth_test_enabled(&mut self, enabled: bool) -> GfxResult<()> {
        self.current_material_mut()?.depth_test = enabled;
        Ok(())
    }

    pub fn set_material_texturing_mode(&mut self, mode: TexturingMode) -> GfxResult<()> {
        self.current_material_mut()?.texturing_mode = mode;
        Ok(())
    }

    // ---- frame protocol ----

    /// One-time device setup before the first frame.
    pub fn prepare_for_rendering(&mut self) {
        self.device.set_clear_color(self.config.clear_color);
        log::debug!(
            "renderer ready: {} materials, {} geometries, {} textures",
            self.materials.len(),
            self.geometries.len(),
            self.textures.len()
        );
    }

    /// Clears the frame and resets the per-frame counters.
    pub fn prepare_to_render_frame(&mut self) {
        self.device.clear();
        self.stats = FrameStats {
            frame: self.frames,
            ..FrameStats::default()
        };
    }

    /// Draws the current geometry with the current material, texture and
    /// composed model-view-projection matrix. Exactly one device draw is
    /// issued on success; on failure nothing is drawn and the error is
    /// returned after a warning is logged.
    pub fn render_current_geometry(&mut self) -> GfxResult<()> {
        let result = match (self.current.material, self.current.geometry) {
            (None, _) => Err(GfxError::NothingBound("material")),
            (_, None) => Err(GfxError::NothingBound("geometry")),
            (Some(material), Some(geometry)) => {
                self.submit(material, geometry, self.current.texture)
            }
        };
        self.record(result)
    }

    /// Draws one scene object with its mesh binding and world matrix.
    ///
    /// The world matrix is multiplied onto the Model stack inside a
    /// push/pop pair, so the stack and its mode are unchanged afterwards.
    /// Current bindings are neither used nor modified.
    pub fn render_object(&mut self, scene: &Scene, id: ObjectId) -> GfxResult<()> {
        let result = self.submit_object(scene, id);
        self.record(result)
    }

    /// Draws every renderable object of the scene. Failed draws are logged
    /// and skipped. Returns the number of objects drawn.
    pub fn render_scene(&mut self, scene: &Scene) -> usize {
        let renderable: Vec<ObjectId> = scene
            .iter()
            .filter(|(_, object)| object.is_renderable())
            .map(|(id, _)| id)
            .collect();

        renderable
            .into_iter()
            .filter(|id| self.render_object(scene, *id).is_ok())
            .count()
    }

    /// Presents the frame and returns its counters.
    pub fn finish_frame_rendering(&mut self) -> FrameStats {
        self.device.present();
        self.frames += 1;
        log::trace!("frame finished: {:?}", self.stats);
        self.stats
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.stats
    }

    fn submit_object(&mut self, scene: &Scene, id: ObjectId) -> GfxResult<u32> {
        let object = scene.object(id).ok_or(GfxError::StaleKey("scene object"))?;
        let mesh = object.mesh.ok_or(GfxError::NotRenderable)?;
        let world = scene
            .world_matrix(id)
            .ok_or(GfxError::StaleKey("scene object"))?;

        let mode = self.matrix_stack.mode();
        self.matrix_stack.set_mode(MatrixMode::Model);
        self.matrix_stack.push();
        self.matrix_stack.multiply_matrix(world);

        let result = self.submit(mesh.material, mesh.geometry, None);

        self.matrix_stack.pop();
        self.matrix_stack.set_mode(mode);
        result
    }

    /// Binds material, texture and geometry and issues the draw. Returns the
    /// number of indices drawn.
    fn submit(
        &self,
        material: MaterialId,
        geometry: GeometryId,
        texture: Option<TextureId>,
    ) -> GfxResult<u32> {
        let material = self
            .materials
            .get(material)
            .ok_or(GfxError::StaleKey("material"))?;
        let geometry = self
            .geometries
            .get(geometry)
            .ok_or(GfxError::StaleKey("geometry"))?;
        let texture = match texture.or(material.texture) {
            Some(id) => Some(self.textures.get(id).ok_or(GfxError::StaleKey("texture"))?),
            None => None,
        };

        material.bind(geometry.topology(), texture)?;

        let mvp = self.matrix_stack.model_view_projection();
        material.shader().set_uniform(
            Material::MODEL_VIEW_PROJECTION_MATRIX,
            UniformValue::Mat4(convert_matrix4_to_array(mvp)),
        );

        geometry.bind(material.shader());
        self.device
            .draw_indexed(geometry.topology(), geometry.index_count());
        Ok(geometry.index_count())
    }

    fn record(&mut self, result: GfxResult<u32>) -> GfxResult<()> {
        match result {
            Ok(indices) => {
                self.stats.draw_calls += 1;
                self.stats.indices_submitted += indices as usize;
                Ok(())
            }
            Err(error) => {
                log::warn!("draw skipped: {}", error);
                self.stats.skipped_draws += 1;
                Err(error)
            }
        }
    }
}
