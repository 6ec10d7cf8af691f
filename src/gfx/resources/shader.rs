//! Shader program lifecycle.
//!
//! A [`ShaderProgram`] owns its vertex and fragment sources, the declared
//! attribute and uniform names, and (once linked) a device program handle.
//!
//! ```text
//!              compile() ok
//! Uncompiled ───────────────▶ Ready
//!     │  ▲                      │
//!     │  └──── cleanup() ───────┘
//!     │  ▲
//!     │  └──── cleanup() ───┐
//!     └─────────────────▶ Dead
//!        compile() fails
//! ```
//!
//! Names are resolved to locations only when a link succeeds. Names the
//! linked program does not use resolve to [`Location::INVALID`].

use std::collections::HashMap;

use crate::error::{GfxError, GfxResult};
use crate::gfx::device::{ProgramHandle, ShaderStage, SharedDevice, UniformValue};

/// Lifecycle state of a [`ShaderProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramState {
    #[default]
    Uncompiled,
    Ready,
    Dead,
}

/// Resolved attribute or uniform location.
///
/// [`Location::INVALID`] marks a name the program does not use, or any
/// lookup made while the program is not `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location(i32);

impl Location {
    pub const INVALID: Location = Location(-1);

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Device location, `None` for [`Location::INVALID`].
    pub fn index(self) -> Option<u32> {
        u32::try_from(self.0).ok()
    }
}

impl From<Option<u32>> for Location {
    fn from(location: Option<u32>) -> Self {
        location
            .and_then(|l| i32::try_from(l).ok())
            .map_or(Location::INVALID, Location)
    }
}

pub struct ShaderProgram {
    device: SharedDevice,
    vertex_source: String,
    fragment_source: String,
    attributes: Vec<String>,
    uniforms: Vec<String>,
    program: Option<ProgramHandle>,
    attribute_locations: HashMap<String, Location>,
    uniform_locations: HashMap<String, Location>,
    state: ProgramState,
}

impl ShaderProgram {
    /// Creates an `Uncompiled` program. Nothing reaches the device until
    /// [`compile`](Self::compile).
    pub fn new(
        device: &SharedDevice,
        vertex_source: impl Into<String>,
        fragment_source: impl Into<String>,
        attributes: &[&str],
        uniforms: &[&str],
    ) -> Self {
        let mut program = Self {
            device: device.clone(),
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            attributes: Vec::new(),
            uniforms: Vec::new(),
            program: None,
            attribute_locations: HashMap::new(),
            uniform_locations: HashMap::new(),
            state: ProgramState::Uncompiled,
        };
        for name in attributes {
            program.declare_attribute(name);
        }
        for name in uniforms {
            program.declare_uniform(name);
        }
        program
    }

    pub fn state(&self) -> ProgramState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ProgramState::Ready
    }

    /// Device program handle, present only while `Ready`.
    pub fn handle(&self) -> Option<ProgramHandle> {
        self.program
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    pub fn attribute_names(&self) -> &[String] {
        &self.attributes
    }

    pub fn uniform_names(&self) -> &[String] {
        &self.uniforms
    }

    /// Adds an attribute name. On a `Ready` program it is resolved at once.
    pub fn declare_attribute(&mut self, name: &str) {
        if self.attributes.iter().any(|a| a == name) {
            return;
        }
        self.attributes.push(name.to_string());
        if let Some(program) = self.program {
            let location = self.device.attribute_location(program, name).into();
            self.attribute_locations.insert(name.to_string(), location);
        }
    }

    /// Adds a uniform name. On a `Ready` program it is resolved at once.
    pub fn declare_uniform(&mut self, name: &str) {
        if self.uniforms.iter().any(|u| u == name) {
            return;
        }
        self.uniforms.push(name.to_string());
        if let Some(program) = self.program {
            let location = self.device.uniform_location(program, name).into();
            self.uniform_locations.insert(name.to_string(), location);
        }
    }

    /// Replaces both sources. They are used by the next successful
    /// [`compile`](Self::compile); a `Ready` program keeps running the old
    /// ones until [`cleanup`](Self::cleanup).
    pub fn set_sources(&mut self, vertex_source: impl Into<String>, fragment_source: impl Into<String>) {
        self.vertex_source = vertex_source.into();
        self.fragment_source = fragment_source.into();
    }

    /// Compiles both stages, links them and resolves every declared name.
    ///
    /// A `Ready` program is left untouched. A `Dead` program is reset first,
    /// as [`cleanup`](Self::cleanup) would. Any failure logs the device
    /// diagnostics, releases every intermediate stage, moves the program to
    /// `Dead` and returns the error; later stages are not attempted.
    pub fn compile(&mut self) -> GfxResult<()> {
        match self.state {
            ProgramState::Ready => {
                log::debug!("compile() on a ready program ignored");
                return Ok(());
            }
            ProgramState::Dead => self.cleanup(),
            ProgramState::Uncompiled => {}
        }

        let vertex = match self
            .device
            .compile_shader(ShaderStage::Vertex, &self.vertex_source)
        {
            Ok(shader) => shader,
            Err(log) => {
                return Err(self.fail(GfxError::ShaderCompile {
                    stage: ShaderStage::Vertex,
                    log,
                }))
            }
        };

        let fragment = match self
            .device
            .compile_shader(ShaderStage::Fragment, &self.fragment_source)
        {
            Ok(shader) => shader,
            Err(log) => {
                self.device.delete_shader(vertex);
                return Err(self.fail(GfxError::ShaderCompile {
                    stage: ShaderStage::Fragment,
                    log,
                }));
            }
        };

        let linked = self.device.link_program(vertex, fragment);
        self.device.delete_shader(vertex);
        self.device.delete_shader(fragment);

        let program = match linked {
            Ok(program) => program,
            Err(log) => return Err(self.fail(GfxError::ShaderLink { log })),
        };

        self.attribute_locations = self
            .attributes
            .iter()
            .map(|name| (name.clone(), self.device.attribute_location(program, name).into()))
            .collect();
        self.uniform_locations = self
            .uniforms
            .iter()
            .map(|name| (name.clone(), self.device.uniform_location(program, name).into()))
            .collect();
        self.program = Some(program);
        self.state = ProgramState::Ready;

        log::debug!(
            "shader program {:?} ready ({} attributes, {} uniforms)",
            program,
            self.attributes.len(),
            self.uniforms.len()
        );
        Ok(())
    }

    fn fail(&mut self, error: GfxError) -> GfxError {
        log::error!("{}", error);
        self.state = ProgramState::Dead;
        error
    }

    /// Makes this the active program. Only a `Ready` program can be bound;
    /// otherwise nothing reaches the device and `false` is returned.
    pub fn use_program(&self) -> bool {
        match self.program {
            Some(program) if self.is_ready() => {
                self.device.use_program(Some(program));
                true
            }
            _ => {
                log::trace!("use_program() skipped, program is {:?}", self.state);
                false
            }
        }
    }

    /// Releases the device program, forgets all resolved locations and
    /// returns to `Uncompiled`.
    pub fn cleanup(&mut self) {
        if let Some(program) = self.program.take() {
            self.device.delete_program(program);
        }
        self.attribute_locations.clear();
        self.uniform_locations.clear();
        self.state = ProgramState::Uncompiled;
    }

    pub fn attribute_location(&self, name: &str) -> Location {
        if !self.is_ready() {
            return Location::INVALID;
        }
        self.attribute_locations
            .get(name)
            .copied()
            .unwrap_or(Location::INVALID)
    }

    pub fn uniform_location(&self, name: &str) -> Location {
        if !self.is_ready() {
            return Location::INVALID;
        }
        self.uniform_locations
            .get(name)
            .copied()
            .unwrap_or(Location::INVALID)
    }

    /// Writes a uniform of this program, which must be the one in use.
    /// Returns `false` when the name does not resolve.
    pub fn set_uniform(&self, name: &str, value: UniformValue) -> bool {
        match self.uniform_location(name).index() {
            Some(location) => {
                self.device.set_uniform(location, value);
                true
            }
            None => false,
        }
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        if let Some(program) = self.program.take() {
            self.device.delete_program(program);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::device::{DeviceCommand, HeadlessDevice};
    use std::rc::Rc;

    const VERTEX: &str = r#"
        attribute vec4 position;
        attribute vec4 color;
        uniform mat4 model_view_projection_matrix;
        varying vec4 fragment_color;
        void main()
        {
            fragment_color = color;
            gl_Position = model_view_projection_matrix * position;
        }
    "#;

    const FRAGMENT: &str = r#"
        uniform bool texture_enabled;
        varying vec4 fragment_color;
        void main()
        {
            gl_FragColor = fragment_color;
        }
    "#;

    const BROKEN_VERTEX: &str = "attribute vec4 position;\nvoid main() {\n    gl_Position = position;\n";

    fn setup() -> (Rc<HeadlessDevice>, SharedDevice) {
        let headless = Rc::new(HeadlessDevice::new());
        let device: SharedDevice = headless.clone();
        (headless, device)
    }

    fn program(device: &SharedDevice, vertex: &str, fragment: &str) -> ShaderProgram {
        ShaderProgram::new(
            device,
            vertex,
            fragment,
            &["position", "color", "normal"],
            &["model_view_projection_matrix", "texture_enabled", "point_size"],
        )
    }

    #[test]
    fn test_compile_resolves_locations() {
        let (headless, device) = setup();
        let mut shader = program(&device, VERTEX, FRAGMENT);
        assert_eq!(shader.state(), ProgramState::Uncompiled);
        assert_eq!(shader.attribute_location("position"), Location::INVALID);

        shader.compile().unwrap();

        assert_eq!(shader.state(), ProgramState::Ready);
        assert!(shader.attribute_location("position").is_valid());
        assert!(shader.attribute_location("color").is_valid());
        assert_eq!(shader.attribute_location("normal"), Location::INVALID);
        assert_eq!(shader.uniform_location("point_size"), Location::INVALID);
        assert_eq!(shader.uniform_location("undeclared"), Location::INVALID);
        assert!(shader.uniform_location("texture_enabled").is_valid());
        assert_eq!(headless.live_programs(), 1);
        assert_eq!(headless.live_shaders(), 0);
    }

    #[test]
    fn test_invalid_vertex_source_is_dead_and_unbindable() {
        let (headless, device) = setup();
        let mut shader = program(&device, BROKEN_VERTEX, FRAGMENT);

        let error = shader.compile().unwrap_err();
        assert!(matches!(
            error,
            GfxError::ShaderCompile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
        assert_eq!(shader.state(), ProgramState::Dead);
        assert_eq!(shader.handle(), None);

        assert!(!shader.use_program());
        assert!(!headless
            .commands()
            .iter()
            .any(|c| matches!(c, DeviceCommand::UseProgram(_))));
        assert_eq!(headless.current_program(), None);
    }

    #[test]
    fn test_fragment_failure_releases_vertex_stage() {
        let (headless, device) = setup();
        let mut shader = program(&device, VERTEX, "void main() {");

        assert!(matches!(
            shader.compile(),
            Err(GfxError::ShaderCompile {
                stage: ShaderStage::Fragment,
                ..
            })
        ));
        assert_eq!(shader.state(), ProgramState::Dead);
        assert_eq!(headless.live_shaders(), 0);
    }

    #[test]
    fn test_link_failure_discards_stages() {
        let (headless, device) = setup();
        let mut shader = program(&device, VERTEX, "void main() { }");

        assert!(matches!(shader.compile(), Err(GfxError::ShaderLink { .. })));
        assert_eq!(shader.state(), ProgramState::Dead);
        assert_eq!(headless.live_shaders(), 0);
        assert_eq!(headless.live_programs(), 0);
    }

    #[test]
    fn test_cleanup_then_compile_resolves_fresh_locations() {
        let (headless, device) = setup();
        let mut shader = program(&device, VERTEX, FRAGMENT);
        shader.compile().unwrap();
        let first = shader.handle().unwrap();
        let position = shader.attribute_location("position");

        shader.cleanup();
        assert_eq!(shader.state(), ProgramState::Uncompiled);
        assert_eq!(shader.attribute_location("position"), Location::INVALID);
        assert!(!headless.is_live_program(first));

        // Same sources: ready again on a new handle.
        shader.compile().unwrap();
        let second = shader.handle().unwrap();
        assert_ne!(first, second);
        assert_eq!(shader.attribute_location("position"), position);

        // Different sources: locations follow the new declarations.
        shader.cleanup();
        let swapped = VERTEX.replace(
            "attribute vec4 position;\n        attribute vec4 color;",
            "attribute vec4 color;\n        attribute vec4 position;",
        );
        shader.set_sources(swapped, FRAGMENT);
        shader.compile().unwrap();
        assert_ne!(shader.attribute_location("position"), position);
        assert_eq!(shader.attribute_location("color"), position);
        assert_eq!(headless.live_programs(), 1);
    }

    #[test]
    fn test_dead_program_recompiles_after_fix() {
        let (_headless, device) = setup();
        let mut shader = program(&device, BROKEN_VERTEX, FRAGMENT);
        assert!(shader.compile().is_err());

        shader.set_sources(VERTEX, FRAGMENT);
        shader.compile().unwrap();
        assert!(shader.is_ready());
        assert!(shader.use_program());
    }

    #[test]
    fn test_compile_on_ready_is_a_no_op() {
        let (headless, device) = setup();
        let mut shader = program(&device, VERTEX, FRAGMENT);
        shader.compile().unwrap();
        let handle = shader.handle();

        shader.compile().unwrap();
        assert_eq!(shader.handle(), handle);
        assert_eq!(headless.live_programs(), 1);
    }

    #[test]
    fn test_drop_releases_handle_at_most_once() {
        let (headless, device) = setup();

        let uncompiled = program(&device, VERTEX, FRAGMENT);
        drop(uncompiled);
        assert_eq!(headless.released_programs(), 0);

        let mut ready = program(&device, VERTEX, FRAGMENT);
        ready.compile().unwrap();
        drop(ready);
        assert_eq!(headless.released_programs(), 1);

        let mut dead = program(&device, BROKEN_VERTEX, FRAGMENT);
        let _ = dead.compile();
        drop(dead);
        assert_eq!(headless.released_programs(), 1);

        let mut cleaned = program(&device, VERTEX, FRAGMENT);
        cleaned.compile().unwrap();
        cleaned.cleanup();
        drop(cleaned);
        assert_eq!(headless.released_programs(), 2);

        assert_eq!(headless.live_programs(), 0);
        assert_eq!(headless.live_shaders(), 0);
        assert_eq!(headless.double_releases(), 0);
    }

    #[test]
    fn test_late_declarations_resolve_on_ready_program() {
        let (_headless, device) = setup();
        let mut shader = ShaderProgram::new(&device, VERTEX, FRAGMENT, &[], &[]);
        shader.compile().unwrap();

        shader.declare_attribute("color");
        shader.declare_uniform("model_view_projection_matrix");
        assert!(shader.attribute_location("color").is_valid());
        assert!(shader.set_uniform(
            "model_view_projection_matrix",
            UniformValue::Mat4([[0.0; 4]; 4])
        ));
        assert!(!shader.set_uniform("texture_enabled", UniformValue::Bool(true)));
    }
}
