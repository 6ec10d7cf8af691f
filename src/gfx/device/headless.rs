//! In-memory graphics device.
//!
//! [`HeadlessDevice`] implements the full [`GraphicsDevice`] contract without
//! a GPU. Shader sources get a lexical check (balanced delimiters, a
//! `void main()` entry point, well-formed interface declarations) and their
//! `attribute`/`in`/`uniform` declarations become the program's active
//! names, located in declaration order. Every state change is appended to a
//! command log and every live object is tracked, so callers can observe
//! exactly what reached the device and whether anything leaked.

use std::cell::RefCell;
use std::collections::HashMap;

use super::{
    AttributeLayout, BufferHandle, Capability, GraphicsDevice, PrimitiveTopology, ProgramHandle,
    ShaderHandle, ShaderStage, TextureHandle, UniformValue,
};

/// One state-changing call observed by the device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    UseProgram(Option<ProgramHandle>),
    SetUniform { location: u32, value: UniformValue },
    SetCapability { capability: Capability, enabled: bool },
    LineWidth(f32),
    PointSize(f32),
    BindBuffers { vertex: BufferHandle, index: BufferHandle },
    VertexAttribute { location: u32, layout: AttributeLayout },
    BindTexture(Option<TextureHandle>),
    ClearColor([f32; 4]),
    Clear,
    Draw { topology: PrimitiveTopology, index_count: u32 },
    Present,
}

#[derive(Debug, Clone)]
struct CompiledStage {
    stage: ShaderStage,
    attributes: Vec<String>,
    uniforms: Vec<String>,
    writes_color: bool,
}

#[derive(Debug, Clone)]
struct LinkedProgram {
    attributes: Vec<String>,
    uniforms: Vec<String>,
}

#[derive(Debug, Default)]
struct DeviceState {
    next_handle: u32,
    shaders: HashMap<u32, CompiledStage>,
    programs: HashMap<u32, LinkedProgram>,
    buffers: HashMap<u32, usize>,
    textures: HashMap<u32, (u32, u32)>,
    commands: Vec<DeviceCommand>,
    current_program: Option<ProgramHandle>,
    released_programs: usize,
    double_releases: usize,
}

impl DeviceState {
    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn release_twice(&mut self, kind: &str, id: u32) {
        self.double_releases += 1;
        log::warn!("{} {} released but not live", kind, id);
    }
}

/// Graphics device that keeps all state in memory.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    state: RefCell<DeviceState>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the command log.
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state.borrow().commands.clone()
    }

    /// Drains the command log.
    pub fn take_commands(&self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.state.borrow_mut().commands)
    }

    /// Number of draw commands in the log.
    pub fn draw_calls(&self) -> usize {
        self.state
            .borrow()
            .commands
            .iter()
            .filter(|c| matches!(c, DeviceCommand::Draw { .. }))
            .count()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn is_live_program(&self, program: ProgramHandle) -> bool {
        self.state.borrow().programs.contains_key(&program.0)
    }

    /// Programs handed back through `delete_program` while live.
    pub fn released_programs(&self) -> usize {
        self.state.borrow().released_programs
    }

    /// Releases of handles that were not live (already deleted or never created).
    pub fn double_releases(&self) -> usize {
        self.state.borrow().double_releases
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.state.borrow().current_program
    }

    fn record(&self, command: DeviceCommand) {
        log::trace!("device: {:?}", command);
        self.state.borrow_mut().commands.push(command);
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String> {
        let compiled = scan_source(stage, source)?;
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.shaders.insert(id, compiled);
        Ok(ShaderHandle(id))
    }

    fn delete_shader(&self, shader: ShaderHandle) {
        let mut state = self.state.borrow_mut();
        if state.shaders.remove(&shader.0).is_none() {
            state.release_twice("shader", shader.0);
        }
    }

    fn link_program(
        &self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();

        let (vs, fs) = match (state.shaders.get(&vertex.0), state.shaders.get(&fragment.0)) {
            (Some(vs), Some(fs)) => (vs.clone(), fs.clone()),
            _ => return Err("ERROR: Linking: unknown shader object attached".to_string()),
        };
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err("ERROR: Linking: attached shaders have mismatched stages".to_string());
        }
        if !vs.attributes.iter().any(|a| a == "position") {
            return Err(
                "ERROR: Linking: vertex stage does not declare the attribute 'position'"
                    .to_string(),
            );
        }
        if !fs.writes_color {
            return Err("ERROR: Linking: fragment stage never writes a final color".to_string());
        }

        let mut uniforms = vs.uniforms;
        for name in fs.uniforms {
            if !uniforms.contains(&name) {
                uniforms.push(name);
            }
        }
        state.programs.insert(
            id,
            LinkedProgram {
                attributes: vs.attributes,
                uniforms,
            },
        );
        Ok(ProgramHandle(id))
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state.borrow_mut();
        if state.programs.remove(&program.0).is_some() {
            state.released_programs += 1;
            if state.current_program == Some(program) {
                state.current_program = None;
            }
        } else {
            state.release_twice("program", program.0);
        }
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let linked = state.programs.get(&program.0)?;
        linked
            .attributes
            .iter()
            .position(|a| a == name)
            .map(|i| i as u32)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let linked = state.programs.get(&program.0)?;
        linked
            .uniforms
            .iter()
            .position(|u| u == name)
            .map(|i| i as u32)
    }

    fn use_program(&self, program: Option<ProgramHandle>) {
        self.state.borrow_mut().current_program = program;
        self.record(DeviceCommand::UseProgram(program));
    }

    fn set_uniform(&self, location: u32, value: UniformValue) {
        self.record(DeviceCommand::SetUniform { location, value });
    }

    fn create_vertex_buffer(&self, data: &[u8]) -> BufferHandle {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.buffers.insert(id, data.len());
        BufferHandle(id)
    }

    fn create_index_buffer(&self, indices: &[u32]) -> BufferHandle {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state
            .buffers
            .insert(id, std::mem::size_of_val(indices));
        BufferHandle(id)
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state.borrow_mut();
        if state.buffers.remove(&buffer.0).is_none() {
            state.release_twice("buffer", buffer.0);
        }
    }

    fn bind_buffers(&self, vertex: BufferHandle, index: BufferHandle) {
        self.record(DeviceCommand::BindBuffers { vertex, index });
    }

    fn bind_vertex_attribute(&self, location: u32, layout: AttributeLayout) {
        self.record(DeviceCommand::VertexAttribute { location, layout });
    }

    fn create_texture(
        &self,
        width: u32,
        height: u32,
        _rgba: &[u8],
        _mipmaps: bool,
    ) -> TextureHandle {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.textures.insert(id, (width, height));
        TextureHandle(id)
    }

    fn bind_texture(&self, texture: Option<TextureHandle>) {
        self.record(DeviceCommand::BindTexture(texture));
    }

    fn delete_texture(&self, texture: TextureHandle) {
        let mut state = self.state.borrow_mut();
        if state.textures.remove(&texture.0).is_none() {
            state.release_twice("texture", texture.0);
        }
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        self.record(DeviceCommand::SetCapability {
            capability,
            enabled,
        });
    }

    fn set_line_width(&self, width: f32) {
        self.record(DeviceCommand::LineWidth(width));
    }

    fn set_point_size(&self, size: f32) {
        self.record(DeviceCommand::PointSize(size));
    }

    fn set_clear_color(&self, color: [f32; 4]) {
        self.record(DeviceCommand::ClearColor(color));
    }

    fn clear(&self) {
        self.record(DeviceCommand::Clear);
    }

    fn draw_indexed(&self, topology: PrimitiveTopology, index_count: u32) {
        self.record(DeviceCommand::Draw {
            topology,
            index_count,
        });
    }

    fn present(&self) {
        self.record(DeviceCommand::Present);
    }
}

/// Checks one stage's source and extracts its interface.
fn scan_source(stage: ShaderStage, source: &str) -> Result<CompiledStage, String> {
    let mut open: Vec<(char, usize)> = Vec::new();
    // Top-level statements with the line each one starts on.
    let mut statements: Vec<(usize, String)> = Vec::new();
    let mut statement = String::new();
    let mut statement_line = 1;
    let mut body = String::new();
    let mut in_comment = false;
    let mut last_line = 1;

    for (number, text) in source.lines().enumerate() {
        let line = number + 1;
        last_line = line;
        if !in_comment && text.trim_start().starts_with('#') {
            continue;
        }

        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if in_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    in_comment = false;
                }
                continue;
            }
            if c == '/' && chars.peek() == Some(&'/') {
                break;
            }
            if c == '/' && chars.peek() == Some(&'*') {
                chars.next();
                in_comment = true;
                continue;
            }

            let depth = open.iter().filter(|(d, _)| *d == '{').count();
            match c {
                '(' | '{' => open.push((c, line)),
                ')' | '}' => {
                    let expected = if c == ')' { '(' } else { '{' };
                    match open.pop() {
                        Some((d, _)) if d == expected => {}
                        _ => return Err(format!("ERROR: 0:{}: syntax error, unexpected '{}'", line, c)),
                    }
                }
                _ => {}
            }

            if depth == 0 {
                if c == ';' {
                    statements.push((statement_line, std::mem::take(&mut statement)));
                } else if c != '{' {
                    if statement.trim().is_empty() && !c.is_whitespace() {
                        statement_line = line;
                    }
                    statement.push(c);
                }
            } else if c == '}' && depth == 1 {
                statements.push((statement_line, std::mem::take(&mut statement)));
            } else {
                body.push(c);
            }
        }
        statement.push('\n');
        body.push('\n');
    }
    if !statement.trim().is_empty() {
        statements.push((statement_line, statement));
    }

    if in_comment {
        return Err(format!("ERROR: 0:{}: unterminated comment", last_line));
    }
    if let Some((d, line)) = open.last() {
        return Err(format!(
            "ERROR: 0:{}: unexpected end of file, '{}' is never closed",
            line, d
        ));
    }

    let mut compiled = CompiledStage {
        stage,
        attributes: Vec::new(),
        uniforms: Vec::new(),
        writes_color: body.contains("gl_FragColor"),
    };
    let mut has_main = false;

    for (line, statement) in &statements {
        let statement = strip_layout(statement.trim());
        if statement.is_empty() {
            continue;
        }
        let syntax_error = || {
            format!(
                "ERROR: 0:{}: syntax error in declaration '{}'",
                line,
                statement.lines().next().unwrap_or_default()
            )
        };

        // `uniform float a, b[2]` declares `a` and `b`.
        let mut declarators = statement.split(',');
        let head: Vec<&str> = declarators
            .next()
            .unwrap_or_default()
            .split_whitespace()
            .collect();
        let Some(&qualifier) = head.first() else {
            return Err(syntax_error());
        };
        if matches!(qualifier, "const" | "precision") {
            continue;
        }
        let is_interface = matches!(qualifier, "attribute" | "uniform" | "in" | "out" | "varying");

        if !is_interface {
            if statement.replace(char::is_whitespace, "").contains("voidmain(") {
                has_main = true;
            }
            continue;
        }
        if statement.contains('(') || head.len() < 3 {
            return Err(syntax_error());
        }

        let mut names = Vec::new();
        for declarator in std::iter::once(head[head.len() - 1]).chain(declarators) {
            let name = declarator
                .split(|c: char| c == '[' || c.is_whitespace())
                .find(|part| !part.is_empty())
                .ok_or_else(syntax_error)?;
            names.push(name.to_string());
        }

        match (stage, qualifier) {
            (_, "uniform") => compiled.uniforms.extend(names),
            (ShaderStage::Vertex, "attribute" | "in") => compiled.attributes.extend(names),
            (ShaderStage::Fragment, "out") if head[1] == "vec4" => compiled.writes_color = true,
            _ => {}
        }
    }

    if !has_main {
        return Err(format!(
            "ERROR: 0:{}: missing entry point 'void main()'",
            last_line
        ));
    }

    Ok(compiled)
}

fn strip_layout(statement: &str) -> &str {
    match statement.strip_prefix("layout") {
        Some(rest) => match rest.find(')') {
            Some(end) => rest[end + 1..].trim_start(),
            None => statement,
        },
        None => statement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
        #version 110
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
        #version 110
        uniform bool texture_enabled;
        varying vec4 fragment_color;
        void main()
        {
            gl_FragColor = fragment_color;
        }
    "#;

    fn link(device: &HeadlessDevice, vertex: &str, fragment: &str) -> Result<ProgramHandle, String> {
        let vs = device.compile_shader(ShaderStage::Vertex, vertex)?;
        let fs = device.compile_shader(ShaderStage::Fragment, fragment)?;
        let result = device.link_program(vs, fs);
        device.delete_shader(vs);
        device.delete_shader(fs);
        result
    }

    #[test]
    fn test_valid_program_links() {
        let device = HeadlessDevice::new();
        let program = link(&device, VERTEX, FRAGMENT).unwrap();

        assert_eq!(device.live_programs(), 1);
        assert_eq!(device.live_shaders(), 0);
        assert_eq!(device.attribute_location(program, "position"), Some(0));
        assert_eq!(device.attribute_location(program, "color"), Some(1));
        assert_eq!(device.attribute_location(program, "normal"), None);
        assert_eq!(
            device.uniform_location(program, "model_view_projection_matrix"),
            Some(0)
        );
        assert_eq!(device.uniform_location(program, "texture_enabled"), Some(1));
    }

    #[test]
    fn test_unbalanced_source_fails_with_line() {
        let device = HeadlessDevice::new();
        let source = "attribute vec4 position;\nvoid main()\n{\n    gl_Position = position;\n";
        let log = device
            .compile_shader(ShaderStage::Vertex, source)
            .unwrap_err();

        assert!(log.starts_with("ERROR: 0:3:"), "{}", log);
        assert_eq!(device.live_shaders(), 0);
    }

    #[test]
    fn test_stray_closing_brace_fails() {
        let device = HeadlessDevice::new();
        let log = device
            .compile_shader(ShaderStage::Fragment, "void main() { } }")
            .unwrap_err();
        assert!(log.contains("unexpected '}'"));
    }

    #[test]
    fn test_missing_main_fails() {
        let device = HeadlessDevice::new();
        let log = device
            .compile_shader(ShaderStage::Vertex, "attribute vec4 position;")
            .unwrap_err();
        assert!(log.contains("void main()"));
    }

    #[test]
    fn test_unterminated_declaration_fails() {
        let device = HeadlessDevice::new();
        let source = "uniform mat4 matrix\nvoid main() { gl_FragColor = vec4(1.0); }";
        assert!(device
            .compile_shader(ShaderStage::Fragment, source)
            .is_err());
    }

    #[test]
    fn test_declaration_error_reports_its_own_line() {
        let device = HeadlessDevice::new();
        let source = "attribute vec4 position;\nuniform mat4\nvoid main()\n{\n    gl_Position = position;\n}\n";
        let log = device
            .compile_shader(ShaderStage::Vertex, source)
            .unwrap_err();

        assert!(log.starts_with("ERROR: 0:2:"), "{}", log);
    }

    #[test]
    fn test_every_name_in_a_declaration_is_active() {
        let device = HeadlessDevice::new();
        let vertex = "attribute vec4 position, color;\nuniform float a, b[2];\nvoid main() { gl_Position = position * a; }";
        let program = link(&device, vertex, FRAGMENT).unwrap();

        assert_eq!(device.attribute_location(program, "position"), Some(0));
        assert_eq!(device.attribute_location(program, "color"), Some(1));
        assert_eq!(device.uniform_location(program, "a"), Some(0));
        assert_eq!(device.uniform_location(program, "b"), Some(1));
        assert_eq!(device.uniform_location(program, "texture_enabled"), Some(2));
    }

    #[test]
    fn test_comments_are_ignored() {
        let device = HeadlessDevice::new();
        let source = "// void main() {\n/* } */ void main() { gl_FragColor = vec4(1.0); }";
        assert!(device.compile_shader(ShaderStage::Fragment, source).is_ok());
    }

    #[test]
    fn test_link_requires_position_attribute() {
        let device = HeadlessDevice::new();
        let vertex = "attribute vec4 vertex;\nvoid main() { gl_Position = vertex; }";
        let log = link(&device, vertex, FRAGMENT).unwrap_err();

        assert!(log.contains("'position'"));
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn test_link_requires_color_output() {
        let device = HeadlessDevice::new();
        let fragment = "void main() { }";
        assert!(link(&device, VERTEX, fragment).is_err());

        let modern = "layout(location = 0) out vec4 final_color;\nvoid main() { final_color = vec4(1.0); }";
        assert!(link(&device, VERTEX, modern).is_ok());
    }

    #[test]
    fn test_release_tracking() {
        let device = HeadlessDevice::new();
        let program = link(&device, VERTEX, FRAGMENT).unwrap();
        device.use_program(Some(program));

        device.delete_program(program);
        assert_eq!(device.released_programs(), 1);
        assert_eq!(device.current_program(), None);
        assert_eq!(device.double_releases(), 0);

        device.delete_program(program);
        assert_eq!(device.released_programs(), 1);
        assert_eq!(device.double_releases(), 1);
    }

    #[test]
    fn test_commands_are_recorded_in_order() {
        let device = HeadlessDevice::new();
        device.clear();
        device.draw_indexed(PrimitiveTopology::Lines, 12);
        device.present();

        assert_eq!(
            device.take_commands(),
            vec![
                DeviceCommand::Clear,
                DeviceCommand::Draw {
                    topology: PrimitiveTopology::Lines,
                    index_count: 12
                },
                DeviceCommand::Present,
            ]
        );
        assert!(device.commands().is_empty());
    }
}
