//! Material system
//!
//! A [`Material`] couples one [`ShaderProgram`] with the render state it is
//! drawn with. Materials are stored by the renderer and referenced by
//! [`MaterialId`](super::MaterialId).

use crate::error::{GfxError, GfxResult};
use crate::gfx::device::{Capability, PrimitiveTopology, SharedDevice, UniformValue};
use crate::gfx::geometry::Vertex;
use crate::gfx::transform::convert_matrix4_to_array;

use super::shader::ShaderProgram;
use super::texture_resource::Texture;
use super::TextureId;

/// How a sampled texel is combined with the interpolated vertex color.
///
/// The discriminant is the value written to the `texturing_mode` uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TexturingMode {
    /// `color + texel`
    Addition = 0,
    /// `color - texel`
    Subtraction = 1,
    /// `texel - color`
    ReverseSubtraction = 2,
    /// `color * texel`
    #[default]
    Modulation = 3,
    /// texel over color by texel alpha
    Decaling = 4,
}

impl TexturingMode {
    pub fn as_uniform(self) -> i32 {
        self as i32
    }
}

/// Vertex stage matching the standard attribute and uniform names.
pub const DEFAULT_VERTEX_SHADER: &str = r#"
#version 100

attribute vec4 position;
attribute vec4 color;
attribute vec4 texture_coordinates;

uniform bool texture_enabled;
uniform mat4 texture_transformation_matrix;
uniform float point_size;
uniform mat4 model_view_projection_matrix;

varying vec4 fragment_color;
varying vec2 fragment_texture_coordinates;

void main()
{
    fragment_color = color;
    if (texture_enabled) {
        vec4 transformed = texture_transformation_matrix * texture_coordinates;
        fragment_texture_coordinates = transformed.st;
    }
    gl_PointSize = point_size;
    gl_Position = model_view_projection_matrix * position;
}
"#;

/// Fragment stage implementing every [`TexturingMode`].
pub const DEFAULT_FRAGMENT_SHADER: &str = r#"
#version 100
#ifdef GL_ES
precision mediump float;
#endif

uniform bool texture_enabled;
uniform int texturing_mode;
uniform sampler2D texture_sampler;

varying vec4 fragment_color;
varying vec2 fragment_texture_coordinates;

void main()
{
    vec4 color = fragment_color;
    if (texture_enabled) {
        vec4 texel = texture2D(texture_sampler, fragment_texture_coordinates);
        if (texturing_mode == 0) {
            color = vec4(color.rgb + texel.rgb, color.a * texel.a);
        } else if (texturing_mode == 1) {
            color = vec4(color.rgb - texel.rgb, color.a * texel.a);
        } else if (texturing_mode == 2) {
            color = vec4(texel.rgb - color.rgb, color.a * texel.a);
        } else if (texturing_mode == 3) {
            color = color * texel;
        } else {
            color = vec4(mix(color.rgb, texel.rgb, texel.a), color.a);
        }
    }
    gl_FragColor = color;
}
"#;

/// Shader program plus render state.
pub struct Material {
    pub name: String,
    device: SharedDevice,
    shader: ShaderProgram,
    pub face_culling: bool,
    pub depth_test: bool,
    pub line_width: f32,
    pub point_size: f32,
    pub texturing_mode: TexturingMode,
    /// Texture drawn with this material when the renderer has no current
    /// texture bound.
    pub texture: Option<TextureId>,
}

impl Material {
    pub const MODEL_VIEW_PROJECTION_MATRIX: &'static str = "model_view_projection_matrix";
    pub const TEXTURE_ENABLED: &'static str = "texture_enabled";
    pub const TEXTURING_MODE: &'static str = "texturing_mode";
    pub const TEXTURE_SAMPLER: &'static str = "texture_sampler";
    pub const TEXTURE_TRANSFORMATION_MATRIX: &'static str = "texture_transformation_matrix";
    pub const POINT_SIZE: &'static str = "point_size";

    pub const STANDARD_ATTRIBUTES: [&'static str; 4] = [
        Vertex::POSITION,
        Vertex::NORMAL,
        Vertex::COLOR,
        Vertex::TEXTURE_COORDINATES,
    ];

    pub const STANDARD_UNIFORMS: [&'static str; 6] = [
        Self::MODEL_VIEW_PROJECTION_MATRIX,
        Self::TEXTURE_ENABLED,
        Self::TEXTURING_MODE,
        Self::TEXTURE_SAMPLER,
        Self::TEXTURE_TRANSFORMATION_MATRIX,
        Self::POINT_SIZE,
    ];

    /// Creates an uncompiled material declaring the standard names.
    ///
    /// Culling and depth testing start disabled, line width and point size
    /// at one.
    pub fn new(
        device: &SharedDevice,
        vertex_source: impl Into<String>,
        fragment_source: impl Into<String>,
    ) -> Self {
        Self {
            name: "untitled material".to_string(),
            device: device.clone(),
            shader: ShaderProgram::new(
                device,
                vertex_source,
                fragment_source,
                &Self::STANDARD_ATTRIBUTES,
                &Self::STANDARD_UNIFORMS,
            ),
            face_culling: false,
            depth_test: false,
            line_width: 1.0,
            point_size: 1.0,
            texturing_mode: TexturingMode::default(),
            texture: None,
        }
    }

    /// Material running [`DEFAULT_VERTEX_SHADER`] and [`DEFAULT_FRAGMENT_SHADER`].
    pub fn standard(device: &SharedDevice) -> Self {
        Self::new(device, DEFAULT_VERTEX_SHADER, DEFAULT_FRAGMENT_SHADER).with_name("standard")
    }

    /// Builder pattern: sets the material name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder pattern: enables or disables back-face culling
    pub fn with_face_culling(mut self, enabled: bool) -> Self {
        self.face_culling = enabled;
        self
    }

    /// Builder pattern: enables or disables depth testing
    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    /// Builder pattern: sets the width of line primitives
    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }

    /// Builder pattern: sets the size of point primitives
    pub fn with_point_size(mut self, size: f32) -> Self {
        self.point_size = size;
        self
    }

    /// Builder pattern: sets how texels combine with vertex colors
    pub fn with_texturing_mode(mut self, mode: TexturingMode) -> Self {
        self.texturing_mode = mode;
        self
    }

    /// Builder pattern: sets the material's own texture
    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }

    /// Mutable access for source changes, extra declarations and
    /// `cleanup()`/`compile()` cycles.
    pub fn shader_mut(&mut self) -> &mut ShaderProgram {
        &mut self.shader
    }

    pub fn compile(&mut self) -> GfxResult<()> {
        self.shader.compile()
    }

    pub fn is_ready(&self) -> bool {
        self.shader.is_ready()
    }

    /// Binds the program and all render state ahead of a draw.
    ///
    /// In order: activates the program, uploads the texturing uniforms,
    /// binds `texture`, applies culling and depth testing, then sets the line
    /// width or point size when `topology` uses it. Nothing reaches the
    /// device if the program is not `Ready`.
    pub(crate) fn bind(&self, topology: PrimitiveTopology, texture: Option<&Texture>) -> GfxResult<()> {
        if !self.shader.use_program() {
            return Err(GfxError::ProgramNotReady(self.shader.state()));
        }

        self.shader.set_uniform(
            Self::TEXTURING_MODE,
            UniformValue::Int(self.texturing_mode.as_uniform()),
        );
        self.shader
            .set_uniform(Self::TEXTURE_ENABLED, UniformValue::Bool(texture.is_some()));
        match texture {
            Some(texture) => {
                self.device.bind_texture(Some(texture.handle()));
                self.shader.set_uniform(Self::TEXTURE_SAMPLER, UniformValue::Int(0));
                self.shader.set_uniform(
                    Self::TEXTURE_TRANSFORMATION_MATRIX,
                    UniformValue::Mat4(convert_matrix4_to_array(texture.transformation)),
                );
            }
            None => self.device.bind_texture(None),
        }

        self.device
            .set_capability(Capability::FaceCulling, self.face_culling);
        self.device
            .set_capability(Capability::DepthTest, self.depth_test);

        match topology {
            PrimitiveTopology::Lines => self.device.set_line_width(self.line_width),
            PrimitiveTopology::Points => {
                self.device.set_point_size(self.point_size);
                self.shader
                    .set_uniform(Self::POINT_SIZE, UniformValue::Float(self.point_size));
            }
            PrimitiveTopology::Triangles => {}
        }

        Ok(())
    }
}
