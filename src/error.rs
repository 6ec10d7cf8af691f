//! Error types shared by the graphics modules.

use crate::gfx::device::ShaderStage;

/// Errors reported by shader, resource and draw operations.
///
/// None of these are fatal to the process. Shader failures leave the program
/// in the `Dead` state, draw failures skip the draw call.
#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    #[error("failed to compile the {stage} shader:\n{log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("failed to link the shader program:\n{log}")]
    ShaderLink { log: String },

    #[error("shader program is not ready (state: {0:?})")]
    ProgramNotReady(crate::gfx::resources::ProgramState),

    #[error("no {0} is bound for drawing")]
    NothingBound(&'static str),

    #[error("{0} key does not resolve (destroyed or never created)")]
    StaleKey(&'static str),

    #[error("scene object has no mesh binding")]
    NotRenderable,

    #[error("image is {width}x{height} but holds {actual} bytes, expected {expected}")]
    ImageSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("parenting would create a cycle in the object hierarchy")]
    ParentCycle,

    #[error("window system error: {0}")]
    Window(String),
}

pub type GfxResult<T> = Result<T, GfxError>;
