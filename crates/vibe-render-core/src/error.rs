use std::fmt;

use thiserror::Error;

use crate::bitmap::PixelKind;

/// Fully qualified name of a port, used in diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortRef {
    pub device: String,
    pub renderer: String,
    pub port: String,
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' of renderer '{}' in device '{}'",
            self.port, self.renderer, self.device
        )
    }
}

/// Configuration errors raised while assembling or resolving a render graph.
///
/// All of these describe a wiring mistake in how a machine was put together.
/// None of them can occur while rendering a frame of an already resolved graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("device '{tag}' is already registered")]
    DuplicateDevice { tag: String },

    #[error("renderer '{renderer}' already exists in device '{device}'")]
    DuplicateRenderer { device: String, renderer: String },

    #[error("duplicate input name {0}")]
    DuplicateInput(PortRef),

    #[error("duplicate output name {0}")]
    DuplicateOutput(PortRef),

    #[error("no device with tag '{tag}'")]
    UnknownDevice { tag: String },

    #[error("no renderer '{renderer}' in device '{device}'")]
    UnknownRenderer { device: String, renderer: String },

    #[error("no input {0}")]
    UnknownInput(PortRef),

    #[error("no output {0}")]
    UnknownOutput(PortRef),

    #[error("malformed port path '{path}' (expected tag:renderer.port)")]
    BadPortPath { path: String },

    #[error("duplicate connection on input {0}")]
    DuplicateConnection(PortRef),

    #[error("can't connect {output_kind} output {output} to {input_kind} input {input}")]
    KindMismatch {
        output: PortRef,
        output_kind: PixelKind,
        input: PortRef,
        input_kind: PixelKind,
    },

    #[error("nothing connected to required input {0}")]
    Unconnected(PortRef),

    #[error("couldn't topologically sort the renderers (stuck: {stuck})")]
    Cycle { stuck: String },

    #[error("constant {value:#X} does not fit {kind} input {input}")]
    ConstantOutOfRange {
        input: PortRef,
        kind: PixelKind,
        value: u32,
    },

    #[error("render graph is already resolved; wiring can no longer change")]
    GraphFrozen,
}
