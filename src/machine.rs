//! Declarative machine descriptions: which devices exist, which renderers and
//! ports they own, and how the ports are wired.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;
use vibe_render_core::{Manager, PixelKind, RenderError, RenderInterface};

use crate::behavior::{self, Behavior};

#[derive(Error, Debug)]
pub enum MachineError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid machine description: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("renderer {renderer}: {message}")]
    Behavior { renderer: String, message: String },

    #[error("malformed target '{0}' (expected tag:renderer)")]
    BadTarget(String),

    #[error("port '{0}' is not part of the resolved graph")]
    NotScheduled(String),

    #[error("failed to write PNG {}: {source}", path.display())]
    Png {
        path: PathBuf,
        source: png::EncodingError,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortKind {
    Indexed,
    Rgb,
}

impl From<PortKind> for PixelKind {
    fn from(kind: PortKind) -> Self {
        match kind {
            PortKind::Indexed => PixelKind::Indexed,
            PortKind::Rgb => PixelKind::Rgb,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortDescription {
    pub name: String,
    pub kind: PortKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RendererDescription {
    pub name: String,
    #[serde(default)]
    pub target: bool,
    #[serde(default)]
    pub behavior: Behavior,
    #[serde(default)]
    pub inputs: Vec<PortDescription>,
    #[serde(default)]
    pub outputs: Vec<PortDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceDescription {
    pub tag: String,
    #[serde(default, rename = "renderer")]
    pub renderers: Vec<RendererDescription>,
}

/// `from` output path feeding `to` input path, both `tag:renderer.port`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Constant {
    pub input: String,
    pub value: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MachineDescription {
    #[serde(rename = "device")]
    pub devices: Vec<DeviceDescription>,
    #[serde(rename = "connect")]
    pub connections: Vec<Connection>,
    #[serde(rename = "constant")]
    pub constants: Vec<Constant>,
    /// Extra targets as `tag:renderer`, on top of per-renderer `target` flags.
    pub targets: Vec<String>,
}

/// Device facades created from a description, in declaration order.
#[derive(Debug)]
pub struct Machine {
    pub devices: Vec<RenderInterface>,
}

impl MachineDescription {
    pub fn from_toml(text: &str) -> Result<Self, MachineError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, MachineError> {
        let text = std::fs::read_to_string(path).map_err(|source| MachineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let desc = Self::from_toml(&text)?;
        info!(
            "Loaded machine {} ({} devices, {} connections)",
            path.display(),
            desc.devices.len(),
            desc.connections.len()
        );
        Ok(desc)
    }

    /// Registers every device and renderer, then applies the wiring.
    pub fn build(&self, manager: &mut Manager) -> Result<Machine, MachineError> {
        let mut devices = Vec::with_capacity(self.devices.len());
        for device in &self.devices {
            let mut iface = RenderInterface::new(manager, &device.tag)?;
            for desc in &device.renderers {
                let renderer = iface.create_renderer(manager, &desc.name)?;
                let inputs = desc
                    .inputs
                    .iter()
                    .map(|p| {
                        let kind = PixelKind::from(p.kind);
                        renderer.create_input(&p.name, kind).map(|id| (id, kind))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let outputs = desc
                    .outputs
                    .iter()
                    .map(|p| {
                        let kind = PixelKind::from(p.kind);
                        renderer.create_output(&p.name, kind).map(|id| (id, kind))
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let callback = behavior::build(&desc.behavior, &inputs, &outputs).map_err(
                    |message| MachineError::Behavior {
                        renderer: format!("{}:{}", device.tag, desc.name),
                        message,
                    },
                )?;
                if let Some(callback) = callback {
                    renderer.set_callback(callback);
                }
                if desc.target {
                    renderer.mark_as_target()?;
                }
            }
            devices.push(iface);
        }

        for conn in &self.connections {
            let output = manager.find_output(&conn.from)?;
            let input = manager.find_input(&conn.to)?;
            manager.connect(output, input)?;
        }
        for constant in &self.constants {
            let input = manager.find_input(&constant.input)?;
            manager.set_constant(input, constant.value)?;
            debug!("constant {} = {:#X}", constant.input, constant.value);
        }
        for target in &self.targets {
            let (tag, name) = target
                .rsplit_once(':')
                .ok_or_else(|| MachineError::BadTarget(target.clone()))?;
            let id = manager.get_renderer(tag, name)?;
            manager.mark_as_target(id)?;
        }

        Ok(Machine { devices })
    }
}
