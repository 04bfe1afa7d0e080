use crate::{
    bitmap::Rect,
    error::RenderError,
    manager::Manager,
    port::RendererId,
    renderer::Renderer,
};

/// Handle of a registered device inside a [`Manager`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub(crate) usize);

/// A chip emulation that contributes renderers to the frame.
///
/// Implementors register everything they need during the configuration phase;
/// wiring between devices happens afterwards, outside of the device.
pub trait RenderDevice {
    fn register_renderers(&mut self, manager: &mut Manager) -> Result<(), RenderError>;
}

/// Per-device facade over the manager.
///
/// A device keeps one of these to create its renderers and to hand them out by
/// name to the machine wiring code.
#[derive(Clone, Debug)]
pub struct RenderInterface {
    device: DeviceId,
    tag: String,
    renderers: Vec<(String, RendererId)>,
}

impl RenderInterface {
    pub fn new(manager: &mut Manager, tag: &str) -> Result<Self, RenderError> {
        let device = manager.register_device(tag)?;
        Ok(Self {
            device,
            tag: tag.to_owned(),
            renderers: Vec::new(),
        })
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Creates a renderer owned by this device and returns it for port setup.
    pub fn create_renderer<'m>(
        &mut self,
        manager: &'m mut Manager,
        name: &str,
    ) -> Result<&'m mut Renderer, RenderError> {
        let id = manager.create_renderer(self.device, name)?;
        self.renderers.push((name.to_owned(), id));
        Ok(manager.renderer_mut(id))
    }

    pub fn get_renderer(&self, name: &str) -> Result<RendererId, RenderError> {
        self.renderers
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, id)| id)
            .ok_or_else(|| RenderError::UnknownRenderer {
                device: self.tag.clone(),
                renderer: name.to_owned(),
            })
    }

    /// Renderers of this device in creation order.
    pub fn renderers(&self) -> impl Iterator<Item = RendererId> + '_ {
        self.renderers.iter().map(|&(_, id)| id)
    }

    /// Renders only this device's sub-pipeline: its own scheduled renderers
    /// and whatever feeds them, in the manager's execution order. Renderers of
    /// other devices that none of ours depend on do not run.
    pub fn do_render(
        &self,
        manager: &mut Manager,
        width: u32,
        height: u32,
        clip: Rect,
    ) -> Result<(), RenderError> {
        let roots: Vec<RendererId> = self.renderers().collect();
        manager.do_render_for(&roots, width, height, clip)
    }
}
