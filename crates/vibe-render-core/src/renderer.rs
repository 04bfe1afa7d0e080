use crate::{
    bitmap::{Bitmap, Buffer, Pixel, PixelKind, Rect},
    error::{PortRef, RenderError},
    interface::DeviceId,
    port::{InputId, OutputId, Port, RendererId},
};

/// Render callback supplied by the owning device. It receives the frame clip
/// rectangle and may only touch the ports of its own renderer.
pub type RenderFn = Box<dyn FnMut(&mut RenderContext<'_>, Rect)>;

/// A node of the render graph: named input and output ports plus the
/// callback that turns the former into the latter.
pub struct Renderer {
    id: RendererId,
    device: DeviceId,
    device_tag: String,
    name: String,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    callback: Option<RenderFn>,
    target: bool,
    frozen: bool,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("id", &self.id)
            .field("device", &self.device)
            .field("device_tag", &self.device_tag)
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("has_callback", &self.callback.is_some())
            .field("target", &self.target)
            .field("frozen", &self.frozen)
            .finish()
    }
}

impl Renderer {
    pub(crate) fn new(id: RendererId, device: DeviceId, device_tag: &str, name: &str) -> Self {
        Self {
            id,
            device,
            device_tag: device_tag.to_owned(),
            name: name.to_owned(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            callback: None,
            target: false,
            frozen: false,
        }
    }

    pub fn id(&self) -> RendererId {
        self.id
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn device_tag(&self) -> &str {
        &self.device_tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_target(&self) -> bool {
        self.target
    }

    /// Marks this renderer as a final sink. Targets are the roots of the
    /// backward reachability walk.
    pub fn mark_as_target(&mut self) -> Result<(), RenderError> {
        if self.frozen {
            return Err(RenderError::GraphFrozen);
        }
        self.target = true;
        Ok(())
    }

    pub fn set_callback(&mut self, callback: impl FnMut(&mut RenderContext<'_>, Rect) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub fn create_input(&mut self, name: &str, kind: PixelKind) -> Result<InputId, RenderError> {
        if self.frozen {
            return Err(RenderError::GraphFrozen);
        }
        if self.inputs.iter().any(|p| p.name() == name) {
            return Err(RenderError::DuplicateInput(self.port_ref(name)));
        }
        self.inputs.push(Port::new(name, kind));
        Ok(InputId {
            renderer: self.id,
            index: self.inputs.len() - 1,
        })
    }

    pub fn create_output(&mut self, name: &str, kind: PixelKind) -> Result<OutputId, RenderError> {
        if self.frozen {
            return Err(RenderError::GraphFrozen);
        }
        if self.outputs.iter().any(|p| p.name() == name) {
            return Err(RenderError::DuplicateOutput(self.port_ref(name)));
        }
        self.outputs.push(Port::new(name, kind));
        Ok(OutputId {
            renderer: self.id,
            index: self.outputs.len() - 1,
        })
    }

    pub fn input(&self, name: &str) -> Result<InputId, RenderError> {
        self.inputs
            .iter()
            .position(|p| p.name() == name)
            .map(|index| InputId {
                renderer: self.id,
                index,
            })
            .ok_or_else(|| RenderError::UnknownInput(self.port_ref(name)))
    }

    pub fn output(&self, name: &str) -> Result<OutputId, RenderError> {
        self.outputs
            .iter()
            .position(|p| p.name() == name)
            .map(|index| OutputId {
                renderer: self.id,
                index,
            })
            .ok_or_else(|| RenderError::UnknownOutput(self.port_ref(name)))
    }

    /// Inputs in declaration order.
    pub fn all_inputs(&self) -> impl Iterator<Item = (InputId, &Port)> + '_ {
        let renderer = self.id;
        self.inputs
            .iter()
            .enumerate()
            .map(move |(index, port)| (InputId { renderer, index }, port))
    }

    /// Outputs in declaration order.
    pub fn all_outputs(&self) -> impl Iterator<Item = (OutputId, &Port)> + '_ {
        let renderer = self.id;
        self.outputs
            .iter()
            .enumerate()
            .map(move |(index, port)| (OutputId { renderer, index }, port))
    }

    pub fn input_port(&self, index: usize) -> &Port {
        &self.inputs[index]
    }

    pub fn output_port(&self, index: usize) -> &Port {
        &self.outputs[index]
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Invokes the callback over `clip`. A renderer without a callback is a
    /// passive sink whose input buffers are read from outside.
    pub fn run(&mut self, ctx: &mut RenderContext<'_>, clip: Rect) {
        if let Some(callback) = self.callback.as_mut() {
            callback(ctx, clip);
        }
    }

    /// Ports and the target flag are fixed once the graph is resolved.
    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    pub(crate) fn port_ref(&self, port: &str) -> PortRef {
        PortRef {
            device: self.device_tag.clone(),
            renderer: self.name.clone(),
            port: port.to_owned(),
        }
    }
}

/// Read-only view of the buffers feeding one renderer.
///
/// The manager lends the buffers on either side of the running renderer's own
/// outputs; `slots` index the whole buffer list. A renderer never reads its
/// own outputs, since that would be a cycle.
#[derive(Clone, Copy)]
pub(crate) struct InputBuffers<'a> {
    before: &'a [Buffer],
    after: &'a [Buffer],
    outputs: (usize, usize),
    slots: &'a [usize],
}

impl<'a> InputBuffers<'a> {
    pub(crate) fn new(
        before: &'a [Buffer],
        after: &'a [Buffer],
        outputs: (usize, usize),
        slots: &'a [usize],
    ) -> Self {
        Self {
            before,
            after,
            outputs,
            slots,
        }
    }

    fn get(self, index: usize) -> &'a Buffer {
        let slot = self.slots[index];
        let (start, end) = self.outputs;
        if slot < start {
            &self.before[slot]
        } else {
            debug_assert!(slot >= end, "renderer reads its own output");
            &self.after[slot - end]
        }
    }
}

/// Buffers bound to the ports of the renderer currently running.
///
/// Inputs are handed out as shared references only; the producer of a buffer
/// is the only one that ever gets it mutably.
pub struct RenderContext<'a> {
    renderer: RendererId,
    inputs: InputBuffers<'a>,
    outputs: &'a mut [Buffer],
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(renderer: RendererId, inputs: InputBuffers<'a>, outputs: &'a mut [Buffer]) -> Self {
        Self {
            renderer,
            inputs,
            outputs,
        }
    }

    pub fn renderer(&self) -> RendererId {
        self.renderer
    }

    /// Bitmap behind one of this renderer's inputs.
    ///
    /// # Panics
    ///
    /// Panics if `port` belongs to another renderer or `P` does not match the
    /// port's pixel kind. Both are bugs in the calling device.
    pub fn input<P: Pixel>(&self, port: InputId) -> &'a Bitmap<P> {
        let buffer = self.input_buffer(port);
        P::bitmap(buffer).unwrap_or_else(|| {
            panic!(
                "input #{} is {}, not {}",
                port.index,
                buffer.kind(),
                P::KIND
            )
        })
    }

    /// Bitmap behind one of this renderer's outputs.
    ///
    /// # Panics
    ///
    /// Same conditions as [`RenderContext::input`].
    pub fn output<P: Pixel>(&mut self, port: OutputId) -> &mut Bitmap<P> {
        let buffer = self.output_buffer(port);
        let kind = buffer.kind();
        match P::bitmap_mut(buffer) {
            Some(bitmap) => bitmap,
            None => panic!("output #{} is {kind}, not {}", port.index, P::KIND),
        }
    }

    pub fn input_buffer(&self, port: InputId) -> &'a Buffer {
        assert_eq!(
            port.renderer, self.renderer,
            "input belongs to another renderer"
        );
        self.inputs.get(port.index)
    }

    pub fn output_buffer(&mut self, port: OutputId) -> &mut Buffer {
        assert_eq!(
            port.renderer, self.renderer,
            "output belongs to another renderer"
        );
        &mut self.outputs[port.index]
    }

    /// All input buffers in declaration order.
    pub fn inputs(&self) -> impl ExactSizeIterator<Item = &'a Buffer> + use<'a> {
        let inputs = self.inputs;
        (0..inputs.slots.len()).map(move |index| inputs.get(index))
    }

    /// All output buffers in declaration order.
    pub fn outputs_mut(&mut self) -> &mut [Buffer] {
        &mut *self.outputs
    }
}
