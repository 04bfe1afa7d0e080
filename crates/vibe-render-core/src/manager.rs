use std::collections::{HashMap, HashSet};
use std::ops::Range;

use log::{debug, info, warn};

use crate::{
    bitmap::{Buffer, Pixel, PixelKind, Rect},
    error::{PortRef, RenderError},
    interface::{DeviceId, RenderDevice},
    port::{InputId, OutputId, Port, RendererId},
    renderer::{InputBuffers, RenderContext, Renderer},
};

#[cfg(feature = "render-trace")]
macro_rules! render_trace {
    ($($arg:tt)*) => {
        log::trace!($($arg)*);
    };
}
#[cfg(not(feature = "render-trace"))]
macro_rules! render_trace {
    ($($arg:tt)*) => {};
}

/// What feeds an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    Source(OutputId),
    Constant(u32),
}

struct Device {
    tag: String,
    renderers: Vec<RendererId>,
}

/// Buffer indices bound to one scheduled renderer. A renderer's outputs
/// occupy one contiguous run of the buffer list.
#[derive(Clone, Default)]
struct Slots {
    inputs: Vec<usize>,
    outputs: Range<usize>,
}

/// Result of the one-time graph resolution.
struct Schedule {
    order: Vec<RendererId>,
    slots: Vec<Option<Slots>>,
    buffers: Vec<Buffer>,
    /// Value each buffer is refilled with on a size change; 0 for outputs.
    fills: Vec<u32>,
    frame_size: Option<(u32, u32)>,
}

/// Owns every renderer, the connection table and the intermediate buffers,
/// and runs the renderers needed by the targets once per frame.
pub struct Manager {
    devices: Vec<Device>,
    renderers: Vec<Renderer>,
    bindings: HashMap<InputId, Binding>,
    schedule: Option<Schedule>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("devices", &self.devices.len())
            .field("renderers", &self.renderers.len())
            .field("resolved", &self.schedule.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            renderers: Vec::new(),
            bindings: HashMap::new(),
            schedule: None,
        }
    }

    /// Lets `device` register its renderers.
    pub fn add_device(&mut self, device: &mut dyn RenderDevice) -> Result<(), RenderError> {
        device.register_renderers(self)
    }

    pub fn register_device(&mut self, tag: &str) -> Result<DeviceId, RenderError> {
        self.ensure_unresolved()?;
        if self.devices.iter().any(|d| d.tag == tag) {
            return Err(RenderError::DuplicateDevice {
                tag: tag.to_owned(),
            });
        }
        self.devices.push(Device {
            tag: tag.to_owned(),
            renderers: Vec::new(),
        });
        Ok(DeviceId(self.devices.len() - 1))
    }

    /// Adds a renderer to `device`.
    ///
    /// # Panics
    ///
    /// Panics if `device` was registered with another manager.
    pub fn create_renderer(&mut self, device: DeviceId, name: &str) -> Result<RendererId, RenderError> {
        self.ensure_unresolved()?;
        let entry = &self.devices[device.0];
        if entry
            .renderers
            .iter()
            .any(|&id| self.renderers[id.0].name() == name)
        {
            return Err(RenderError::DuplicateRenderer {
                device: entry.tag.clone(),
                renderer: name.to_owned(),
            });
        }

        let id = RendererId(self.renderers.len());
        self.renderers
            .push(Renderer::new(id, device, &entry.tag, name));
        self.devices[device.0].renderers.push(id);
        Ok(id)
    }

    pub fn device_tag(&self, device: DeviceId) -> &str {
        &self.devices[device.0].tag
    }

    pub fn renderer(&self, id: RendererId) -> &Renderer {
        &self.renderers[id.0]
    }

    pub fn renderer_mut(&mut self, id: RendererId) -> &mut Renderer {
        &mut self.renderers[id.0]
    }

    /// Every renderer in registration order.
    pub fn renderers(&self) -> impl Iterator<Item = &Renderer> + '_ {
        self.renderers.iter()
    }

    /// `tag:name` of a renderer.
    pub fn describe_renderer(&self, id: RendererId) -> String {
        let r = self.renderer(id);
        format!("{}:{}", r.device_tag(), r.name())
    }

    /// Looks up a renderer of any device, for cross-device wiring.
    pub fn get_renderer(&self, tag: &str, name: &str) -> Result<RendererId, RenderError> {
        let device = self
            .devices
            .iter()
            .find(|d| d.tag == tag)
            .ok_or_else(|| RenderError::UnknownDevice {
                tag: tag.to_owned(),
            })?;
        device
            .renderers
            .iter()
            .copied()
            .find(|&id| self.renderers[id.0].name() == name)
            .ok_or_else(|| RenderError::UnknownRenderer {
                device: tag.to_owned(),
                renderer: name.to_owned(),
            })
    }

    /// Resolves a `tag:renderer.port` path to an input.
    pub fn find_input(&self, path: &str) -> Result<InputId, RenderError> {
        let (tag, renderer, port) = parse_port_path(path)?;
        self.renderer(self.get_renderer(tag, renderer)?).input(port)
    }

    /// Resolves a `tag:renderer.port` path to an output.
    pub fn find_output(&self, path: &str) -> Result<OutputId, RenderError> {
        let (tag, renderer, port) = parse_port_path(path)?;
        self.renderer(self.get_renderer(tag, renderer)?).output(port)
    }

    /// Feeds `input` from `output`. An input takes exactly one binding.
    pub fn connect(&mut self, output: OutputId, input: InputId) -> Result<(), RenderError> {
        self.ensure_unresolved()?;
        if self.bindings.contains_key(&input) {
            return Err(RenderError::DuplicateConnection(self.input_ref(input)));
        }

        let out_port = self.output_port(output);
        let in_port = self.input_port(input);
        if !out_port.can_feed(in_port) {
            return Err(RenderError::KindMismatch {
                output: self.output_ref(output),
                output_kind: out_port.kind(),
                input: self.input_ref(input),
                input_kind: in_port.kind(),
            });
        }

        debug!(
            "connect {}.{} -> {}.{}",
            self.describe_renderer(output.renderer),
            out_port.name(),
            self.describe_renderer(input.renderer),
            in_port.name()
        );
        self.bindings.insert(input, Binding::Source(output));
        Ok(())
    }

    /// Binds `input` to a fixed fill value instead of a producer.
    pub fn set_constant(&mut self, input: InputId, value: u32) -> Result<(), RenderError> {
        self.ensure_unresolved()?;
        if self.bindings.contains_key(&input) {
            return Err(RenderError::DuplicateConnection(self.input_ref(input)));
        }

        let kind = self.input_port(input).kind();
        let fits = match kind {
            PixelKind::Indexed => u16::from_constant(value).is_some(),
            PixelKind::Rgb => u32::from_constant(value).is_some(),
        };
        if !fits {
            return Err(RenderError::ConstantOutOfRange {
                input: self.input_ref(input),
                kind,
                value,
            });
        }

        self.bindings.insert(input, Binding::Constant(value));
        Ok(())
    }

    pub fn mark_as_target(&mut self, renderer: RendererId) -> Result<(), RenderError> {
        self.renderers[renderer.0].mark_as_target()
    }

    pub fn binding(&self, input: InputId) -> Option<Binding> {
        self.bindings.get(&input).copied()
    }

    pub fn is_resolved(&self) -> bool {
        self.schedule.is_some()
    }

    /// Renderers in execution order, once resolved.
    pub fn execution_order(&self) -> Option<&[RendererId]> {
        self.schedule.as_ref().map(|s| s.order.as_slice())
    }

    /// Size the buffers were last prepared for.
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.schedule.as_ref().and_then(|s| s.frame_size)
    }

    /// Buffer bound to `input`, if its renderer is scheduled.
    pub fn input_buffer(&self, input: InputId) -> Option<&Buffer> {
        let schedule = self.schedule.as_ref()?;
        let slots = schedule.slots[input.renderer.0].as_ref()?;
        Some(&schedule.buffers[slots.inputs[input.index]])
    }

    /// Buffer backing `output`, if its renderer is scheduled.
    pub fn output_buffer(&self, output: OutputId) -> Option<&Buffer> {
        let schedule = self.schedule.as_ref()?;
        let slots = schedule.slots[output.renderer.0].as_ref()?;
        Some(&schedule.buffers[slots.outputs.start + output.index])
    }

    /// Computes the renderers needed by the targets, their execution order
    /// and their buffers. Runs once; later calls do nothing.
    pub fn resolve(&mut self) -> Result<(), RenderError> {
        if self.schedule.is_some() {
            return Ok(());
        }

        let needed = self.collect_needed()?;
        let order = self.sort_needed(needed)?;
        let schedule = self.allocate(order);

        if schedule.order.is_empty() {
            warn!("No target renderers; nothing will be rendered");
        }
        info!(
            "Resolved render graph: {} of {} renderers scheduled, {} buffers",
            schedule.order.len(),
            self.renderers.len(),
            schedule.buffers.len()
        );
        for (step, &id) in schedule.order.iter().enumerate() {
            debug!("  {step}: {}", self.describe_renderer(id));
        }

        for renderer in &mut self.renderers {
            renderer.freeze();
        }
        self.schedule = Some(schedule);
        Ok(())
    }

    /// Renders one frame (or band) of `width` x `height`, limited to `clip`.
    ///
    /// Buffers keep their contents between calls. Only a change of frame size
    /// reallocates them, refilling outputs with 0 and constants with their
    /// bound value.
    pub fn do_render(&mut self, width: u32, height: u32, clip: Rect) -> Result<(), RenderError> {
        self.resolve()?;
        self.render_pass(width, height, clip, None);
        Ok(())
    }

    /// Like [`Manager::do_render`], but only runs `roots` and the scheduled
    /// renderers they depend on. Roots that no target needs have no buffers
    /// and are skipped.
    pub fn do_render_for(
        &mut self,
        roots: &[RendererId],
        width: u32,
        height: u32,
        clip: Rect,
    ) -> Result<(), RenderError> {
        self.resolve()?;
        let mask = self.upstream_of(roots);
        self.render_pass(width, height, clip, Some(mask.as_slice()));
        Ok(())
    }

    fn render_pass(&mut self, width: u32, height: u32, clip: Rect, only: Option<&[bool]>) {
        let Some(schedule) = self.schedule.as_mut() else {
            return;
        };

        if schedule.frame_size != Some((width, height)) {
            debug!("Resizing {} render buffers to {width}x{height}", schedule.buffers.len());
            for (buffer, &fill) in schedule.buffers.iter_mut().zip(&schedule.fills) {
                buffer.resize_and_fill(width, height, fill);
            }
            schedule.frame_size = Some((width, height));
        }

        let clip = clip.intersect(&Rect::full(width, height));
        for &id in &schedule.order {
            if only.is_some_and(|mask| !mask[id.0]) {
                continue;
            }
            let Some(slots) = schedule.slots[id.0].as_ref() else {
                continue;
            };

            // The renderer writes its own run of buffers while reading the
            // ones on either side of it.
            let (start, end) = (slots.outputs.start, slots.outputs.end);
            let (before, rest) = schedule.buffers.split_at_mut(start);
            let (outputs, after) = rest.split_at_mut(end - start);
            let inputs = InputBuffers::new(before, after, (start, end), &slots.inputs);

            let renderer = &mut self.renderers[id.0];
            render_trace!("run {}:{} over {:?}", renderer.device_tag(), renderer.name(), clip);
            let mut ctx = RenderContext::new(id, inputs, outputs);
            renderer.run(&mut ctx, clip);
        }
    }

    /// Scheduled renderers reachable backwards from the scheduled `roots`, as
    /// a flag per renderer.
    fn upstream_of(&self, roots: &[RendererId]) -> Vec<bool> {
        let mut mask = vec![false; self.renderers.len()];
        let Some(schedule) = self.schedule.as_ref() else {
            return mask;
        };
        let mut pending: Vec<RendererId> = roots
            .iter()
            .copied()
            .filter(|id| schedule.slots[id.0].is_some())
            .collect();
        while let Some(id) = pending.pop() {
            if mask[id.0] {
                continue;
            }
            mask[id.0] = true;
            for (input, _) in self.renderers[id.0].all_inputs() {
                if let Some(Binding::Source(output)) = self.bindings.get(&input) {
                    pending.push(output.renderer);
                }
            }
        }
        mask
    }

    /// Backward walk from the targets. Returns a membership flag per renderer.
    fn collect_needed(&self) -> Result<Vec<bool>, RenderError> {
        let mut needed = vec![false; self.renderers.len()];
        let mut pending: Vec<InputId> = Vec::new();

        for renderer in self.renderers.iter().filter(|r| r.is_target()) {
            needed[renderer.id().0] = true;
            pending.extend(renderer.all_inputs().map(|(id, _)| id));
        }

        while !pending.is_empty() {
            let mut next = Vec::new();
            for input in pending.drain(..) {
                match self.bindings.get(&input) {
                    Some(Binding::Constant(_)) => {}
                    Some(Binding::Source(output)) => {
                        let owner = output.renderer;
                        if !needed[owner.0] {
                            needed[owner.0] = true;
                            next.extend(self.renderers[owner.0].all_inputs().map(|(id, _)| id));
                        }
                    }
                    None => return Err(RenderError::Unconnected(self.input_ref(input))),
                }
            }
            pending = next;
        }
        Ok(needed)
    }

    /// Repeated ready-scan over the needed renderers. Renderers that become
    /// ready in the same pass keep registration order.
    fn sort_needed(&self, needed: Vec<bool>) -> Result<Vec<RendererId>, RenderError> {
        let mut remaining: Vec<RendererId> = needed
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n)
            .map(|(i, _)| RendererId(i))
            .collect();
        let mut generated: HashSet<OutputId> = HashSet::new();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let placed = order.len();
            let mut blocked = Vec::new();
            for id in remaining {
                let renderer = &self.renderers[id.0];
                let ready = renderer.all_inputs().all(|(input, _)| match self.bindings.get(&input) {
                    Some(Binding::Source(output)) => generated.contains(output),
                    _ => true,
                });
                if ready {
                    generated.extend(renderer.all_outputs().map(|(output, _)| output));
                    order.push(id);
                } else {
                    blocked.push(id);
                }
            }

            if order.len() == placed {
                let stuck = blocked
                    .iter()
                    .map(|&id| self.describe_renderer(id))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(RenderError::Cycle { stuck });
            }
            remaining = blocked;
        }
        Ok(order)
    }

    /// One buffer per output of every scheduled renderer, shared by all of its
    /// consumers, plus one private buffer per constant-bound input.
    fn allocate(&self, order: Vec<RendererId>) -> Schedule {
        let mut slots: Vec<Option<Slots>> = vec![None; self.renderers.len()];
        let mut buffers = Vec::new();
        let mut fills = Vec::new();

        for &id in &order {
            let start = buffers.len();
            for (_, port) in self.renderers[id.0].all_outputs() {
                buffers.push(Buffer::empty(port.kind()));
                fills.push(0);
            }
            let outputs = start..buffers.len();
            slots[id.0] = Some(Slots {
                inputs: Vec::new(),
                outputs,
            });
        }

        for &id in &order {
            let mut inputs = Vec::new();
            for (input, port) in self.renderers[id.0].all_inputs() {
                let slot = match self.bindings.get(&input) {
                    Some(&Binding::Source(output)) => slots[output.renderer.0]
                        .as_ref()
                        .map(|s| s.outputs.start + output.index),
                    Some(&Binding::Constant(value)) => {
                        buffers.push(Buffer::empty(port.kind()));
                        fills.push(value);
                        Some(buffers.len() - 1)
                    }
                    None => None,
                };
                // Resolution already proved every input bound and every
                // producer scheduled.
                if let Some(slot) = slot {
                    inputs.push(slot);
                }
            }
            if let Some(s) = slots[id.0].as_mut() {
                s.inputs = inputs;
            }
        }

        Schedule {
            order,
            slots,
            buffers,
            fills,
            frame_size: None,
        }
    }

    fn ensure_unresolved(&self) -> Result<(), RenderError> {
        if self.schedule.is_some() {
            return Err(RenderError::GraphFrozen);
        }
        Ok(())
    }

    fn input_port(&self, input: InputId) -> &Port {
        self.renderers[input.renderer.0].input_port(input.index)
    }

    fn output_port(&self, output: OutputId) -> &Port {
        self.renderers[output.renderer.0].output_port(output.index)
    }

    fn input_ref(&self, input: InputId) -> PortRef {
        let r = &self.renderers[input.renderer.0];
        r.port_ref(r.input_port(input.index).name())
    }

    fn output_ref(&self, output: OutputId) -> PortRef {
        let r = &self.renderers[output.renderer.0];
        r.port_ref(r.output_port(output.index).name())
    }
}

/// Splits `tag:renderer.port`. The tag itself may contain colons.
fn parse_port_path(path: &str) -> Result<(&str, &str, &str), RenderError> {
    let bad = || RenderError::BadPortPath {
        path: path.to_owned(),
    };
    let (tag, rest) = path.rsplit_once(':').ok_or_else(bad)?;
    let (renderer, port) = rest.split_once('.').ok_or_else(bad)?;
    if tag.is_empty() || renderer.is_empty() || port.is_empty() {
        return Err(bad());
    }
    Ok((tag, renderer, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_paths_split_on_last_colon() {
        assert_eq!(
            parse_port_path(":mainpcb:vdp.layer.pix").unwrap(),
            (":mainpcb", "vdp", "layer.pix")
        );
        assert_eq!(parse_port_path("vdp:bg.o").unwrap(), ("vdp", "bg", "o"));
        assert!(matches!(
            parse_port_path("vdp.bg.o"),
            Err(RenderError::BadPortPath { .. })
        ));
        assert!(parse_port_path("vdp:.o").is_err());
    }

    #[test]
    #[should_panic]
    fn renderer_for_a_foreign_device_panics() {
        let mut other = Manager::new();
        let device = other.register_device("vdp").unwrap();
        let _ = Manager::new().create_renderer(device, "layer");
    }
}
