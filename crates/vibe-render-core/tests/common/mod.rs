#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use vibe_render_core::{
    InputId, Manager, OutputId, PixelKind, RenderInterface, RendererId,
};

/// Shared record of which renderers ran, in call order.
#[derive(Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    pub fn push(&self, name: &str) {
        self.0.borrow_mut().push(name.to_owned());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

/// A renderer with the given indexed inputs and outputs whose callback only
/// records that it ran.
pub fn logged_renderer(
    manager: &mut Manager,
    iface: &mut RenderInterface,
    name: &str,
    inputs: &[&str],
    outputs: &[&str],
    log: &CallLog,
) -> (RendererId, Vec<InputId>, Vec<OutputId>) {
    let renderer = iface.create_renderer(manager, name).unwrap();
    let ins = inputs
        .iter()
        .map(|n| renderer.create_input(n, PixelKind::Indexed).unwrap())
        .collect();
    let outs = outputs
        .iter()
        .map(|n| renderer.create_output(n, PixelKind::Indexed).unwrap())
        .collect();
    let log = log.clone();
    let label = name.to_owned();
    renderer.set_callback(move |_, _| log.push(&label));
    (renderer.id(), ins, outs)
}
