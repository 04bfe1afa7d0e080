mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{CallLog, logged_renderer};
use vibe_render_core::{
    Manager, OutputId, PixelKind, Rect, RenderDevice, RenderError, RenderInterface,
};

#[test]
fn producer_mixer_display_run_in_order() {
    let mut manager = Manager::new();
    let log = CallLog::default();

    // Registered back to front so the order has to come from the wiring.
    let mut screen = RenderInterface::new(&mut manager, "screen").unwrap();
    let (display, display_in, _) =
        logged_renderer(&mut manager, &mut screen, "display", &["d"], &[], &log);
    let mut mixer = RenderInterface::new(&mut manager, "mixer").unwrap();
    let (mix, mix_in, mix_out) = logged_renderer(&mut manager, &mut mixer, "mixer", &["i"], &["m"], &log);
    let mut tiles = RenderInterface::new(&mut manager, "tiles").unwrap();
    let (producer, _, producer_out) =
        logged_renderer(&mut manager, &mut tiles, "producer", &[], &["o"], &log);

    manager.connect(producer_out[0], mix_in[0]).unwrap();
    manager.connect(mix_out[0], display_in[0]).unwrap();
    manager.mark_as_target(display).unwrap();

    screen
        .do_render(&mut manager, 64, 64, Rect::full(64, 64))
        .unwrap();

    assert_eq!(manager.execution_order().unwrap(), &[producer, mix, display]);
    assert_eq!(log.calls(), ["producer", "mixer", "display"]);
}

#[test]
fn device_pass_through_renders_only_its_own_sub_pipeline() {
    let mut manager = Manager::new();
    let log = CallLog::default();

    let mut tiles = RenderInterface::new(&mut manager, "tiles").unwrap();
    let (_, _, layer_out) = logged_renderer(&mut manager, &mut tiles, "layer", &[], &["o"], &log);
    let mut screen = RenderInterface::new(&mut manager, "screen").unwrap();
    let (display, display_in, _) =
        logged_renderer(&mut manager, &mut screen, "display", &["d"], &[], &log);
    // A second target on another device, unrelated to the screen.
    let mut osd = RenderInterface::new(&mut manager, "osd").unwrap();
    let (text, _, _) = logged_renderer(&mut manager, &mut osd, "text", &[], &["t"], &log);
    // Owned by the screen but needed by no target, so never scheduled.
    logged_renderer(&mut manager, &mut screen, "spare", &[], &["s"], &log);

    manager.connect(layer_out[0], display_in[0]).unwrap();
    manager.mark_as_target(display).unwrap();
    manager.mark_as_target(text).unwrap();

    screen
        .do_render(&mut manager, 8, 8, Rect::full(8, 8))
        .unwrap();
    assert_eq!(log.calls(), ["layer", "display"]);

    osd.do_render(&mut manager, 8, 8, Rect::full(8, 8)).unwrap();
    assert_eq!(log.calls(), ["layer", "display", "text"]);

    // A device that only produces runs alone.
    tiles.do_render(&mut manager, 8, 8, Rect::full(8, 8)).unwrap();
    assert_eq!(log.calls()[3..], ["layer"]);

    manager.do_render(8, 8, Rect::full(8, 8)).unwrap();
    assert_eq!(log.calls()[4..], ["layer", "display", "text"]);
}

#[test]
fn pixels_flow_from_producer_to_target() {
    let mut manager = Manager::new();
    let mut vdp = RenderInterface::new(&mut manager, "vdp").unwrap();

    let producer = vdp.create_renderer(&mut manager, "producer").unwrap();
    let o = producer.create_output("o", PixelKind::Indexed).unwrap();
    producer.set_callback(move |ctx, clip| ctx.output::<u16>(o).fill_rect(&clip, 5));

    let mixer = vdp.create_renderer(&mut manager, "mixer").unwrap();
    let i = mixer.create_input("i", PixelKind::Indexed).unwrap();
    let m = mixer.create_output("m", PixelKind::Indexed).unwrap();
    mixer.set_callback(move |ctx, clip| {
        let src = ctx.input::<u16>(i);
        let dst = ctx.output::<u16>(m);
        for y in clip.top..clip.bottom {
            for x in clip.left..clip.right {
                *dst.pixel_mut(x, y) = src.pixel(x, y) + 1;
            }
        }
    });

    let last = Rc::new(Cell::new(0u16));
    let display = vdp.create_renderer(&mut manager, "display").unwrap();
    let d = display.create_input("d", PixelKind::Indexed).unwrap();
    let sink = Rc::clone(&last);
    display.set_callback(move |ctx, _| sink.set(ctx.input::<u16>(d).pixel(63, 63)));
    display.mark_as_target().unwrap();

    manager.connect(o, i).unwrap();
    manager.connect(m, d).unwrap();
    manager.do_render(64, 64, Rect::full(64, 64)).unwrap();

    assert_eq!(last.get(), 6);
}

/// A tilemap chip that owns its renderer and exposes its output by name.
struct TilemapChip {
    iface: Option<RenderInterface>,
    pen: u16,
}

impl TilemapChip {
    fn output(&self, manager: &Manager) -> OutputId {
        let iface = self.iface.as_ref().unwrap();
        manager
            .renderer(iface.get_renderer("layer").unwrap())
            .output("pix")
            .unwrap()
    }
}

impl RenderDevice for TilemapChip {
    fn register_renderers(&mut self, manager: &mut Manager) -> Result<(), RenderError> {
        let mut iface = RenderInterface::new(manager, "tilemap")?;
        let layer = iface.create_renderer(manager, "layer")?;
        let pix = layer.create_output("pix", PixelKind::Indexed)?;
        let pen = self.pen;
        layer.set_callback(move |ctx, clip| ctx.output::<u16>(pix).fill_rect(&clip, pen));
        self.iface = Some(iface);
        Ok(())
    }
}

#[test]
fn devices_register_through_the_manager() {
    let mut manager = Manager::new();
    let mut chip = TilemapChip {
        iface: None,
        pen: 9,
    };
    manager.add_device(&mut chip).unwrap();
    // Registering twice collides on the device tag.
    assert!(matches!(
        manager.add_device(&mut chip),
        Err(RenderError::DuplicateDevice { .. })
    ));

    let mut lcd = RenderInterface::new(&mut manager, "lcd").unwrap();
    let panel = lcd.create_renderer(&mut manager, "panel").unwrap();
    let panel_id = panel.id();
    let input = panel.create_input("pix", PixelKind::Indexed).unwrap();
    panel.mark_as_target().unwrap();

    manager.connect(chip.output(&manager), input).unwrap();
    manager.do_render(4, 4, Rect::full(4, 4)).unwrap();

    let seen = manager.input_buffer(input).unwrap().as_indexed().unwrap();
    assert!(seen.pixels().iter().all(|&p| p == 9));
    assert_eq!(lcd.renderers().collect::<Vec<_>>(), [panel_id]);
    assert_eq!(manager.describe_renderer(panel_id), "lcd:panel");
}
