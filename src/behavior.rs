//! Stock render callbacks for machine descriptions.
//!
//! Real chip emulations supply their own callbacks. These exist so a wiring
//! description can be rendered and inspected without any chip attached.

use serde::Deserialize;
use vibe_render_core::{
    Bitmap, Buffer, InputId, OutputId, Pixel, PixelKind, Rect, RenderContext, RenderFn,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Behavior {
    /// No callback; the renderer is a passive sink.
    #[default]
    None,
    /// Fill every output with a constant.
    Fill { value: u32 },
    /// Indexed `(x ^ y) & 0xF`, or an x/y gradient for rgb outputs.
    Pattern,
    /// Copy the first input into every output of the same kind.
    Passthrough,
    /// Layer the inputs in order; 0 is transparent.
    Overlay,
    /// Convert the single indexed input to rgb through a color table.
    Palette { colors: Vec<u32> },
}

/// Builds the callback for `behavior`, checking it against the declared ports.
pub fn build(
    behavior: &Behavior,
    inputs: &[(InputId, PixelKind)],
    outputs: &[(OutputId, PixelKind)],
) -> Result<Option<RenderFn>, String> {
    let callback: RenderFn = match behavior {
        Behavior::None => return Ok(None),
        Behavior::Fill { value } => {
            let value = *value;
            require(!outputs.is_empty(), "fill needs at least one output")?;
            if value > 0xFFFF && outputs.iter().any(|&(_, k)| k == PixelKind::Indexed) {
                return Err(format!("fill value {value:#X} does not fit an indexed output"));
            }
            Box::new(move |ctx: &mut RenderContext<'_>, clip: Rect| {
                for buffer in ctx.outputs_mut() {
                    match buffer {
                        Buffer::Indexed(b) => b.fill_rect(&clip, value as u16),
                        Buffer::Rgb(b) => b.fill_rect(&clip, value & 0x00FF_FFFF),
                    }
                }
            })
        }
        Behavior::Pattern => {
            require(!outputs.is_empty(), "pattern needs at least one output")?;
            Box::new(|ctx: &mut RenderContext<'_>, clip: Rect| {
                for buffer in ctx.outputs_mut() {
                    match buffer {
                        Buffer::Indexed(b) => {
                            paint(b, &clip, |x, y| ((x ^ y) & 0x0F) as u16);
                        }
                        Buffer::Rgb(b) => {
                            paint(b, &clip, |x, y| {
                                ((x & 0xFF) << 16) | ((y & 0xFF) << 8) | ((x ^ y) & 0xFF)
                            });
                        }
                    }
                }
            })
        }
        Behavior::Passthrough => {
            let &(_, kind) = inputs
                .first()
                .ok_or("passthrough needs at least one input")?;
            require(
                outputs.iter().any(|&(_, k)| k == kind),
                &format!("passthrough needs an output of kind {kind}"),
            )?;
            Box::new(|ctx: &mut RenderContext<'_>, clip: Rect| {
                let Some(src) = ctx.inputs().next() else {
                    return;
                };
                for dst in ctx.outputs_mut() {
                    match (dst, src) {
                        (Buffer::Indexed(d), Buffer::Indexed(s)) => d.copy_rect_from(s, &clip),
                        (Buffer::Rgb(d), Buffer::Rgb(s)) => d.copy_rect_from(s, &clip),
                        _ => {}
                    }
                }
            })
        }
        Behavior::Overlay => {
            let &(_, kind) = inputs.first().ok_or("overlay needs at least one input")?;
            require(!outputs.is_empty(), "overlay needs at least one output")?;
            require(
                inputs.iter().all(|&(_, k)| k == kind) && outputs.iter().all(|&(_, k)| k == kind),
                "overlay ports must all share one pixel kind",
            )?;
            Box::new(|ctx: &mut RenderContext<'_>, clip: Rect| {
                let layers: Vec<&Buffer> = ctx.inputs().collect();
                for dst in ctx.outputs_mut() {
                    match dst {
                        Buffer::Indexed(d) => overlay(&typed::<u16>(&layers), d, &clip),
                        Buffer::Rgb(d) => overlay(&typed::<u32>(&layers), d, &clip),
                    }
                }
            })
        }
        Behavior::Palette { colors } => {
            require(
                inputs.len() == 1 && inputs[0].1 == PixelKind::Indexed,
                "palette needs exactly one indexed input",
            )?;
            require(
                !outputs.is_empty() && outputs.iter().all(|&(_, k)| k == PixelKind::Rgb),
                "palette outputs must be rgb",
            )?;
            let colors: Vec<u32> = colors.iter().map(|c| c & 0x00FF_FFFF).collect();
            let input = inputs[0].0;
            Box::new(move |ctx: &mut RenderContext<'_>, clip: Rect| {
                let src = ctx.input::<u16>(input);
                for dst in ctx.outputs_mut() {
                    if let Buffer::Rgb(d) = dst {
                        paint(d, &clip, |x, y| {
                            colors
                                .get(usize::from(src.pixel(x, y)))
                                .copied()
                                .unwrap_or(0)
                        });
                    }
                }
            })
        }
    };
    Ok(Some(callback))
}

fn require(ok: bool, message: &str) -> Result<(), String> {
    if ok { Ok(()) } else { Err(message.to_owned()) }
}

fn paint<P: Pixel>(dst: &mut Bitmap<P>, clip: &Rect, mut pixel: impl FnMut(u32, u32) -> P) {
    for y in clip.top..clip.bottom {
        let row = dst.row_mut(y);
        for x in clip.left..clip.right {
            row[x as usize] = pixel(x, y);
        }
    }
}

fn typed<'b, P: Pixel>(buffers: &[&'b Buffer]) -> Vec<&'b Bitmap<P>> {
    buffers.iter().filter_map(|&b| P::bitmap(b)).collect()
}

fn overlay<P: Pixel>(layers: &[&Bitmap<P>], dst: &mut Bitmap<P>, clip: &Rect) {
    paint(dst, clip, |x, y| {
        layers
            .iter()
            .map(|layer| layer.pixel(x, y))
            .filter(|&p| p != P::default())
            .last()
            .unwrap_or_default()
    });
}
