//! Frame composition engine for emulated video hardware.
//!
//! Each video chip of an emulated machine registers one or more
//! [`renderer::Renderer`]s with typed input and output ports. Machine wiring
//! code connects outputs to inputs (or binds inputs to constants), marks the
//! renderers that produce the displayed picture as targets, and the
//! [`manager::Manager`] takes care of the rest: it finds the renderers the
//! targets depend on, orders them so every producer runs before its
//! consumers, owns the intermediate pixel buffers and runs the whole chain
//! once per frame.

/// Pixel kinds, bitmaps, buffers and clip rectangles.
pub mod bitmap;

/// Configuration errors.
pub mod error;

/// Per-device registration facade.
pub mod interface;

/// Graph resolution, buffer ownership and per-frame execution.
pub mod manager;

/// Port handles and port descriptions.
pub mod port;

/// Render graph nodes and the context handed to their callbacks.
pub mod renderer;

pub use bitmap::{Bitmap, Buffer, Pixel, PixelKind, Rect};
pub use error::{PortRef, RenderError};
pub use interface::{DeviceId, RenderDevice, RenderInterface};
pub use manager::{Binding, Manager};
pub use port::{InputId, OutputId, Port, RendererId};
pub use renderer::{RenderContext, RenderFn, Renderer};
