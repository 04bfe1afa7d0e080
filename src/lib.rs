//! Headless frontend for the frame composition engine.
//!
//! Machines are described as data (see [`machine`]) instead of being wired by
//! hand, which makes it possible to check and render a wiring without any
//! chip emulation attached.

/// Stock render callbacks usable from a machine description.
pub mod behavior;

/// Machine description format and loader.
pub mod machine;

/// PNG output of render buffers.
pub mod snapshot;
