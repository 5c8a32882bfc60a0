//! Platform-facing types and the traits the tiling core talks through.

pub mod event;
pub mod geometry;
pub mod headless;
pub mod overlay;
pub mod screen;
pub mod window_server;

#[cfg(test)]
pub(crate) mod testing;
