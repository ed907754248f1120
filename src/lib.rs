//! trigon
//!
//! Opens a window and draws a single triangle with a vertex/fragment shader
//! pair loaded from WGSL files on disk. The triangle's scale ping-pongs between
//! two bounds every frame and the surface follows window resizes.
//!
//! High-level modules
//! - `animation`: range remapping, the ping-pong scale oscillator and its uniform
//! - `app`: winit event loop and the [`app::run`] entry point
//! - `config`: window, shader paths, clear colour and animation bounds
//! - `context`: GPU device, queue and window surface
//! - `geometry`: the vertex type and the fixed triangle
//! - `pipelines`: render pipeline and buffers for the triangle
//! - `shader`: shader file loading, compilation and linking
//!

pub mod animation;
pub mod app;
#[cfg(feature = "integration-tests")]
pub mod capture;
pub mod config;
pub mod context;
pub mod geometry;
pub mod pipelines;
pub mod shader;

pub use config::Config;
