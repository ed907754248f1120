//! Render pipelines.
//!
//! - `triangle`: the shader pair, vertex/uniform buffers and bind group used to draw the triangle

pub mod triangle;
