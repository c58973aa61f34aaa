//! GPU side of the window renderer.
//!
//! - `context` owns the wgpu instance, device and surface, and picks the
//!   surface format and MSAA sample count.
//! - `pipeline` builds the chrome and overlay pipelines that share one pass.
//! - `uniforms` mirrors the GLSL uniform blocks.
//! - `textures` decodes and uploads story images on first use.
//! - `state` implements [`crate::background::FrameSink`] on top of the above.

mod context;
mod pipeline;
mod state;
mod textures;
mod uniforms;

pub(crate) use state::GpuState;
