//! GPU side of the shader surface.
//!
//! - `context` owns wgpu instance/device/surface wiring and reconfigures the
//!   swapchain when the window resizes.
//! - `uniforms` lays out each layer's std140 block (built-in `u_resolution`
//!   and `u_time` first, then the program's own uniforms) and keeps a CPU
//!   mirror that is uploaded only when it changes.
//! - `pipeline` compiles one layer's wrapped GLSL into a render pipeline with
//!   the layer's blend equation; `validate_program` runs the same sources
//!   through naga alone.
//! - `state` glues everything together: it gates time updates through the
//!   surface clock and draws all layers in one pass.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub use pipeline::validate_program;
pub(crate) use state::GpuState;
