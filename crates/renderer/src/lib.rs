//! Shader surface for dotreveal.
//!
//! The crate owns one window-sized rectangle per layer, compiles each layer's
//! GLSL through wgpu, and advances a shared `u_time` uniform once per display
//! refresh, capped by [`SurfaceClock`]. The overall flow is:
//!
//! ```text
//!   dotreveal / dotmatrix
//!          │ RendererConfig { layers: Vec<ShaderProgram>, .. }
//!          ▼
//!   Renderer::run ──▶ WindowState ──▶ winit event loop ──▶ render_frame()
//!                                          │
//!                                          ├─▶ SurfaceClock gate ─▶ u_time
//!                                          └─▶ resize ─▶ u_resolution = 2 × viewport
//! ```
//!
//! Uniform blocks are generated from each program's [`UniformSet`]; callers
//! write plain GLSL that refers to uniforms by name (`u_time`,
//! `u_resolution`, plus their own) and never declare them.

mod compile;
mod gpu;
mod runtime;
mod types;
mod window;

use anyhow::Result;

pub use compile::{wrap_glsl, FULLSCREEN_RECT_VERTEX};
pub use gpu::validate_program;
pub use runtime::{
    time_source_for_policy, BoxedTimeSource, FixedTimeSource, RenderPolicy, SurfaceClock,
    SystemTimeSource, TimeSample, TimeSource, DEFAULT_MAX_FPS,
};
pub use types::{
    BlendMode, RendererConfig, ShaderProgram, UniformKind, UniformSet, UniformValue, Viewport,
    HIGH_DENSITY_SCALE,
};

/// Entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the window and blocks until it is closed.
    ///
    /// Shader compilation and surface creation failures are returned without
    /// translation.
    pub fn run(&mut self) -> Result<()> {
        if self.config.layers.is_empty() {
            anyhow::bail!("renderer needs at least one layer to draw");
        }
        tracing::info!(
            width = self.config.surface_size.0,
            height = self.config.surface_size.1,
            policy = ?self.config.policy,
            "starting shader surface"
        );
        window::run(&self.config)
    }
}
