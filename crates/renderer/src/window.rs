use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::GpuState;
use crate::runtime::{time_source_for_policy, BoxedTimeSource};
use crate::types::RendererConfig;

/// Mounted surface: GPU resources, the window they draw into, and the clock
/// feeding them.
///
/// `gpu` is declared before `window` so the surface is released first.
pub(crate) struct WindowState {
    gpu: Option<GpuState>,
    window: Arc<Window>,
    time_source: BoxedTimeSource,
    scale_factor: f64,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let scale_factor = window.scale_factor();
        let gpu = GpuState::new(
            window.as_ref(),
            window.inner_size(),
            scale_factor,
            &config.layers,
            config.background,
            &config.policy,
        )?;
        let labels: Vec<_> = gpu.layer_labels().map(str::to_owned).collect();
        info!(layers = ?labels, "shader surface mounted");

        Ok(Self {
            gpu: Some(gpu),
            window,
            time_source: time_source_for_policy(&config.policy),
            scale_factor,
        })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(new_size, self.scale_factor);
        }
    }

    fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
        let size = self.window.inner_size();
        self.resize(size);
    }

    /// Advances the clock by one display tick and draws every layer.
    fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };
        let sample = self.time_source.sample();
        gpu.tick(sample);
        gpu.render()
    }

    fn recover_surface(&mut self) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.reconfigure();
        }
    }

    /// Releases the GPU resources ahead of the window.
    fn unmount(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            let viewport = gpu.viewport();
            drop(gpu);
            debug!(
                width = viewport.width,
                height = viewport.height,
                "shader surface released"
            );
        }
    }
}

/// Opens the window and drives the event loop until it closes.
pub(crate) fn run(config: &RendererConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let (width, height) = config.surface_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(LogicalSize::new(width.max(1), height.max(1)))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, config)?;
    state.window().request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } if is_escape_press(&event) => {
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => {
                    state.resize(new_size);
                }
                WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                    state.set_scale_factor(scale_factor);
                }
                WindowEvent::RedrawRequested => {
                    if let Err(err) = state.render_frame() {
                        match surface_recovery(&err) {
                            SurfaceRecovery::Reconfigure => state.recover_surface(),
                            SurfaceRecovery::Exit => {
                                error!("surface out of memory; closing window");
                                elwt.exit();
                            }
                            SurfaceRecovery::Retry => {
                                warn!(error = ?err, "surface error; retrying next frame");
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Event::AboutToWait => {
            state.window().request_redraw();
            elwt.set_control_flow(ControlFlow::Wait);
        }
        Event::LoopExiting => {
            state.unmount();
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

/// What the event loop does after a frame fails to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceRecovery {
    /// Reapply the current surface configuration; the size is unchanged.
    Reconfigure,
    Exit,
    Retry,
}

fn surface_recovery(err: &wgpu::SurfaceError) -> SurfaceRecovery {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceRecovery::Reconfigure,
        wgpu::SurfaceError::OutOfMemory => SurfaceRecovery::Exit,
        _ => SurfaceRecovery::Retry,
    }
}

fn is_escape_press(event: &KeyEvent) -> bool {
    event.state == ElementState::Pressed
        && matches!(event.logical_key, Key::Named(NamedKey::Escape))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_and_outdated_surfaces_are_reconfigured_once() {
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::Lost),
            SurfaceRecovery::Reconfigure
        );
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::Outdated),
            SurfaceRecovery::Reconfigure
        );
    }

    #[test]
    fn out_of_memory_closes_and_timeouts_retry() {
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::OutOfMemory),
            SurfaceRecovery::Exit
        );
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::Timeout),
            SurfaceRecovery::Retry
        );
    }
}
