use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, trace};
use winit::dpi::PhysicalSize;

use crate::compile::FULLSCREEN_RECT_VERTICES;
use crate::runtime::{RenderPolicy, SurfaceClock, TimeSample};
use crate::types::{ShaderProgram, Viewport};

use super::context::GpuContext;
use super::pipeline::LayerPipeline;

/// Converts a physical window size into the logical viewport.
pub(crate) fn logical_viewport(size: PhysicalSize<u32>, scale_factor: f64) -> Viewport {
    let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    };
    let logical = size.to_logical::<f64>(scale);
    Viewport::new(logical.width as f32, logical.height as f32)
}

/// Owns every GPU resource behind one window.
///
/// Dropping the state releases pipelines, buffers, and the surface.
pub(crate) struct GpuState {
    layers: Vec<LayerPipeline>,
    context: GpuContext,
    background: wgpu::Color,
    viewport: Viewport,
    clock: SurfaceClock,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        scale_factor: f64,
        programs: &[ShaderProgram],
        background: [f32; 3],
        policy: &RenderPolicy,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size)?;
        let viewport = logical_viewport(context.size, scale_factor);
        let clock = SurfaceClock::for_policy(policy);
        let mut layers = programs
            .iter()
            .map(|program| {
                LayerPipeline::new(&context.device, context.surface_format, program, viewport)
            })
            .collect::<Result<Vec<_>>>()?;
        for layer in &mut layers {
            layer.uniforms.set_time(clock.time());
        }
        debug!(
            layers = layers.len(),
            width = viewport.width,
            height = viewport.height,
            max_fps = clock.max_fps(),
            time = clock.time(),
            "surface mounted"
        );

        Ok(Self {
            layers,
            context,
            background: wgpu::Color {
                r: f64::from(background[0]),
                g: f64::from(background[1]),
                b: f64::from(background[2]),
                a: 1.0,
            },
            viewport,
            clock,
        })
    }

    pub(crate) fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>, scale_factor: f64) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        self.viewport = logical_viewport(new_size, scale_factor);
        let resolution = self.viewport.resolution();
        for layer in &mut self.layers {
            layer.uniforms.set_resolution(resolution);
        }
        debug!(?resolution, "surface resized");
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    /// Feeds one display tick through the frame-rate gate.
    ///
    /// Returns whether `u_time` changed.
    pub(crate) fn tick(&mut self, sample: TimeSample) -> bool {
        if !self.clock.tick(sample.seconds) {
            trace!(
                seconds = sample.seconds,
                frame = sample.frame_index,
                "tick skipped by frame cap"
            );
            return false;
        }
        let time = self.clock.time();
        for layer in &mut self.layers {
            layer.uniforms.set_time(time);
        }
        true
    }

    pub(crate) fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        for layer in &mut self.layers {
            layer.flush_uniforms(&self.context.queue);
        }

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("surface pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            for layer in &self.layers {
                render_pass.set_pipeline(&layer.pipeline);
                render_pass.set_bind_group(0, &layer.bind_group, &[]);
                render_pass.draw(0..FULLSCREEN_RECT_VERTICES, 0..1);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub(crate) fn layer_labels(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_viewport_divides_by_scale_factor() {
        let viewport = logical_viewport(PhysicalSize::new(2560, 1440), 2.0);
        assert_eq!(viewport, Viewport::new(1280.0, 720.0));
        assert_eq!(viewport.resolution(), [2560.0, 1440.0]);
    }

    #[test]
    fn invalid_scale_factor_is_treated_as_one() {
        let viewport = logical_viewport(PhysicalSize::new(800, 600), 0.0);
        assert_eq!(viewport, Viewport::new(800.0, 600.0));
    }
}
