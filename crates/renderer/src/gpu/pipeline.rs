use anyhow::{anyhow, Context, Result};
use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::ShaderStage;

use crate::compile::{compile_stage, wrap_glsl};
use crate::types::{BlendMode, ShaderProgram, Viewport};

use super::uniforms::{UniformBlock, UniformLayout};

/// Both stages of `program`, wrapped with the block generated from `layout`.
fn wrapped_stages(program: &ShaderProgram, layout: &UniformLayout) -> [(ShaderStage, String); 2] {
    let header = layout.glsl_header();
    [
        (ShaderStage::Vertex, wrap_glsl(&header, &program.vertex)),
        (ShaderStage::Fragment, wrap_glsl(&header, &program.fragment)),
    ]
}

/// Parses and validates a program's wrapped stages with naga.
///
/// Runs the same front end the pipeline uses, without a device.
pub fn validate_program(program: &ShaderProgram) -> Result<()> {
    let layout = UniformLayout::from_set(&program.uniforms)
        .with_context(|| format!("invalid uniforms for layer '{}'", program.label))?;
    for (stage, source) in wrapped_stages(program, &layout) {
        let module = glsl::Frontend::default()
            .parse(&glsl::Options::from(stage), &source)
            .map_err(|err| anyhow!("failed to parse {} {stage:?} stage: {err}", program.label))?;
        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .map_err(|err| {
                anyhow!("failed to validate {} {stage:?} stage: {err}", program.label)
            })?;
    }
    Ok(())
}

impl BlendMode {
    pub(crate) fn to_wgpu(self) -> wgpu::BlendState {
        match self {
            BlendMode::Additive => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
            BlendMode::Premultiplied => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        }
    }
}

/// Compiled pipeline plus the uniform buffer feeding it.
pub(crate) struct LayerPipeline {
    pub label: String,
    pub pipeline: wgpu::RenderPipeline,
    pub uniforms: UniformBlock,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl LayerPipeline {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        program: &ShaderProgram,
        viewport: Viewport,
    ) -> Result<Self> {
        let uniforms = UniformBlock::new(&program.uniforms, viewport)
            .with_context(|| format!("invalid uniforms for layer '{}'", program.label))?;
        let [(_, vertex), (_, fragment)] = wrapped_stages(program, uniforms.layout());

        let vertex_module = compile_stage(
            device,
            &format!("{} vertex", program.label),
            vertex,
            ShaderStage::Vertex,
        )?;
        let fragment_module = compile_stage(
            device,
            &format!("{} fragment", program.label),
            fragment,
            ShaderStage::Fragment,
        )
        .with_context(|| format!("failed to compile layer '{}'", program.label))?;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform buffer"),
            size: uniforms.layout().size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("layer pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&program.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(program.blend.to_wgpu()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            label: program.label.clone(),
            pipeline,
            uniforms,
            uniform_buffer,
            bind_group,
        })
    }

    /// Uploads the CPU uniform mirror if anything changed since the last call.
    pub fn flush_uniforms(&mut self, queue: &wgpu::Queue) {
        if self.uniforms.take_dirty() {
            queue.write_buffer(&self.uniform_buffer, 0, self.uniforms.bytes());
        }
    }
}
