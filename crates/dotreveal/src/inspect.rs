use anyhow::{Context, Result};
use dotmatrix::effect::gradient_program;
use renderer::{BlendMode, ShaderProgram, UniformValue, Viewport};
use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::{InspectArgs, ShaderArgs};
use crate::run::{resolve_effect, ResolvedEffect};

#[derive(Debug, Serialize)]
struct UniformReport<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    value: Value,
}

#[derive(Debug, Serialize)]
struct LayerReport<'a> {
    label: &'a str,
    blend: &'static str,
    uniforms: Vec<UniformReport<'a>>,
}

#[derive(Debug, Serialize)]
struct SceneReport<'a> {
    resolution: [f32; 2],
    background: [f32; 3],
    layers: Vec<LayerReport<'a>>,
}

fn blend_name(blend: BlendMode) -> &'static str {
    match blend {
        BlendMode::Additive => "additive",
        BlendMode::Premultiplied => "premultiplied",
    }
}

fn uniform_json(value: &UniformValue) -> Value {
    match value {
        UniformValue::Float(value) => json!(value),
        UniformValue::FloatArray(values) => json!(values),
        UniformValue::Vec3Array(values) => json!(values),
    }
}

fn layer_report(program: &ShaderProgram) -> LayerReport<'_> {
    LayerReport {
        label: &program.label,
        blend: blend_name(program.blend),
        uniforms: program
            .uniforms
            .iter()
            .map(|(name, value)| UniformReport {
                name,
                kind: value.kind().as_str(),
                value: uniform_json(value),
            })
            .collect(),
    }
}

pub fn print_uniforms(args: InspectArgs) -> Result<()> {
    let ResolvedEffect { config, effect } = resolve_effect(&args.effect)?;
    let (width, height) = args.size.unwrap_or_else(|| config.surface_size());
    let scene = effect
        .compose()
        .context("failed to generate reveal effect shaders")?;

    let report = SceneReport {
        resolution: Viewport::new(width as f32, height as f32).resolution(),
        background: scene.background,
        layers: scene.layers.iter().map(layer_report).collect(),
    };
    let text = serde_json::to_string_pretty(&report).context("failed to serialise uniforms")?;
    println!("{text}");
    Ok(())
}

pub fn print_shader(args: ShaderArgs) -> Result<()> {
    let ResolvedEffect { effect, .. } = resolve_effect(&args.effect)?;
    let program = if args.overlay {
        gradient_program()
    } else {
        effect
            .pattern()
            .program()
            .context("failed to generate dot matrix shader")?
    };
    renderer::validate_program(&program)?;
    let source = if args.vertex {
        &program.vertex
    } else {
        &program.fragment
    };
    print!("{source}");
    Ok(())
}
