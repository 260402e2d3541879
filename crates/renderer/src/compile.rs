use std::borrow::Cow;

use anyhow::{anyhow, Result};
use wgpu::naga::ShaderStage;

/// Vertex body shared by every layer: a full-window rectangle built from two
/// triangles, emitting `fragCoord` in top-left-origin pixels of
/// `u_resolution`.
pub const FULLSCREEN_RECT_VERTEX: &str = r"layout(location = 0) out vec2 fragCoord;

const vec2 positions[6] = vec2[6](
    vec2(-1.0, -1.0),
    vec2(1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    vec2 position = positions[gl_VertexIndex];
    fragCoord = (position + vec2(1.0)) * 0.5 * u_resolution;
    fragCoord.y = u_resolution.y - fragCoord.y;
    gl_Position = vec4(position, 0.0, 1.0);
}
";

/// Number of vertices drawn per layer.
pub(crate) const FULLSCREEN_RECT_VERTICES: u32 = 6;

/// Prepends the version directive and the generated uniform block.
///
/// `#line 1` keeps compiler diagnostics pointing at the caller's own source.
pub fn wrap_glsl(uniform_header: &str, body: &str) -> String {
    let body = strip_version(body);
    format!("#version 450\n{uniform_header}\n#line 1\n{body}")
}

fn strip_version(source: &str) -> Cow<'_, str> {
    if source
        .lines()
        .any(|line| line.trim_start().starts_with("#version"))
    {
        let mut stripped = String::with_capacity(source.len());
        for line in source.lines() {
            if line.trim_start().starts_with("#version") {
                continue;
            }
            stripped.push_str(line);
            stripped.push('\n');
        }
        Cow::Owned(stripped)
    } else {
        Cow::Borrowed(source)
    }
}

/// Compiles a wrapped GLSL stage through wgpu's naga frontend.
///
/// Validation errors reported by wgpu are returned as-is instead of reaching
/// the uncaptured error handler.
pub(crate) fn compile_stage(
    device: &wgpu::Device,
    label: &str,
    source: String,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule> {
    tracing::trace!(label, ?stage, bytes = source.len(), "compiling shader stage");
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source),
            stage,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(anyhow!("failed to compile {label}: {err}"));
    }
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_puts_header_before_body() {
        let wrapped = wrap_glsl("uniform block;", "void main() {}\n");
        let header_at = wrapped.find("uniform block;").expect("header");
        let body_at = wrapped.find("void main()").expect("body");
        assert!(wrapped.starts_with("#version 450\n"));
        assert!(header_at < body_at);
        assert!(wrapped.contains("#line 1\n"));
    }

    #[test]
    fn wrap_strips_caller_version_directive() {
        let wrapped = wrap_glsl("", "#version 300 es\nvoid main() {}\n");
        assert_eq!(wrapped.matches("#version").count(), 1);
        assert!(!wrapped.contains("300 es"));
    }

    #[test]
    fn vertex_maps_rect_into_top_left_pixels() {
        assert!(FULLSCREEN_RECT_VERTEX.contains("out vec2 fragCoord"));
        assert!(FULLSCREEN_RECT_VERTEX.contains("u_resolution.y - fragCoord.y"));
        assert!(FULLSCREEN_RECT_VERTEX.contains(&format!(
            "vec2 positions[{FULLSCREEN_RECT_VERTICES}]"
        )));
    }
}
