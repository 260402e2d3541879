//! Top-level reveal effect: the dot matrix with an intro reveal and an
//! optional bottom-up fade layered over it.

use renderer::{
    BlendMode, RenderPolicy, RendererConfig, ShaderProgram, UniformSet, UniformValue,
    FULLSCREEN_RECT_VERTEX,
};

use crate::color::{Palette, Rgb};
use crate::opacity::{OpacityTable, DEFAULT_OPACITIES};
use crate::pattern::{CenterAxes, DotMatrix};
use crate::reveal::RevealExpression;
use crate::template::TemplateError;

pub const DEFAULT_ANIMATION_SPEED: f32 = 0.3;
pub const DEFAULT_EFFECT_DOT_SIZE: f32 = 4.0;
pub const DEFAULT_COLORS: [Rgb; 3] = [
    Rgb::new(255, 215, 0),
    Rgb::new(255, 191, 0),
    Rgb::new(218, 165, 32),
];

/// Colour the overlay fades in from at the bottom edge.
pub const GRADIENT_COLOR: Rgb = Rgb::new(3, 7, 18);
/// Fraction of the height, measured from the bottom, where the overlay
/// becomes fully transparent.
pub const GRADIENT_STOP: f32 = 0.84;

pub const GRADIENT_COLOR_UNIFORM: &str = "u_gradient_color";
pub const GRADIENT_STOP_UNIFORM: &str = "u_gradient_stop";

const GRADIENT_FRAGMENT: &str = r"layout(location = 0) in vec2 fragCoord;
layout(location = 0) out vec4 fragColor;

void main() {
    float from_bottom = 1.0 - fragCoord.y / u_resolution.y;
    float alpha = 1.0 - clamp(from_bottom / u_gradient_stop, 0.0, 1.0);
    fragColor = vec4(u_gradient_color[0] * alpha, alpha);
}
";

/// Styling of the surface the effect fills.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerStyle {
    pub background: Rgb,
    pub title: String,
}

impl Default for ContainerStyle {
    fn default() -> Self {
        Self {
            background: Rgb::new(0, 0, 0),
            title: "dotreveal".to_string(),
        }
    }
}

/// Layers and surface styling ready for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectScene {
    /// Back to front.
    pub layers: Vec<ShaderProgram>,
    pub background: [f32; 3],
    pub title: String,
}

impl EffectScene {
    pub fn into_renderer_config(
        self,
        surface_size: (u32, u32),
        policy: RenderPolicy,
    ) -> RendererConfig {
        RendererConfig {
            surface_size,
            title: self.title,
            background: self.background,
            layers: self.layers,
            policy,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevealEffect {
    pub animation_speed: f32,
    pub opacities: OpacityTable,
    pub palette: Palette,
    pub dot_size: f32,
    pub show_gradient: bool,
    pub container: ContainerStyle,
    /// Replaces the intro reveal when set.
    pub reveal_override: Option<RevealExpression>,
}

impl Default for RevealEffect {
    fn default() -> Self {
        Self {
            animation_speed: DEFAULT_ANIMATION_SPEED,
            opacities: OpacityTable::from_values(&DEFAULT_OPACITIES),
            palette: Palette::from_colors(&DEFAULT_COLORS),
            dot_size: DEFAULT_EFFECT_DOT_SIZE,
            show_gradient: true,
            container: ContainerStyle::default(),
            reveal_override: None,
        }
    }
}

impl RevealEffect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_animation_speed(mut self, speed: f32) -> Self {
        self.animation_speed = speed;
        self
    }

    pub fn with_opacities(mut self, opacities: &[f32]) -> Self {
        self.opacities = OpacityTable::from_values(opacities);
        self
    }

    pub fn with_colors(mut self, colors: &[Rgb]) -> Self {
        self.palette = Palette::from_colors(colors);
        self
    }

    pub fn with_dot_size(mut self, dot_size: f32) -> Self {
        self.dot_size = dot_size;
        self
    }

    pub fn with_gradient(mut self, show: bool) -> Self {
        self.show_gradient = show;
        self
    }

    pub fn with_container(mut self, container: ContainerStyle) -> Self {
        self.container = container;
        self
    }

    pub fn with_reveal(mut self, reveal: RevealExpression) -> Self {
        self.reveal_override = Some(reveal);
        self
    }

    pub fn reveal_expression(&self) -> RevealExpression {
        self.reveal_override
            .clone()
            .unwrap_or_else(|| RevealExpression::intro(self.animation_speed))
    }

    pub fn pattern(&self) -> DotMatrix {
        DotMatrix::new()
            .with_palette(self.palette)
            .with_opacities(self.opacities)
            .with_dot_size(self.dot_size)
            .with_center(CenterAxes::BOTH)
            .with_reveal(self.reveal_expression())
    }

    pub fn compose(&self) -> Result<EffectScene, TemplateError> {
        let mut layers = vec![self.pattern().program()?];
        if self.show_gradient {
            layers.push(gradient_program());
        }
        tracing::debug!(
            layers = layers.len(),
            animation_speed = self.animation_speed,
            "composed reveal effect"
        );
        Ok(EffectScene {
            layers,
            background: self.container.background.normalized(),
            title: self.container.title.clone(),
        })
    }
}

/// Uniforms read by the overlay.
pub fn gradient_uniforms() -> UniformSet {
    let mut set = UniformSet::new();
    set.insert(
        GRADIENT_COLOR_UNIFORM,
        UniformValue::Vec3Array(vec![GRADIENT_COLOR.normalized()]),
    );
    set.insert(GRADIENT_STOP_UNIFORM, UniformValue::Float(GRADIENT_STOP));
    set
}

/// Opaque at the bottom edge, clear from [`GRADIENT_STOP`] upwards.
pub fn gradient_program() -> ShaderProgram {
    ShaderProgram {
        label: "gradient overlay".to_string(),
        vertex: FULLSCREEN_RECT_VERTEX.to_string(),
        fragment: GRADIENT_FRAGMENT.to_string(),
        uniforms: gradient_uniforms(),
        blend: BlendMode::Premultiplied,
    }
}
