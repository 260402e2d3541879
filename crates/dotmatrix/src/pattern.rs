//! Grid-of-dots fragment program and the uniforms it reads.

use renderer::{BlendMode, ShaderProgram, UniformSet, UniformValue, FULLSCREEN_RECT_VERTEX};

use crate::color::{Palette, PALETTE_SLOTS};
use crate::opacity::{OpacityTable, OPACITY_SLOTS};
use crate::reveal::RevealExpression;
use crate::template::{ShaderTemplate, TemplateError};

/// Width and height of one grid cell in resolution pixels.
pub const DEFAULT_CELL_SIZE: f32 = 20.0;
/// Side of the lit square inside each cell.
pub const DEFAULT_DOT_SIZE: f32 = 2.0;
/// Time units between re-rolls of a cell's opacity bucket.
pub const FLICKER_PERIOD: f32 = 5.0;

pub const COLORS_UNIFORM: &str = "u_colors";
pub const OPACITIES_UNIFORM: &str = "u_opacities";
pub const TOTAL_SIZE_UNIFORM: &str = "u_total_size";
pub const DOT_SIZE_UNIFORM: &str = "u_dot_size";

const FRAGMENT_SKELETON: &str = r"layout(location = 0) in vec2 fragCoord;
layout(location = 0) out vec4 fragColor;

const float PHI = 1.61803398874989484820459;
const int PALETTE_SLOTS = $PALETTE_SLOTS;
const int OPACITY_SLOTS = $OPACITY_SLOTS;

float random(vec2 xy) {
    return fract(tan(distance(xy * PHI, xy) * 0.5) * xy.x);
}

void main() {
    vec2 st = fragCoord;
{{center_x}}{{center_y}}
    float opacity = step(0.0, st.x);
    opacity *= step(0.0, st.y);

    vec2 st2 = floor(st / u_total_size);

    float frequency = $FLICKER_PERIOD;
    float show_offset = random(st2);
    float rand = random(st2 * floor((u_time / frequency) + show_offset + frequency) + 1.0);
    opacity *= u_opacities[clamp(int(rand * float(OPACITY_SLOTS)), 0, OPACITY_SLOTS - 1)];
    opacity *= 1.0 - step(u_dot_size / u_total_size, fract(st.x / u_total_size));
    opacity *= 1.0 - step(u_dot_size / u_total_size, fract(st.y / u_total_size));

    vec3 color = u_colors[clamp(int(show_offset * float(PALETTE_SLOTS)), 0, PALETTE_SLOTS - 1)];

{{reveal}}
    fragColor = vec4(color, opacity);
    fragColor.rgb *= fragColor.a;
}
";

const CENTER_X: &str = "    st.x -= floor((mod(u_resolution.x, u_total_size) - u_dot_size) * 0.5);\n";
const CENTER_Y: &str = "    st.y -= floor((mod(u_resolution.y, u_total_size) - u_dot_size) * 0.5);\n";

/// Axes along which the grid is shifted so the leftover margin is split
/// evenly between both edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CenterAxes {
    pub x: bool,
    pub y: bool,
}

impl CenterAxes {
    pub const BOTH: Self = Self { x: true, y: true };
    pub const NONE: Self = Self { x: false, y: false };
}

impl Default for CenterAxes {
    fn default() -> Self {
        Self::BOTH
    }
}

/// Shift applied to one axis before the cell index is computed.
///
/// Mirrors the GLSL `floor((mod(resolution, cell) - dot) * 0.5)`.
pub fn center_offset(resolution: f32, cell_size: f32, dot_size: f32) -> f32 {
    ((resolution.rem_euclid(cell_size) - dot_size) * 0.5).floor()
}

/// Parameters of the dot grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DotMatrix {
    pub palette: Palette,
    pub opacities: OpacityTable,
    pub cell_size: f32,
    pub dot_size: f32,
    pub center: CenterAxes,
    pub reveal: RevealExpression,
}

impl Default for DotMatrix {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            opacities: OpacityTable::default(),
            cell_size: DEFAULT_CELL_SIZE,
            dot_size: DEFAULT_DOT_SIZE,
            center: CenterAxes::default(),
            reveal: RevealExpression::None,
        }
    }
}

impl DotMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_opacities(mut self, opacities: OpacityTable) -> Self {
        self.opacities = opacities;
        self
    }

    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_dot_size(mut self, dot_size: f32) -> Self {
        self.dot_size = dot_size;
        self
    }

    pub fn with_center(mut self, center: CenterAxes) -> Self {
        self.center = center;
        self
    }

    pub fn with_reveal(mut self, reveal: RevealExpression) -> Self {
        self.reveal = reveal;
        self
    }

    /// Fragment program with centering and reveal statements filled in.
    pub fn fragment_source(&self) -> Result<String, TemplateError> {
        let skeleton = FRAGMENT_SKELETON
            .replace("$PALETTE_SLOTS", &PALETTE_SLOTS.to_string())
            .replace("$OPACITY_SLOTS", &OPACITY_SLOTS.to_string())
            .replace("$FLICKER_PERIOD", &crate::reveal::glsl_float(FLICKER_PERIOD));
        let template = ShaderTemplate::parse(&skeleton)?;
        let reveal = self.reveal.glsl();
        template.render(&[
            ("center_x", if self.center.x { CENTER_X } else { "" }),
            ("center_y", if self.center.y { CENTER_Y } else { "" }),
            ("reveal", &reveal),
        ])
    }

    /// Uniforms in block order.
    pub fn uniforms(&self) -> UniformSet {
        let mut set = UniformSet::new();
        set.insert(
            COLORS_UNIFORM,
            UniformValue::Vec3Array(self.palette.normalized().to_vec()),
        );
        set.insert(
            OPACITIES_UNIFORM,
            UniformValue::FloatArray(self.opacities.values().to_vec()),
        );
        set.insert(TOTAL_SIZE_UNIFORM, UniformValue::Float(self.cell_size));
        set.insert(DOT_SIZE_UNIFORM, UniformValue::Float(self.dot_size));
        set
    }

    pub fn program(&self) -> Result<ShaderProgram, TemplateError> {
        let fragment = self.fragment_source()?;
        tracing::debug!(
            cell_size = self.cell_size,
            dot_size = self.dot_size,
            center_x = self.center.x,
            center_y = self.center.y,
            bytes = fragment.len(),
            "generated dot matrix program"
        );
        Ok(ShaderProgram {
            label: "dot matrix".to_string(),
            vertex: FULLSCREEN_RECT_VERTEX.to_string(),
            fragment,
            uniforms: self.uniforms(),
            blend: BlendMode::Additive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    #[test]
    fn rgb_palette_and_full_opacity_reach_the_uniforms() {
        let matrix = DotMatrix::new()
            .with_palette(Palette::from_colors(&[
                Rgb::new(255, 0, 0),
                Rgb::new(0, 255, 0),
                Rgb::new(0, 0, 255),
            ]))
            .with_opacities(OpacityTable::from_values(&[1.0; OPACITY_SLOTS]));
        let uniforms = matrix.uniforms();

        assert_eq!(
            uniforms.get(COLORS_UNIFORM),
            Some(&UniformValue::Vec3Array(vec![
                [1.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 0.0, 1.0],
            ]))
        );
        assert_eq!(
            uniforms.get(OPACITIES_UNIFORM),
            Some(&UniformValue::FloatArray(vec![1.0; OPACITY_SLOTS]))
        );
    }

    #[test]
    fn uniform_order_and_sizes_are_fixed() {
        let uniforms = DotMatrix::new()
            .with_opacities(OpacityTable::from_values(&[0.2, 0.4]))
            .uniforms();
        let names: Vec<_> = uniforms.iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            [COLORS_UNIFORM, OPACITIES_UNIFORM, TOTAL_SIZE_UNIFORM, DOT_SIZE_UNIFORM]
        );
        assert_eq!(uniforms.get(COLORS_UNIFORM).map(|v| v.len()), Some(6));
        assert_eq!(uniforms.get(OPACITIES_UNIFORM).map(|v| v.len()), Some(10));
        assert_eq!(
            uniforms.get(TOTAL_SIZE_UNIFORM),
            Some(&UniformValue::Float(DEFAULT_CELL_SIZE))
        );
    }

    #[test]
    fn center_offset_splits_the_remainder() {
        assert_eq!(center_offset(2570.0, 20.0, 2.0), 4.0);
        assert_eq!(center_offset(2560.0, 20.0, 2.0), -1.0);
        assert_eq!(center_offset(1001.0, 20.0, 4.0), -2.0);
    }

    #[test]
    fn centering_statements_follow_the_axes() {
        let both = DotMatrix::new().fragment_source().unwrap();
        assert!(both.contains(CENTER_X.trim()));
        assert!(both.contains(CENTER_Y.trim()));

        let only_y = DotMatrix::new()
            .with_center(CenterAxes { x: false, y: true })
            .fragment_source()
            .unwrap();
        assert!(!only_y.contains("st.x -="));
        assert!(only_y.contains("st.y -="));
    }

    #[test]
    fn fragment_source_is_fully_rendered() {
        let source = DotMatrix::new()
            .with_reveal(RevealExpression::intro(0.3))
            .fragment_source()
            .unwrap();
        assert!(!source.contains("{{"));
        assert!(!source.contains('$'));
        assert!(source.contains("const int OPACITY_SLOTS = 10;"));
        assert!(source.contains("float frequency = 5.0;"));
        assert!(source.contains("animation_speed_factor = 0.3;"));
        assert!(source.contains("fragColor.rgb *= fragColor.a;"));
    }

    #[test]
    fn program_uses_additive_blending() {
        let program = DotMatrix::new().program().unwrap();
        assert_eq!(program.blend, BlendMode::Additive);
        assert_eq!(program.vertex, FULLSCREEN_RECT_VERTEX);
    }

    #[test]
    fn custom_reveals_compile_with_naga() {
        let reveals = [
            "opacity *= step(1.0, u_time);",
            "float fade = smoothstep(0.0, 2.0, u_time - length(st2));\nopacity *= fade;",
            "color *= 0.5 + 0.5 * sin(u_time + show_offset);",
            "if (rand < 0.2) opacity = 0.0;",
        ];
        for source in reveals {
            let reveal = RevealExpression::custom(source).unwrap();
            let program = DotMatrix::new().with_reveal(reveal).program().unwrap();
            renderer::validate_program(&program)
                .unwrap_or_else(|err| panic!("{source}: {err:#}"));
        }
    }
}
