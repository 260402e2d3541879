//! CPU evaluation of the generated programs, used for still exports and to
//! pin the grid arithmetic in tests.

use renderer::{Viewport, HIGH_DENSITY_SCALE};

use crate::color::PALETTE_SLOTS;
use crate::effect::{RevealEffect, GRADIENT_COLOR, GRADIENT_STOP};
use crate::opacity::{OpacityTable, OPACITY_SLOTS};
use crate::pattern::{center_offset, CenterAxes, DotMatrix, FLICKER_PERIOD};
use crate::reveal::{
    RevealExpression, INTRO_DISTANCE_WEIGHT, INTRO_JITTER_WEIGHT, INTRO_SETTLE,
};

const PHI: f32 = 1.618_034;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SampleError {
    #[error("custom reveal expressions can only be evaluated on the GPU")]
    CustomReveal,
    #[error("viewport {width}x{height} has no pixels")]
    EmptyViewport { width: f32, height: f32 },
    #[error("viewport {width}x{height} exceeds the limit of {} pixels", MAX_SAMPLED_PIXELS)]
    TooLarge { width: f32, height: f32 },
}

/// Largest number of logical pixels [`EffectSampler`] will render.
pub const MAX_SAMPLED_PIXELS: f64 = 8192.0 * 8192.0;

fn fract(value: f32) -> f32 {
    value - value.floor()
}

fn step(edge: f32, value: f32) -> f32 {
    if value < edge {
        0.0
    } else {
        1.0
    }
}

/// GLSL `int()` on a bucket scale, clamped into `0..slots`.
fn bucket(value: f32, slots: usize) -> usize {
    let scaled = value * slots as f32;
    if scaled.is_nan() || scaled <= 0.0 {
        0
    } else {
        (scaled.trunc() as usize).min(slots - 1)
    }
}

/// Per-cell hash shared with the fragment program.
pub fn random(cell: [f32; 2]) -> f32 {
    let length = cell[0].hypot(cell[1]);
    let distance = length * (PHI - 1.0).abs();
    fract((distance * 0.5).tan() * cell[0])
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Reveal {
    Always,
    Intro { animation_speed: f32 },
}

/// Evaluates the dot matrix for one viewport.
#[derive(Debug, Clone)]
pub struct PatternSampler {
    palette: [[f32; 3]; PALETTE_SLOTS],
    opacities: OpacityTable,
    cell_size: f32,
    dot_size: f32,
    offset: [f32; 2],
    resolution: [f32; 2],
    reveal: Reveal,
}

impl PatternSampler {
    pub fn new(matrix: &DotMatrix, viewport: Viewport) -> Result<Self, SampleError> {
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return Err(SampleError::EmptyViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        let reveal = match &matrix.reveal {
            RevealExpression::None => Reveal::Always,
            RevealExpression::Intro { animation_speed } => Reveal::Intro {
                animation_speed: *animation_speed,
            },
            RevealExpression::Custom(_) => return Err(SampleError::CustomReveal),
        };
        let resolution = viewport.resolution();
        let CenterAxes { x, y } = matrix.center;
        let axis_offset = |enabled: bool, extent: f32| {
            if enabled {
                center_offset(extent, matrix.cell_size, matrix.dot_size)
            } else {
                0.0
            }
        };

        Ok(Self {
            palette: matrix.palette.normalized(),
            opacities: matrix.opacities,
            cell_size: matrix.cell_size,
            dot_size: matrix.dot_size,
            offset: [axis_offset(x, resolution[0]), axis_offset(y, resolution[1])],
            resolution,
            reveal,
        })
    }

    pub fn resolution(&self) -> [f32; 2] {
        self.resolution
    }

    /// Premultiplied RGBA at `frag`, given in top-left-origin resolution
    /// pixels.
    pub fn sample(&self, frag: [f32; 2], time: f32) -> [f32; 4] {
        let st = [frag[0] - self.offset[0], frag[1] - self.offset[1]];
        let mut opacity = step(0.0, st[0]) * step(0.0, st[1]);

        let cell = [
            (st[0] / self.cell_size).floor(),
            (st[1] / self.cell_size).floor(),
        ];

        let show_offset = random(cell);
        let generation = (time / FLICKER_PERIOD + show_offset + FLICKER_PERIOD).floor();
        let rand = random([cell[0] * generation + 1.0, cell[1] * generation + 1.0]);
        opacity *= self.opacities.get(bucket(rand, OPACITY_SLOTS));

        let footprint = self.dot_size / self.cell_size;
        opacity *= 1.0 - step(footprint, fract(st[0] / self.cell_size));
        opacity *= 1.0 - step(footprint, fract(st[1] / self.cell_size));

        let color = self.palette[bucket(show_offset, PALETTE_SLOTS)];

        if let Reveal::Intro { animation_speed } = self.reveal {
            opacity *= self.intro_factor(cell, time * animation_speed);
        }

        [color[0] * opacity, color[1] * opacity, color[2] * opacity, opacity]
    }

    fn intro_factor(&self, cell: [f32; 2], progress: f32) -> f32 {
        let center = [
            self.resolution[0] / 2.0 / self.cell_size,
            self.resolution[1] / 2.0 / self.cell_size,
        ];
        let distance = (center[0] - cell[0]).hypot(center[1] - cell[1]);
        let intro_offset =
            distance * INTRO_DISTANCE_WEIGHT + random(cell) * INTRO_JITTER_WEIGHT;
        let shown = step(intro_offset, progress);
        let overshoot =
            ((1.0 - step(intro_offset + INTRO_SETTLE, progress)) * 1.25).clamp(1.0, 1.25);
        shown * overshoot
    }
}

/// Premultiplied overlay colour at a row, `frag_y` in top-left-origin
/// resolution pixels.
pub fn gradient_sample(frag_y: f32, resolution_y: f32) -> [f32; 4] {
    let from_bottom = 1.0 - frag_y / resolution_y;
    let alpha = 1.0 - (from_bottom / GRADIENT_STOP).clamp(0.0, 1.0);
    let [r, g, b] = GRADIENT_COLOR.normalized();
    [r * alpha, g * alpha, b * alpha, alpha]
}

/// `src * src_alpha + dst`.
pub fn blend_additive(dst: [f32; 3], src: [f32; 4]) -> [f32; 3] {
    std::array::from_fn(|channel| dst[channel] + src[channel] * src[3])
}

/// `src + dst * (1 - src_alpha)`.
pub fn blend_premultiplied(dst: [f32; 3], src: [f32; 4]) -> [f32; 3] {
    std::array::from_fn(|channel| src[channel] + dst[channel] * (1.0 - src[3]))
}

/// Composites a whole [`RevealEffect`] the way the window draws it.
#[derive(Debug, Clone)]
pub struct EffectSampler {
    pattern: PatternSampler,
    background: [f32; 3],
    show_gradient: bool,
    viewport: Viewport,
}

impl EffectSampler {
    pub fn new(effect: &RevealEffect, viewport: Viewport) -> Result<Self, SampleError> {
        let pixels = f64::from(viewport.width.round()) * f64::from(viewport.height.round());
        if !pixels.is_finite() || pixels > MAX_SAMPLED_PIXELS {
            return Err(SampleError::TooLarge {
                width: viewport.width,
                height: viewport.height,
            });
        }
        Ok(Self {
            pattern: PatternSampler::new(&effect.pattern(), viewport)?,
            background: effect.container.background.normalized(),
            show_gradient: effect.show_gradient,
            viewport,
        })
    }

    /// Final colour of the logical pixel at column `x`, row `y`.
    pub fn pixel(&self, x: u32, y: u32, time: f32) -> [u8; 3] {
        let frag = [
            (x as f32 + 0.5) * HIGH_DENSITY_SCALE,
            (y as f32 + 0.5) * HIGH_DENSITY_SCALE,
        ];
        let mut color = blend_additive(self.background, self.pattern.sample(frag, time));
        if self.show_gradient {
            color = blend_premultiplied(
                color,
                gradient_sample(frag[1], self.pattern.resolution()[1]),
            );
        }
        color.map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    /// Row-major RGB8 buffer covering the viewport.
    pub fn render_rgb(&self, time: f32) -> (u32, u32, Vec<u8>) {
        let width = self.viewport.width.round().max(1.0) as u32;
        let height = self.viewport.height.round().max(1.0) as u32;
        let mut buffer = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                buffer.extend_from_slice(&self.pixel(x, y, time));
            }
        }
        tracing::debug!(width, height, time, "sampled effect on the CPU");
        (width, height, buffer)
    }
}
