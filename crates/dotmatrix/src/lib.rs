//! Dot-matrix reveal effect.
//!
//! [`RevealEffect`] is the configuration surface. It resolves colours and
//! opacities into fixed-size tables, builds a [`DotMatrix`] with an intro
//! [`RevealExpression`], and composes the layers handed to `renderer`:
//!
//! ```text
//!   RevealEffect ──compose()──▶ EffectScene { dot matrix, gradient overlay }
//!        │                              │
//!        └─pattern()─▶ DotMatrix ──program()──▶ ShaderProgram + UniformSet
//! ```
//!
//! [`sample`] evaluates the same arithmetic on the CPU for still exports.

pub mod color;
pub mod effect;
pub mod opacity;
pub mod pattern;
pub mod reveal;
pub mod sample;
pub mod template;

pub use color::{Palette, Rgb, GOLD, PALETTE_SLOTS};
pub use effect::{ContainerStyle, EffectScene, RevealEffect};
pub use opacity::{OpacityTable, DEFAULT_OPACITIES, OPACITY_SLOTS};
pub use pattern::{CenterAxes, DotMatrix};
pub use reveal::RevealExpression;
pub use sample::{EffectSampler, PatternSampler, SampleError};
pub use template::{ShaderTemplate, TemplateError};
