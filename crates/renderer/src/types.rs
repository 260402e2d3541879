use crate::runtime::RenderPolicy;

/// Multiplier applied to the logical viewport before it reaches `u_resolution`.
///
/// Fragment programs are authored against a high-density canvas, so the
/// resolution uniform always reports twice the logical viewport.
pub const HIGH_DENSITY_SCALE: f32 = 2.0;

/// Type tag that selects how a uniform is laid out in the GPU block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    /// A single `float`.
    Uniform1f,
    /// A `float[N]` array.
    Uniform1fv,
    /// A `vec3[N]` array.
    Uniform3fv,
}

impl UniformKind {
    /// Name used when reporting uniforms to humans or JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            UniformKind::Uniform1f => "uniform1f",
            UniformKind::Uniform1fv => "uniform1fv",
            UniformKind::Uniform3fv => "uniform3fv",
        }
    }
}

impl std::fmt::Display for UniformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value carried by a named uniform.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    FloatArray(Vec<f32>),
    Vec3Array(Vec<[f32; 3]>),
}

impl UniformValue {
    /// Returns the type tag matching this value.
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Uniform1f,
            UniformValue::FloatArray(_) => UniformKind::Uniform1fv,
            UniformValue::Vec3Array(_) => UniformKind::Uniform3fv,
        }
    }

    /// Number of array elements, or 1 for scalars.
    pub fn len(&self) -> usize {
        match self {
            UniformValue::Float(_) => 1,
            UniformValue::FloatArray(values) => values.len(),
            UniformValue::Vec3Array(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered mapping from uniform name to value.
///
/// Insertion order is significant: it fixes the field order of the
/// generated uniform block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformSet {
    entries: Vec<(String, UniformValue)>,
}

impl UniformSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a uniform, replacing the value in place if the name exists.
    pub fn insert(&mut self, name: impl Into<String>, value: UniformValue) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Blend equation used when a layer is composited onto the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// `src * src_alpha + dst * 1`. Used by the dot matrix, whose output is
    /// already premultiplied.
    Additive,
    /// `src * 1 + dst * (1 - src_alpha)`. Regular premultiplied over.
    Premultiplied,
}

/// Complete description of one full-window layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderProgram {
    /// Debug label forwarded to wgpu objects.
    pub label: String,
    /// GLSL 450 vertex body without the uniform header.
    pub vertex: String,
    /// GLSL 450 fragment body without the uniform header.
    pub fragment: String,
    pub uniforms: UniformSet,
    pub blend: BlendMode,
}

/// Logical size of the area the effect covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Value of the `u_resolution` uniform for this viewport.
    pub fn resolution(&self) -> [f32; 2] {
        [
            self.width * HIGH_DENSITY_SCALE,
            self.height * HIGH_DENSITY_SCALE,
        ]
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in logical pixels.
    pub surface_size: (u32, u32),
    /// Window title.
    pub title: String,
    /// Clear colour behind every layer, normalised RGB.
    pub background: [f32; 3],
    /// Layers drawn back to front.
    pub layers: Vec<ShaderProgram>,
    pub policy: RenderPolicy,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "dotreveal".to_string(),
            background: [0.0, 0.0, 0.0],
            layers: Vec::new(),
            policy: RenderPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_is_twice_the_viewport() {
        let viewport = Viewport::new(640.0, 360.0);
        assert_eq!(viewport.resolution(), [1280.0, 720.0]);
    }

    #[test]
    fn insert_replaces_existing_entry_in_place() {
        let mut set = UniformSet::new();
        set.insert("u_a", UniformValue::Float(1.0));
        set.insert("u_b", UniformValue::FloatArray(vec![1.0, 2.0]));
        set.insert("u_a", UniformValue::Float(3.0));

        let names: Vec<_> = set.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["u_a", "u_b"]);
        assert_eq!(set.get("u_a"), Some(&UniformValue::Float(3.0)));
    }

    #[test]
    fn kind_tags_follow_values() {
        assert_eq!(UniformValue::Float(0.0).kind(), UniformKind::Uniform1f);
        assert_eq!(
            UniformValue::FloatArray(vec![]).kind(),
            UniformKind::Uniform1fv
        );
        assert_eq!(
            UniformValue::Vec3Array(vec![[0.0; 3]]).kind(),
            UniformKind::Uniform3fv
        );
        assert_eq!(UniformKind::Uniform3fv.to_string(), "uniform3fv");
    }
}
