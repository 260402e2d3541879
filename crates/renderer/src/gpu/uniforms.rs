use anyhow::{bail, Result};

use crate::types::{UniformSet, UniformValue, Viewport};

/// Built-in uniform fed from the viewport.
pub(crate) const RESOLUTION_UNIFORM: &str = "u_resolution";
/// Built-in uniform fed from the surface clock.
pub(crate) const TIME_UNIFORM: &str = "u_time";

const BLOCK_INSTANCE: &str = "surface";
const MEMBER_PREFIX: &str = "block_";
const STD140_ARRAY_STRIDE: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldType {
    Float,
    Vec2,
    FloatArray(usize),
    Vec3Array(usize),
}

impl FieldType {
    fn alignment(self) -> usize {
        match self {
            FieldType::Float => 4,
            FieldType::Vec2 => 8,
            FieldType::FloatArray(_) | FieldType::Vec3Array(_) => STD140_ARRAY_STRIDE,
        }
    }

    fn size(self) -> usize {
        match self {
            FieldType::Float => 4,
            FieldType::Vec2 => 8,
            FieldType::FloatArray(len) | FieldType::Vec3Array(len) => len * STD140_ARRAY_STRIDE,
        }
    }

    fn declaration(self, member: &str) -> String {
        match self {
            FieldType::Float => format!("float {member};"),
            FieldType::Vec2 => format!("vec2 {member};"),
            FieldType::FloatArray(len) => format!("float {member}[{len}];"),
            FieldType::Vec3Array(len) => format!("vec3 {member}[{len}];"),
        }
    }
}

#[derive(Clone, Debug)]
struct Field {
    name: String,
    ty: FieldType,
    offset: usize,
}

/// std140 layout of one layer's uniform block.
///
/// `u_resolution` and `u_time` always lead the block; the program's own
/// uniforms follow in insertion order.
#[derive(Clone, Debug)]
pub(crate) struct UniformLayout {
    fields: Vec<Field>,
    size: usize,
}

impl UniformLayout {
    pub fn from_set(set: &UniformSet) -> Result<Self> {
        let mut fields = Vec::with_capacity(set.len() + 2);
        let mut cursor = 0usize;
        let mut push = |name: &str, ty: FieldType, fields: &mut Vec<Field>| {
            let offset = align_to(cursor, ty.alignment());
            cursor = offset + ty.size();
            fields.push(Field {
                name: name.to_string(),
                ty,
                offset,
            });
        };

        push(RESOLUTION_UNIFORM, FieldType::Vec2, &mut fields);
        push(TIME_UNIFORM, FieldType::Float, &mut fields);

        for (name, value) in set.iter() {
            if name == RESOLUTION_UNIFORM || name == TIME_UNIFORM {
                bail!("uniform '{name}' is reserved for the surface");
            }
            let ty = match value {
                UniformValue::Float(_) => FieldType::Float,
                UniformValue::FloatArray(values) if values.is_empty() => {
                    bail!("uniform array '{name}' must not be empty")
                }
                UniformValue::FloatArray(values) => FieldType::FloatArray(values.len()),
                UniformValue::Vec3Array(values) if values.is_empty() => {
                    bail!("uniform array '{name}' must not be empty")
                }
                UniformValue::Vec3Array(values) => FieldType::Vec3Array(values.len()),
            };
            push(name, ty, &mut fields);
        }

        Ok(Self {
            fields,
            size: align_to(cursor.max(1), 16),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// GLSL declaration of the block plus macros mapping plain uniform names
    /// onto block members.
    pub fn glsl_header(&self) -> String {
        let mut header =
            String::from("layout(std140, set = 0, binding = 0) uniform SurfaceUniforms {\n");
        for field in &self.fields {
            header.push_str("    ");
            header.push_str(&field.ty.declaration(&member_name(&field.name)));
            header.push('\n');
        }
        header.push_str("} ");
        header.push_str(BLOCK_INSTANCE);
        header.push_str(";\n\n");
        for field in &self.fields {
            header.push_str(&format!(
                "#define {name} {BLOCK_INSTANCE}.{member}\n",
                name = field.name,
                member = member_name(&field.name)
            ));
        }
        header
    }
}

fn member_name(name: &str) -> String {
    format!("{MEMBER_PREFIX}{name}")
}

fn align_to(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

/// CPU mirror of a layer's uniform buffer.
pub(crate) struct UniformBlock {
    layout: UniformLayout,
    bytes: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    pub fn new(set: &UniformSet, viewport: Viewport) -> Result<Self> {
        let layout = UniformLayout::from_set(set)?;
        let mut block = Self {
            bytes: vec![0u8; layout.size()],
            layout,
            dirty: true,
        };
        block.set_resolution(viewport.resolution());
        for (name, value) in set.iter() {
            block.write_value(name, value);
        }
        Ok(block)
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.write_floats(TIME_UNIFORM, &[seconds], 4);
    }

    pub fn set_resolution(&mut self, resolution: [f32; 2]) {
        self.write_floats(RESOLUTION_UNIFORM, &resolution, 4);
    }

    #[cfg(test)]
    pub fn time(&self) -> f32 {
        self.read_f32(TIME_UNIFORM, 0).unwrap_or_default()
    }

    #[cfg(test)]
    pub fn resolution(&self) -> [f32; 2] {
        [
            self.read_f32(RESOLUTION_UNIFORM, 0).unwrap_or_default(),
            self.read_f32(RESOLUTION_UNIFORM, 4).unwrap_or_default(),
        ]
    }

    /// Returns true once after any write, so callers upload only on change.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    fn write_value(&mut self, name: &str, value: &UniformValue) {
        match value {
            UniformValue::Float(value) => self.write_floats(name, &[*value], 4),
            UniformValue::FloatArray(values) => {
                self.write_floats(name, values, STD140_ARRAY_STRIDE)
            }
            UniformValue::Vec3Array(values) => {
                let Some(base) = self.layout.field(name).map(|field| field.offset) else {
                    return;
                };
                for (index, vector) in values.iter().enumerate() {
                    let offset = base + index * STD140_ARRAY_STRIDE;
                    self.bytes[offset..offset + 12]
                        .copy_from_slice(bytemuck::cast_slice(vector.as_slice()));
                }
                self.dirty = true;
            }
        }
    }

    fn write_floats(&mut self, name: &str, values: &[f32], stride: usize) {
        let Some(base) = self.layout.field(name).map(|field| field.offset) else {
            return;
        };
        for (index, value) in values.iter().enumerate() {
            let offset = base + index * stride;
            self.bytes[offset..offset + 4].copy_from_slice(bytemuck::bytes_of(value));
        }
        self.dirty = true;
    }

    #[cfg(test)]
    fn read_f32(&self, name: &str, byte_offset: usize) -> Option<f32> {
        let offset = self.layout.field(name)?.offset + byte_offset;
        let slice = self.bytes.get(offset..offset + 4)?;
        Some(bytemuck::pod_read_unaligned(slice))
    }
}
