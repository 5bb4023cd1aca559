mod intrinsics;
mod writer;

use crate::back::targets::GlslVersion;
use crate::back::{InvocationArgument, ShaderBackend, StageInput};
use crate::error::{GraphErrorKind, LayoutErrorKind, ShaderGenError};
use crate::reflect::resources::ResourceKind;
use crate::reflect::semantics::BuiltinVariable;
use once_cell::sync::Lazy;
use shadergen_common::map::FastHashSet;
use shadergen_common::GroupSize;
use shadergen_program::{
    builtin, short_name, BinaryOperator, Literal, ParameterDirection, Symbol, TypeKind,
    TypeReference,
};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Default precision of floating point values, for GLSL ES targets.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum FloatPrecision {
    Low,
    Medium,
    #[default]
    High,
}

impl Display for FloatPrecision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FloatPrecision::Low => "lowp",
            FloatPrecision::Medium => "mediump",
            FloatPrecision::High => "highp",
        })
    }
}

/// Error returned when a float precision qualifier is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown float precision `{0}`")]
pub struct UnknownFloatPrecision(pub String);

impl FromStr for FloatPrecision {
    type Err = UnknownFloatPrecision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "low" | "lowp" => FloatPrecision::Low,
            "medium" | "mediump" => FloatPrecision::Medium,
            "high" | "highp" => FloatPrecision::High,
            _ => return Err(UnknownFloatPrecision(s.to_string())),
        })
    }
}

/// Options for GLSL generation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlslCompileOptions {
    pub version: GlslVersion,
    /// Negate the Y component of the vertex position, for targets with a flipped clip space.
    pub flip_vertex_y: bool,
    pub float_precision: FloatPrecision,
}

/// Generates GLSL source.
#[derive(Debug, Clone)]
pub struct GlslBackend {
    options: GlslCompileOptions,
    name: String,
}

impl GlslBackend {
    pub fn new(options: GlslCompileOptions) -> Self {
        GlslBackend {
            name: format!("glsl{}", options.version),
            options,
        }
    }

    pub fn version(&self) -> GlslVersion {
        self.options.version
    }

    pub fn options(&self) -> &GlslCompileOptions {
        &self.options
    }

    fn unmapped(&self, ty: &TypeReference) -> ShaderGenError {
        LayoutErrorKind::UnmappedType {
            ty: ty.to_string(),
            target: self.name.clone(),
        }
        .into()
    }

    fn map_primitive(&self, name: &str) -> Option<&'static str> {
        Some(match short_name(name) {
            builtin::BOOL => "bool",
            builtin::SBYTE | builtin::SHORT | builtin::INT | builtin::LONG => "int",
            builtin::BYTE | builtin::USHORT | builtin::UINT | builtin::ULONG => "uint",
            builtin::FLOAT => "float",
            builtin::DOUBLE if !self.version().is_es() => "double",
            builtin::VECTOR2 => "vec2",
            builtin::VECTOR3 => "vec3",
            builtin::VECTOR4 => "vec4",
            builtin::INT2 => "ivec2",
            builtin::INT3 => "ivec3",
            builtin::INT4 => "ivec4",
            builtin::UINT2 => "uvec2",
            builtin::UINT3 => "uvec3",
            builtin::UINT4 => "uvec4",
            builtin::MATRIX4X4 => "mat4",
            _ => return None,
        })
    }

    /// The GLSL type of an opaque resource, if the version can express it.
    pub(crate) fn map_resource(&self, kind: ResourceKind) -> Option<&'static str> {
        let version = self.version();
        if version.uses_descriptor_sets() {
            return Some(match kind {
                ResourceKind::Texture2D | ResourceKind::DepthTexture2D => "texture2D",
                ResourceKind::Texture2DArray | ResourceKind::DepthTexture2DArray => {
                    "texture2DArray"
                }
                ResourceKind::TextureCube => "textureCube",
                ResourceKind::Texture2DMS => "texture2DMS",
                ResourceKind::Sampler => "sampler",
                ResourceKind::SamplerComparison => "samplerShadow",
                ResourceKind::RWTexture2D => "image2D",
                _ => return None,
            });
        }
        Some(match kind {
            ResourceKind::Texture2D => "sampler2D",
            ResourceKind::Texture2DArray => "sampler2DArray",
            ResourceKind::TextureCube => "samplerCube",
            ResourceKind::Texture2DMS if !version.is_es() => "sampler2DMS",
            ResourceKind::DepthTexture2D => "sampler2DShadow",
            ResourceKind::DepthTexture2DArray => "sampler2DArrayShadow",
            ResourceKind::RWTexture2D if version.supports_storage() => "image2D",
            _ => return None,
        })
    }

    /// Whether the version can declare a resource of this kind.
    pub fn supports(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Uniform => true,
            ResourceKind::Sampler | ResourceKind::SamplerComparison => true,
            ResourceKind::StructuredBuffer
            | ResourceKind::RWStructuredBuffer
            | ResourceKind::AtomicBuffer => self.version().supports_storage(),
            kind => self.map_resource(kind).is_some(),
        }
    }
}

static RESERVED_WORDS: Lazy<FastHashSet<&'static str>> = Lazy::new(|| {
    [
        "active", "asm", "atomic_uint", "attribute", "bool", "break", "buffer", "case", "cast",
        "centroid", "class", "coherent", "common", "const", "continue", "default", "discard",
        "do", "double", "else", "enum", "extern", "external", "false", "filter", "fixed",
        "flat", "float", "for", "goto", "half", "highp", "if", "image2D", "in", "inline",
        "inout", "input", "int", "interface", "invariant", "layout", "long", "lowp", "main",
        "mat2", "mat3", "mat4", "mediump", "namespace", "noinline", "noperspective", "out",
        "output", "packed", "partition", "patch", "precise", "precision", "public", "readonly",
        "resource", "restrict", "return", "sample", "sampler", "sampler2D", "samplerCube",
        "shared", "short", "sizeof", "smooth", "static", "struct", "subroutine", "superp",
        "switch", "template", "texture", "texture2D", "this", "true", "typedef", "uint",
        "uniform", "union", "unsigned", "using", "vec2", "vec3", "vec4", "void", "volatile",
        "while", "writeonly",
    ]
    .into_iter()
    .collect()
});

const COMPONENTS: [&str; 4] = ["x", "y", "z", "w"];

fn matrix_element(name: &str) -> Option<(usize, usize)> {
    let bytes = name.as_bytes();
    match bytes {
        [b'M', row @ b'1'..=b'4', column @ b'1'..=b'4'] => {
            Some(((row - b'1') as usize, (column - b'1') as usize))
        }
        _ => None,
    }
}

fn is_vector(ty: &TypeReference) -> bool {
    is_vector_name(&ty.name)
}

fn is_vector_name(name: &str) -> bool {
    matches!(
        short_name(name),
        builtin::VECTOR2
            | builtin::VECTOR3
            | builtin::VECTOR4
            | builtin::INT2
            | builtin::INT3
            | builtin::INT4
            | builtin::UINT2
            | builtin::UINT3
            | builtin::UINT4
    )
}

fn is_matrix(ty: &TypeReference) -> bool {
    short_name(&ty.name) == builtin::MATRIX4X4
}

fn format_float<T: Into<f64> + Display + Copy>(value: T) -> String {
    let wide: f64 = value.into();
    if wide.is_nan() {
        return "(0.0 / 0.0)".to_string();
    }
    if wide.is_infinite() {
        return if wide > 0.0 { "(1.0 / 0.0)" } else { "(-1.0 / 0.0)" }.to_string();
    }
    let text = value.to_string();
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}

impl ShaderBackend for GlslBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn map_type(&self, ty: &TypeReference) -> Result<String, ShaderGenError> {
        match &ty.kind {
            TypeKind::Void => Ok("void".to_string()),
            TypeKind::Primitive => self
                .map_primitive(&ty.name)
                .map(str::to_string)
                .ok_or_else(|| self.unmapped(ty)),
            TypeKind::Struct => Ok(self.correct_identifier(ty.short_name())),
            TypeKind::Enum { underlying } => self.map_type(underlying),
            TypeKind::Array { element } => self.map_type(element),
            TypeKind::Class => ResourceKind::from_type_name(&ty.name)
                .and_then(|kind| self.map_resource(kind))
                .map(str::to_string)
                .ok_or_else(|| self.unmapped(ty)),
        }
    }

    fn map_identifier(&self, symbol: &Symbol) -> String {
        if is_vector_name(&symbol.declaring_type) {
            if let Some(index) = ["X", "Y", "Z", "W"].iter().position(|c| *c == symbol.name) {
                return COMPONENTS[index].to_string();
            }
        }
        if short_name(&symbol.declaring_type) == builtin::MATRIX4X4 {
            if let Some((row, column)) = matrix_element(&symbol.name) {
                return format!("[{row}][{column}]");
            }
        }
        self.correct_identifier(&symbol.name)
    }

    fn correct_identifier(&self, identifier: &str) -> String {
        if RESERVED_WORDS.contains(identifier) || identifier.starts_with("gl_") {
            format!("{identifier}_")
        } else {
            identifier.to_string()
        }
    }

    fn format_literal(&self, literal: &Literal) -> String {
        match literal {
            Literal::Bool(value) => value.to_string(),
            Literal::Int(value) => value.to_string(),
            Literal::UInt(value) => format!("{value}u"),
            Literal::Float(value) => format_float(*value),
            Literal::Double(value) if self.version().is_es() => format_float(*value),
            Literal::Double(value) if value.is_finite() => format!("{}lf", format_float(*value)),
            Literal::Double(value) => format_float(*value),
        }
    }

    fn format_binary_expression(
        &self,
        left: &InvocationArgument,
        op: BinaryOperator,
        right: &InvocationArgument,
    ) -> String {
        let function = match op {
            BinaryOperator::Less => Some("lessThan"),
            BinaryOperator::LessEqual => Some("lessThanEqual"),
            BinaryOperator::Greater => Some("greaterThan"),
            BinaryOperator::GreaterEqual => Some("greaterThanEqual"),
            _ => None,
        };
        match function {
            Some(function) if is_vector(&left.ty) => {
                format!("{function}({}, {})", left.text, right.text)
            }
            // Host matrices are row-major and reach the device transposed.
            _ if op == BinaryOperator::Multiply
                && is_matrix(&right.ty)
                && (is_matrix(&left.ty) || is_vector(&left.ty)) =>
            {
                format!("{} * {}", right.text, left.text)
            }
            _ => format!("{} {} {}", left.text, op.symbol(), right.text),
        }
    }

    fn format_invocation(
        &self,
        declaring_type: &str,
        method: &str,
        arguments: &[InvocationArgument],
    ) -> Result<String, ShaderGenError> {
        intrinsics::format_intrinsic(self, declaring_type, method, arguments)?.ok_or_else(|| {
            GraphErrorKind::UnknownIntrinsic {
                declaring_type: declaring_type.to_string(),
                method: method.to_string(),
                target: self.name.clone(),
            }
            .into()
        })
    }

    fn format_construction(
        &self,
        ty: &TypeReference,
        arguments: &[InvocationArgument],
    ) -> Result<String, ShaderGenError> {
        match ty.kind {
            TypeKind::Primitive | TypeKind::Struct => {
                let arguments: Vec<&str> = arguments.iter().map(|a| a.text.as_str()).collect();
                Ok(format!("{}({})", self.map_type(ty)?, arguments.join(", ")))
            }
            _ => Err(self.unmapped(ty)),
        }
    }

    fn format_default_value(&self, ty: &TypeReference) -> Result<String, ShaderGenError> {
        let mapped = self.map_type(ty)?;
        Ok(match mapped.as_str() {
            "bool" => "false".to_string(),
            "int" => "0".to_string(),
            "uint" => "0u".to_string(),
            "float" => "0.0".to_string(),
            "double" => "0.0lf".to_string(),
            vector if vector.starts_with("ivec") => format!("{vector}(0)"),
            vector if vector.starts_with("uvec") => format!("{vector}(0u)"),
            vector if vector.starts_with("vec") || vector.starts_with("mat") => {
                format!("{vector}(0.0)")
            }
            _ => return Err(self.unmapped(ty)),
        })
    }

    fn format_cast(&self, ty: &TypeReference, operand: &str) -> Result<String, ShaderGenError> {
        Ok(format!("{}({operand})", self.map_type(ty)?))
    }

    fn format_builtin_variable(&self, builtin: BuiltinVariable) -> String {
        let vulkan = self.version().uses_descriptor_sets();
        match builtin {
            BuiltinVariable::VertexId if vulkan => "uint(gl_VertexIndex)",
            BuiltinVariable::VertexId => "uint(gl_VertexID)",
            BuiltinVariable::InstanceId if vulkan => "uint(gl_InstanceIndex)",
            BuiltinVariable::InstanceId => "uint(gl_InstanceID)",
            BuiltinVariable::DispatchThreadId => "gl_GlobalInvocationID",
            BuiltinVariable::GroupThreadId => "gl_LocalInvocationID",
            BuiltinVariable::IsFrontFace => "gl_FrontFacing",
        }
        .to_string()
    }

    fn format_static_member(&self, declaring_type: &str, name: &str) -> Option<String> {
        intrinsics::format_static_member(declaring_type, name)
    }

    fn format_image_load(
        &self,
        image: &str,
        coordinates: &InvocationArgument,
        element: &TypeReference,
    ) -> String {
        let load = format!("imageLoad({image}, ivec2({}))", coordinates.text);
        match short_name(&element.name) {
            builtin::FLOAT => format!("{load}.x"),
            builtin::VECTOR2 => format!("{load}.xy"),
            builtin::VECTOR3 => format!("{load}.xyz"),
            _ => load,
        }
    }

    fn format_image_store(
        &self,
        image: &str,
        coordinates: &InvocationArgument,
        value: &InvocationArgument,
    ) -> String {
        let value = match short_name(&value.ty.name) {
            builtin::VECTOR4 => value.text.clone(),
            builtin::VECTOR3 => format!("vec4({}, 1.0)", value.text),
            builtin::VECTOR2 => format!("vec4({}, 0.0, 1.0)", value.text),
            _ => format!("vec4({})", value.text),
        };
        format!("imageStore({image}, ivec2({}), {value})", coordinates.text)
    }

    fn parameter_direction_keyword(&self, direction: ParameterDirection) -> &'static str {
        match direction {
            ParameterDirection::In => "",
            ParameterDirection::Out => "out",
            ParameterDirection::InOut => "inout",
        }
    }

    fn is_indexer_access(&self, symbol: &Symbol) -> bool {
        short_name(&symbol.declaring_type) == builtin::MATRIX4X4
            && matrix_element(&symbol.name).is_some()
    }

    fn compute_group_declaration(&self, group: GroupSize) -> String {
        format!(
            "layout(local_size_x = {}, local_size_y = {}, local_size_z = {}) in;",
            group.x, group.y, group.z
        )
    }

    fn write_stage(&self, input: &StageInput<'_>) -> Result<String, ShaderGenError> {
        writer::write_stage(self, input)
    }
}
