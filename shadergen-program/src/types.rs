use std::fmt::{Display, Formatter};

/// Canonical names of the builtin scalar, vector and matrix types.
pub mod builtin {
    pub const VOID: &str = "void";
    pub const BOOL: &str = "bool";
    pub const SBYTE: &str = "sbyte";
    pub const BYTE: &str = "byte";
    pub const SHORT: &str = "short";
    pub const USHORT: &str = "ushort";
    pub const INT: &str = "int";
    pub const UINT: &str = "uint";
    pub const LONG: &str = "long";
    pub const ULONG: &str = "ulong";
    pub const FLOAT: &str = "float";
    pub const DOUBLE: &str = "double";

    pub const VECTOR2: &str = "Vector2";
    pub const VECTOR3: &str = "Vector3";
    pub const VECTOR4: &str = "Vector4";
    pub const INT2: &str = "Int2";
    pub const INT3: &str = "Int3";
    pub const INT4: &str = "Int4";
    pub const UINT2: &str = "UInt2";
    pub const UINT3: &str = "UInt3";
    pub const UINT4: &str = "UInt4";
    pub const MATRIX4X4: &str = "Matrix4x4";

    /// Static classes whose methods are intrinsics rather than program functions.
    pub const MATHF: &str = "MathF";
    pub const SHADER_BUILTINS: &str = "ShaderBuiltins";
    pub const SHADER_SWIZZLE: &str = "ShaderSwizzle";
}

/// Canonical names of the opaque resource wrapper types.
pub mod resource {
    pub const TEXTURE_2D: &str = "Texture2DResource";
    pub const TEXTURE_2D_ARRAY: &str = "Texture2DArrayResource";
    pub const TEXTURE_CUBE: &str = "TextureCubeResource";
    pub const TEXTURE_2D_MS: &str = "Texture2DMSResource";
    pub const DEPTH_TEXTURE_2D: &str = "DepthTexture2DResource";
    pub const DEPTH_TEXTURE_2D_ARRAY: &str = "DepthTexture2DArrayResource";
    pub const SAMPLER: &str = "SamplerResource";
    pub const SAMPLER_COMPARISON: &str = "SamplerComparisonResource";
    pub const STRUCTURED_BUFFER: &str = "StructuredBuffer";
    pub const RW_STRUCTURED_BUFFER: &str = "RWStructuredBuffer";
    pub const RW_TEXTURE_2D: &str = "RWTexture2DResource";
    pub const ATOMIC_BUFFER: &str = "AtomicBufferUInt32";
}

/// The resolved shape of a type.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    /// A builtin scalar, vector or matrix type.
    Primitive,
    /// A user-declared value type.
    Struct,
    /// A reference type. Never blittable.
    Class,
    /// An enumeration with its underlying integer type.
    Enum { underlying: Box<TypeReference> },
    /// An array of `element`. The element count lives on the declaring field.
    Array { element: Box<TypeReference> },
}

/// A reference to a resolved type by canonical name.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeReference {
    pub name: String,
    pub kind: TypeKind,
    /// Generic arguments, for wrapper types such as `StructuredBuffer<T>`.
    pub type_arguments: Vec<TypeReference>,
}

impl TypeReference {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        TypeReference {
            name: name.into(),
            kind,
            type_arguments: Vec::new(),
        }
    }

    pub fn void() -> Self {
        Self::new(builtin::VOID, TypeKind::Void)
    }

    pub fn primitive(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Primitive)
    }

    pub fn bool() -> Self {
        Self::primitive(builtin::BOOL)
    }

    pub fn int() -> Self {
        Self::primitive(builtin::INT)
    }

    pub fn uint() -> Self {
        Self::primitive(builtin::UINT)
    }

    pub fn float() -> Self {
        Self::primitive(builtin::FLOAT)
    }

    pub fn vector2() -> Self {
        Self::primitive(builtin::VECTOR2)
    }

    pub fn vector3() -> Self {
        Self::primitive(builtin::VECTOR3)
    }

    pub fn vector4() -> Self {
        Self::primitive(builtin::VECTOR4)
    }

    pub fn matrix4x4() -> Self {
        Self::primitive(builtin::MATRIX4X4)
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Struct)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    pub fn enumeration(name: impl Into<String>, underlying: TypeReference) -> Self {
        Self::new(
            name,
            TypeKind::Enum {
                underlying: Box::new(underlying),
            },
        )
    }

    /// An array of `element`, named `element[]`.
    pub fn array(element: TypeReference) -> Self {
        Self::new(
            format!("{}[]", element.name),
            TypeKind::Array {
                element: Box::new(element),
            },
        )
    }

    /// An opaque resource wrapper type, optionally generic.
    pub fn resource(name: impl Into<String>, type_arguments: Vec<TypeReference>) -> Self {
        TypeReference {
            name: name.into(),
            kind: TypeKind::Class,
            type_arguments,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct)
    }

    pub fn is_reference_type(&self) -> bool {
        matches!(self.kind, TypeKind::Class)
    }

    /// The element type, if this is an array.
    pub fn element_type(&self) -> Option<&TypeReference> {
        match &self.kind {
            TypeKind::Array { element } => Some(element),
            _ => None,
        }
    }

    /// The final segment of a dotted type name.
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }
}

impl Display for TypeReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if !self.type_arguments.is_empty() {
            f.write_str("<")?;
            for (index, argument) in self.type_arguments.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{argument}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

/// The final segment of a dotted name.
pub fn short_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn display_generic_wrapper() {
        let buffer = TypeReference::resource(
            resource::STRUCTURED_BUFFER,
            vec![TypeReference::structure("Demo.Particle")],
        );
        assert_eq!("StructuredBuffer<Demo.Particle>", buffer.to_string());
        assert!(buffer.is_reference_type());
    }

    #[test]
    pub fn short_names() {
        assert_eq!("Particle", short_name("Demo.Shaders.Particle"));
        assert_eq!("float", TypeReference::float().short_name());
        let array = TypeReference::array(TypeReference::vector4());
        assert_eq!("Vector4[]", array.name);
        assert_eq!(Some(&TypeReference::vector4()), array.element_type());
    }
}
