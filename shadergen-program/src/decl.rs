use crate::location::SourceLocation;
use crate::tree::{Block, Literal};
use crate::types::{short_name, TypeReference};
use shadergen_common::{GroupSize, ShaderStage};
use std::fmt::{Display, Formatter};

/// The vertex semantic attached to a field of a stage input or output structure.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum SemanticType {
    #[default]
    None,
    Position,
    Normal,
    TextureCoordinate,
    Color,
    Tangent,
    SystemPosition,
    ColorTarget,
}

/// The direction a parameter passes its value.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum ParameterDirection {
    #[default]
    In,
    Out,
    InOut,
}

/// What kind of type a declaration introduces.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeclarationKind {
    Struct,
    Class,
    Enum,
}

/// Declarative metadata attached to a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAttributes {
    pub semantic: Option<SemanticType>,
    /// The constant element count of an array field.
    pub array_size: Option<u32>,
    /// The descriptor set index of a resource field.
    pub resource_set: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDeclaration {
    pub name: String,
    pub ty: TypeReference,
    pub is_static: bool,
    /// The folded value of a constant field.
    pub constant: Option<Literal>,
    pub attributes: FieldAttributes,
    pub location: Option<SourceLocation>,
}

impl FieldDeclaration {
    pub fn new(name: impl Into<String>, ty: TypeReference) -> Self {
        FieldDeclaration {
            name: name.into(),
            ty,
            is_static: false,
            constant: None,
            attributes: FieldAttributes::default(),
            location: None,
        }
    }

    pub fn with_semantic(mut self, semantic: SemanticType) -> Self {
        self.attributes.semantic = Some(semantic);
        self
    }

    pub fn with_array_size(mut self, size: u32) -> Self {
        self.attributes.array_size = Some(size);
        self
    }

    pub fn with_resource_set(mut self, set: u32) -> Self {
        self.attributes.resource_set = Some(set);
        self
    }

    pub fn with_constant(mut self, value: Literal) -> Self {
        self.constant = Some(value);
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_constant(&self) -> bool {
        self.constant.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDeclaration {
    pub name: String,
    pub ty: TypeReference,
    pub direction: ParameterDirection,
    pub default_value: Option<Literal>,
}

impl ParameterDeclaration {
    pub fn new(name: impl Into<String>, ty: TypeReference) -> Self {
        ParameterDeclaration {
            name: name.into(),
            ty,
            direction: ParameterDirection::In,
            default_value: None,
        }
    }

    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Declarative metadata attached to a method.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodAttributes {
    pub stage: Option<ShaderStage>,
    pub compute_group: Option<GroupSize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDeclaration {
    pub name: String,
    pub is_constructor: bool,
    pub return_type: TypeReference,
    pub parameters: Vec<ParameterDeclaration>,
    pub attributes: MethodAttributes,
    /// The resolved body. Methods without a body are external.
    pub body: Option<Block>,
    pub location: Option<SourceLocation>,
}

impl MethodDeclaration {
    pub fn new(name: impl Into<String>, return_type: TypeReference) -> Self {
        MethodDeclaration {
            name: name.into(),
            is_constructor: false,
            return_type,
            parameters: Vec::new(),
            attributes: MethodAttributes::default(),
            body: None,
            location: None,
        }
    }

    /// A constructor of `declaring_type`, named `ctor`.
    pub fn constructor(declaring_type: TypeReference) -> Self {
        MethodDeclaration {
            is_constructor: true,
            ..Self::new(CONSTRUCTOR_NAME, declaring_type)
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterDeclaration) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_stage(mut self, stage: ShaderStage) -> Self {
        self.attributes.stage = Some(stage);
        self
    }

    pub fn with_compute_group(mut self, group: GroupSize) -> Self {
        self.attributes.stage = Some(ShaderStage::Compute);
        self.attributes.compute_group = Some(group);
        self
    }

    pub fn with_body(mut self, body: Block) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// The method name constructors are declared under.
pub const CONSTRUCTOR_NAME: &str = "ctor";

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclaration {
    pub name: String,
    pub kind: DeclarationKind,
    pub fields: Vec<FieldDeclaration>,
    pub methods: Vec<MethodDeclaration>,
    pub location: Option<SourceLocation>,
}

impl TypeDeclaration {
    pub fn new(name: impl Into<String>, kind: DeclarationKind) -> Self {
        TypeDeclaration {
            name: name.into(),
            kind,
            fields: Vec::new(),
            methods: Vec::new(),
            location: None,
        }
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Self::new(name, DeclarationKind::Struct)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, DeclarationKind::Class)
    }

    pub fn with_field(mut self, field: FieldDeclaration) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodDeclaration) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }

    pub fn is_reference_type(&self) -> bool {
        self.kind == DeclarationKind::Class
    }

    pub fn method(&self, name: &str) -> Option<&MethodDeclaration> {
        self.methods.iter().find(|method| method.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields that occupy storage in an instance, in declaration order.
    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldDeclaration> {
        self.fields
            .iter()
            .filter(|field| !field.is_static && !field.is_constant())
    }
}

/// Identity of a function in the program call graph.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId {
    pub declaring_type: String,
    pub name: String,
}

impl MethodId {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        MethodId {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }

    /// Parses a `Namespace.Type.Method` reference, splitting at the final dot.
    pub fn parse(reference: &str) -> Option<Self> {
        let (declaring_type, name) = reference.rsplit_once('.')?;
        if declaring_type.is_empty() || name.is_empty() {
            return None;
        }
        Some(MethodId::new(declaring_type, name))
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

impl Display for MethodId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)
    }
}

/// An explicitly declared shader set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSetDeclaration {
    pub name: String,
    pub vertex: Option<String>,
    pub fragment: Option<String>,
    pub compute: Option<String>,
}

impl ShaderSetDeclaration {
    pub fn graphics(
        name: impl Into<String>,
        vertex: Option<&str>,
        fragment: Option<&str>,
    ) -> Self {
        ShaderSetDeclaration {
            name: name.into(),
            vertex: vertex.map(str::to_string),
            fragment: fragment.map(str::to_string),
            compute: None,
        }
    }

    pub fn compute(name: impl Into<String>, compute: &str) -> Self {
        ShaderSetDeclaration {
            name: name.into(),
            vertex: None,
            fragment: None,
            compute: Some(compute.to_string()),
        }
    }

    /// The entry point reference declared for `stage`.
    pub fn entry(&self, stage: ShaderStage) -> Option<&str> {
        match stage {
            ShaderStage::Vertex => self.vertex.as_deref(),
            ShaderStage::Fragment => self.fragment.as_deref(),
            ShaderStage::Compute => self.compute.as_deref(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn parse_method_reference() {
        let id = MethodId::parse("Demo.Shaders.Basic.VS").unwrap();
        assert_eq!("Demo.Shaders.Basic", id.declaring_type);
        assert_eq!("VS", id.name);
        assert_eq!("Demo.Shaders.Basic.VS", id.to_string());
        assert!(MethodId::parse("VS").is_none());
        assert!(MethodId::parse("Basic.").is_none());
    }

    #[test]
    pub fn instance_fields_skip_constants() {
        let decl = TypeDeclaration::structure("Demo.Light")
            .with_field(FieldDeclaration::new("Color", TypeReference::vector3()))
            .with_field(
                FieldDeclaration::new("MaxLights", TypeReference::int())
                    .with_constant(Literal::Int(4)),
            )
            .with_field(FieldDeclaration::new("Range", TypeReference::float()));
        let names: Vec<_> = decl.instance_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(vec!["Color", "Range"], names);
    }
}
