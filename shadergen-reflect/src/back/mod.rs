/// The tree-walking function emitter.
pub mod emit;
/// The GLSL backend.
pub mod glsl;
/// Swizzle recognition.
pub mod swizzle;
/// Output target versions.
pub mod targets;

use crate::error::ShaderGenError;
use crate::reflect::model::{ShaderFunction, StageEntry};
use crate::reflect::semantics::{BuiltinVariable, FunctionUsage};
use crate::reflect::structure::StructureDefinition;
use crate::reflect::resources::ResourceDefinition;
use shadergen_common::{GroupSize, ShaderStage};
use shadergen_program::{
    short_name, BinaryOperator, Literal, MethodId, ParameterDirection, Symbol, TypeReference,
};

/// An already emitted argument together with its resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationArgument {
    pub text: String,
    pub ty: TypeReference,
}

impl InvocationArgument {
    pub fn new(text: impl Into<String>, ty: TypeReference) -> Self {
        InvocationArgument {
            text: text.into(),
            ty,
        }
    }
}

/// The emitted text of a single function definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFunction {
    pub function: ShaderFunction,
    pub text: String,
    /// Names of the resources the function body references, in first-use order.
    pub resources_used: Vec<String>,
}

/// Everything a backend needs to assemble the source of one stage.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    pub set_name: &'a str,
    pub stage: ShaderStage,
    pub entry: &'a StageEntry,
    /// Every structure of the set, each one after the structures it contains.
    pub structures: &'a [&'a StructureDefinition],
    /// Function definitions in call order, ending with the entry point.
    pub functions: &'a [EmittedFunction],
}

impl<'a> StageInput<'a> {
    pub fn resources(&self) -> &'a [ResourceDefinition] {
        &self.entry.resources
    }

    /// Usage aggregated over every function the entry point reaches.
    pub fn usage(&self) -> FunctionUsage {
        self.entry.function.usage()
    }

    pub fn structure(&self, name: &str) -> Option<&'a StructureDefinition> {
        self.structures.iter().copied().find(|structure| structure.name == name)
    }
}

/// The translation surface a target language provides to the emitter.
///
/// The emitter walks the resolved program and delegates every target-specific piece
/// of text to the backend.
pub trait ShaderBackend: Send + Sync {
    /// A name identifying the backend and its configuration, such as `glsl450`.
    fn name(&self) -> &str;

    fn map_type(&self, ty: &TypeReference) -> Result<String, ShaderGenError>;

    /// Maps a member symbol to its target spelling.
    fn map_identifier(&self, symbol: &Symbol) -> String;

    /// Renames identifiers that collide with target keywords or reserved names.
    fn correct_identifier(&self, identifier: &str) -> String;

    fn format_literal(&self, literal: &Literal) -> String;

    fn format_binary_expression(
        &self,
        left: &InvocationArgument,
        op: BinaryOperator,
        right: &InvocationArgument,
    ) -> String;

    /// Formats a call to an intrinsic of a builtin type.
    fn format_invocation(
        &self,
        declaring_type: &str,
        method: &str,
        arguments: &[InvocationArgument],
    ) -> Result<String, ShaderGenError>;

    /// Formats construction of a builtin value or structure from its arguments.
    fn format_construction(
        &self,
        ty: &TypeReference,
        arguments: &[InvocationArgument],
    ) -> Result<String, ShaderGenError>;

    /// The zero value of a builtin type.
    fn format_default_value(&self, ty: &TypeReference) -> Result<String, ShaderGenError>;

    fn format_cast(&self, ty: &TypeReference, operand: &str) -> Result<String, ShaderGenError>;

    fn format_builtin_variable(&self, builtin: BuiltinVariable) -> String;

    /// Formats a static member of a builtin type, such as a vector constant.
    fn format_static_member(&self, declaring_type: &str, name: &str) -> Option<String>;

    fn format_image_load(
        &self,
        image: &str,
        coordinates: &InvocationArgument,
        element: &TypeReference,
    ) -> String;

    fn format_image_store(
        &self,
        image: &str,
        coordinates: &InvocationArgument,
        value: &InvocationArgument,
    ) -> String;

    fn parameter_direction_keyword(&self, direction: ParameterDirection) -> &'static str;

    /// Whether a member access is spelled as an indexer rather than a field access.
    fn is_indexer_access(&self, symbol: &Symbol) -> bool;

    fn compute_group_declaration(&self, group: GroupSize) -> String;

    /// Assembles the complete source of one stage.
    fn write_stage(&self, input: &StageInput<'_>) -> Result<String, ShaderGenError>;

    /// The emitted name of a function.
    fn format_function_name(&self, id: &MethodId) -> String {
        if id.is_constructor() {
            format!("{}_ctor", self.correct_identifier(short_name(&id.declaring_type)))
        } else {
            self.correct_identifier(&id.name)
        }
    }

    /// The variable a constructor body assigns through `this`.
    fn constructor_target(&self) -> &'static str {
        "_this"
    }
}
