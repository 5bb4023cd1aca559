#![forbid(missing_docs)]
//! Cross-compiler from resolved host-language shader programs to GLSL-family source.
//!
//! shadergen takes a [`ResolvedProgram`](crate::program::ResolvedProgram), a fully
//! type-resolved description of shader code written in a host language, and produces
//! source text for each target backend together with the metadata needed to bind it:
//! structure layouts on the host and the device, resource bindings, and entry points.
//!
//! ## Usage
//! Build or load a `ResolvedProgram`, register one or more backends on a
//! [`ShaderGenerator`](crate::generate::ShaderGenerator), and call `generate`. Each
//! shader set is generated independently, so one failing set does not prevent the
//! rest from being produced.
//!
//! | **Target**       | **`GlslVersion`** | **Compute** |
//! |------------------|-------------------|-------------|
//! | OpenGL 3.3 core  | `Glsl330`         | ❌          |
//! | OpenGL ES 3.0    | `Glsl300Es`       | ❌          |
//! | Vulkan GLSL 4.50 | `Glsl450`         | ✔           |
//!

#[cfg(feature = "program")]
/// The resolved program representation consumed by the generator.
///
/// Programs are built from type declarations whose method bodies are already
/// resolved statement and expression trees.
pub mod program {
    pub use shadergen_program::*;
}

#[cfg(feature = "reflect")]
/// Program analysis, the shader model, and backends.
pub mod reflect {
    /// Supported output targets.
    pub mod targets {
        pub use shadergen_reflect::back::glsl::{
            FloatPrecision, GlslBackend, GlslCompileOptions, UnknownFloatPrecision,
        };
        pub use shadergen_reflect::back::targets::{GlslVersion, UnknownGlslVersion};
    }

    pub use shadergen_reflect::error::*;

    pub use shadergen_reflect::back::{
        EmittedFunction, InvocationArgument, ShaderBackend, StageInput,
    };
    pub use shadergen_reflect::reflect::layout::{AlignmentInfo, FieldOffset, LayoutCalculator};
    pub use shadergen_reflect::reflect::model::{
        ParameterDefinition, ShaderFunction, ShaderFunctionKind, ShaderModel, StageEntry,
    };
    pub use shadergen_reflect::reflect::resources::{ResourceDefinition, ResourceKind};
    pub use shadergen_reflect::reflect::semantics::{BuiltinVariable, FunctionUsage, StageMask};
    pub use shadergen_reflect::reflect::structure::{FieldDefinition, StructureDefinition};

    /// Lower level building blocks of the generation pipeline.
    pub mod helper {
        pub use shadergen_reflect::back::emit::FunctionEmitter;
        pub use shadergen_reflect::reflect::callgraph::{call_sites, CallGraph, CallSite};
        pub use shadergen_reflect::reflect::context::{
            BackendContext, ContextRegistry, StageUsage,
        };
        pub use shadergen_reflect::reflect::model::ModelBuilder;
        pub use shadergen_reflect::reflect::resources::ResourceBinder;
        pub use shadergen_reflect::reflect::sets::{discover_shader_sets, ShaderSetInfo};
        pub use shadergen_reflect::reflect::validate::validate_model;
    }
}

#[cfg(feature = "reflect")]
/// Generation of every shader set of a program.
pub mod generate {
    pub use shadergen_reflect::generate::*;
}

pub use shadergen_common::{GroupSize, ShaderStage};
