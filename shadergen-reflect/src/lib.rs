//! Cross-compilation of resolved shader programs into target shading languages.
//!
//! A [`ResolvedProgram`](shadergen_program::ResolvedProgram) is partitioned into shader
//! sets, each of which is analyzed into a [`ShaderModel`](reflect::model::ShaderModel)
//! and emitted by every registered [`ShaderBackend`](back::ShaderBackend).
//!
//! ```rust
//! use shadergen_program::ResolvedProgram;
//! use shadergen_reflect::back::glsl::{GlslBackend, GlslCompileOptions};
//! use shadergen_reflect::generate::{GenerationOptions, ShaderGenerator};
//!
//! let program = ResolvedProgram::new();
//! let generator = ShaderGenerator::new(&program)
//!     .with_backend(GlslBackend::new(GlslCompileOptions::default()));
//! let result = generator.generate(&GenerationOptions::default()).unwrap();
//! assert!(result.sets().is_empty());
//! ```

/// Shader codegen backends.
pub mod back;
/// Error types.
pub mod error;
/// Shader set generation.
pub mod generate;
/// Program analysis and the shader model.
pub mod reflect;
