use crate::reflect::resources::ResourceKind;
use crate::reflect::semantics::StageMask;
use shadergen_common::ShaderStage;
use shadergen_program::{MethodId, SourceLocation};
use thiserror::Error;

/// Failures while analyzing the call graph of an entry point.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphErrorKind {
    /// A function calls itself directly.
    #[error("function `{0}` is recursive; recursion is not supported in shader code")]
    Recursion(MethodId),
    /// A function is reachable from one of its own callees.
    #[error("cyclical call graph involving `{caller}` and `{callee}`")]
    Cycle { caller: MethodId, callee: MethodId },
    /// A call targets a program type that does not declare the method.
    #[error("call target `{0}` could not be resolved")]
    UnresolvedCall(MethodId),
    /// The backend has no mapping for an intrinsic call.
    #[error("`{declaring_type}.{method}` is not a supported intrinsic for {target}")]
    UnknownIntrinsic {
        declaring_type: String,
        method: String,
        target: String,
    },
    /// A function in the call graph has no resolved body to translate.
    #[error("function `{0}` has no body")]
    MissingBody(MethodId),
}

/// Failures while computing host and device memory layouts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutErrorKind {
    #[error("type `{0}` contains references and is not blittable")]
    NonBlittable(String),
    #[error("enum `{ty}` has unsupported underlying type `{underlying}`")]
    UnknownEnumUnderlyingType { ty: String, underlying: String },
    #[error("cannot assess size of structure `{0}`: it has no instance fields")]
    EmptyStructure(String),
    #[error("type `{0}` is not declared in the program")]
    UnknownType(String),
    #[error("type `{0}` has no size")]
    Unsized(String),
    #[error("structure `{0}` contains itself")]
    RecursiveStructure(String),
    #[error("array field `{structure}.{field}` must declare a constant element count")]
    MissingArraySize { structure: String, field: String },
    #[error("type `{ty}` cannot be expressed in {target}")]
    UnmappedType { ty: String, target: String },
    #[error("size of `{0}` exceeds the addressable range")]
    SizeOverflow(String),
}

/// Failures while binding or declaring resources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceErrorKind {
    #[error("shader set `{0}` is declared more than once")]
    DuplicateShaderSet(String),
    #[error("resource `{resource}` of type `{ty}` is invalid: uniform resources must be simple blittable structures")]
    NonBlittableResource { resource: String, ty: String },
    #[error("resource `{resource}` wraps `{wrapper}` without a type argument")]
    MissingTypeArgument { resource: String, wrapper: String },
    /// Two entry point types of one set declare a resource with the same name.
    #[error("resource `{resource}` is declared by both `{first}` and `{second}`")]
    DuplicateResource {
        resource: String,
        first: String,
        second: String,
    },
    #[error("structure `{structure}` used by resource `{resource}` does not have the same layout on the host and the device")]
    LayoutMismatch { resource: String, structure: String },
    #[error("resource `{resource}` of kind {kind:?} is not supported by {target}")]
    UnsupportedResource {
        resource: String,
        kind: ResourceKind,
        target: String,
    },
}

/// Violations of per-stage structural contracts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageErrorKind {
    #[error("`{builtin}` can only be used in {allowed} shaders, but was used in a {stage} shader")]
    BuiltinOutsideStage {
        builtin: String,
        stage: ShaderStage,
        allowed: StageMask,
    },
    #[error("`{function}` member `{member}` is missing a semantic")]
    MissingSemantic { function: MethodId, member: String },
    #[error("vertex entry point `{0}` must return a structure with a system position member")]
    MissingSystemPosition(MethodId),
    #[error("`{owner}` declares {count} {stage} entry points; exactly one is required")]
    InvalidEntryPointCount {
        owner: String,
        stage: ShaderStage,
        count: usize,
    },
    #[error("shader set `{set}` references `{reference}`, which is not a {stage} entry point")]
    EntryPointNotFound {
        set: String,
        reference: String,
        stage: ShaderStage,
    },
    #[error("entry point `{function}` has an invalid signature: {reason}")]
    InvalidEntrySignature { function: MethodId, reason: String },
    #[error("compute entry point `{0}` must declare a non-zero thread group size")]
    InvalidComputeGroup(MethodId),
    #[error("{stage} shaders are not supported by {target}")]
    UnsupportedStage { stage: ShaderStage, target: String },
}

/// Misuse of the generation pipeline itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigErrorKind {
    #[error("no context was initialized for shader set `{set}` on backend `{backend}`")]
    ContextNotInitialized { backend: String, set: String },
    #[error("a context was already initialized for shader set `{set}` on backend `{backend}`")]
    ContextAlreadyInitialized { backend: String, set: String },
    #[error("no backends were registered")]
    NoBackends,
}

/// Error type for shader generation.
///
/// Every failure is fatal to the shader set being generated.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderGenError {
    #[error("call graph error: {0}")]
    Graph(#[from] GraphErrorKind),
    #[error("layout error: {0}")]
    Layout(#[from] LayoutErrorKind),
    #[error("resource error: {0}")]
    Resource(#[from] ResourceErrorKind),
    #[error("stage error: {0}")]
    Stage(#[from] StageErrorKind),
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigErrorKind),
    /// An error with the source location it was raised at.
    #[error("{location}: {error}")]
    Located {
        error: Box<ShaderGenError>,
        location: SourceLocation,
    },
}

impl ShaderGenError {
    /// Attaches a source location, if one is available and none is attached yet.
    pub fn at(self, location: Option<&SourceLocation>) -> Self {
        match (self, location) {
            (located @ ShaderGenError::Located { .. }, _) => located,
            (error, Some(location)) => ShaderGenError::Located {
                error: Box::new(error),
                location: location.clone(),
            },
            (error, None) => error,
        }
    }

    /// The error without any attached location.
    pub fn inner(&self) -> &ShaderGenError {
        match self {
            ShaderGenError::Located { error, .. } => error.inner(),
            error => error,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            ShaderGenError::Located { location, .. } => Some(location),
            _ => None,
        }
    }
}
