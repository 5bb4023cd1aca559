use bitflags::bitflags;
use shadergen_common::ShaderStage;
use shadergen_program::builtin;
use std::fmt::{Display, Formatter};

bitflags! {
    /// The set of stages a builtin or intrinsic may be used from.
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct StageMask: u8 {
        const VERTEX = 0b00000001;
        const FRAGMENT = 0b00000010;
        const COMPUTE = 0b00000100;
    }
}

impl StageMask {
    pub fn allows(&self, stage: ShaderStage) -> bool {
        self.contains(StageMask::from(stage))
    }
}

impl From<ShaderStage> for StageMask {
    fn from(value: ShaderStage) -> Self {
        match value {
            ShaderStage::Vertex => StageMask::VERTEX,
            ShaderStage::Fragment => StageMask::FRAGMENT,
            ShaderStage::Compute => StageMask::COMPUTE,
        }
    }
}

impl Display for StageMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = ShaderStage::ALL
            .iter()
            .filter(|stage| self.allows(**stage))
            .map(ToString::to_string)
            .collect();
        if names.is_empty() {
            f.write_str("no")
        } else {
            f.write_str(&names.join(" or "))
        }
    }
}

bitflags! {
    /// Builtins and features a function touches, as observed during emission.
    ///
    /// Flags are only ever added.
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct FunctionUsage: u16 {
        const VERTEX_ID = 1 << 0;
        const INSTANCE_ID = 1 << 1;
        const DISPATCH_THREAD_ID = 1 << 2;
        const GROUP_THREAD_ID = 1 << 3;
        const FRONT_FACE = 1 << 4;
        const INTERLOCKED_ADD = 1 << 5;
        const TEXTURE_2D_MS = 1 << 6;
        const STRUCTURED_BUFFER = 1 << 7;
        const RW_TEXTURE_2D = 1 << 8;
    }
}

impl FunctionUsage {
    /// Whether the usage needs storage buffer or image support from the target.
    pub fn uses_storage(&self) -> bool {
        self.intersects(
            FunctionUsage::STRUCTURED_BUFFER
                | FunctionUsage::INTERLOCKED_ADD
                | FunctionUsage::RW_TEXTURE_2D,
        )
    }
}

/// System values exposed as members of the builtins type.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BuiltinVariable {
    VertexId,
    InstanceId,
    DispatchThreadId,
    GroupThreadId,
    IsFrontFace,
}

impl BuiltinVariable {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "VertexID" => BuiltinVariable::VertexId,
            "InstanceID" => BuiltinVariable::InstanceId,
            "DispatchThreadID" => BuiltinVariable::DispatchThreadId,
            "GroupThreadID" => BuiltinVariable::GroupThreadId,
            "IsFrontFace" => BuiltinVariable::IsFrontFace,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinVariable::VertexId => "VertexID",
            BuiltinVariable::InstanceId => "InstanceID",
            BuiltinVariable::DispatchThreadId => "DispatchThreadID",
            BuiltinVariable::GroupThreadId => "GroupThreadID",
            BuiltinVariable::IsFrontFace => "IsFrontFace",
        }
    }

    pub fn stages(&self) -> StageMask {
        match self {
            BuiltinVariable::VertexId | BuiltinVariable::InstanceId => StageMask::VERTEX,
            BuiltinVariable::DispatchThreadId | BuiltinVariable::GroupThreadId => {
                StageMask::COMPUTE
            }
            BuiltinVariable::IsFrontFace => StageMask::FRAGMENT,
        }
    }

    pub fn usage(&self) -> FunctionUsage {
        match self {
            BuiltinVariable::VertexId => FunctionUsage::VERTEX_ID,
            BuiltinVariable::InstanceId => FunctionUsage::INSTANCE_ID,
            BuiltinVariable::DispatchThreadId => FunctionUsage::DISPATCH_THREAD_ID,
            BuiltinVariable::GroupThreadId => FunctionUsage::GROUP_THREAD_ID,
            BuiltinVariable::IsFrontFace => FunctionUsage::FRONT_FACE,
        }
    }
}

/// The stages an intrinsic of the builtins type may be invoked from.
///
/// Intrinsics that are not restricted may be used from every stage.
pub fn intrinsic_stages(method: &str) -> StageMask {
    match method {
        "Ddx" | "Ddy" | "DdxFine" | "DdyFine" | "Discard" | "SampleComparison" => {
            StageMask::FRAGMENT
        }
        "InterlockedAdd" => StageMask::FRAGMENT | StageMask::COMPUTE,
        _ => StageMask::all(),
    }
}

/// Whether a declaring type name is the builtins type.
pub fn is_builtins_type(declaring_type: &str) -> bool {
    shadergen_program::short_name(declaring_type) == builtin::SHADER_BUILTINS
}
