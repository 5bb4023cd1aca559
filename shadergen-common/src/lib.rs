//! Common types shared by the shadergen crates.
//!
//! Re-exported as `shadergen::common`.

/// Hash map aliases.
pub mod map;

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// The pipeline stage an entry point function runs in.
#[repr(u32)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ShaderStage {
    Vertex = 0,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// All stages, in the order their sources are generated.
    pub const ALL: [ShaderStage; 3] = [
        ShaderStage::Vertex,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];
}

impl Display for ShaderStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        })
    }
}

/// Error returned when a stage name is not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown shader stage `{0}`")]
pub struct UnknownStage(pub String);

impl FromStr for ShaderStage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "vertex" | "vert" | "vs" => ShaderStage::Vertex,
            "fragment" | "frag" | "fs" | "pixel" => ShaderStage::Fragment,
            "compute" | "comp" | "cs" => ShaderStage::Compute,
            _ => return Err(UnknownStage(s.to_string())),
        })
    }
}

/// The thread group dimensions of a compute entry point.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl GroupSize {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        GroupSize { x, y, z }
    }

    /// Whether every dimension is non-zero.
    pub fn is_valid(&self) -> bool {
        self.x > 0 && self.y > 0 && self.z > 0
    }
}

impl Default for GroupSize {
    fn default() -> Self {
        GroupSize { x: 1, y: 1, z: 1 }
    }
}

impl From<GroupSize> for [u32; 3] {
    fn from(value: GroupSize) -> Self {
        [value.x, value.y, value.z]
    }
}

impl From<[u32; 3]> for GroupSize {
    fn from(value: [u32; 3]) -> Self {
        GroupSize::new(value[0], value[1], value[2])
    }
}
