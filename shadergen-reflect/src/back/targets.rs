use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// A GLSL language version a backend can target.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum GlslVersion {
    /// Desktop GLSL 3.30, with combined texture samplers and no binding qualifiers.
    Glsl330,
    /// GLSL ES 3.00.
    Glsl300Es,
    /// Desktop GLSL 4.50 with Vulkan-style descriptor sets and separate samplers.
    #[default]
    Glsl450,
}

/// Error returned when a GLSL version string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown GLSL version `{0}`")]
pub struct UnknownGlslVersion(pub String);

impl GlslVersion {
    /// The `#version` directive of the version.
    pub fn directive(&self) -> &'static str {
        match self {
            GlslVersion::Glsl330 => "#version 330 core",
            GlslVersion::Glsl300Es => "#version 300 es",
            GlslVersion::Glsl450 => "#version 450",
        }
    }

    pub fn is_es(&self) -> bool {
        matches!(self, GlslVersion::Glsl300Es)
    }

    /// Whether textures and samplers are separate objects bound by set and binding.
    pub fn uses_descriptor_sets(&self) -> bool {
        matches!(self, GlslVersion::Glsl450)
    }

    pub fn supports_compute(&self) -> bool {
        matches!(self, GlslVersion::Glsl450)
    }

    /// Whether storage buffers and images are available, natively or by extension.
    pub fn supports_storage(&self) -> bool {
        !self.is_es()
    }
}

impl Display for GlslVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            GlslVersion::Glsl330 => "330",
            GlslVersion::Glsl300Es => "300es",
            GlslVersion::Glsl450 => "450",
        })
    }
}

impl FromStr for GlslVersion {
    type Err = UnknownGlslVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "330" | "330core" | "glsl330" => GlslVersion::Glsl330,
            "300es" | "300 es" | "es300" | "essl300" => GlslVersion::Glsl300Es,
            "450" | "glsl450" | "vulkan" => GlslVersion::Glsl450,
            _ => return Err(UnknownGlslVersion(s.to_string())),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn parse_versions() {
        assert_eq!(Ok(GlslVersion::Glsl330), "330".parse());
        assert_eq!(Ok(GlslVersion::Glsl300Es), "300 ES".parse());
        assert_eq!(Ok(GlslVersion::Glsl450), "vulkan".parse());
        assert_eq!(
            Err(UnknownGlslVersion("110".into())),
            "110".parse::<GlslVersion>()
        );
    }

    #[test]
    pub fn display_round_trips() {
        for version in [GlslVersion::Glsl330, GlslVersion::Glsl300Es, GlslVersion::Glsl450] {
            assert_eq!(Ok(version), version.to_string().parse());
        }
    }
}
