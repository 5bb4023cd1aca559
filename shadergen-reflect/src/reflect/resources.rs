use crate::error::{ResourceErrorKind, ShaderGenError};
use shadergen_common::map::FastHashMap;
use shadergen_program::{resource, short_name, FieldDeclaration, TypeReference};
use tracing::trace;

/// The kind of a bound resource.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A uniform buffer holding a blittable value.
    Uniform,
    Texture2D,
    Texture2DArray,
    TextureCube,
    Texture2DMS,
    Sampler,
    SamplerComparison,
    StructuredBuffer,
    RWStructuredBuffer,
    RWTexture2D,
    DepthTexture2D,
    DepthTexture2DArray,
    AtomicBuffer,
}

const RESOURCE_TYPES: &[(&str, ResourceKind)] = &[
    (resource::TEXTURE_2D, ResourceKind::Texture2D),
    (resource::TEXTURE_2D_ARRAY, ResourceKind::Texture2DArray),
    (resource::TEXTURE_CUBE, ResourceKind::TextureCube),
    (resource::TEXTURE_2D_MS, ResourceKind::Texture2DMS),
    (resource::SAMPLER, ResourceKind::Sampler),
    (resource::SAMPLER_COMPARISON, ResourceKind::SamplerComparison),
    (resource::STRUCTURED_BUFFER, ResourceKind::StructuredBuffer),
    (resource::RW_STRUCTURED_BUFFER, ResourceKind::RWStructuredBuffer),
    (resource::RW_TEXTURE_2D, ResourceKind::RWTexture2D),
    (resource::DEPTH_TEXTURE_2D, ResourceKind::DepthTexture2D),
    (resource::DEPTH_TEXTURE_2D_ARRAY, ResourceKind::DepthTexture2DArray),
    (resource::ATOMIC_BUFFER, ResourceKind::AtomicBuffer),
];

impl ResourceKind {
    /// The resource kind of a known wrapper type, by name.
    pub fn from_type_name(name: &str) -> Option<ResourceKind> {
        let name = short_name(name);
        RESOURCE_TYPES
            .iter()
            .find(|(wrapper, _)| *wrapper == name)
            .map(|(_, kind)| *kind)
    }

    /// Whether the resource wraps a generic element type.
    pub fn is_generic(&self) -> bool {
        matches!(
            self,
            ResourceKind::StructuredBuffer
                | ResourceKind::RWStructuredBuffer
                | ResourceKind::RWTexture2D
        )
    }

    /// Whether the resource is backed by a blittable value laid out in memory.
    pub fn has_memory_layout(&self) -> bool {
        matches!(
            self,
            ResourceKind::Uniform | ResourceKind::StructuredBuffer | ResourceKind::RWStructuredBuffer
        )
    }

    pub fn is_texture(&self) -> bool {
        matches!(
            self,
            ResourceKind::Texture2D
                | ResourceKind::Texture2DArray
                | ResourceKind::TextureCube
                | ResourceKind::Texture2DMS
                | ResourceKind::DepthTexture2D
                | ResourceKind::DepthTexture2DArray
        )
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self, ResourceKind::Sampler | ResourceKind::SamplerComparison)
    }
}

/// A resource bound at a descriptor set and binding slot.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDefinition {
    pub name: String,
    /// The type declaring the resource field.
    pub owner: String,
    pub descriptor_set: u32,
    pub binding: u32,
    /// The wrapped element type for generic resources, the value type for uniforms,
    /// and the wrapper itself otherwise.
    pub value_type: TypeReference,
    pub kind: ResourceKind,
}

/// Assigns sequential bindings to resource fields, independently per descriptor set.
///
/// Resource names share one namespace in the generated source, so a name may only be
/// bound once.
#[derive(Debug, Default)]
pub struct ResourceBinder {
    next_binding: FastHashMap<u32, u32>,
    owners: FastHashMap<String, String>,
}

impl ResourceBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies a resource field's type into its kind and value type.
    pub fn classify(
        name: &str,
        ty: &TypeReference,
    ) -> Result<(ResourceKind, TypeReference), ShaderGenError> {
        if let Some(kind) = ResourceKind::from_type_name(&ty.name) {
            if !kind.is_generic() {
                return Ok((kind, ty.clone()));
            }
            let value_type = ty.type_arguments.first().cloned().ok_or_else(|| {
                ResourceErrorKind::MissingTypeArgument {
                    resource: name.to_string(),
                    wrapper: ty.name.clone(),
                }
            })?;
            return Ok((kind, value_type));
        }

        if ty.is_reference_type() {
            return Err(ResourceErrorKind::NonBlittableResource {
                resource: name.to_string(),
                ty: ty.name.clone(),
            }
            .into());
        }

        Ok((ResourceKind::Uniform, ty.clone()))
    }

    /// Binds a resource field of `owner` to the next free slot of its descriptor set.
    pub fn bind(
        &mut self,
        owner: &str,
        field: &FieldDeclaration,
    ) -> Result<ResourceDefinition, ShaderGenError> {
        let (kind, value_type) =
            Self::classify(&field.name, &field.ty).map_err(|e| e.at(field.location.as_ref()))?;

        if let Some(first) = self.owners.get(&field.name) {
            return Err(ShaderGenError::from(ResourceErrorKind::DuplicateResource {
                resource: field.name.clone(),
                first: first.clone(),
                second: owner.to_string(),
            })
            .at(field.location.as_ref()));
        }
        self.owners.insert(field.name.clone(), owner.to_string());

        let descriptor_set = field.attributes.resource_set.unwrap_or(0);
        let next = self.next_binding.entry(descriptor_set).or_insert(0);
        let binding = *next;
        *next += 1;

        trace!(resource = %field.name, descriptor_set, binding, ?kind, "bound resource");
        Ok(ResourceDefinition {
            name: field.name.clone(),
            owner: owner.to_string(),
            descriptor_set,
            binding,
            value_type,
            kind,
        })
    }
}
