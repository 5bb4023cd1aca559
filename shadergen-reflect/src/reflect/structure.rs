use crate::error::{LayoutErrorKind, ShaderGenError};
use crate::reflect::layout::{AlignmentInfo, FieldOffset, LayoutCalculator, Packer};
use shadergen_program::{ResolvedProgram, SemanticType, TypeDeclaration, TypeReference};
use tracing::debug;

/// A structure member as seen by the backends.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: TypeReference,
    pub semantic: SemanticType,
    /// The element count of an array member, or 0.
    pub array_element_count: u32,
    pub alignment: AlignmentInfo,
}

impl FieldDefinition {
    pub fn is_array(&self) -> bool {
        self.array_element_count > 0
    }

    /// The type of a single element, for array members.
    pub fn element_type(&self) -> &TypeReference {
        self.ty.element_type().unwrap_or(&self.ty)
    }
}

/// A user structure with its computed layout.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
    pub alignment: AlignmentInfo,
    /// Whether every member sits at the same offset on the host and the device,
    /// and both sides have the same total size.
    pub host_matches_device_layout: bool,
}

impl StructureDefinition {
    /// Builds the definition of a value type declared in the program.
    pub fn from_declaration(
        program: &ResolvedProgram,
        layouts: &LayoutCalculator,
        declaration: &TypeDeclaration,
    ) -> Result<StructureDefinition, ShaderGenError> {
        let mut fields = Vec::new();
        let mut packer = Packer::new();
        for field in declaration.instance_fields() {
            let (alignment, array_element_count) = layouts
                .field_layout(program, &declaration.name, field)
                .map_err(|e| e.at(field.location.as_ref()))?;
            packer.push(alignment).ok_or_else(|| {
                LayoutErrorKind::SizeOverflow(declaration.name.clone())
            })?;
            fields.push(FieldDefinition {
                name: field.name.clone(),
                ty: field.ty.clone(),
                semantic: field.attributes.semantic.unwrap_or_default(),
                array_element_count,
                alignment,
            });
        }

        // Computes and memoizes the aggregate, raising the same errors as the layout query.
        let alignment = layouts.alignment_of(
            program,
            &TypeReference::structure(declaration.name.clone()),
        )?;
        let (_, host_matches_device_layout) = packer.finish();

        debug!(
            structure = %declaration.name,
            host_size = alignment.host_size,
            device_size = alignment.device_size,
            host_matches_device_layout,
            "discovered structure"
        );

        Ok(StructureDefinition {
            name: declaration.name.clone(),
            fields,
            alignment,
            host_matches_device_layout,
        })
    }

    pub fn short_name(&self) -> &str {
        shadergen_program::short_name(&self.name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Replays the packing of every member.
    pub fn offsets(&self) -> Vec<FieldOffset> {
        let mut packer = Packer::new();
        self.fields
            .iter()
            .map_while(|field| packer.push(field.alignment))
            .collect()
    }

    /// The first member carrying `semantic`.
    pub fn field_with_semantic(&self, semantic: SemanticType) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.semantic == semantic)
    }
}
