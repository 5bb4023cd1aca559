use crate::error::{LayoutErrorKind, ShaderGenError};
use once_cell::sync::Lazy;
use shadergen_common::map::FastHashMap;
use shadergen_program::{
    builtin, FieldDeclaration, ResolvedProgram, TypeKind, TypeReference,
};
use std::sync::RwLock;
use tracing::trace;

/// Size and alignment of a type on the host and on the device.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AlignmentInfo {
    pub host_size: u32,
    pub device_size: u32,
    pub host_alignment: u32,
    pub device_alignment: u32,
}

impl AlignmentInfo {
    pub const fn new(
        host_size: u32,
        device_size: u32,
        host_alignment: u32,
        device_alignment: u32,
    ) -> Self {
        AlignmentInfo {
            host_size,
            device_size,
            host_alignment,
            device_alignment,
        }
    }

    /// A scalar that is naturally aligned on both sides.
    pub const fn scalar(size: u32) -> Self {
        Self::new(size, size, size, size)
    }

    /// The layout of `count` consecutive elements of this type, or `None` if the
    /// total size overflows.
    pub const fn array(self, count: u32) -> Option<Self> {
        match (
            self.host_size.checked_mul(count),
            self.device_size.checked_mul(count),
        ) {
            (Some(host_size), Some(device_size)) => Some(Self::new(
                host_size,
                device_size,
                self.host_alignment,
                self.device_alignment,
            )),
            _ => None,
        }
    }
}

/// The padding required to bring `offset` up to a multiple of `alignment`.
pub const fn padding(offset: u32, alignment: u32) -> u32 {
    if alignment == 0 {
        return 0;
    }
    (alignment - offset % alignment) % alignment
}

/// Offsets of a field within its structure.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FieldOffset {
    pub host: u32,
    pub device: u32,
}

/// Sequential field packing shared by layout computation and structure definitions.
#[derive(Debug, Clone)]
pub(crate) struct Packer {
    host: u32,
    device: u32,
    host_alignment: u32,
    device_alignment: u32,
    matches: bool,
}

impl Packer {
    pub fn new() -> Self {
        Packer {
            host: 0,
            device: 0,
            host_alignment: 1,
            device_alignment: 1,
            matches: true,
        }
    }

    /// Places the next field, returning its offsets, or `None` if the structure
    /// outgrows the 32-bit address range.
    pub fn push(&mut self, info: AlignmentInfo) -> Option<FieldOffset> {
        let offset = FieldOffset {
            host: self
                .host
                .checked_add(padding(self.host, info.host_alignment))?,
            device: self
                .device
                .checked_add(padding(self.device, info.device_alignment))?,
        };
        let host = offset.host.checked_add(info.host_size)?;
        let device = offset.device.checked_add(info.device_size)?;

        if offset.host != offset.device {
            self.matches = false;
        }
        self.host = host;
        self.device = device;
        self.host_alignment = self.host_alignment.max(info.host_alignment);
        self.device_alignment = self.device_alignment.max(info.device_alignment);
        Some(offset)
    }

    /// The total layout, and whether every field offset and the final size agree.
    pub fn finish(self) -> (AlignmentInfo, bool) {
        let matches = self.matches && self.host == self.device;
        (
            AlignmentInfo::new(
                self.host,
                self.device,
                self.host_alignment,
                self.device_alignment,
            ),
            matches,
        )
    }
}

static BUILTIN_LAYOUTS: Lazy<FastHashMap<&'static str, AlignmentInfo>> = Lazy::new(|| {
    let vec2 = AlignmentInfo::new(8, 8, 4, 8);
    let vec3 = AlignmentInfo::new(12, 16, 4, 16);
    let vec4 = AlignmentInfo::new(16, 16, 4, 16);

    let mut map = FastHashMap::default();
    map.insert(builtin::BOOL, AlignmentInfo::new(1, 4, 1, 4));
    map.insert(builtin::SBYTE, AlignmentInfo::scalar(1));
    map.insert(builtin::BYTE, AlignmentInfo::scalar(1));
    map.insert(builtin::SHORT, AlignmentInfo::scalar(2));
    map.insert(builtin::USHORT, AlignmentInfo::scalar(2));
    map.insert(builtin::INT, AlignmentInfo::scalar(4));
    map.insert(builtin::UINT, AlignmentInfo::scalar(4));
    map.insert(builtin::FLOAT, AlignmentInfo::scalar(4));
    map.insert(builtin::LONG, AlignmentInfo::scalar(8));
    map.insert(builtin::ULONG, AlignmentInfo::scalar(8));
    map.insert(builtin::DOUBLE, AlignmentInfo::scalar(8));
    map.insert(builtin::VECTOR2, vec2);
    map.insert(builtin::VECTOR3, vec3);
    map.insert(builtin::VECTOR4, vec4);
    map.insert(builtin::INT2, vec2);
    map.insert(builtin::INT3, vec3);
    map.insert(builtin::INT4, vec4);
    map.insert(builtin::UINT2, vec2);
    map.insert(builtin::UINT3, vec3);
    map.insert(builtin::UINT4, vec4);
    map.insert(builtin::MATRIX4X4, AlignmentInfo::new(64, 64, 4, 16));
    map
});

/// Layout of a builtin scalar, vector or matrix type.
pub fn builtin_layout(name: &str) -> Option<AlignmentInfo> {
    BUILTIN_LAYOUTS
        .get(shadergen_program::short_name(name))
        .copied()
}

const ENUM_UNDERLYING_TYPES: &[&str] = &[
    builtin::SBYTE,
    builtin::BYTE,
    builtin::SHORT,
    builtin::USHORT,
    builtin::INT,
    builtin::UINT,
    builtin::LONG,
    builtin::ULONG,
];

/// Computes and memoizes [`AlignmentInfo`] by canonical type name.
///
/// The calculator may be shared between threads generating different shader sets.
/// Concurrent computations of the same type produce identical results, so the
/// first one stored wins.
#[derive(Debug, Default)]
pub struct LayoutCalculator {
    cache: RwLock<FastHashMap<String, AlignmentInfo>>,
    device_alignments: FastHashMap<String, u32>,
}

impl LayoutCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the device alignment of an aggregate type.
    pub fn with_device_alignment(mut self, type_name: impl Into<String>, alignment: u32) -> Self {
        self.device_alignments.insert(type_name.into(), alignment.max(1));
        self
    }

    /// The memoized layout of a type, if it has been computed already.
    pub fn cached(&self, type_name: &str) -> Option<AlignmentInfo> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(type_name).copied())
    }

    /// Computes the layout of `ty`, memoizing it and every aggregate it contains.
    pub fn alignment_of(
        &self,
        program: &ResolvedProgram,
        ty: &TypeReference,
    ) -> Result<AlignmentInfo, ShaderGenError> {
        let mut visiting = Vec::new();
        self.compute(program, ty, &mut visiting)
    }

    /// The layout a field occupies within its structure, and its array element count.
    pub fn field_layout(
        &self,
        program: &ResolvedProgram,
        owner: &str,
        field: &FieldDeclaration,
    ) -> Result<(AlignmentInfo, u32), ShaderGenError> {
        let mut visiting = Vec::new();
        self.compute_field(program, owner, field, &mut visiting)
    }

    /// Applies any configured device alignment override to an aggregate layout.
    pub(crate) fn apply_override(&self, type_name: &str, mut info: AlignmentInfo) -> AlignmentInfo {
        if let Some(alignment) = self.device_alignments.get(type_name) {
            info.device_alignment = *alignment;
        }
        info
    }

    fn compute(
        &self,
        program: &ResolvedProgram,
        ty: &TypeReference,
        visiting: &mut Vec<String>,
    ) -> Result<AlignmentInfo, ShaderGenError> {
        if let Some(info) = self.cached(&ty.name) {
            return Ok(info);
        }

        let info = match &ty.kind {
            TypeKind::Void => return Err(LayoutErrorKind::Unsized(ty.name.clone()).into()),
            TypeKind::Class => return Err(LayoutErrorKind::NonBlittable(ty.name.clone()).into()),
            TypeKind::Primitive => builtin_layout(&ty.name)
                .ok_or_else(|| LayoutErrorKind::UnknownType(ty.name.clone()))?,
            TypeKind::Enum { underlying } => {
                let underlying_name = shadergen_program::short_name(&underlying.name);
                if !ENUM_UNDERLYING_TYPES.contains(&underlying_name) {
                    return Err(LayoutErrorKind::UnknownEnumUnderlyingType {
                        ty: ty.name.clone(),
                        underlying: underlying.name.clone(),
                    }
                    .into());
                }
                builtin_layout(underlying_name)
                    .ok_or_else(|| LayoutErrorKind::UnknownType(underlying.name.clone()))?
            }
            // Without a declaring field there is no element count; this is the element layout.
            TypeKind::Array { element } => self.compute(program, element, visiting)?,
            TypeKind::Struct => self.compute_struct(program, ty, visiting)?,
        };

        trace!(ty = %ty.name, ?info, "computed layout");
        let mut cache = self
            .cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(*cache.entry(ty.name.clone()).or_insert(info))
    }

    fn compute_struct(
        &self,
        program: &ResolvedProgram,
        ty: &TypeReference,
        visiting: &mut Vec<String>,
    ) -> Result<AlignmentInfo, ShaderGenError> {
        let declaration = program
            .get_type(&ty.name)
            .ok_or_else(|| LayoutErrorKind::UnknownType(ty.name.clone()))?;
        if declaration.is_reference_type() {
            return Err(LayoutErrorKind::NonBlittable(ty.name.clone()).into());
        }
        if visiting.contains(&ty.name) {
            return Err(LayoutErrorKind::RecursiveStructure(ty.name.clone()).into());
        }

        visiting.push(ty.name.clone());
        let mut packer = Packer::new();
        let mut any = false;
        for field in declaration.instance_fields() {
            let (info, _) = self
                .compute_field(program, &ty.name, field, visiting)
                .map_err(|e| e.at(field.location.as_ref()))?;
            packer
                .push(info)
                .ok_or_else(|| LayoutErrorKind::SizeOverflow(ty.name.clone()))?;
            any = true;
        }
        visiting.pop();

        if !any {
            return Err(ShaderGenError::from(LayoutErrorKind::EmptyStructure(
                ty.name.clone(),
            ))
            .at(declaration.location.as_ref()));
        }

        let (info, _) = packer.finish();
        Ok(self.apply_override(&ty.name, info))
    }

    fn compute_field(
        &self,
        program: &ResolvedProgram,
        owner: &str,
        field: &FieldDeclaration,
        visiting: &mut Vec<String>,
    ) -> Result<(AlignmentInfo, u32), ShaderGenError> {
        match field.ty.element_type() {
            Some(element) => {
                let count = field
                    .attributes
                    .array_size
                    .filter(|count| *count > 0)
                    .ok_or_else(|| LayoutErrorKind::MissingArraySize {
                        structure: owner.to_string(),
                        field: field.name.clone(),
                    })?;
                let info = self.compute(program, element, visiting)?;
                let array = info.array(count).ok_or_else(|| {
                    LayoutErrorKind::SizeOverflow(format!("{owner}.{}", field.name))
                })?;
                Ok((array, count))
            }
            None => Ok((self.compute(program, &field.ty, visiting)?, 0)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use shadergen_program::{FieldDeclaration, TypeDeclaration};

    fn program() -> ResolvedProgram {
        ResolvedProgram::new()
            .with_type(
                TypeDeclaration::structure("Demo.Mismatch")
                    .with_field(FieldDeclaration::new("A", TypeReference::vector3()))
                    .with_field(FieldDeclaration::new("B", TypeReference::float())),
            )
            .unwrap()
            .with_type(
                TypeDeclaration::structure("Demo.Packed")
                    .with_field(FieldDeclaration::new("A", TypeReference::vector4()))
                    .with_field(FieldDeclaration::new("B", TypeReference::float()))
                    .with_field(
                        FieldDeclaration::new("C", TypeReference::array(TypeReference::float()))
                            .with_array_size(3),
                    ),
            )
            .unwrap()
            .with_type(TypeDeclaration::structure("Demo.Empty"))
            .unwrap()
            .with_type(
                TypeDeclaration::structure("Demo.Holder")
                    .with_field(FieldDeclaration::new("Inner", TypeReference::class("Demo.Texture"))),
            )
            .unwrap()
            .with_type(
                TypeDeclaration::structure("Demo.Unsized")
                    .with_field(FieldDeclaration::new("C", TypeReference::array(TypeReference::float()))),
            )
            .unwrap()
            .with_type(
                TypeDeclaration::structure("Demo.ZeroLength").with_field(
                    FieldDeclaration::new("C", TypeReference::array(TypeReference::float()))
                        .with_array_size(0),
                ),
            )
            .unwrap()
            .with_type(
                TypeDeclaration::structure("Demo.Huge").with_field(
                    FieldDeclaration::new("C", TypeReference::array(TypeReference::vector4()))
                        .with_array_size(300_000_000),
                ),
            )
            .unwrap()
            .with_type(
                TypeDeclaration::structure("Demo.Oversized")
                    .with_field(
                        FieldDeclaration::new("A", TypeReference::array(TypeReference::vector4()))
                            .with_array_size(200_000_000),
                    )
                    .with_field(
                        FieldDeclaration::new("B", TypeReference::array(TypeReference::vector4()))
                            .with_array_size(200_000_000),
                    ),
            )
            .unwrap()
    }

    #[test]
    pub fn padding_formula() {
        assert_eq!(0, padding(0, 16));
        assert_eq!(4, padding(12, 16));
        assert_eq!(0, padding(16, 16));
        assert_eq!(3, padding(1, 4));
    }

    #[test]
    pub fn builtin_layouts() {
        let layouts = LayoutCalculator::new();
        let program = ResolvedProgram::new();
        assert_eq!(
            AlignmentInfo::new(12, 16, 4, 16),
            layouts.alignment_of(&program, &TypeReference::vector3()).unwrap()
        );
        assert_eq!(
            AlignmentInfo::scalar(4),
            layouts.alignment_of(&program, &TypeReference::float()).unwrap()
        );
        assert_eq!(
            AlignmentInfo::new(64, 64, 4, 16),
            layouts.alignment_of(&program, &TypeReference::matrix4x4()).unwrap()
        );
    }

    #[test]
    pub fn aggregate_layout_is_packed() {
        let layouts = LayoutCalculator::new();
        let info = layouts
            .alignment_of(&program(), &TypeReference::structure("Demo.Packed"))
            .unwrap();
        assert_eq!(AlignmentInfo::new(32, 32, 4, 16), info);
    }

    #[test]
    pub fn mismatched_sizes() {
        let layouts = LayoutCalculator::new();
        let info = layouts
            .alignment_of(&program(), &TypeReference::structure("Demo.Mismatch"))
            .unwrap();
        assert_eq!(16, info.host_size);
        assert_eq!(20, info.device_size);
    }

    #[test]
    pub fn results_are_memoized() {
        let layouts = LayoutCalculator::new();
        let program = program();
        let ty = TypeReference::structure("Demo.Packed");
        assert_eq!(None, layouts.cached("Demo.Packed"));
        let first = layouts.alignment_of(&program, &ty).unwrap();
        assert_eq!(Some(first), layouts.cached("Demo.Packed"));
        assert_eq!(first, layouts.alignment_of(&program, &ty).unwrap());
    }

    #[test]
    pub fn concurrent_queries_agree() {
        use rayon::prelude::*;

        let layouts = LayoutCalculator::new();
        let program = program();
        let ty = TypeReference::structure("Demo.Packed");
        let results: Vec<_> = (0..64)
            .into_par_iter()
            .map(|_| layouts.alignment_of(&program, &ty).unwrap())
            .collect();
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    pub fn device_alignment_override() {
        let layouts = LayoutCalculator::new().with_device_alignment("Demo.Packed", 256);
        let info = layouts
            .alignment_of(&program(), &TypeReference::structure("Demo.Packed"))
            .unwrap();
        assert_eq!(256, info.device_alignment);
        assert_eq!(4, info.host_alignment);
    }

    #[test]
    pub fn rejects_invalid_types() {
        let layouts = LayoutCalculator::new();
        let program = program();

        let err = layouts
            .alignment_of(&program, &TypeReference::structure("Demo.Empty"))
            .unwrap_err();
        assert_eq!(
            &ShaderGenError::Layout(LayoutErrorKind::EmptyStructure("Demo.Empty".into())),
            err.inner()
        );

        let err = layouts
            .alignment_of(&program, &TypeReference::structure("Demo.Holder"))
            .unwrap_err();
        assert_eq!(
            &ShaderGenError::Layout(LayoutErrorKind::NonBlittable("Demo.Texture".into())),
            err.inner()
        );

        let err = layouts
            .alignment_of(
                &program,
                &TypeReference::enumeration("Demo.Mode", TypeReference::float()),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ShaderGenError::Layout(LayoutErrorKind::UnknownEnumUnderlyingType { .. })
        ));

        let err = layouts
            .alignment_of(&program, &TypeReference::structure("Demo.Unsized"))
            .unwrap_err();
        assert!(matches!(
            err.inner(),
            ShaderGenError::Layout(LayoutErrorKind::MissingArraySize { .. })
        ));
    }

    #[test]
    pub fn enums_use_their_underlying_layout() {
        let layouts = LayoutCalculator::new();
        let info = layouts
            .alignment_of(
                &ResolvedProgram::new(),
                &TypeReference::enumeration("Demo.Mode", TypeReference::primitive("ushort")),
            )
            .unwrap();
        assert_eq!(AlignmentInfo::scalar(2), info);
    }

    #[test]
    pub fn zero_length_arrays_are_rejected() {
        let err = LayoutCalculator::new()
            .alignment_of(&program(), &TypeReference::structure("Demo.ZeroLength"))
            .unwrap_err();
        assert_eq!(
            &ShaderGenError::Layout(LayoutErrorKind::MissingArraySize {
                structure: "Demo.ZeroLength".into(),
                field: "C".into(),
            }),
            err.inner()
        );
    }

    #[test]
    pub fn oversized_layouts_are_rejected() {
        let layouts = LayoutCalculator::new();
        let program = program();

        let err = layouts
            .alignment_of(&program, &TypeReference::structure("Demo.Huge"))
            .unwrap_err();
        assert_eq!(
            &ShaderGenError::Layout(LayoutErrorKind::SizeOverflow("Demo.Huge.C".into())),
            err.inner()
        );

        let err = layouts
            .alignment_of(&program, &TypeReference::structure("Demo.Oversized"))
            .unwrap_err();
        assert_eq!(
            &ShaderGenError::Layout(LayoutErrorKind::SizeOverflow("Demo.Oversized".into())),
            err.inner()
        );
        assert_eq!(None, AlignmentInfo::scalar(4).array(u32::MAX));
    }
}
