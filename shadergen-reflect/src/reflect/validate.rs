use crate::error::{ResourceErrorKind, ShaderGenError, StageErrorKind};
use crate::reflect::model::{ShaderFunction, ShaderModel};
use crate::reflect::semantics::BuiltinVariable;
use crate::reflect::structure::StructureDefinition;
use shadergen_common::map::FastHashSet;
use shadergen_common::ShaderStage;
use shadergen_program::{builtin, short_name, SemanticType, TypeReference};

const STAGE_BUILTINS: &[BuiltinVariable] = &[
    BuiltinVariable::VertexId,
    BuiltinVariable::InstanceId,
    BuiltinVariable::DispatchThreadId,
    BuiltinVariable::GroupThreadId,
    BuiltinVariable::IsFrontFace,
];

fn invalid_signature(function: &ShaderFunction, reason: &str) -> ShaderGenError {
    StageErrorKind::InvalidEntrySignature {
        function: function.id(),
        reason: reason.to_string(),
    }
    .into()
}

/// Validates the semantic structure of every entry point and the layout of every
/// memory-backed resource of a finalized model.
pub fn validate_model(model: &ShaderModel) -> Result<(), ShaderGenError> {
    for stage in ShaderStage::ALL {
        let Some(entry) = model.entry(stage) else {
            continue;
        };
        let function = &entry.function;

        for builtin in STAGE_BUILTINS {
            if function.usage().contains(builtin.usage()) && !builtin.stages().allows(stage) {
                return Err(StageErrorKind::BuiltinOutsideStage {
                    builtin: builtin.name().to_string(),
                    stage,
                    allowed: builtin.stages(),
                }
                .into());
            }
        }

        match stage {
            ShaderStage::Vertex => validate_vertex(model, function)?,
            ShaderStage::Fragment => validate_fragment(model, function)?,
            ShaderStage::Compute => validate_compute(function)?,
        }
    }

    for resource in &model.all_resources {
        if !resource.kind.has_memory_layout() {
            continue;
        }
        let value_type = resource
            .value_type
            .element_type()
            .unwrap_or(&resource.value_type);
        let Some(structure) = model.structure(&value_type.name) else {
            continue;
        };
        if let Some(divergent) = divergent_structure(model, structure, &mut FastHashSet::default()) {
            return Err(ResourceErrorKind::LayoutMismatch {
                resource: resource.name.clone(),
                structure: divergent.name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// The first structure reachable from `structure`, itself included, whose host and
/// device layouts differ.
fn divergent_structure<'a>(
    model: &'a ShaderModel,
    structure: &'a StructureDefinition,
    seen: &mut FastHashSet<&'a str>,
) -> Option<&'a StructureDefinition> {
    if !seen.insert(structure.name.as_str()) {
        return None;
    }
    if !structure.host_matches_device_layout {
        return Some(structure);
    }
    structure.fields.iter().find_map(|field| {
        model
            .structure(&field.element_type().name)
            .and_then(|nested| divergent_structure(model, nested, seen))
    })
}

/// The structure a stage input or output is declared with.
fn stage_structure<'a>(
    model: &'a ShaderModel,
    function: &ShaderFunction,
    ty: &TypeReference,
    what: &str,
) -> Result<&'a StructureDefinition, ShaderGenError> {
    if !ty.is_struct() {
        return Err(invalid_signature(
            function,
            &format!("{what} `{ty}` must be a structure"),
        ));
    }
    model
        .structure(&ty.name)
        .ok_or_else(|| invalid_signature(function, &format!("{what} `{ty}` was not discovered")))
}

fn require_semantics(
    function: &ShaderFunction,
    structure: &StructureDefinition,
) -> Result<(), ShaderGenError> {
    match structure
        .fields
        .iter()
        .find(|field| field.semantic == SemanticType::None)
    {
        Some(field) => Err(StageErrorKind::MissingSemantic {
            function: function.id(),
            member: field.name.clone(),
        }
        .into()),
        None => Ok(()),
    }
}

fn single_input<'a>(
    model: &'a ShaderModel,
    function: &ShaderFunction,
) -> Result<Option<&'a StructureDefinition>, ShaderGenError> {
    match function.parameters.as_slice() {
        [] => Ok(None),
        [input] => {
            let structure = stage_structure(model, function, &input.ty, "input")?;
            require_semantics(function, structure)?;
            Ok(Some(structure))
        }
        _ => Err(invalid_signature(function, "at most one input structure is allowed")),
    }
}

fn validate_vertex(model: &ShaderModel, function: &ShaderFunction) -> Result<(), ShaderGenError> {
    single_input(model, function)?;

    if function.return_type.is_void() {
        return Err(StageErrorKind::MissingSystemPosition(function.id()).into());
    }
    let output = stage_structure(model, function, &function.return_type, "output")?;
    require_semantics(function, output)?;
    if output.field_with_semantic(SemanticType::SystemPosition).is_none() {
        return Err(StageErrorKind::MissingSystemPosition(function.id()).into());
    }
    Ok(())
}

fn validate_fragment(model: &ShaderModel, function: &ShaderFunction) -> Result<(), ShaderGenError> {
    single_input(model, function)?;

    let output = &function.return_type;
    if output.is_void() || short_name(&output.name) == builtin::VECTOR4 {
        return Ok(());
    }
    let output = stage_structure(model, function, output, "output")?;
    require_semantics(function, output)?;
    if let Some(field) = output
        .fields
        .iter()
        .find(|field| field.semantic != SemanticType::ColorTarget)
    {
        return Err(invalid_signature(
            function,
            &format!("output member `{}` must be a color target", field.name),
        ));
    }
    Ok(())
}

fn validate_compute(function: &ShaderFunction) -> Result<(), ShaderGenError> {
    if !function.parameters.is_empty() {
        return Err(invalid_signature(function, "compute entry points take no parameters"));
    }
    if !function.return_type.is_void() {
        return Err(invalid_signature(function, "compute entry points must return void"));
    }
    if !function.compute_group.is_valid() {
        return Err(StageErrorKind::InvalidComputeGroup(function.id()).into());
    }
    Ok(())
}
