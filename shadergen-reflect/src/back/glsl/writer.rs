use super::GlslBackend;
use crate::back::{ShaderBackend, StageInput};
use crate::error::{ResourceErrorKind, ShaderGenError, StageErrorKind};
use crate::reflect::resources::{ResourceDefinition, ResourceKind};
use crate::reflect::semantics::FunctionUsage;
use crate::reflect::structure::{FieldDefinition, StructureDefinition};
use shadergen_common::ShaderStage;
use shadergen_program::{builtin, short_name, SemanticType, TypeKind, TypeReference};

/// Assembles the source of one stage: header, declarations, functions, and the `main` wrapper.
pub(super) fn write_stage(
    backend: &GlslBackend,
    input: &StageInput<'_>,
) -> Result<String, ShaderGenError> {
    if input.stage == ShaderStage::Compute && !backend.version().supports_compute() {
        return Err(StageErrorKind::UnsupportedStage {
            stage: input.stage,
            target: backend.name().to_string(),
        }
        .into());
    }

    let mut writer = StageWriter {
        backend,
        input,
        out: String::new(),
    };
    writer.header();
    for structure in input.structures {
        writer.structure(structure)?;
    }
    for resource in input.resources() {
        writer.resource(resource)?;
    }
    writer.stage_interface()?;
    for function in input.functions {
        writer.out.push_str(&function.text);
        writer.out.push('\n');
    }
    writer.main()?;
    Ok(writer.out)
}

struct StageWriter<'a> {
    backend: &'a GlslBackend,
    input: &'a StageInput<'a>,
    out: String,
}

impl<'a> StageWriter<'a> {
    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn header(&mut self) {
        let version = self.backend.version();
        self.line(version.directive());

        if !version.is_es() && !version.uses_descriptor_sets() {
            let usage = self.input.usage();
            let kinds: Vec<ResourceKind> =
                self.input.resources().iter().map(|r| r.kind).collect();
            let storage = usage
                .intersects(FunctionUsage::STRUCTURED_BUFFER | FunctionUsage::INTERLOCKED_ADD)
                || kinds.iter().any(|kind| {
                    matches!(
                        kind,
                        ResourceKind::StructuredBuffer
                            | ResourceKind::RWStructuredBuffer
                            | ResourceKind::AtomicBuffer
                    )
                });
            if storage {
                self.line("#extension GL_ARB_shader_storage_buffer_object : enable");
            }
            if usage.contains(FunctionUsage::RW_TEXTURE_2D)
                || kinds.contains(&ResourceKind::RWTexture2D)
            {
                self.line("#extension GL_ARB_shader_image_load_store : enable");
            }
        }

        if version.is_es() {
            let precision = self.backend.options().float_precision;
            for ty in [
                "float",
                "int",
                "sampler2DArray",
                "sampler2DShadow",
                "sampler2DArrayShadow",
                "samplerCube",
            ] {
                self.line(&format!("precision {precision} {ty};"));
            }
        }
        self.line("");
    }

    fn field_declaration(&self, field: &FieldDefinition) -> Result<String, ShaderGenError> {
        let ty = self.backend.map_type(&field.ty)?;
        let name = self.backend.correct_identifier(&field.name);
        if field.is_array() {
            Ok(format!("{ty} {name}[{}];", field.array_element_count))
        } else {
            Ok(format!("{ty} {name};"))
        }
    }

    fn structure(&mut self, structure: &StructureDefinition) -> Result<(), ShaderGenError> {
        let name = self.backend.correct_identifier(short_name(&structure.name));
        self.line(&format!("struct {name}"));
        self.line("{");
        for field in &structure.fields {
            let declaration = self.field_declaration(field)?;
            self.line(&format!("    {declaration}"));
        }
        self.line("};");
        self.line("");
        Ok(())
    }

    /// The layout qualifier list for a resource, or an empty string.
    fn layout(&self, resource: &ResourceDefinition, qualifiers: &[&str]) -> String {
        let mut parts: Vec<String> = qualifiers.iter().map(|q| q.to_string()).collect();
        if self.backend.version().uses_descriptor_sets() {
            parts.push(format!("set = {}", resource.descriptor_set));
            parts.push(format!("binding = {}", resource.binding));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("layout({}) ", parts.join(", "))
        }
    }

    fn resource(&mut self, resource: &ResourceDefinition) -> Result<(), ShaderGenError> {
        if !self.backend.supports(resource.kind) {
            return Err(ResourceErrorKind::UnsupportedResource {
                resource: resource.name.clone(),
                kind: resource.kind,
                target: self.backend.name().to_string(),
            }
            .into());
        }

        let name = self.backend.correct_identifier(&resource.name);
        match resource.kind {
            ResourceKind::Uniform => {
                let ty = self.backend.map_type(&resource.value_type)?;
                let layout = self.layout(resource, &["std140"]);
                self.line(&format!("{layout}uniform {}Buffer", resource.name));
                self.line("{");
                self.line(&format!("    {ty} {name};"));
                self.line("};");
            }
            ResourceKind::Sampler | ResourceKind::SamplerComparison => {
                // Samplers are folded into the texture objects without descriptor sets.
                if !self.backend.version().uses_descriptor_sets() {
                    return Ok(());
                }
                let ty = self.mapped(resource)?;
                let layout = self.layout(resource, &[]);
                self.line(&format!("{layout}uniform {ty} {name};"));
            }
            ResourceKind::StructuredBuffer | ResourceKind::RWStructuredBuffer => {
                let ty = self.backend.map_type(&resource.value_type)?;
                let layout = self.layout(resource, &["std430"]);
                let access = if resource.kind == ResourceKind::StructuredBuffer {
                    "readonly "
                } else {
                    ""
                };
                self.line(&format!("{layout}{access}buffer {}Buffer", resource.name));
                self.line("{");
                self.line(&format!("    {ty} {name}[];"));
                self.line("};");
            }
            ResourceKind::AtomicBuffer => {
                let layout = self.layout(resource, &["std430"]);
                self.line(&format!("{layout}buffer {}Buffer", resource.name));
                self.line("{");
                self.line(&format!("    uint {name}[];"));
                self.line("};");
            }
            ResourceKind::RWTexture2D => {
                let format = image_format(&resource.value_type);
                let layout = self.layout(resource, &[format]);
                let ty = self.mapped(resource)?;
                self.line(&format!("{layout}uniform {ty} {name};"));
            }
            _ => {
                let ty = self.mapped(resource)?;
                let layout = self.layout(resource, &[]);
                self.line(&format!("{layout}uniform {ty} {name};"));
            }
        }
        self.line("");
        Ok(())
    }

    fn mapped(&self, resource: &ResourceDefinition) -> Result<&'static str, ShaderGenError> {
        self.backend.map_resource(resource.kind).ok_or_else(|| {
            ResourceErrorKind::UnsupportedResource {
                resource: resource.name.clone(),
                kind: resource.kind,
                target: self.backend.name().to_string(),
            }
            .into()
        })
    }

    /// The structure passed into the entry point, if it takes one.
    fn input_structure(&self) -> Option<&'a StructureDefinition> {
        let parameter = self.input.entry.function.parameters.first()?;
        self.input.structure(&parameter.ty.name)
    }

    fn output_structure(&self) -> Option<&'a StructureDefinition> {
        let ty = &self.input.entry.function.return_type;
        if ty.kind != TypeKind::Struct {
            return None;
        }
        self.input.structure(&ty.name)
    }

    fn stage_interface(&mut self) -> Result<(), ShaderGenError> {
        let descriptor_sets = self.backend.version().uses_descriptor_sets();
        match self.input.stage {
            ShaderStage::Vertex => {
                if let Some(structure) = self.input_structure() {
                    for (location, field) in structure.fields.iter().enumerate() {
                        let declaration = self.field_declaration(field)?;
                        self.line(&format!("layout(location = {location}) in {declaration}"));
                    }
                }
                if let Some(structure) = self.output_structure() {
                    for (index, field) in varyings(structure).enumerate() {
                        let declaration = self.varying(index, field, "out", descriptor_sets)?;
                        self.line(&declaration);
                    }
                }
            }
            ShaderStage::Fragment => {
                if let Some(structure) = self.input_structure() {
                    for (index, field) in varyings(structure).enumerate() {
                        let declaration = self.varying(index, field, "in", descriptor_sets)?;
                        self.line(&declaration);
                    }
                }
                let input: &'a StageInput<'a> = self.input;
                let return_type = &input.entry.function.return_type;
                if let Some(structure) = self.output_structure() {
                    for location in 0..structure.fields.len() {
                        self.line(&format!(
                            "layout(location = {location}) out vec4 _outputColor_{location};"
                        ));
                    }
                } else if !return_type.is_void() {
                    self.line("layout(location = 0) out vec4 _outputColor_;");
                }
            }
            ShaderStage::Compute => {
                let group = self.input.entry.function.compute_group;
                let declaration = self.backend.compute_group_declaration(group);
                self.line(&declaration);
            }
        }
        self.line("");
        Ok(())
    }

    fn varying(
        &self,
        index: usize,
        field: &FieldDefinition,
        direction: &str,
        with_location: bool,
    ) -> Result<String, ShaderGenError> {
        let ty = self.backend.map_type(&field.ty)?;
        let layout = if with_location {
            format!("layout(location = {index}) ")
        } else {
            String::new()
        };
        let interpolation = if is_integral(&field.ty) { "flat " } else { "" };
        Ok(format!("{layout}{interpolation}{direction} {ty} fsin_{index};"))
    }

    fn main(&mut self) -> Result<(), ShaderGenError> {
        let input: &'a StageInput<'a> = self.input;
        let entry = &input.entry.function;
        let name = self.backend.format_function_name(&entry.id());

        self.line("void main()");
        self.line("{");

        let parameter = self.input_structure();
        if let Some(structure) = parameter {
            let ty = self.backend.map_type(&entry.parameters[0].ty)?;
            self.line(&format!("    {ty} _input;"));
            let mut varying = 0;
            for field in &structure.fields {
                let member = self.backend.correct_identifier(&field.name);
                let source = match self.input.stage {
                    ShaderStage::Fragment if field.semantic == SemanticType::SystemPosition => {
                        "gl_FragCoord".to_string()
                    }
                    ShaderStage::Fragment => {
                        varying += 1;
                        format!("fsin_{}", varying - 1)
                    }
                    _ => member.clone(),
                };
                self.line(&format!("    _input.{member} = {source};"));
            }
        }
        let call = if parameter.is_some() {
            format!("{name}(_input)")
        } else {
            format!("{name}()")
        };

        if entry.return_type.is_void() {
            self.line(&format!("    {call};"));
        } else {
            let ty = self.backend.map_type(&entry.return_type)?;
            self.line(&format!("    {ty} _output = {call};"));
            match (self.input.stage, self.output_structure()) {
                (ShaderStage::Vertex, Some(structure)) => self.vertex_outputs(structure),
                (ShaderStage::Fragment, Some(structure)) => {
                    for (location, field) in structure.fields.iter().enumerate() {
                        let member = self.backend.correct_identifier(&field.name);
                        self.line(&format!("    _outputColor_{location} = _output.{member};"));
                    }
                }
                (ShaderStage::Fragment, None) => self.line("    _outputColor_ = _output;"),
                _ => {}
            }
        }
        self.line("}");
        Ok(())
    }

    fn vertex_outputs(&mut self, structure: &StructureDefinition) {
        let mut varying = 0;
        for field in &structure.fields {
            let member = self.backend.correct_identifier(&field.name);
            if field.semantic == SemanticType::SystemPosition {
                self.line(&format!("    gl_Position = _output.{member};"));
                if self.backend.options().flip_vertex_y {
                    self.line("    gl_Position.y = -gl_Position.y;");
                }
            } else {
                self.line(&format!("    fsin_{varying} = _output.{member};"));
                varying += 1;
            }
        }
    }
}

/// Fields passed between the vertex and fragment stages, in declaration order.
fn varyings(structure: &StructureDefinition) -> impl Iterator<Item = &FieldDefinition> {
    structure
        .fields
        .iter()
        .filter(|field| field.semantic != SemanticType::SystemPosition)
}

fn is_integral(ty: &TypeReference) -> bool {
    matches!(
        short_name(&ty.name),
        builtin::INT
            | builtin::UINT
            | builtin::INT2
            | builtin::INT3
            | builtin::INT4
            | builtin::UINT2
            | builtin::UINT3
            | builtin::UINT4
    )
}

fn image_format(element: &TypeReference) -> &'static str {
    match short_name(&element.name) {
        builtin::FLOAT => "r32f",
        builtin::VECTOR2 => "rg32f",
        _ => "rgba32f",
    }
}
