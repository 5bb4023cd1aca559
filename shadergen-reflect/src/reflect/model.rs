use crate::error::ShaderGenError;
use crate::reflect::context::BackendContext;
use crate::reflect::layout::LayoutCalculator;
use crate::reflect::resources::{ResourceDefinition, ResourceKind};
use crate::reflect::semantics::FunctionUsage;
use crate::reflect::structure::StructureDefinition;
use shadergen_common::map::FastHashSet;
use shadergen_common::{GroupSize, ShaderStage};
use shadergen_program::{
    ExpressionKind, MethodDeclaration, MethodId, ParameterDirection, ResolvedProgram, Statement,
    TypeKind, TypeReference,
};
use tracing::debug;

/// The role a function plays in a shader set.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderFunctionKind {
    Normal,
    VertexEntryPoint,
    FragmentEntryPoint,
    ComputeEntryPoint,
}

impl ShaderFunctionKind {
    pub fn stage(&self) -> Option<ShaderStage> {
        match self {
            ShaderFunctionKind::Normal => None,
            ShaderFunctionKind::VertexEntryPoint => Some(ShaderStage::Vertex),
            ShaderFunctionKind::FragmentEntryPoint => Some(ShaderStage::Fragment),
            ShaderFunctionKind::ComputeEntryPoint => Some(ShaderStage::Compute),
        }
    }
}

impl From<Option<ShaderStage>> for ShaderFunctionKind {
    fn from(value: Option<ShaderStage>) -> Self {
        match value {
            None => ShaderFunctionKind::Normal,
            Some(ShaderStage::Vertex) => ShaderFunctionKind::VertexEntryPoint,
            Some(ShaderStage::Fragment) => ShaderFunctionKind::FragmentEntryPoint,
            Some(ShaderStage::Compute) => ShaderFunctionKind::ComputeEntryPoint,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDefinition {
    pub name: String,
    pub ty: TypeReference,
    pub direction: ParameterDirection,
}

/// A function that is translated into shader code.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderFunction {
    pub declaring_type: String,
    pub name: String,
    pub return_type: TypeReference,
    pub parameters: Vec<ParameterDefinition>,
    pub kind: ShaderFunctionKind,
    /// Thread group size. All zeros unless declared on a compute entry point.
    pub compute_group: GroupSize,
    pub is_constructor: bool,
    usage: FunctionUsage,
}

impl ShaderFunction {
    pub fn from_declaration(declaring_type: &str, method: &MethodDeclaration) -> Self {
        ShaderFunction {
            declaring_type: declaring_type.to_string(),
            name: method.name.clone(),
            return_type: method.return_type.clone(),
            parameters: method
                .parameters
                .iter()
                .map(|parameter| ParameterDefinition {
                    name: parameter.name.clone(),
                    ty: parameter.ty.clone(),
                    direction: parameter.direction,
                })
                .collect(),
            kind: method.attributes.stage.into(),
            compute_group: method
                .attributes
                .compute_group
                .unwrap_or(GroupSize::new(0, 0, 0)),
            is_constructor: method.is_constructor,
            usage: FunctionUsage::empty(),
        }
    }

    pub fn id(&self) -> MethodId {
        MethodId::new(self.declaring_type.clone(), self.name.clone())
    }

    pub fn is_entry_point(&self) -> bool {
        self.kind != ShaderFunctionKind::Normal
    }

    pub fn usage(&self) -> FunctionUsage {
        self.usage
    }

    /// Records builtins or features observed in the function. Flags are never cleared.
    pub fn mark_usage(&mut self, usage: FunctionUsage) {
        self.usage |= usage;
    }
}

/// The entry point of one stage with everything it transitively touches.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEntry {
    /// The entry point, with usage aggregated over every function it reaches.
    pub function: ShaderFunction,
    /// Reachable functions, callees first, ending with the entry point.
    pub functions: Vec<MethodId>,
    /// Resources used by any reachable function, in binding declaration order.
    pub resources: Vec<ResourceDefinition>,
}

/// The backend-facing description of one shader set.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderModel {
    pub structures: Vec<StructureDefinition>,
    pub all_resources: Vec<ResourceDefinition>,
    pub functions: Vec<ShaderFunction>,
    pub vertex: Option<StageEntry>,
    pub fragment: Option<StageEntry>,
    pub compute: Option<StageEntry>,
}

impl ShaderModel {
    pub fn entry(&self, stage: ShaderStage) -> Option<&StageEntry> {
        match stage {
            ShaderStage::Vertex => self.vertex.as_ref(),
            ShaderStage::Fragment => self.fragment.as_ref(),
            ShaderStage::Compute => self.compute.as_ref(),
        }
    }

    pub fn entry_function(&self, stage: ShaderStage) -> Option<&ShaderFunction> {
        self.entry(stage).map(|entry| &entry.function)
    }

    pub fn vertex_resources(&self) -> &[ResourceDefinition] {
        self.stage_resources(ShaderStage::Vertex)
    }

    pub fn fragment_resources(&self) -> &[ResourceDefinition] {
        self.stage_resources(ShaderStage::Fragment)
    }

    pub fn compute_resources(&self) -> &[ResourceDefinition] {
        self.stage_resources(ShaderStage::Compute)
    }

    pub fn stage_resources(&self, stage: ShaderStage) -> &[ResourceDefinition] {
        self.entry(stage)
            .map(|entry| entry.resources.as_slice())
            .unwrap_or_default()
    }

    pub fn structure(&self, name: &str) -> Option<&StructureDefinition> {
        self.structures.iter().find(|structure| structure.name == name)
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceDefinition> {
        self.all_resources.iter().find(|resource| resource.name == name)
    }

    pub fn function(&self, id: &MethodId) -> Option<&ShaderFunction> {
        self.functions
            .iter()
            .find(|function| function.declaring_type == id.declaring_type && function.name == id.name)
    }

    /// Structures ordered so that every structure follows the structures it contains.
    pub fn structures_in_dependency_order(&self) -> Vec<&StructureDefinition> {
        fn visit<'a>(
            model: &'a ShaderModel,
            structure: &'a StructureDefinition,
            seen: &mut FastHashSet<&'a str>,
            ordered: &mut Vec<&'a StructureDefinition>,
        ) {
            if !seen.insert(structure.name.as_str()) {
                return;
            }
            for field in &structure.fields {
                if let Some(nested) = model.structure(&field.element_type().name) {
                    visit(model, nested, seen, ordered);
                }
            }
            ordered.push(structure);
        }

        let mut seen = FastHashSet::default();
        let mut ordered = Vec::with_capacity(self.structures.len());
        for structure in &self.structures {
            visit(self, structure, &mut seen, &mut ordered);
        }
        ordered
    }
}

/// Collects the structures a shader set needs and assembles its [`ShaderModel`].
pub struct ModelBuilder<'a> {
    program: &'a ResolvedProgram,
    layouts: &'a LayoutCalculator,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(program: &'a ResolvedProgram, layouts: &'a LayoutCalculator) -> Self {
        ModelBuilder { program, layouts }
    }

    /// Registers `ty` and every structure nested in it, if it is a program structure.
    pub fn discover(
        &self,
        context: &mut BackendContext,
        ty: &TypeReference,
    ) -> Result<(), ShaderGenError> {
        let ty = match &ty.kind {
            TypeKind::Array { element } => element.as_ref(),
            _ => ty,
        };
        if !ty.is_struct() || context.has_structure(&ty.name) {
            return Ok(());
        }
        let Some(declaration) = self.program.get_type(&ty.name) else {
            return Ok(());
        };

        let structure = StructureDefinition::from_declaration(self.program, self.layouts, declaration)?;
        let nested: Vec<TypeReference> = structure.fields.iter().map(|f| f.ty.clone()).collect();
        context.add_structure(structure);
        for field_type in &nested {
            self.discover(context, field_type)?;
        }
        Ok(())
    }

    /// Forces discovery of every structure the set's resources and functions touch.
    ///
    /// Resource value types come first, followed by parameter and return types of
    /// every function, then structure types used inside function bodies.
    pub fn discover_structures(&self, context: &mut BackendContext) -> Result<(), ShaderGenError> {
        let resource_types: Vec<TypeReference> = context
            .resources()
            .iter()
            .filter(|resource| {
                matches!(
                    resource.kind,
                    ResourceKind::Uniform
                        | ResourceKind::StructuredBuffer
                        | ResourceKind::RWStructuredBuffer
                )
            })
            .map(|resource| resource.value_type.clone())
            .collect();
        for ty in &resource_types {
            self.discover(context, ty)?;
        }

        let mut signature_types = Vec::new();
        let mut body_types = Vec::new();
        for function in context.functions() {
            signature_types.extend(function.parameters.iter().map(|p| p.ty.clone()));
            signature_types.push(function.return_type.clone());

            let Some(body) = self
                .program
                .get_method(&function.id())
                .and_then(|method| method.body.as_ref())
            else {
                continue;
            };
            body.walk_expressions(&mut |expression| {
                if let ExpressionKind::ObjectCreation { .. } = expression.kind {
                    body_types.push(expression.ty.clone());
                }
            });
            for statement in &body.statements {
                collect_declared_types(statement, &mut body_types);
            }
        }

        for ty in signature_types.iter().chain(body_types.iter()) {
            self.discover(context, ty)?;
        }
        Ok(())
    }

    /// Finalizes the context into a model, partitioning resources per stage.
    pub fn build(&self, context: &BackendContext) -> ShaderModel {
        debug!(
            set = %context.set_name(),
            backend = %context.backend(),
            structures = context.structures().len(),
            resources = context.resources().len(),
            functions = context.functions().len(),
            "built shader model"
        );

        ShaderModel {
            structures: context.structures().to_vec(),
            all_resources: context.resources().to_vec(),
            functions: context.functions().to_vec(),
            vertex: stage_entry(context, ShaderStage::Vertex),
            fragment: stage_entry(context, ShaderStage::Fragment),
            compute: stage_entry(context, ShaderStage::Compute),
        }
    }
}

fn stage_entry(context: &BackendContext, stage: ShaderStage) -> Option<StageEntry> {
    let usage = context.stage_usage(stage)?;
    let mut function = context.function(&usage.entry)?.clone();
    for id in &usage.functions {
        if let Some(callee) = context.function(id) {
            function.mark_usage(callee.usage());
        }
    }
    let resources = context
        .resources()
        .iter()
        .filter(|resource| usage.resources.contains(&resource.name))
        .cloned()
        .collect();
    Some(StageEntry {
        function,
        functions: usage.functions.clone(),
        resources,
    })
}

fn collect_declared_types(statement: &Statement, types: &mut Vec<TypeReference>) {
    match statement {
        Statement::VariableDeclaration { ty, .. } => types.push(ty.clone()),
        Statement::For { initializers, .. } => {
            for initializer in initializers {
                collect_declared_types(initializer, types);
            }
        }
        _ => {}
    }
    for child in statement.child_statements() {
        collect_declared_types(child, types);
    }
}
