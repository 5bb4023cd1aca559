//! Generation of every shader set of a program for every registered backend.

use crate::back::emit::FunctionEmitter;
use crate::back::{EmittedFunction, ShaderBackend, StageInput};
use crate::error::{ConfigErrorKind, ShaderGenError};
use crate::reflect::callgraph::CallGraph;
use crate::reflect::context::{BackendContext, ContextRegistry, StageUsage};
use crate::reflect::layout::LayoutCalculator;
use crate::reflect::model::{ModelBuilder, ShaderFunction, ShaderModel};
use crate::reflect::resources::ResourceBinder;
use crate::reflect::sets::{discover_shader_sets, ShaderSetInfo};
use crate::reflect::validate::validate_model;
use rayon::prelude::*;
use shadergen_common::map::FastHashSet;
use shadergen_common::ShaderStage;
use shadergen_program::ResolvedProgram;
use tracing::{debug, warn};

/// Options for a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Generate independent shader sets on the rayon thread pool.
    pub parallel: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        GenerationOptions { parallel: true }
    }
}

/// What a [`ShaderSetProcessor`] receives for each generated set.
#[derive(Debug, Clone, Copy)]
pub struct ShaderSetProcessorInput<'a> {
    pub set_name: &'a str,
    pub backend: &'a str,
    pub vertex_function: Option<&'a ShaderFunction>,
    pub fragment_function: Option<&'a ShaderFunction>,
    pub compute_function: Option<&'a ShaderFunction>,
    pub model: &'a ShaderModel,
}

/// A post-processing hook run once per successfully generated set and backend.
pub trait ShaderSetProcessor: Send + Sync {
    fn process(&self, input: &ShaderSetProcessorInput<'_>);
}

/// The sources and model of one shader set for one backend.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedShaderSet {
    pub name: String,
    pub backend: String,
    pub model: ShaderModel,
    pub vertex_source: Option<String>,
    pub fragment_source: Option<String>,
    pub compute_source: Option<String>,
}

impl GeneratedShaderSet {
    pub fn source(&self, stage: ShaderStage) -> Option<&str> {
        match stage {
            ShaderStage::Vertex => self.vertex_source.as_deref(),
            ShaderStage::Fragment => self.fragment_source.as_deref(),
            ShaderStage::Compute => self.compute_source.as_deref(),
        }
    }
}

/// A shader set that could not be generated for a backend.
#[derive(Debug)]
pub struct SetFailure {
    pub set: String,
    pub backend: String,
    pub error: ShaderGenError,
}

/// Everything a generation run produced. Sets that failed do not prevent the others
/// from being generated.
#[derive(Debug, Default)]
pub struct ShaderGenerationResult {
    sets: Vec<GeneratedShaderSet>,
    failures: Vec<SetFailure>,
}

impl ShaderGenerationResult {
    /// Looks up the output of a set for a backend.
    pub fn get(&self, backend: &str, set: &str) -> Option<&GeneratedShaderSet> {
        self.sets
            .iter()
            .find(|generated| generated.backend == backend && generated.name == set)
    }

    pub fn sets(&self) -> &[GeneratedShaderSet] {
        &self.sets
    }

    pub fn failures(&self) -> &[SetFailure] {
        &self.failures
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives shader set discovery, analysis, emission, and validation.
pub struct ShaderGenerator<'a> {
    program: &'a ResolvedProgram,
    layouts: LayoutCalculator,
    backends: Vec<Box<dyn ShaderBackend>>,
    processors: Vec<Box<dyn ShaderSetProcessor>>,
}

impl<'a> ShaderGenerator<'a> {
    pub fn new(program: &'a ResolvedProgram) -> Self {
        ShaderGenerator {
            program,
            layouts: LayoutCalculator::new(),
            backends: Vec::new(),
            processors: Vec::new(),
        }
    }

    pub fn add_backend(&mut self, backend: impl ShaderBackend + 'static) {
        self.backends.push(Box::new(backend));
    }

    pub fn with_backend(mut self, backend: impl ShaderBackend + 'static) -> Self {
        self.add_backend(backend);
        self
    }

    pub fn add_processor(&mut self, processor: impl ShaderSetProcessor + 'static) {
        self.processors.push(Box::new(processor));
    }

    /// The layout calculator shared by every set of this generator.
    pub fn layouts(&self) -> &LayoutCalculator {
        &self.layouts
    }

    /// Generates every shader set of the program for every backend.
    ///
    /// Errors discovering the sets themselves abort the run. Errors within a set are
    /// collected into [`ShaderGenerationResult::failures`].
    pub fn generate(
        &self,
        options: &GenerationOptions,
    ) -> Result<ShaderGenerationResult, ShaderGenError> {
        if self.backends.is_empty() {
            return Err(ConfigErrorKind::NoBackends.into());
        }

        let sets = discover_shader_sets(self.program)?;
        debug!(
            sets = sets.len(),
            backends = self.backends.len(),
            parallel = options.parallel,
            "generating shader sets"
        );

        let outcomes: Vec<Vec<Result<GeneratedShaderSet, SetFailure>>> = if options.parallel {
            sets.par_iter().map(|set| self.generate_set(set)).collect()
        } else {
            sets.iter().map(|set| self.generate_set(set)).collect()
        };

        let mut result = ShaderGenerationResult::default();
        for outcome in outcomes.into_iter().flatten() {
            match outcome {
                Ok(generated) => {
                    self.run_processors(&generated);
                    result.sets.push(generated);
                }
                Err(failure) => {
                    if !self.processors.is_empty() {
                        warn!(
                            set = %failure.set,
                            backend = %failure.backend,
                            "skipping processors for failed shader set"
                        );
                    }
                    result.failures.push(failure);
                }
            }
        }
        Ok(result)
    }

    fn run_processors(&self, generated: &GeneratedShaderSet) {
        let model = &generated.model;
        let input = ShaderSetProcessorInput {
            set_name: &generated.name,
            backend: &generated.backend,
            vertex_function: model.entry_function(ShaderStage::Vertex),
            fragment_function: model.entry_function(ShaderStage::Fragment),
            compute_function: model.entry_function(ShaderStage::Compute),
            model,
        };
        for processor in &self.processors {
            processor.process(&input);
        }
    }

    /// Generates one set for every backend. Each backend gets its own context.
    fn generate_set(&self, set: &ShaderSetInfo) -> Vec<Result<GeneratedShaderSet, SetFailure>> {
        debug!(set = %set.name, "generating shader set");
        let mut registry = ContextRegistry::new();

        self.backends
            .iter()
            .map(|backend| {
                let backend = backend.as_ref();
                self.generate_for_backend(&mut registry, backend, set)
                    .map_err(|error| {
                        debug!(set = %set.name, backend = backend.name(), %error, "shader set failed");
                        SetFailure {
                            set: set.name.clone(),
                            backend: backend.name().to_string(),
                            error,
                        }
                    })
            })
            .collect()
    }

    fn generate_for_backend(
        &self,
        registry: &mut ContextRegistry,
        backend: &dyn ShaderBackend,
        set: &ShaderSetInfo,
    ) -> Result<GeneratedShaderSet, ShaderGenError> {
        let context = registry.init(backend.name(), &set.name)?;
        debug!(set = %set.name, backend = backend.name(), "initialized backend context");

        self.bind_resources(context, set)?;
        self.collect_functions(context, set)?;

        let builder = ModelBuilder::new(self.program, &self.layouts);
        builder.discover_structures(context)?;
        for structure in context.structures() {
            if !structure.host_matches_device_layout {
                warn!(
                    set = %set.name,
                    structure = %structure.name,
                    "structure layout differs between host and device"
                );
            }
        }

        let mut emitted = Vec::new();
        for (stage, _) in set.entries() {
            emitted.push((stage, self.emit_stage(context, backend, stage)?));
        }

        let model = builder.build(context);
        validate_model(&model)?;

        let structures = model.structures_in_dependency_order();
        let mut generated = GeneratedShaderSet {
            name: set.name.clone(),
            backend: backend.name().to_string(),
            model: model.clone(),
            vertex_source: None,
            fragment_source: None,
            compute_source: None,
        };
        for (stage, functions) in &emitted {
            let Some(entry) = model.entry(*stage) else {
                continue;
            };
            let source = backend.write_stage(&StageInput {
                set_name: &set.name,
                stage: *stage,
                entry,
                structures: &structures,
                functions,
            })?;
            match stage {
                ShaderStage::Vertex => generated.vertex_source = Some(source),
                ShaderStage::Fragment => generated.fragment_source = Some(source),
                ShaderStage::Compute => generated.compute_source = Some(source),
            }
        }

        debug!(set = %set.name, backend = backend.name(), "generated shader set");
        Ok(generated)
    }

    /// Binds the instance fields of the set's entry point types as resources.
    fn bind_resources(
        &self,
        context: &mut BackendContext,
        set: &ShaderSetInfo,
    ) -> Result<(), ShaderGenError> {
        let mut binder = ResourceBinder::new();
        for owner in set.resource_owners() {
            let Some(declaration) = self.program.get_type(owner) else {
                continue;
            };
            for field in declaration.instance_fields() {
                context.add_resource(binder.bind(owner, field)?);
            }
        }
        debug!(set = %set.name, resources = context.resources().len(), "bound resources");
        Ok(())
    }

    /// Records every function reachable from the set's entry points, callees first.
    fn collect_functions(
        &self,
        context: &mut BackendContext,
        set: &ShaderSetInfo,
    ) -> Result<(), ShaderGenError> {
        for (stage, entry) in set.entries() {
            let ordered = CallGraph::ordered_functions(self.program, entry)?;
            debug!(set = %set.name, %stage, functions = ordered.len(), "ordered functions");
            for id in &ordered {
                if let Some(method) = self.program.get_method(id) {
                    context.add_function(ShaderFunction::from_declaration(&id.declaring_type, method));
                }
            }
            context.set_stage_usage(
                stage,
                StageUsage {
                    entry: entry.clone(),
                    functions: ordered,
                    resources: FastHashSet::default(),
                },
            );
        }
        Ok(())
    }

    /// Emits every function of one stage and records what the stage uses.
    fn emit_stage(
        &self,
        context: &mut BackendContext,
        backend: &dyn ShaderBackend,
        stage: ShaderStage,
    ) -> Result<Vec<EmittedFunction>, ShaderGenError> {
        let Some(usage) = context.stage_usage(stage).cloned() else {
            return Ok(Vec::new());
        };
        let resources = context.resources().to_vec();

        let mut emitter = FunctionEmitter::new(backend, self.program, &resources, stage);
        let mut functions = Vec::with_capacity(usage.functions.len());
        let mut used = FastHashSet::default();
        for id in &usage.functions {
            let function = emitter.emit(id)?;
            if let Some(recorded) = context.function_mut(id) {
                recorded.mark_usage(function.function.usage());
            }
            used.extend(function.resources_used.iter().cloned());
            functions.push(function);
        }

        context.set_stage_usage(
            stage,
            StageUsage {
                resources: used,
                ..usage
            },
        );
        Ok(functions)
    }
}
