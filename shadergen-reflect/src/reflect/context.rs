use crate::error::{ConfigErrorKind, ShaderGenError};
use crate::reflect::model::ShaderFunction;
use crate::reflect::resources::ResourceDefinition;
use crate::reflect::structure::StructureDefinition;
use shadergen_common::map::{FastHashMap, FastHashSet};
use shadergen_common::ShaderStage;
use shadergen_program::MethodId;

/// What one stage's entry point reaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageUsage {
    pub entry: MethodId,
    /// Reachable functions, callees first.
    pub functions: Vec<MethodId>,
    /// Names of the resources referenced by any reachable function.
    pub resources: FastHashSet<String>,
}

/// Mutable state accumulated while generating one shader set for one backend.
#[derive(Debug)]
pub struct BackendContext {
    backend: String,
    set_name: String,
    structures: Vec<StructureDefinition>,
    resources: Vec<ResourceDefinition>,
    functions: Vec<ShaderFunction>,
    stages: FastHashMap<ShaderStage, StageUsage>,
}

impl BackendContext {
    fn new(backend: &str, set_name: &str) -> Self {
        BackendContext {
            backend: backend.to_string(),
            set_name: set_name.to_string(),
            structures: Vec::new(),
            resources: Vec::new(),
            functions: Vec::new(),
            stages: FastHashMap::default(),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn set_name(&self) -> &str {
        &self.set_name
    }

    pub fn structures(&self) -> &[StructureDefinition] {
        &self.structures
    }

    pub fn has_structure(&self, name: &str) -> bool {
        self.structures.iter().any(|structure| structure.name == name)
    }

    /// Adds a structure unless one with the same name is already known.
    pub fn add_structure(&mut self, structure: StructureDefinition) -> bool {
        if self.has_structure(&structure.name) {
            return false;
        }
        self.structures.push(structure);
        true
    }

    pub fn resources(&self) -> &[ResourceDefinition] {
        &self.resources
    }

    pub fn add_resource(&mut self, resource: ResourceDefinition) {
        self.resources.push(resource);
    }

    pub fn functions(&self) -> &[ShaderFunction] {
        &self.functions
    }

    pub fn function(&self, id: &MethodId) -> Option<&ShaderFunction> {
        self.functions
            .iter()
            .find(|function| function.declaring_type == id.declaring_type && function.name == id.name)
    }

    pub fn function_mut(&mut self, id: &MethodId) -> Option<&mut ShaderFunction> {
        self.functions
            .iter_mut()
            .find(|function| function.declaring_type == id.declaring_type && function.name == id.name)
    }

    /// Adds a function unless it is already known. Functions shared between stages are
    /// recorded once.
    pub fn add_function(&mut self, function: ShaderFunction) {
        if self.function(&function.id()).is_none() {
            self.functions.push(function);
        }
    }

    pub fn stage_usage(&self, stage: ShaderStage) -> Option<&StageUsage> {
        self.stages.get(&stage)
    }

    pub fn set_stage_usage(&mut self, stage: ShaderStage, usage: StageUsage) {
        self.stages.insert(stage, usage);
    }
}

/// Backend contexts keyed by backend and shader set.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: FastHashMap<(String, String), BackendContext>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the context for a backend and set. Each pair may only be initialized once.
    pub fn init(&mut self, backend: &str, set_name: &str) -> Result<&mut BackendContext, ShaderGenError> {
        let key = (backend.to_string(), set_name.to_string());
        if self.contexts.contains_key(&key) {
            return Err(ConfigErrorKind::ContextAlreadyInitialized {
                backend: key.0,
                set: key.1,
            }
            .into());
        }
        Ok(self
            .contexts
            .entry(key)
            .or_insert_with(|| BackendContext::new(backend, set_name)))
    }

    pub fn get(&self, backend: &str, set_name: &str) -> Result<&BackendContext, ShaderGenError> {
        self.contexts
            .get(&(backend.to_string(), set_name.to_string()))
            .ok_or_else(|| not_initialized(backend, set_name))
    }

    pub fn get_mut(
        &mut self,
        backend: &str,
        set_name: &str,
    ) -> Result<&mut BackendContext, ShaderGenError> {
        self.contexts
            .get_mut(&(backend.to_string(), set_name.to_string()))
            .ok_or_else(|| not_initialized(backend, set_name))
    }
}

fn not_initialized(backend: &str, set_name: &str) -> ShaderGenError {
    ConfigErrorKind::ContextNotInitialized {
        backend: backend.to_string(),
        set: set_name.to_string(),
    }
    .into()
}

#[cfg(test)]
mod test {
    use super::*;
    use shadergen_program::{MethodDeclaration, TypeReference};

    #[test]
    pub fn contexts_are_initialized_once() {
        let mut registry = ContextRegistry::new();
        assert!(registry.get("glsl450", "Basic").is_err());

        registry.init("glsl450", "Basic").unwrap();
        registry.init("glsl330", "Basic").unwrap();
        assert_eq!(
            ShaderGenError::Configuration(ConfigErrorKind::ContextAlreadyInitialized {
                backend: "glsl450".into(),
                set: "Basic".into(),
            }),
            registry.init("glsl450", "Basic").unwrap_err()
        );
        assert_eq!("Basic", registry.get("glsl330", "Basic").unwrap().set_name());
    }

    #[test]
    pub fn lookups_before_init_fail() {
        let mut registry = ContextRegistry::new();
        assert_eq!(
            ShaderGenError::Configuration(ConfigErrorKind::ContextNotInitialized {
                backend: "glsl450".into(),
                set: "Basic".into(),
            }),
            registry.get_mut("glsl450", "Basic").unwrap_err()
        );
    }

    #[test]
    pub fn functions_are_recorded_once() {
        let mut registry = ContextRegistry::new();
        let context = registry.init("glsl450", "Basic").unwrap();
        let helper = MethodDeclaration::new("Helper", TypeReference::float());
        context.add_function(ShaderFunction::from_declaration("Demo.Shader", &helper));
        context.add_function(ShaderFunction::from_declaration("Demo.Shader", &helper));
        assert_eq!(1, context.functions().len());
        assert!(context
            .function_mut(&MethodId::new("Demo.Shader", "Helper"))
            .is_some());
    }
}
