use crate::decl::{MethodDeclaration, MethodId, ShaderSetDeclaration, TypeDeclaration};
use crate::error::ProgramError;
use shadergen_common::map::FastHashMap;

/// The fully resolved program handed over by the front end.
///
/// Type declarations keep their insertion order, which is the order shader sets and
/// structures are discovered in.
#[derive(Debug, Clone, Default)]
pub struct ResolvedProgram {
    types: Vec<TypeDeclaration>,
    index: FastHashMap<String, usize>,
    shader_sets: Vec<ShaderSetDeclaration>,
}

impl ResolvedProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type declaration. Method names must be unique within a type.
    pub fn add_type(&mut self, declaration: TypeDeclaration) -> Result<(), ProgramError> {
        if self.index.contains_key(&declaration.name) {
            return Err(ProgramError::DuplicateType(declaration.name));
        }

        for (position, method) in declaration.methods.iter().enumerate() {
            if declaration.methods[..position]
                .iter()
                .any(|other| other.name == method.name)
            {
                return Err(ProgramError::DuplicateMethod {
                    declaring_type: declaration.name.clone(),
                    method: method.name.clone(),
                });
            }
        }

        self.index.insert(declaration.name.clone(), self.types.len());
        self.types.push(declaration);
        Ok(())
    }

    /// Builder-style variant of [`add_type`](Self::add_type).
    pub fn with_type(mut self, declaration: TypeDeclaration) -> Result<Self, ProgramError> {
        self.add_type(declaration)?;
        Ok(self)
    }

    pub fn add_shader_set(&mut self, set: ShaderSetDeclaration) {
        self.shader_sets.push(set);
    }

    pub fn with_shader_set(mut self, set: ShaderSetDeclaration) -> Self {
        self.add_shader_set(set);
        self
    }

    pub fn types(&self) -> &[TypeDeclaration] {
        &self.types
    }

    pub fn shader_sets(&self) -> &[ShaderSetDeclaration] {
        &self.shader_sets
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDeclaration> {
        self.index.get(name).map(|&position| &self.types[position])
    }

    pub fn get_method(&self, id: &MethodId) -> Option<&MethodDeclaration> {
        self.get_type(&id.declaring_type)?.method(&id.name)
    }
}
