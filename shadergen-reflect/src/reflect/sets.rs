use crate::error::{ResourceErrorKind, ShaderGenError, StageErrorKind};
use shadergen_common::map::FastHashSet;
use shadergen_common::ShaderStage;
use shadergen_program::{MethodId, ResolvedProgram, ShaderSetDeclaration};
use tracing::debug;

/// A shader set with its entry points resolved.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSetInfo {
    pub name: String,
    pub vertex: Option<MethodId>,
    pub fragment: Option<MethodId>,
    pub compute: Option<MethodId>,
}

impl ShaderSetInfo {
    pub fn entry(&self, stage: ShaderStage) -> Option<&MethodId> {
        match stage {
            ShaderStage::Vertex => self.vertex.as_ref(),
            ShaderStage::Fragment => self.fragment.as_ref(),
            ShaderStage::Compute => self.compute.as_ref(),
        }
    }

    fn entry_mut(&mut self, stage: ShaderStage) -> &mut Option<MethodId> {
        match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Fragment => &mut self.fragment,
            ShaderStage::Compute => &mut self.compute,
        }
    }

    /// Entry points present in this set, in stage order.
    pub fn entries(&self) -> impl Iterator<Item = (ShaderStage, &MethodId)> {
        ShaderStage::ALL
            .into_iter()
            .filter_map(|stage| self.entry(stage).map(|entry| (stage, entry)))
    }

    /// Types whose fields are the set's resources, in stage order, without duplicates.
    pub fn resource_owners(&self) -> Vec<&str> {
        let mut owners: Vec<&str> = Vec::new();
        for (_, entry) in self.entries() {
            if !owners.contains(&entry.declaring_type.as_str()) {
                owners.push(&entry.declaring_type);
            }
        }
        owners
    }
}

fn explicit_set(
    program: &ResolvedProgram,
    declaration: &ShaderSetDeclaration,
) -> Result<ShaderSetInfo, ShaderGenError> {
    let mut set = ShaderSetInfo {
        name: declaration.name.clone(),
        vertex: None,
        fragment: None,
        compute: None,
    };

    for stage in ShaderStage::ALL {
        let Some(reference) = declaration.entry(stage) else {
            continue;
        };
        let not_found = || StageErrorKind::EntryPointNotFound {
            set: declaration.name.clone(),
            reference: reference.to_string(),
            stage,
        };
        let id = MethodId::parse(reference).ok_or_else(not_found)?;
        let method = program.get_method(&id).ok_or_else(not_found)?;
        if method.attributes.stage != Some(stage) {
            return Err(ShaderGenError::from(not_found()).at(method.location.as_ref()));
        }
        *set.entry_mut(stage) = Some(id);
    }

    if set.entries().next().is_none() {
        return Err(StageErrorKind::InvalidEntryPointCount {
            owner: declaration.name.clone(),
            stage: ShaderStage::Vertex,
            count: 0,
        }
        .into());
    }
    Ok(set)
}

/// Resolves every shader set of the program.
///
/// Explicitly declared sets come first, in declaration order. Every type declaring
/// stage entry points that no explicit set references forms an implicit set named
/// after the type.
pub fn discover_shader_sets(program: &ResolvedProgram) -> Result<Vec<ShaderSetInfo>, ShaderGenError> {
    let mut sets = Vec::new();
    for declaration in program.shader_sets() {
        sets.push(explicit_set(program, declaration)?);
    }

    let referenced: FastHashSet<MethodId> = sets
        .iter()
        .flat_map(|set: &ShaderSetInfo| set.entries().map(|(_, id)| id.clone()))
        .collect();

    for declaration in program.types() {
        let mut set = ShaderSetInfo {
            name: declaration.short_name().to_string(),
            vertex: None,
            fragment: None,
            compute: None,
        };

        for stage in ShaderStage::ALL {
            let entries: Vec<MethodId> = declaration
                .methods
                .iter()
                .filter(|method| method.attributes.stage == Some(stage))
                .map(|method| MethodId::new(declaration.name.clone(), method.name.clone()))
                .filter(|id| !referenced.contains(id))
                .collect();

            match entries.len() {
                0 => {}
                1 => *set.entry_mut(stage) = entries.into_iter().next(),
                count => {
                    return Err(ShaderGenError::from(StageErrorKind::InvalidEntryPointCount {
                        owner: declaration.name.clone(),
                        stage,
                        count,
                    })
                    .at(declaration.location.as_ref()))
                }
            }
        }

        if set.entries().next().is_some() {
            sets.push(set);
        }
    }

    let mut names = FastHashSet::default();
    for set in &sets {
        if !names.insert(set.name.as_str()) {
            return Err(ResourceErrorKind::DuplicateShaderSet(set.name.clone()).into());
        }
    }

    debug!(sets = sets.len(), "discovered shader sets");
    Ok(sets)
}

#[cfg(test)]
mod test {
    use super::*;
    use shadergen_program::{Block, MethodDeclaration, TypeDeclaration, TypeReference};

    fn entry(name: &str, stage: ShaderStage) -> MethodDeclaration {
        MethodDeclaration::new(name, TypeReference::void())
            .with_stage(stage)
            .with_body(Block::default())
    }

    #[test]
    pub fn implicit_sets_are_named_after_their_type() {
        let program = ResolvedProgram::new()
            .with_type(
                TypeDeclaration::class("Demo.Basic")
                    .with_method(entry("VS", ShaderStage::Vertex))
                    .with_method(entry("FS", ShaderStage::Fragment)),
            )
            .unwrap();

        let sets = discover_shader_sets(&program).unwrap();
        assert_eq!(
            vec![ShaderSetInfo {
                name: "Basic".into(),
                vertex: Some(MethodId::new("Demo.Basic", "VS")),
                fragment: Some(MethodId::new("Demo.Basic", "FS")),
                compute: None,
            }],
            sets
        );
        assert_eq!(vec!["Demo.Basic"], sets[0].resource_owners());
    }

    #[test]
    pub fn explicit_sets_can_span_types() {
        let program = ResolvedProgram::new()
            .with_type(TypeDeclaration::class("Demo.Vertex").with_method(entry("VS", ShaderStage::Vertex)))
            .unwrap()
            .with_type(
                TypeDeclaration::class("Demo.Fragment").with_method(entry("FS", ShaderStage::Fragment)),
            )
            .unwrap()
            .with_shader_set(ShaderSetDeclaration::graphics(
                "Split",
                Some("Demo.Vertex.VS"),
                Some("Demo.Fragment.FS"),
            ));

        let sets = discover_shader_sets(&program).unwrap();
        assert_eq!(1, sets.len());
        assert_eq!(vec!["Demo.Vertex", "Demo.Fragment"], sets[0].resource_owners());
    }

    #[test]
    pub fn explicit_entries_must_match_their_stage() {
        let program = ResolvedProgram::new()
            .with_type(TypeDeclaration::class("Demo.Shader").with_method(entry("VS", ShaderStage::Vertex)))
            .unwrap()
            .with_shader_set(ShaderSetDeclaration::graphics("Wrong", None, Some("Demo.Shader.VS")));

        let err = discover_shader_sets(&program).unwrap_err();
        assert!(matches!(
            err.inner(),
            ShaderGenError::Stage(StageErrorKind::EntryPointNotFound { .. })
        ));
    }

    #[test]
    pub fn duplicate_stage_entries_are_rejected() {
        let program = ResolvedProgram::new()
            .with_type(
                TypeDeclaration::class("Demo.Shader")
                    .with_method(entry("VS1", ShaderStage::Vertex))
                    .with_method(entry("VS2", ShaderStage::Vertex)),
            )
            .unwrap();

        let err = discover_shader_sets(&program).unwrap_err();
        assert_eq!(
            &ShaderGenError::Stage(StageErrorKind::InvalidEntryPointCount {
                owner: "Demo.Shader".into(),
                stage: ShaderStage::Vertex,
                count: 2,
            }),
            err.inner()
        );
    }

    #[test]
    pub fn duplicate_set_names_are_rejected() {
        let program = ResolvedProgram::new()
            .with_type(TypeDeclaration::class("A.Shader").with_method(entry("CS", ShaderStage::Compute)))
            .unwrap()
            .with_type(TypeDeclaration::class("B.Shader").with_method(entry("CS", ShaderStage::Compute)))
            .unwrap();

        let err = discover_shader_sets(&program).unwrap_err();
        assert_eq!(
            ShaderGenError::Resource(ResourceErrorKind::DuplicateShaderSet("Shader".into())),
            err
        );
    }
}
