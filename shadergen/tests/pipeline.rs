mod common;

use common::*;
use pretty_assertions::assert_eq;
use shadergen::generate::{GenerationOptions, ShaderGenerator};
use shadergen::program::{
    resource, Block, Expression, ExpressionKind, FieldDeclaration, Literal, MethodDeclaration,
    ResolvedProgram, ShaderSetDeclaration, SourceLocation, Statement, Symbol, SymbolKind,
    TypeDeclaration, TypeReference,
};
use shadergen::reflect::targets::{GlslBackend, GlslCompileOptions, GlslVersion};
use shadergen::reflect::{
    FunctionUsage, GraphErrorKind, ResourceErrorKind, ShaderGenError, StageErrorKind,
};
use shadergen::{GroupSize, ShaderStage};

fn glsl(version: GlslVersion) -> GlslBackend {
    GlslBackend::new(GlslCompileOptions {
        version,
        ..Default::default()
    })
}

fn compute_entry(body: Vec<Statement>) -> MethodDeclaration {
    MethodDeclaration::new("CS", TypeReference::void())
        .with_stage(ShaderStage::Compute)
        .with_compute_group(GroupSize::new(64, 1, 1))
        .with_body(Block::new(body))
}

/// Generates for Vulkan GLSL and returns the error of the only failed set.
fn single_failure(program: &ResolvedProgram) -> ShaderGenError {
    let result = ShaderGenerator::new(program)
        .with_backend(glsl(GlslVersion::Glsl450))
        .generate(&GenerationOptions::default())
        .unwrap();
    assert_eq!(1, result.failures().len(), "{:?}", result.failures());
    result.failures()[0].error.clone()
}

fn builtins() -> Expression {
    Expression::new(
        ExpressionKind::Identifier(Symbol::new("", "ShaderGen.ShaderBuiltins", SymbolKind::Type)),
        TypeReference::class("ShaderGen.ShaderBuiltins"),
    )
}

#[test]
pub fn resource_bindings_follow_declaration_order() {
    install_subscriber();
    let block = TypeDeclaration::structure("Shaders.Block")
        .with_field(FieldDeclaration::new("Tint", TypeReference::vector4()));
    let shader = TypeDeclaration::class("Shaders.Bound")
        .with_field(FieldDeclaration::new(
            "A",
            TypeReference::structure("Shaders.Block"),
        ))
        .with_field(FieldDeclaration::new("B", TypeReference::float()))
        .with_method(compute_entry(vec![]));
    let program = program(vec![block, shader]);

    let result = ShaderGenerator::new(&program)
        .with_backend(glsl(GlslVersion::Glsl450))
        .generate(&GenerationOptions::default())
        .unwrap();
    assert!(result.is_success(), "{:?}", result.failures());

    let model = &result.get("glsl450", "Bound").unwrap().model;
    let bindings: Vec<(&str, u32, u32)> = model
        .all_resources
        .iter()
        .map(|r| (r.name.as_str(), r.descriptor_set, r.binding))
        .collect();
    assert_eq!(vec![("A", 0, 0), ("B", 0, 1)], bindings);
}

#[test]
pub fn padded_uniform_and_texture_round_trip() {
    use shadergen::reflect::helper::ResourceBinder;
    use shadergen::reflect::{LayoutCalculator, StructureDefinition};

    let params = TypeDeclaration::structure("Shaders.Params")
        .with_field(FieldDeclaration::new("pos", TypeReference::vector3()))
        .with_field(FieldDeclaration::new("scale", TypeReference::float()));
    let fields = [
        FieldDeclaration::new("A", TypeReference::structure("Shaders.Params")),
        FieldDeclaration::new("B", TypeReference::resource(resource::TEXTURE_2D, vec![])),
    ];
    let program = program(vec![params.clone()]);

    let mut binder = ResourceBinder::new();
    let bound: Vec<(String, u32, u32)> = fields
        .iter()
        .map(|field| binder.bind("Shaders.Shader", field).unwrap())
        .map(|r| (r.name, r.descriptor_set, r.binding))
        .collect();
    assert_eq!(
        vec![("A".to_string(), 0, 0), ("B".to_string(), 0, 1)],
        bound
    );

    let structure =
        StructureDefinition::from_declaration(&program, &LayoutCalculator::new(), &params)
            .unwrap();
    assert!(!structure.host_matches_device_layout);
}

#[test]
pub fn divergent_uniform_layouts_are_rejected() {
    install_subscriber();
    let block = TypeDeclaration::structure("Shaders.Padded")
        .with_field(FieldDeclaration::new("Direction", TypeReference::vector3()))
        .with_field(FieldDeclaration::new("Intensity", TypeReference::float()));
    let shader = TypeDeclaration::class("Shaders.Lit")
        .with_field(FieldDeclaration::new(
            "Light",
            TypeReference::structure("Shaders.Padded"),
        ))
        .with_method(compute_entry(vec![]));
    let program = program(vec![block, shader]);

    let generator = ShaderGenerator::new(&program).with_backend(glsl(GlslVersion::Glsl450));
    let result = generator.generate(&GenerationOptions::default()).unwrap();
    assert_eq!(
        &ShaderGenError::Resource(ResourceErrorKind::LayoutMismatch {
            resource: "Light".to_string(),
            structure: "Shaders.Padded".to_string(),
        }),
        result.failures()[0].error.inner()
    );

    let alignment = generator
        .layouts()
        .alignment_of(&program, &TypeReference::structure("Shaders.Padded"))
        .unwrap();
    assert_eq!(16, alignment.host_size);
    assert_eq!(20, alignment.device_size);
}

#[test]
pub fn cycles_report_the_call_site() {
    install_subscriber();
    let call = |name: &str| {
        Expression::invoke("Shaders.Loop", name, vec![], TypeReference::void())
    };
    let site = SourceLocation::new("Loop.cs", 12, 9);
    let shader = TypeDeclaration::class("Shaders.Loop")
        .with_method(
            MethodDeclaration::new("Ping", TypeReference::void())
                .with_body(Block::new(vec![call("Pong").into()])),
        )
        .with_method(
            MethodDeclaration::new("Pong", TypeReference::void())
                .with_body(Block::new(vec![call("Ping").at(site.clone()).into()])),
        )
        .with_method(compute_entry(vec![call("Ping").into()]));
    let program = program(vec![shader]);

    let error = single_failure(&program);
    assert_eq!(Some(&site), error.location());
    assert!(matches!(
        error.inner(),
        ShaderGenError::Graph(GraphErrorKind::Cycle { caller, callee })
            if caller.name == "Pong" && callee.name == "Ping"
    ));
}

#[test]
pub fn resources_are_split_between_stages() {
    install_subscriber();
    let program = textured_program();
    let result = ShaderGenerator::new(&program)
        .with_backend(glsl(GlslVersion::Glsl450))
        .generate(&GenerationOptions::default())
        .unwrap();
    let model = &result.get("glsl450", "Textured").unwrap().model;

    let names = |stage: ShaderStage| -> Vec<String> {
        model
            .stage_resources(stage)
            .iter()
            .map(|r| r.name.clone())
            .collect()
    };
    assert_eq!(vec!["Projection", "World"], names(ShaderStage::Vertex));
    assert_eq!(
        vec!["Surface", "PointSampler"],
        names(ShaderStage::Fragment)
    );
    assert_eq!(4, model.all_resources.len());
}

#[test]
pub fn vertex_builtins_are_rejected_in_fragment_shaders() {
    install_subscriber();
    let vertex_id = builtins().member(
        "ShaderGen.ShaderBuiltins",
        "VertexID",
        TypeReference::uint(),
    );
    let fragment = MethodDeclaration::new("FS", TypeReference::vector4())
        .with_stage(ShaderStage::Fragment)
        .with_parameter(shadergen::program::ParameterDeclaration::new(
            "input",
            TypeReference::structure(FRAGMENT_INPUT),
        ))
        .with_body(Block::new(vec![
            Statement::declare("id", TypeReference::uint(), Some(vertex_id)),
            Statement::Return(Some(Expression::construct(TypeReference::vector4(), vec![]))),
        ]));
    let shader = TypeDeclaration::class("Shaders.Misplaced").with_method(fragment);
    let program = program(vec![fragment_input(), shader]);

    let error = single_failure(&program);
    assert!(matches!(
        error.inner(),
        ShaderGenError::Stage(StageErrorKind::BuiltinOutsideStage { builtin, stage: ShaderStage::Fragment, .. })
            if builtin == "VertexID"
    ));
}

#[test]
pub fn compute_shaders_use_storage_buffers() {
    install_subscriber();
    let particle = TypeDeclaration::structure("Shaders.Particle")
        .with_field(FieldDeclaration::new("Position", TypeReference::vector4()))
        .with_field(FieldDeclaration::new("Velocity", TypeReference::vector4()));
    let particles_ty = TypeReference::resource(
        resource::RW_STRUCTURED_BUFFER,
        vec![TypeReference::structure("Shaders.Particle")],
    );
    let counter_ty = TypeReference::resource(resource::ATOMIC_BUFFER, vec![]);

    let element = || {
        Expression::field("Shaders.Simulate", "Particles", particles_ty.clone()).index(
            Expression::local("i", TypeReference::uint()),
            TypeReference::structure("Shaders.Particle"),
        )
    };
    let member = |name: &str| element().member("Shaders.Particle", name, TypeReference::vector4());
    let thread_x = builtins()
        .member(
            "ShaderGen.ShaderBuiltins",
            "DispatchThreadID",
            TypeReference::primitive("UInt3"),
        )
        .member("UInt3", "X", TypeReference::uint());

    let body = vec![
        Statement::declare("i", TypeReference::uint(), Some(thread_x)),
        Expression::assign(
            member("Position"),
            Expression::binary(
                shadergen::program::BinaryOperator::Add,
                member("Position"),
                member("Velocity"),
                TypeReference::vector4(),
            ),
        )
        .into(),
        Expression::invoke(
            "ShaderGen.ShaderBuiltins",
            "InterlockedAdd",
            vec![
                Expression::field("Shaders.Simulate", "Counter", counter_ty.clone()).into(),
                Expression::int(0).into(),
                Expression::literal(Literal::UInt(1)).into(),
            ],
            TypeReference::uint(),
        )
        .into(),
    ];
    let shader = TypeDeclaration::class("Shaders.Simulate")
        .with_field(FieldDeclaration::new("Particles", particles_ty))
        .with_field(FieldDeclaration::new("Counter", counter_ty))
        .with_method(compute_entry(body));
    let program = program(vec![particle, shader]);

    let result = ShaderGenerator::new(&program)
        .with_backend(glsl(GlslVersion::Glsl450))
        .generate(&GenerationOptions::default())
        .unwrap();
    assert!(result.is_success(), "{:?}", result.failures());
    let generated = result.get("glsl450", "Simulate").unwrap();
    let source = generated.source(ShaderStage::Compute).unwrap();

    for expected in [
        "layout(std430, set = 0, binding = 0) buffer ParticlesBuffer\n{\n    Particle Particles[];\n};",
        "layout(std430, set = 0, binding = 1) buffer CounterBuffer\n{\n    uint Counter[];\n};",
        "layout(local_size_x = 64, local_size_y = 1, local_size_z = 1) in;",
        "gl_GlobalInvocationID.x",
        "Particles[i].Position = Particles[i].Position + Particles[i].Velocity;",
        "atomicAdd(Counter[0], 1u);",
    ] {
        assert!(source.contains(expected), "missing `{expected}` in\n{source}");
    }

    let usage = generated
        .model
        .entry_function(ShaderStage::Compute)
        .unwrap()
        .usage();
    assert!(usage.contains(
        FunctionUsage::DISPATCH_THREAD_ID
            | FunctionUsage::INTERLOCKED_ADD
            | FunctionUsage::STRUCTURED_BUFFER
    ));
    assert!(usage.uses_storage());
}

#[test]
pub fn explicit_sets_claim_their_entry_points() {
    install_subscriber();
    let program = textured_program().with_shader_set(ShaderSetDeclaration::graphics(
        "Combined",
        Some("Shaders.Textured.VS"),
        Some("Shaders.Textured.FS"),
    ));
    let result = ShaderGenerator::new(&program)
        .with_backend(glsl(GlslVersion::Glsl450))
        .generate(&GenerationOptions::default())
        .unwrap();

    assert!(result.is_success(), "{:?}", result.failures());
    assert!(result.get("glsl450", "Combined").is_some());
    assert!(result.get("glsl450", "Textured").is_none());
    assert_eq!(1, result.sets().len());
}

#[test]
pub fn resource_names_collide_across_entry_point_types() {
    install_subscriber();
    let program = program(vec![
        vertex_input(),
        fragment_input(),
        textured_shader("Shaders.First"),
        textured_shader("Shaders.Second"),
    ])
    .with_shader_set(ShaderSetDeclaration::graphics(
        "Mixed",
        Some("Shaders.First.VS"),
        Some("Shaders.Second.FS"),
    ));
    let result = ShaderGenerator::new(&program)
        .with_backend(glsl(GlslVersion::Glsl450))
        .generate(&GenerationOptions::default())
        .unwrap();

    assert!(result.get("glsl450", "Mixed").is_none());
    let failure = result
        .failures()
        .iter()
        .find(|failure| failure.set == "Mixed")
        .unwrap();
    assert_eq!(
        &ShaderGenError::Resource(ResourceErrorKind::DuplicateResource {
            resource: "Projection".to_string(),
            first: "Shaders.First".to_string(),
            second: "Shaders.Second".to_string(),
        }),
        failure.error.inner()
    );
}

#[test]
pub fn discovery_errors_abort_generation() {
    install_subscriber();
    let shader = TypeDeclaration::class("Shaders.Twice")
        .with_method(compute_entry(vec![]))
        .with_method(
            MethodDeclaration::new("CS2", TypeReference::void())
                .with_stage(ShaderStage::Compute)
                .with_compute_group(GroupSize::new(1, 1, 1))
                .with_body(Block::new(vec![])),
        );
    let program = program(vec![shader]);

    let error = ShaderGenerator::new(&program)
        .with_backend(glsl(GlslVersion::Glsl450))
        .generate(&GenerationOptions::default())
        .unwrap_err();
    assert_eq!(
        &ShaderGenError::Stage(StageErrorKind::InvalidEntryPointCount {
            owner: "Shaders.Twice".to_string(),
            stage: ShaderStage::Compute,
            count: 2,
        }),
        error.inner()
    );
}

#[test]
pub fn layouts_are_cached_across_sets() {
    install_subscriber();
    let program = textured_program();
    let generator = ShaderGenerator::new(&program)
        .with_backend(glsl(GlslVersion::Glsl450))
        .with_backend(glsl(GlslVersion::Glsl330));
    assert!(generator.layouts().cached(VERTEX_INPUT).is_none());

    let result = generator.generate(&GenerationOptions::default()).unwrap();
    assert!(result.is_success(), "{:?}", result.failures());

    let cached = generator.layouts().cached(VERTEX_INPUT).unwrap();
    assert_eq!(20, cached.host_size);
    assert_eq!(24, cached.device_size);
}

#[cfg(feature = "serde")]
#[test]
pub fn models_serialize() {
    use shadergen::reflect::ShaderModel;

    let program = textured_program();
    let result = ShaderGenerator::new(&program)
        .with_backend(glsl(GlslVersion::Glsl450))
        .generate(&GenerationOptions::default())
        .unwrap();
    let model = &result.get("glsl450", "Textured").unwrap().model;

    let json = serde_json::to_string(model).unwrap();
    let restored: ShaderModel = serde_json::from_str(&json).unwrap();
    assert_eq!(model, &restored);
    assert!(!restored.structure(VERTEX_INPUT).unwrap().host_matches_device_layout);
}
