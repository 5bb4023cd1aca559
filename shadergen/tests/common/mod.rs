#![allow(dead_code)]

use shadergen::program::{
    resource, Block, Expression, FieldDeclaration, MethodDeclaration, ParameterDeclaration,
    ResolvedProgram, SemanticType, Statement, TypeDeclaration, TypeReference,
};
use shadergen::ShaderStage;

pub const TEXTURED: &str = "Shaders.Textured";
pub const VERTEX_INPUT: &str = "Shaders.VertexInput";
pub const FRAGMENT_INPUT: &str = "Shaders.FragmentInput";

pub fn install_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
        .with_test_writer()
        .try_init();
}

fn input(ty: &str) -> Expression {
    Expression::parameter("input", TypeReference::structure(ty))
}

/// A textured quad: a transformed vertex stage and a sampling fragment stage.
pub fn textured_types() -> Vec<TypeDeclaration> {
    vec![
        vertex_input(),
        fragment_input(),
        textured_shader(TEXTURED),
    ]
}

pub fn vertex_input() -> TypeDeclaration {
    TypeDeclaration::structure(VERTEX_INPUT)
        .with_field(
            FieldDeclaration::new("Position", TypeReference::vector3())
                .with_semantic(SemanticType::Position),
        )
        .with_field(
            FieldDeclaration::new("TexCoords", TypeReference::vector2())
                .with_semantic(SemanticType::TextureCoordinate),
        )
}

pub fn fragment_input() -> TypeDeclaration {
    TypeDeclaration::structure(FRAGMENT_INPUT)
        .with_field(
            FieldDeclaration::new("Position", TypeReference::vector4())
                .with_semantic(SemanticType::SystemPosition),
        )
        .with_field(
            FieldDeclaration::new("TexCoords", TypeReference::vector2())
                .with_semantic(SemanticType::TextureCoordinate),
        )
}

/// The shader class of the textured quad, declared under `name`.
pub fn textured_shader(name: &str) -> TypeDeclaration {
    let result = || Expression::local("result", TypeReference::structure(FRAGMENT_INPUT));
    let world_position = Expression::invoke(
        "System.Numerics.Vector4",
        "Transform",
        vec![
            input(VERTEX_INPUT)
                .member(VERTEX_INPUT, "Position", TypeReference::vector3())
                .into(),
            Expression::field(name, "World", TypeReference::matrix4x4()).into(),
        ],
        TypeReference::vector4(),
    );
    let clip_position = Expression::invoke(
        "System.Numerics.Vector4",
        "Transform",
        vec![
            world_position.into(),
            Expression::field(name, "Projection", TypeReference::matrix4x4()).into(),
        ],
        TypeReference::vector4(),
    );
    let vertex = MethodDeclaration::new("VS", TypeReference::structure(FRAGMENT_INPUT))
        .with_stage(ShaderStage::Vertex)
        .with_parameter(ParameterDeclaration::new(
            "input",
            TypeReference::structure(VERTEX_INPUT),
        ))
        .with_body(Block::new(vec![
            Statement::declare("result", TypeReference::structure(FRAGMENT_INPUT), None),
            Expression::assign(
                result().member(FRAGMENT_INPUT, "Position", TypeReference::vector4()),
                clip_position,
            )
            .into(),
            Expression::assign(
                result().member(FRAGMENT_INPUT, "TexCoords", TypeReference::vector2()),
                input(VERTEX_INPUT).member(VERTEX_INPUT, "TexCoords", TypeReference::vector2()),
            )
            .into(),
            Statement::Return(Some(result())),
        ]));

    let sample = Expression::invoke(
        "ShaderGen.ShaderBuiltins",
        "Sample",
        vec![
            Expression::field(
                name,
                "Surface",
                TypeReference::resource(resource::TEXTURE_2D, vec![]),
            )
            .into(),
            Expression::field(
                name,
                "PointSampler",
                TypeReference::resource(resource::SAMPLER, vec![]),
            )
            .into(),
            input(FRAGMENT_INPUT)
                .member(FRAGMENT_INPUT, "TexCoords", TypeReference::vector2())
                .into(),
        ],
        TypeReference::vector4(),
    );
    let fragment = MethodDeclaration::new("FS", TypeReference::vector4())
        .with_stage(ShaderStage::Fragment)
        .with_parameter(ParameterDeclaration::new(
            "input",
            TypeReference::structure(FRAGMENT_INPUT),
        ))
        .with_body(Block::new(vec![Statement::Return(Some(sample))]));

    TypeDeclaration::class(name)
        .with_field(FieldDeclaration::new("Projection", TypeReference::matrix4x4()))
        .with_field(FieldDeclaration::new("World", TypeReference::matrix4x4()))
        .with_field(FieldDeclaration::new(
            "Surface",
            TypeReference::resource(resource::TEXTURE_2D, vec![]),
        ))
        .with_field(FieldDeclaration::new(
            "PointSampler",
            TypeReference::resource(resource::SAMPLER, vec![]),
        ))
        .with_method(vertex)
        .with_method(fragment)
}

pub fn program(types: Vec<TypeDeclaration>) -> ResolvedProgram {
    let mut program = ResolvedProgram::new();
    for ty in types {
        program.add_type(ty).expect("type names are unique");
    }
    program
}

pub fn textured_program() -> ResolvedProgram {
    program(textured_types())
}
