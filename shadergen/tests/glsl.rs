mod common;

use common::*;
use pretty_assertions::assert_eq;
use shadergen::generate::{GenerationOptions, ShaderGenerator};
use shadergen::reflect::targets::{GlslBackend, GlslCompileOptions, GlslVersion};
use shadergen::ShaderStage;

fn glsl(version: GlslVersion) -> GlslBackend {
    GlslBackend::new(GlslCompileOptions {
        version,
        ..Default::default()
    })
}

const TEXTURED_STRUCTURES: &str = "struct VertexInput
{
    vec3 Position;
    vec2 TexCoords;
};

struct FragmentInput
{
    vec4 Position;
    vec2 TexCoords;
};
";

const TEXTURED_VS: &str = "FragmentInput VS(VertexInput input_)
{
    FragmentInput result;
    result.Position = (Projection * (World * vec4(input_.Position, 1.0)));
    result.TexCoords = input_.TexCoords;
    return result;
}
";

#[test]
pub fn textured_vulkan_glsl() {
    install_subscriber();
    let program = textured_program();
    let result = ShaderGenerator::new(&program)
        .with_backend(glsl(GlslVersion::Glsl450))
        .generate(&GenerationOptions::default())
        .unwrap();
    assert!(result.is_success(), "{:?}", result.failures());

    let textured = result.get("glsl450", "Textured").unwrap();
    assert_eq!(
        format!(
            "#version 450

{TEXTURED_STRUCTURES}
layout(std140, set = 0, binding = 0) uniform ProjectionBuffer
{{
    mat4 Projection;
}};

layout(std140, set = 0, binding = 1) uniform WorldBuffer
{{
    mat4 World;
}};

layout(location = 0) in vec3 Position;
layout(location = 1) in vec2 TexCoords;
layout(location = 0) out vec2 fsin_0;

{TEXTURED_VS}
void main()
{{
    VertexInput _input;
    _input.Position = Position;
    _input.TexCoords = TexCoords;
    FragmentInput _output = VS(_input);
    gl_Position = _output.Position;
    fsin_0 = _output.TexCoords;
}}
"
        ),
        textured.source(ShaderStage::Vertex).unwrap()
    );

    assert_eq!(
        format!(
            "#version 450

{TEXTURED_STRUCTURES}
layout(set = 0, binding = 2) uniform texture2D Surface;

layout(set = 0, binding = 3) uniform sampler PointSampler;

layout(location = 0) in vec2 fsin_0;
layout(location = 0) out vec4 _outputColor_;

vec4 FS(FragmentInput input_)
{{
    return texture(sampler2D(Surface, PointSampler), input_.TexCoords);
}}

void main()
{{
    FragmentInput _input;
    _input.Position = gl_FragCoord;
    _input.TexCoords = fsin_0;
    vec4 _output = FS(_input);
    _outputColor_ = _output;
}}
"
        ),
        textured.source(ShaderStage::Fragment).unwrap()
    );
    assert!(textured.source(ShaderStage::Compute).is_none());
}

#[test]
pub fn textured_desktop_glsl() {
    let program = textured_program();
    let result = ShaderGenerator::new(&program)
        .with_backend(glsl(GlslVersion::Glsl330))
        .generate(&GenerationOptions::default())
        .unwrap();

    let textured = result.get("glsl330", "Textured").unwrap();
    let vertex = textured.source(ShaderStage::Vertex).unwrap();
    assert!(vertex.starts_with("#version 330 core\n\n"));
    assert!(vertex.contains("layout(std140) uniform WorldBuffer\n{\n    mat4 World;\n};"));
    assert!(vertex.contains("\nout vec2 fsin_0;\n"));

    let fragment = textured.source(ShaderStage::Fragment).unwrap();
    assert!(fragment.contains("\nuniform sampler2D Surface;\n"));
    assert!(!fragment.contains("PointSampler;"));
    assert!(fragment.contains("return texture(Surface, input_.TexCoords);"));
    assert!(fragment.contains("\nin vec2 fsin_0;\n"));
}

#[test]
pub fn textured_es_glsl() {
    let program = textured_program();
    let result = ShaderGenerator::new(&program)
        .with_backend(GlslBackend::new(GlslCompileOptions {
            version: GlslVersion::Glsl300Es,
            flip_vertex_y: true,
            float_precision: "mediump".parse().unwrap(),
        }))
        .generate(&GenerationOptions::default())
        .unwrap();

    let textured = result.get("glsl300es", "Textured").unwrap();
    let vertex = textured.source(ShaderStage::Vertex).unwrap();
    assert!(vertex.starts_with("#version 300 es\nprecision mediump float;\n"));
    assert!(vertex.contains(
        "    gl_Position = _output.Position;\n    gl_Position.y = -gl_Position.y;\n"
    ));
}

#[test]
pub fn every_backend_gets_every_set() {
    let program = textured_program();
    let result = ShaderGenerator::new(&program)
        .with_backend(glsl(GlslVersion::Glsl330))
        .with_backend(glsl(GlslVersion::Glsl300Es))
        .with_backend(glsl(GlslVersion::Glsl450))
        .generate(&GenerationOptions::default())
        .unwrap();

    assert_eq!(3, result.sets().len());
    for backend in ["glsl330", "glsl300es", "glsl450"] {
        let set = result.get(backend, "Textured").unwrap();
        assert_eq!(backend, set.backend);
    }
}

#[test]
pub fn parallel_and_sequential_generation_agree() {
    let mut types = textured_types();
    for index in 0..8 {
        types.push(textured_shader(&format!("Shaders.Copy{index}")));
    }
    let program = program(types);
    let generator = ShaderGenerator::new(&program)
        .with_backend(glsl(GlslVersion::Glsl450))
        .with_backend(glsl(GlslVersion::Glsl330));

    let parallel = generator
        .generate(&GenerationOptions { parallel: true })
        .unwrap();
    let sequential = generator
        .generate(&GenerationOptions { parallel: false })
        .unwrap();
    assert_eq!(18, parallel.sets().len());
    assert_eq!(sequential.sets(), parallel.sets());
}

#[test]
pub fn generators_can_be_shared_between_threads() {
    use rayon::prelude::*;

    let program = textured_program();
    let generator = ShaderGenerator::new(&program).with_backend(glsl(GlslVersion::Glsl450));
    let expected = generator
        .generate(&GenerationOptions { parallel: false })
        .unwrap();

    let runs: Vec<_> = (0..4)
        .into_par_iter()
        .map(|_| generator.generate(&GenerationOptions::default()).unwrap())
        .collect();
    for run in runs {
        assert_eq!(expected.sets(), run.sets());
    }
}
