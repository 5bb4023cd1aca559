use super::GlslBackend;
use crate::back::InvocationArgument;
use crate::error::{GraphErrorKind, ResourceErrorKind, ShaderGenError};
use crate::reflect::resources::ResourceKind;
use once_cell::sync::Lazy;
use shadergen_common::map::FastHashMap;
use shadergen_program::{builtin, short_name};

type Formatter = fn(&GlslBackend, &[InvocationArgument]) -> Result<String, FormatError>;

/// Why a custom formatter produced no text.
#[derive(Debug)]
enum FormatError {
    /// The arguments match no overload of the intrinsic.
    Arguments,
    Failed(ShaderGenError),
}

impl From<ShaderGenError> for FormatError {
    fn from(error: ShaderGenError) -> Self {
        FormatError::Failed(error)
    }
}

enum Intrinsic {
    /// A GLSL builtin function taking the same arguments.
    Function(&'static str),
    /// A binary operator between the two arguments.
    Operator(&'static str),
    Custom(Formatter),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum Owner {
    Vector2,
    Vector3,
    Vector4,
    /// `Int2` through `UInt4`.
    IntegerVector,
    Matrix4x4,
    MathF,
    ShaderBuiltins,
}

impl Owner {
    fn from_type_name(name: &str) -> Option<Owner> {
        Some(match short_name(name) {
            builtin::VECTOR2 => Owner::Vector2,
            builtin::VECTOR3 => Owner::Vector3,
            builtin::VECTOR4 => Owner::Vector4,
            builtin::INT2
            | builtin::INT3
            | builtin::INT4
            | builtin::UINT2
            | builtin::UINT3
            | builtin::UINT4 => Owner::IntegerVector,
            builtin::MATRIX4X4 => Owner::Matrix4x4,
            builtin::MATHF => Owner::MathF,
            builtin::SHADER_BUILTINS => Owner::ShaderBuiltins,
            _ => return None,
        })
    }
}

static INTRINSICS: Lazy<FastHashMap<(Owner, &'static str), Intrinsic>> = Lazy::new(|| {
    let mut map = FastHashMap::default();

    for owner in [Owner::Vector2, Owner::Vector3, Owner::Vector4] {
        map.insert((owner, "Abs"), Intrinsic::Function("abs"));
        map.insert((owner, "Add"), Intrinsic::Operator("+"));
        map.insert((owner, "Clamp"), Intrinsic::Function("clamp"));
        map.insert((owner, "Distance"), Intrinsic::Function("distance"));
        map.insert((owner, "DistanceSquared"), Intrinsic::Custom(distance_squared));
        map.insert((owner, "Divide"), Intrinsic::Operator("/"));
        map.insert((owner, "Dot"), Intrinsic::Function("dot"));
        map.insert((owner, "Length"), Intrinsic::Function("length"));
        map.insert((owner, "LengthSquared"), Intrinsic::Custom(length_squared));
        map.insert((owner, "Lerp"), Intrinsic::Function("mix"));
        map.insert((owner, "Max"), Intrinsic::Function("max"));
        map.insert((owner, "Min"), Intrinsic::Function("min"));
        map.insert((owner, "Multiply"), Intrinsic::Operator("*"));
        map.insert((owner, "Negate"), Intrinsic::Custom(negate));
        map.insert((owner, "Normalize"), Intrinsic::Function("normalize"));
        map.insert((owner, "Reflect"), Intrinsic::Function("reflect"));
        map.insert((owner, "SquareRoot"), Intrinsic::Function("sqrt"));
        map.insert((owner, "Subtract"), Intrinsic::Operator("-"));
    }
    map.insert(
        (Owner::Vector2, "Transform"),
        Intrinsic::Custom(|backend, args| Ok(format!("{}.xy", transform(backend, args)?))),
    );
    map.insert(
        (Owner::Vector3, "Transform"),
        Intrinsic::Custom(|backend, args| Ok(format!("{}.xyz", transform(backend, args)?))),
    );
    map.insert((Owner::Vector4, "Transform"), Intrinsic::Custom(transform));
    map.insert((Owner::Vector3, "Cross"), Intrinsic::Function("cross"));

    let integers = Owner::IntegerVector;
    map.insert((integers, "Abs"), Intrinsic::Function("abs"));
    map.insert((integers, "Add"), Intrinsic::Operator("+"));
    map.insert((integers, "Clamp"), Intrinsic::Function("clamp"));
    map.insert((integers, "Divide"), Intrinsic::Operator("/"));
    map.insert((integers, "Max"), Intrinsic::Function("max"));
    map.insert((integers, "Min"), Intrinsic::Function("min"));
    map.insert((integers, "Multiply"), Intrinsic::Operator("*"));
    map.insert((integers, "Subtract"), Intrinsic::Operator("-"));

    map.insert((Owner::Matrix4x4, "Add"), Intrinsic::Operator("+"));
    map.insert((Owner::Matrix4x4, "Subtract"), Intrinsic::Operator("-"));
    map.insert((Owner::Matrix4x4, "Multiply"), Intrinsic::Custom(matrix_multiply));
    map.insert((Owner::Matrix4x4, "Transpose"), Intrinsic::Function("transpose"));

    for (method, function) in [
        ("Abs", "abs"),
        ("Acos", "acos"),
        ("Asin", "asin"),
        ("Atan", "atan"),
        ("Atan2", "atan"),
        ("Ceiling", "ceil"),
        ("Clamp", "clamp"),
        ("Cos", "cos"),
        ("Cosh", "cosh"),
        ("Exp", "exp"),
        ("Floor", "floor"),
        ("Log", "log"),
        ("Log2", "log2"),
        ("Max", "max"),
        ("Min", "min"),
        ("Pow", "pow"),
        ("Round", "round"),
        ("Sin", "sin"),
        ("Sinh", "sinh"),
        ("Sqrt", "sqrt"),
        ("Tan", "tan"),
        ("Tanh", "tanh"),
        ("Truncate", "trunc"),
    ] {
        map.insert((Owner::MathF, method), Intrinsic::Function(function));
    }
    map.insert((Owner::MathF, "Sign"), Intrinsic::Custom(sign));
    map.insert((Owner::MathF, "FusedMultiplyAdd"), Intrinsic::Custom(fused_multiply_add));

    let builtins = Owner::ShaderBuiltins;
    map.insert((builtins, "Sample"), Intrinsic::Custom(sample));
    map.insert((builtins, "SampleLevel"), Intrinsic::Custom(sample_level));
    map.insert((builtins, "SampleGrad"), Intrinsic::Custom(sample_grad));
    map.insert((builtins, "SampleComparison"), Intrinsic::Custom(sample_comparison));
    map.insert(
        (builtins, "SampleComparisonLevelZero"),
        Intrinsic::Custom(sample_comparison_level_zero),
    );
    map.insert((builtins, "Load"), Intrinsic::Custom(load));
    map.insert((builtins, "Ddx"), Intrinsic::Function("dFdx"));
    map.insert((builtins, "Ddy"), Intrinsic::Function("dFdy"));
    map.insert((builtins, "DdxFine"), Intrinsic::Custom(ddx_fine));
    map.insert((builtins, "DdyFine"), Intrinsic::Custom(ddy_fine));
    map.insert((builtins, "Discard"), Intrinsic::Custom(|_, _| Ok("discard".to_string())));
    map.insert((builtins, "Saturate"), Intrinsic::Custom(saturate));
    map.insert((builtins, "Abs"), Intrinsic::Function("abs"));
    map.insert((builtins, "Mod"), Intrinsic::Function("mod"));
    map.insert((builtins, "Frac"), Intrinsic::Function("fract"));
    map.insert((builtins, "Lerp"), Intrinsic::Function("mix"));
    map.insert((builtins, "ClipToTextureCoordinates"), Intrinsic::Custom(clip_to_texture_coordinates));
    map.insert((builtins, "InterlockedAdd"), Intrinsic::Custom(interlocked_add));

    map
});

/// Formats an intrinsic call, or `None` if the method is not a known intrinsic.
pub(super) fn format_intrinsic(
    backend: &GlslBackend,
    declaring_type: &str,
    method: &str,
    arguments: &[InvocationArgument],
) -> Result<Option<String>, ShaderGenError> {
    let Some(intrinsic) =
        Owner::from_type_name(declaring_type).and_then(|owner| INTRINSICS.get(&(owner, method)))
    else {
        return Ok(None);
    };

    let text = match intrinsic {
        Intrinsic::Function(function) => format!("{function}({})", join(arguments)),
        Intrinsic::Operator(op) => {
            let [left, right] = arguments else {
                return Err(arity(backend, declaring_type, method));
            };
            format!("({} {op} {})", left.text, right.text)
        }
        Intrinsic::Custom(formatter) => {
            formatter(backend, arguments).map_err(|error| match error {
                FormatError::Arguments => arity(backend, declaring_type, method),
                FormatError::Failed(error) => error,
            })?
        }
    };
    Ok(Some(text))
}

/// Constants exposed as static members of builtin types.
pub(super) fn format_static_member(declaring_type: &str, name: &str) -> Option<String> {
    let vector = match short_name(declaring_type) {
        builtin::VECTOR2 => Some(("vec2", 2)),
        builtin::VECTOR3 => Some(("vec3", 3)),
        builtin::VECTOR4 => Some(("vec4", 4)),
        _ => None,
    };
    if let Some((ty, components)) = vector {
        let unit = |axis: usize| {
            let values: Vec<&str> = (0..components)
                .map(|i| if i == axis { "1.0" } else { "0.0" })
                .collect();
            format!("{ty}({})", values.join(", "))
        };
        return match name {
            "Zero" => Some(format!("{ty}(0.0)")),
            "One" => Some(format!("{ty}(1.0)")),
            "UnitX" => Some(unit(0)),
            "UnitY" => Some(unit(1)),
            "UnitZ" if components > 2 => Some(unit(2)),
            "UnitW" if components > 3 => Some(unit(3)),
            _ => None,
        };
    }

    match (short_name(declaring_type), name) {
        (builtin::MATRIX4X4, "Identity") => Some("mat4(1.0)".to_string()),
        (builtin::MATHF, "PI") => Some("3.14159265".to_string()),
        (builtin::MATHF, "E") => Some("2.71828183".to_string()),
        _ => None,
    }
}

fn arity(backend: &GlslBackend, declaring_type: &str, method: &str) -> ShaderGenError {
    GraphErrorKind::UnknownIntrinsic {
        declaring_type: declaring_type.to_string(),
        method: format!("{method} with these arguments"),
        target: backend.name.clone(),
    }
    .into()
}

fn join(arguments: &[InvocationArgument]) -> String {
    arguments
        .iter()
        .map(|argument| argument.text.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn distance_squared(_: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    let [a, b] = args else { return Err(FormatError::Arguments) };
    Ok(format!("dot({0} - {1}, {0} - {1})", a.text, b.text))
}

fn length_squared(_: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    let [a] = args else { return Err(FormatError::Arguments) };
    Ok(format!("dot({0}, {0})", a.text))
}

fn negate(_: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    let [a] = args else { return Err(FormatError::Arguments) };
    Ok(format!("-({})", a.text))
}

fn transform(_: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    let [vector, matrix] = args else { return Err(FormatError::Arguments) };
    Ok(match short_name(&vector.ty.name) {
        builtin::VECTOR2 => format!("({} * vec4({}, 0.0, 1.0))", matrix.text, vector.text),
        builtin::VECTOR3 => format!("({} * vec4({}, 1.0))", matrix.text, vector.text),
        _ => format!("({} * {})", matrix.text, vector.text),
    })
}

fn matrix_multiply(_: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    let [a, b] = args else { return Err(FormatError::Arguments) };
    Ok(format!("({} * {})", b.text, a.text))
}

fn sign(_: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    let [a] = args else { return Err(FormatError::Arguments) };
    Ok(format!("int(sign({}))", a.text))
}

fn fused_multiply_add(
    backend: &GlslBackend,
    args: &[InvocationArgument],
) -> Result<String, FormatError> {
    let [a, b, c] = args else { return Err(FormatError::Arguments) };
    if backend.version().uses_descriptor_sets() {
        Ok(format!("fma({}, {}, {})", a.text, b.text, c.text))
    } else {
        Ok(format!("({} * {} + {})", a.text, b.text, c.text))
    }
}

fn saturate(_: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    let [a] = args else { return Err(FormatError::Arguments) };
    Ok(format!("clamp({}, 0.0, 1.0)", a.text))
}

fn ddx_fine(backend: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    let [a] = args else { return Err(FormatError::Arguments) };
    if backend.version().uses_descriptor_sets() {
        Ok(format!("dFdxFine({})", a.text))
    } else {
        Ok(format!("dFdx({})", a.text))
    }
}

fn ddy_fine(backend: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    let [a] = args else { return Err(FormatError::Arguments) };
    if backend.version().uses_descriptor_sets() {
        Ok(format!("dFdyFine({})", a.text))
    } else {
        Ok(format!("dFdy({})", a.text))
    }
}

fn clip_to_texture_coordinates(
    _: &GlslBackend,
    args: &[InvocationArgument],
) -> Result<String, FormatError> {
    let [clip] = args else { return Err(FormatError::Arguments) };
    Ok(format!(
        "vec2(({0}.x / {0}.w) / 2.0 + 0.5, ({0}.y / {0}.w) / -2.0 + 0.5)",
        clip.text
    ))
}

fn interlocked_add(_: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    let [buffer, index, value] = args else { return Err(FormatError::Arguments) };
    Ok(format!("atomicAdd({}[{}], {})", buffer.text, index.text, value.text))
}

/// The texture operand of a sampling call. Descriptor set targets combine the
/// separate texture and sampler objects at the call site.
fn sampled(
    backend: &GlslBackend,
    texture: &InvocationArgument,
    sampler: &InvocationArgument,
) -> Result<(String, ResourceKind), FormatError> {
    let kind = ResourceKind::from_type_name(&texture.ty.name).ok_or(FormatError::Arguments)?;
    if !backend.version().uses_descriptor_sets() {
        return Ok((texture.text.clone(), kind));
    }
    let combined = match kind {
        ResourceKind::Texture2D => "sampler2D",
        ResourceKind::Texture2DArray => "sampler2DArray",
        ResourceKind::TextureCube => "samplerCube",
        ResourceKind::Texture2DMS => "sampler2DMS",
        ResourceKind::DepthTexture2D => "sampler2DShadow",
        ResourceKind::DepthTexture2DArray => "sampler2DArrayShadow",
        _ => {
            return Err(ShaderGenError::from(ResourceErrorKind::UnsupportedResource {
                resource: texture.text.clone(),
                kind,
                target: backend.name.clone(),
            })
            .into())
        }
    };
    Ok((format!("{combined}({}, {})", texture.text, sampler.text), kind))
}

fn is_array(kind: ResourceKind) -> bool {
    matches!(
        kind,
        ResourceKind::Texture2DArray | ResourceKind::DepthTexture2DArray
    )
}

fn sample(backend: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    match args {
        [texture, sampler, coordinates] => {
            let (texture, _) = sampled(backend, texture, sampler)?;
            Ok(format!("texture({texture}, {})", coordinates.text))
        }
        [texture, sampler, coordinates, layer] => {
            let (texture, _) = sampled(backend, texture, sampler)?;
            Ok(format!(
                "texture({texture}, vec3({}, float({})))",
                coordinates.text, layer.text
            ))
        }
        _ => Err(FormatError::Arguments),
    }
}

fn sample_level(backend: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    match args {
        [texture, sampler, coordinates, level] => {
            let (texture, _) = sampled(backend, texture, sampler)?;
            Ok(format!("textureLod({texture}, {}, {})", coordinates.text, level.text))
        }
        [texture, sampler, coordinates, layer, level] => {
            let (texture, _) = sampled(backend, texture, sampler)?;
            Ok(format!(
                "textureLod({texture}, vec3({}, float({})), {})",
                coordinates.text, layer.text, level.text
            ))
        }
        _ => Err(FormatError::Arguments),
    }
}

fn sample_grad(backend: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    let [texture, sampler, coordinates, ddx, ddy] = args else {
        return Err(FormatError::Arguments);
    };
    let (texture, _) = sampled(backend, texture, sampler)?;
    Ok(format!(
        "textureGrad({texture}, {}, {}, {})",
        coordinates.text, ddx.text, ddy.text
    ))
}

fn comparison_coordinates(
    kind: ResourceKind,
    rest: &[InvocationArgument],
) -> Result<String, FormatError> {
    match rest {
        [coordinates, reference] if !is_array(kind) => {
            Ok(format!("vec3({}, {})", coordinates.text, reference.text))
        }
        [coordinates, layer, reference] if is_array(kind) => Ok(format!(
            "vec4({}, float({}), {})",
            coordinates.text, layer.text, reference.text
        )),
        _ => Err(FormatError::Arguments),
    }
}

fn sample_comparison(
    backend: &GlslBackend,
    args: &[InvocationArgument],
) -> Result<String, FormatError> {
    let [texture, sampler, rest @ ..] = args else {
        return Err(FormatError::Arguments);
    };
    let (texture, kind) = sampled(backend, texture, sampler)?;
    Ok(format!(
        "texture({texture}, {})",
        comparison_coordinates(kind, rest)?
    ))
}

fn sample_comparison_level_zero(
    backend: &GlslBackend,
    args: &[InvocationArgument],
) -> Result<String, FormatError> {
    let [texture, sampler, rest @ ..] = args else {
        return Err(FormatError::Arguments);
    };
    let (texture, kind) = sampled(backend, texture, sampler)?;
    Ok(format!(
        "textureGrad({texture}, {}, vec2(0.0), vec2(0.0))",
        comparison_coordinates(kind, rest)?
    ))
}

fn load(backend: &GlslBackend, args: &[InvocationArgument]) -> Result<String, FormatError> {
    let [texture, sampler, coordinates, level_or_sample] = args else {
        return Err(FormatError::Arguments);
    };
    let (texture, _) = sampled(backend, texture, sampler)?;
    Ok(format!(
        "texelFetch({texture}, ivec2({}), int({}))",
        coordinates.text, level_or_sample.text
    ))
}
