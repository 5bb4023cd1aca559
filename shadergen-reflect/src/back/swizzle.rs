const AXES: &[u8] = b"XYZW";

/// Recognizes a call such as `ShaderSwizzle.XZY(v)` as a swizzle of its only argument.
///
/// Returns the lowercase component selector. Names of one to four characters drawn
/// only from `XYZW` are swizzles, any other name is not.
pub fn recognize_swizzle(method: &str, argument_count: usize) -> Option<String> {
    if argument_count != 1 || method.is_empty() || method.len() > AXES.len() {
        return None;
    }
    if !method.bytes().all(|b| AXES.contains(&b)) {
        return None;
    }
    Some(method.to_ascii_lowercase())
}
