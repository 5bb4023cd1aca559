/// Call graph ordering and cycle detection.
pub mod callgraph;
/// Per backend and shader set generation state.
pub mod context;
/// Host and device memory layout of types.
pub mod layout;
/// The shader model handed to backends.
pub mod model;
/// Resource classification and binding assignment.
pub mod resources;
/// Builtin variables, usage flags, and stage masks.
pub mod semantics;
/// Shader set discovery.
pub mod sets;
/// Structure definitions with their member layouts.
pub mod structure;
/// Semantic validation of finalized models.
pub mod validate;
