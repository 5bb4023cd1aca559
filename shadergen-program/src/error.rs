use thiserror::Error;

/// Error type for assembling a resolved program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("the type `{0}` was declared more than once")]
    DuplicateType(String),
    #[error("the method `{method}` was declared more than once on `{declaring_type}`")]
    DuplicateMethod {
        declaring_type: String,
        method: String,
    },
}
