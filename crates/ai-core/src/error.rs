use thiserror::Error;

use crate::{VarId, VarType};

/// Failures of the typed variable model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    #[error("cannot store a {found} value in a {expected} variable")]
    TypeMismatch { expected: VarType, found: &'static str },

    #[error("constant field is read-only")]
    ConstantField,

    #[error("variable {0} is bound but was never resolved")]
    Unbound(VarId),

    #[error("unknown variable `{0}`")]
    UnknownName(String),

    #[error("unknown variable {0}")]
    UnknownId(VarId),

    #[error("variable {0} declared twice")]
    DuplicateId(VarId),

    #[error("variable name `{0}` declared twice")]
    DuplicateName(String),
}
