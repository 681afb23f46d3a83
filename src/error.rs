//! Errors of a generation run.

use crate::definition::DefinitionError;
use confgen_unit::ValidationError;
use std::fmt::{Display, Formatter};

/// The failure of processing a single definition file.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The resolved data doesn't match the schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The definition file itself is broken.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    /// Anything else, like I/O or a failing override source.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl GenerateError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::Validation,
            Self::Definition(_) => ErrorClass::Definition,
            Self::Unexpected(_) => ErrorClass::Unexpected,
        }
    }
}

/// The class of a [`GenerateError`], used when reporting it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Definition,
    Unexpected,
}

impl Display for ErrorClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Validation => "validation error",
            Self::Definition => "definition error",
            Self::Unexpected => "unexpected error",
        })
    }
}
