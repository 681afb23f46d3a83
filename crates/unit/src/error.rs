use crate::path::FieldPath;
use crate::schema::SchemaKind;
use std::fmt::{Display, Formatter};

/// A single validation failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Issue {
    pub path: FieldPath,
    pub message: String,
}

impl Issue {
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Data was rejected by its schema.
///
/// Always carries at least one issue.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    pub(crate) fn new(issues: Vec<Issue>) -> Self {
        debug_assert!(!issues.is_empty());
        Self { issues }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.issues.as_slice() {
            [issue] => write!(f, "validation failed at {issue}"),
            issues => {
                write!(f, "validation failed with {} issues:", issues.len())?;
                for issue in issues {
                    write!(f, "\n  - {issue}")?;
                }
                Ok(())
            }
        }
    }
}

/// Two schemas declare incompatible shapes for the same field path.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("incompatible schemas at {path}: {left} cannot be merged with {right}")]
pub struct SchemaConflict {
    pub path: FieldPath,
    pub left: SchemaKind,
    pub right: SchemaKind,
}
