use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: String,
        expected: String,
        found: String,
    },

    #[error("Singular matrix: {context}")]
    SingularMatrix { context: String },

    #[error("Matrix is not positive definite: {context}")]
    NotPositiveDefinite { context: String },

    #[error("Invalid value for '{name}': {value} ({reason})")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Empty input: {context}")]
    EmptyInput { context: String },
}

impl FilterError {
    pub fn dimension(context: &str, expected: impl ToString, found: impl ToString) -> Self {
        FilterError::DimensionMismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn singular(context: &str) -> Self {
        FilterError::SingularMatrix {
            context: context.to_string(),
        }
    }

    pub fn not_positive_definite(context: &str) -> Self {
        FilterError::NotPositiveDefinite {
            context: context.to_string(),
        }
    }

    pub fn invalid(name: &str, value: impl ToString, reason: &str) -> Self {
        FilterError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn empty(context: &str) -> Self {
        FilterError::EmptyInput {
            context: context.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
