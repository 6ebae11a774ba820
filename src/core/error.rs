use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProjectionError {
    #[error("invalid input: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("average annual return is undefined when total contributions are zero")]
    UndefinedAverageReturn,
}

impl ProjectionError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ProjectionError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
