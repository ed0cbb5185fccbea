use tracing::{error, info, warn};

/// Centralized error types for every card, scheduling and session operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StudyError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Card generation error: {0}")]
    Generation(String),
}

pub type Result<T> = std::result::Result<T, StudyError>;

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
        }
    }

    pub fn with_id(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }
}

impl StudyError {
    pub fn card_not_found(id: impl std::fmt::Display) -> Self {
        StudyError::NotFound(format!("card with id '{}' not found", id))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StudyError::NotFound(_))
    }

    /// Log the error at a level matching its kind and hand it back for propagation
    pub fn log_with_context(self, context: ErrorContext) -> Self {
        match &self {
            StudyError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
            }
            StudyError::Validation(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Validation error"
                );
            }
            StudyError::InvalidState(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Operation not allowed in current state"
                );
            }
            StudyError::Storage(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Storage error"
                );
            }
            StudyError::Generation(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Card generator error"
                );
            }
        }
        self
    }
}

/// Helper trait for attaching logging context to a fallible result
pub trait ResultExt<T> {
    fn log_err(self, context: impl FnOnce() -> ErrorContext) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn log_err(self, context: impl FnOnce() -> ErrorContext) -> Result<T> {
        self.map_err(|err| err.log_with_context(context()))
    }
}

impl From<sqlx::Error> for StudyError {
    fn from(err: sqlx::Error) -> Self {
        StudyError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StudyError {
    fn from(err: serde_json::Error) -> Self {
        StudyError::Storage(format!("snapshot serialization failed: {}", err))
    }
}
