use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::notifier::MailError;

/// Unified error type for the restricted catalog actions.
///
/// Denials are not errors: the evaluator reports them as verdicts. Only
/// structurally invalid requests, missing referenced objects and failing
/// collaborators surface through this type. `NotAuthorized` exists for the
/// host-action convention and is converted back into a verdict where an
/// action promises one.
#[derive(Debug, thiserror::Error)]
pub enum RestrictedError {
    /// A required input field was missing or empty
    #[error("Missing required field '{field}': {message}")]
    Validation { field: String, message: String },

    /// A referenced package, resource or user does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The caller may not perform the action
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// The catalog collaborator failed for a reason other than a missing object
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// The mailer failed to dispatch a message
    #[error("Mail error: {0}")]
    Mail(String),

    /// Configuration could not be loaded or validated
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO failure (fixture and config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RestrictedError {
    /// Builds a validation error for a missing field.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<CatalogError> for RestrictedError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFound(what) => RestrictedError::NotFound(what),
            CatalogError::Unavailable(msg) => RestrictedError::Catalog(msg),
        }
    }
}

impl From<MailError> for RestrictedError {
    fn from(error: MailError) -> Self {
        RestrictedError::Mail(error.to_string())
    }
}

/// Result type alias for operations that can result in a RestrictedError
pub type RestrictedResult<T> = Result<T, RestrictedError>;
