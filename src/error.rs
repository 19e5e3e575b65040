use thiserror::Error;

/// Main error type for nacre operations.
///
/// Every fallible operation carries an HTTP-style status code alongside a
/// human-readable message, so callers embedding the collection behind a
/// transport can map errors without string matching.
#[derive(Error, Debug)]
pub enum NacreError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Could not find a document with id: {0}")]
    DocumentNotFound(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Internal(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for nacre operations
pub type Result<T> = std::result::Result<T, NacreError>;

impl NacreError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            NacreError::BadRequest(_) => 400,
            NacreError::DocumentNotFound(_) => 404,
            NacreError::Unprocessable(_) => 422,
            NacreError::Internal(_) | NacreError::Store(_) | NacreError::Io(_) => 500,
        }
    }

    /// Check if this error was caused by invalid caller input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            NacreError::BadRequest(_)
                | NacreError::DocumentNotFound(_)
                | NacreError::Unprocessable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(NacreError::BadRequest("Bad JSON.".into()).status_code(), 400);
        assert_eq!(NacreError::DocumentNotFound("x".into()).status_code(), 404);
        assert_eq!(NacreError::Unprocessable("page".into()).status_code(), 422);
        assert_eq!(NacreError::Internal("corrupt".into()).status_code(), 500);
    }

    #[test]
    fn test_not_found_display() {
        let err = NacreError::DocumentNotFound("42".into());
        assert_eq!(err.to_string(), "Could not find a document with id: 42");
        assert!(err.is_client_error());
    }
}
