use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field_index: Option<usize>,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field_index {
            Some(index) => write!(f, "field {}: {}", index, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BurnError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(ValidationIssue),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("malformed request: {0}")]
    Request(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl BurnError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ValidationIssue {
            field_index: None,
            message: message.into(),
        })
    }

    pub fn field_validation(field_index: usize, message: impl Into<String>) -> Self {
        Self::Validation(ValidationIssue {
            field_index: Some(field_index),
            message: message.into(),
        })
    }

    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument(message.into())
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Index of the offending field for validation failures tied to one field.
    pub fn field_index(&self) -> Option<usize> {
        match self {
            BurnError::Validation(issue) => issue.field_index,
            _ => None,
        }
    }

    /// Stable machine-readable code, mirrored in CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            BurnError::NotFound(_) => "NOT_FOUND",
            BurnError::Validation(_) => "VALIDATION_ERROR",
            BurnError::InvalidDocument(_) => "INVALID_DOCUMENT",
            BurnError::Serialization(_) => "SERIALIZATION_ERROR",
            BurnError::Request(_) => "MALFORMED_REQUEST",
            BurnError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            BurnError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_names_field_index() {
        let err = BurnError::field_validation(3, "page index 7 out of range (allowed 0..1)");
        assert_eq!(err.field_index(), Some(3));
        assert_eq!(
            err.to_string(),
            "validation error: field 3: page index 7 out of range (allowed 0..1)"
        );
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn request_level_validation_has_no_field_index() {
        let err = BurnError::validation("document id cannot be empty");
        assert_eq!(err.field_index(), None);
        assert_eq!(err.to_string(), "validation error: document id cannot be empty");
    }

    #[test]
    fn io_errors_convert_to_storage() {
        let err: BurnError = std::io::Error::other("disk full").into();
        assert!(matches!(err, BurnError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
