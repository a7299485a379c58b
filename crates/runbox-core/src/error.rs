// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for runbox-core.
//!
//! Provides a unified error type that maps to API error codes.

use std::fmt;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur while manipulating closure documents.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CoreError {
    /// Closure description was not found in the store.
    DescriptionNotFound {
        /// The description id that was not found.
        description_link: String,
    },

    /// Closure was not found in the store.
    ClosureNotFound {
        /// The closure id that was not found.
        closure_id: String,
    },

    /// Document already exists (duplicate id on create).
    AlreadyExists {
        /// The document id that already exists.
        id: String,
    },

    /// Closure is in an invalid state for the requested operation.
    InvalidState {
        /// The closure id.
        closure_id: String,
        /// The expected state.
        expected: String,
        /// The actual persisted state.
        actual: String,
    },

    /// Input validation failed.
    ValidationError {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// A batch creation failed; compensation was attempted.
    CreateFailed {
        /// Description of the first failing sub-creation.
        message: String,
    },

    /// Serialization or deserialization failed.
    Serialization {
        /// Error details.
        details: String,
    },
}

impl CoreError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DescriptionNotFound { .. } => "DESCRIPTION_NOT_FOUND",
            Self::ClosureNotFound { .. } => "CLOSURE_NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::CreateFailed { .. } => "CREATE_FAILED",
            Self::Serialization { .. } => "SERIALIZATION_ERROR",
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DescriptionNotFound { description_link } => {
                write!(f, "Closure description '{}' not found", description_link)
            }
            Self::ClosureNotFound { closure_id } => {
                write!(f, "Closure '{}' not found", closure_id)
            }
            Self::AlreadyExists { id } => {
                write!(f, "Document '{}' already exists", id)
            }
            Self::InvalidState {
                closure_id,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Closure '{}' is in invalid state: expected '{}', got '{}'",
                    closure_id, expected, actual
                )
            }
            Self::ValidationError { field, message } => {
                write!(f, "Validation error for '{}': {}", field, message)
            }
            Self::CreateFailed { message } => {
                write!(f, "Failed to create closure descriptions: {}", message)
            }
            Self::Serialization { details } => {
                write!(f, "Serialization error: {}", details)
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let test_cases = vec![
            (
                CoreError::DescriptionNotFound {
                    description_link: "d-1".to_string(),
                },
                "DESCRIPTION_NOT_FOUND",
            ),
            (
                CoreError::ClosureNotFound {
                    closure_id: "c-1".to_string(),
                },
                "CLOSURE_NOT_FOUND",
            ),
            (
                CoreError::AlreadyExists {
                    id: "c-1".to_string(),
                },
                "ALREADY_EXISTS",
            ),
            (
                CoreError::InvalidState {
                    closure_id: "c-1".to_string(),
                    expected: "CREATED".to_string(),
                    actual: "STARTED".to_string(),
                },
                "INVALID_STATE",
            ),
            (
                CoreError::ValidationError {
                    field: "source".to_string(),
                    message: "required".to_string(),
                },
                "VALIDATION_ERROR",
            ),
            (
                CoreError::CreateFailed {
                    message: "boom".to_string(),
                },
                "CREATE_FAILED",
            ),
        ];

        for (error, expected_code) in test_cases {
            assert_eq!(
                error.error_code(),
                expected_code,
                "Error {:?} should have code {}",
                error,
                expected_code
            );
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::ClosureNotFound {
            closure_id: "abc-123".to_string(),
        };
        assert_eq!(err.to_string(), "Closure 'abc-123' not found");

        let err = CoreError::InvalidState {
            closure_id: "abc-123".to_string(),
            expected: "CREATED".to_string(),
            actual: "FINISHED".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Closure 'abc-123' is in invalid state: expected 'CREATED', got 'FINISHED'"
        );

        let err = CoreError::ValidationError {
            field: "descriptionLink".to_string(),
            message: "is required".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Validation error for 'descriptionLink': is required"
        );
    }
}
