//! Optional rewriting of error objects before they reach the client.
//!
//! By default errors are passed through verbatim. A router configured with a
//! [`Sanitizer`] runs it on every error response after the error callback has
//! seen the original error.
//!
//! # Example
//! ```
//! use ash_rpc_router::sanitization::{MaskInternalErrors, Sanitizer};
//! use ash_rpc_router::Error;
//!
//! let error = Error::internal("db at 10.0.0.5 refused connection");
//! let masked = MaskInternalErrors.sanitize(&error);
//! assert_eq!(masked.message(), "Internal error");
//! ```

use crate::types::{Error, ErrorKind, error_codes};

/// Transforms an error into the version that is sent to clients.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, error: &Error) -> Error;
}

impl<F> Sanitizer for F
where
    F: Fn(&Error) -> Error + Send + Sync,
{
    fn sanitize(&self, error: &Error) -> Error {
        self(error)
    }
}

/// Replaces the message and drops the data of internal errors.
///
/// Application errors and protocol errors are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskInternalErrors;

impl Sanitizer for MaskInternalErrors {
    fn sanitize(&self, error: &Error) -> Error {
        if error.code() == error_codes::INTERNAL_ERROR {
            Error::from_kind(ErrorKind::InternalError)
        } else {
            error.clone()
        }
    }
}

/// Redacts fixed substrings from error messages.
#[derive(Debug, Clone)]
pub struct RedactPatterns {
    patterns: Vec<String>,
    replacement: String,
}

impl RedactPatterns {
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
            replacement: "[REDACTED]".to_string(),
        }
    }

    /// Add a substring to redact (case-sensitive)
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Text written in place of each match
    pub fn replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = replacement.into();
        self
    }
}

impl Default for RedactPatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl Sanitizer for RedactPatterns {
    fn sanitize(&self, error: &Error) -> Error {
        let message = self
            .patterns
            .iter()
            .filter(|pattern| !pattern.is_empty())
            .fold(error.message.clone(), |acc, pattern| {
                acc.replace(pattern.as_str(), &self.replacement)
            });
        Error {
            message,
            ..error.clone()
        }
    }
}
