//! Envelope validation for incoming calls.

use crate::types::{Error, ErrorKind};
use serde_json::Value;
use std::collections::HashMap;

/// Check the protocol version of a call.
///
/// Strict string equality: a numeric `2.0` or a missing version is rejected.
pub fn validate_version(version: Option<&Value>, required: &str) -> Result<(), Error> {
    match version {
        Some(Value::String(v)) if v == required => Ok(()),
        other => Err(Error::new(
            ErrorKind::InvalidRequest.code(),
            format!(
                "{}, wrong version - {}",
                ErrorKind::InvalidRequest.message(),
                describe(other)
            ),
        )),
    }
}

/// Check that the method name is a non-empty string registered in `methods`.
///
/// The type check runs before the lookup, so a numeric method name is an
/// invalid request rather than an unknown method.
pub fn validate_method<'a, T>(
    method: Option<&'a Value>,
    methods: &HashMap<String, T>,
) -> Result<&'a str, Error> {
    let name = match method {
        Some(Value::String(name)) if !name.is_empty() => name.as_str(),
        other => {
            return Err(Error::new(
                ErrorKind::InvalidRequest.code(),
                format!(
                    "{}, wrong method - {}",
                    ErrorKind::InvalidRequest.message(),
                    describe(other)
                ),
            ));
        }
    };

    if !methods.contains_key(name) {
        return Err(Error::new(
            ErrorKind::MethodNotFound.code(),
            format!("{} - {}", ErrorKind::MethodNotFound.message(), name),
        ));
    }

    Ok(name)
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
