//! Core JSON-RPC 2.0 types: calls, responses and error objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Protocol version every call must carry and every response echoes.
pub const JSONRPC_VERSION: &str = "2.0";

/// Opaque request identifier (string, number, ...).
pub type RequestId = Value;

/// One JSON-RPC call as received from the transport.
///
/// Fields are kept as raw JSON values so that a malformed envelope (wrong
/// version type, numeric method name, ...) is reported by validation instead
/// of failing deserialization. A missing or `null` id marks a notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Call {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl Call {
    /// Create a well-formed call for the given method
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: Some(Value::String(JSONRPC_VERSION.to_string())),
            method: Some(Value::String(method.into())),
            params: None,
            id: None,
        }
    }

    /// Build a call from one decoded JSON value.
    ///
    /// Never fails: anything that is not an object becomes an empty call,
    /// which is later rejected as an invalid request.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }

    /// Add parameters to the call
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Add an ID to the call
    pub fn with_id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = Some(id.into()).filter(|id: &Value| !id.is_null());
        self
    }

    /// Override the protocol version
    pub fn with_version(mut self, version: impl Into<Value>) -> Self {
        self.jsonrpc = Some(version.into());
        self
    }

    /// Method name, if present and a string
    pub fn method_name(&self) -> Option<&str> {
        self.method.as_ref().and_then(Value::as_str)
    }

    pub fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    /// Check if this is a notification (no response expected)
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Result or error carried by a response; exactly one is ever present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(Error),
}

/// JSON-RPC 2.0 response message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(default)]
    pub id: Option<RequestId>,
}

impl Response {
    /// Create a successful response
    pub fn success(result: Value, id: Option<RequestId>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            outcome: Outcome::Result(result),
            id,
        }
    }

    /// Create an error response
    pub fn error(error: Error, id: Option<RequestId>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            outcome: Outcome::Error(error),
            id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Result(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(result) => Some(result),
            Outcome::Error(_) => None,
        }
    }

    pub fn error_info(&self) -> Option<&Error> {
        match &self.outcome {
            Outcome::Error(error) => Some(error),
            Outcome::Result(_) => None,
        }
    }

    pub fn take_result(self) -> Option<Value> {
        match self.outcome {
            Outcome::Result(result) => Some(result),
            Outcome::Error(_) => None,
        }
    }

    pub fn take_error(self) -> Option<Error> {
        match self.outcome {
            Outcome::Error(error) => Some(error),
            Outcome::Result(_) => None,
        }
    }

    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }
}

/// JSON-RPC 2.0 error object.
///
/// Handlers and hooks return this directly; its code, message and data are
/// passed through to the client unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Error {
    /// Create a new error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create an error carrying the canonical code and message of a kind
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind.code(), kind.message())
    }

    /// Internal error with a custom message
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    /// Wrap an arbitrary error that has no protocol code of its own.
    ///
    /// The message is kept; the code falls back to the internal error code.
    pub fn from_std(error: &dyn std::error::Error) -> Self {
        let message = error.to_string();
        if message.is_empty() {
            Self::from_kind(ErrorKind::InternalError)
        } else {
            Self::internal(message)
        }
    }

    /// Add additional data to the error
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_code(self.code)
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn is_invalid_request(&self) -> bool {
        self.code == error_codes::INVALID_REQUEST
    }

    pub fn is_method_not_found(&self) -> bool {
        self.code == error_codes::METHOD_NOT_FOUND
    }

    pub fn is_internal_error(&self) -> bool {
        self.code == error_codes::INTERNAL_ERROR
    }

    /// Transform this error using a custom callback function
    pub fn sanitized_with<F>(&self, transform: F) -> Self
    where
        F: FnOnce(&Self) -> Self,
    {
        transform(self)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::from_kind(kind)
    }
}

/// Params that fail to deserialize into a handler's input type.
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error_codes::INVALID_PARAMS, ErrorKind::InvalidParams.message())
            .with_data(Value::String(error.to_string()))
    }
}

/// Classification of an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    /// Any code chosen by the application itself.
    Application(i32),
}

impl ErrorKind {
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::ParseError => error_codes::PARSE_ERROR,
            ErrorKind::InvalidRequest => error_codes::INVALID_REQUEST,
            ErrorKind::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            ErrorKind::InvalidParams => error_codes::INVALID_PARAMS,
            ErrorKind::InternalError => error_codes::INTERNAL_ERROR,
            ErrorKind::Application(code) => code,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::ParseError => "Parse error",
            ErrorKind::InvalidRequest => "Invalid Request",
            ErrorKind::MethodNotFound => "Method not found",
            ErrorKind::InvalidParams => "Invalid params",
            ErrorKind::InternalError => "Internal error",
            ErrorKind::Application(_) => "Application error",
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            error_codes::PARSE_ERROR => ErrorKind::ParseError,
            error_codes::INVALID_REQUEST => ErrorKind::InvalidRequest,
            error_codes::METHOD_NOT_FOUND => ErrorKind::MethodNotFound,
            error_codes::INVALID_PARAMS => ErrorKind::InvalidParams,
            error_codes::INTERNAL_ERROR => ErrorKind::InternalError,
            other => ErrorKind::Application(other),
        }
    }
}

/// Standard JSON-RPC 2.0 error codes.
///
/// # Example
/// ```rust
/// use ash_rpc_router::{Error, error_codes};
///
/// let error = Error::new(error_codes::METHOD_NOT_FOUND, "Method not found");
/// assert!(error.is_method_not_found());
/// ```
pub mod error_codes {
    /// Parse error - Invalid JSON was received by the server.
    pub const PARSE_ERROR: i32 = -32700;

    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;

    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;

    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}
