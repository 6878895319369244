//! Convenience macros for building errors and calls.

/// Create an error with a code and message
///
/// # Usage:
/// ```text
/// // Application error
/// rpc_error!(403, "forbidden")
///
/// // Predefined code with a formatted message
/// rpc_error!(error_codes::INVALID_PARAMS, format!("missing field {}", name))
/// ```
#[macro_export]
macro_rules! rpc_error {
    ($code:expr_2021, $message:expr_2021) => {
        $crate::Error::new($code, $message)
    };
}

/// Create an error with a code, message and additional data
///
/// # Usage:
/// ```text
/// rpc_error_with_data!(error_codes::INVALID_PARAMS, "Invalid parameters", {"expected": "array"})
/// ```
#[macro_export]
macro_rules! rpc_error_with_data {
    ($code:expr_2021, $message:expr_2021, $($data:tt)+) => {
        $crate::Error::new($code, $message).with_data($crate::serde_json::json!($($data)+))
    };
}

/// Create an invalid params error
#[macro_export]
macro_rules! rpc_invalid_params {
    ($message:expr_2021) => {
        $crate::rpc_error!($crate::error_codes::INVALID_PARAMS, $message)
    };
}

/// Create an internal error
#[macro_export]
macro_rules! rpc_internal_error {
    ($message:expr_2021) => {
        $crate::rpc_error!($crate::error_codes::INTERNAL_ERROR, $message)
    };
}

/// Create a call with params and an id
///
/// # Usage:
/// ```text
/// rpc_call!("add", {"a": 1, "b": 2}, 1)
/// rpc_call!("ping", 7)
/// ```
#[macro_export]
macro_rules! rpc_call {
    ($method:expr_2021, $params:tt, $id:expr_2021) => {
        $crate::Call::new($method)
            .with_params($crate::serde_json::json!($params))
            .with_id($id)
    };
    ($method:expr_2021, $id:expr_2021) => {
        $crate::Call::new($method).with_id($id)
    };
}

/// Create a notification (a call without an id)
///
/// # Usage:
/// ```text
/// rpc_notification!("log", {"level": "info"})
/// rpc_notification!("heartbeat")
/// ```
#[macro_export]
macro_rules! rpc_notification {
    ($method:expr_2021, $params:tt) => {
        $crate::Call::new($method).with_params($crate::serde_json::json!($params))
    };
    ($method:expr_2021) => {
        $crate::Call::new($method)
    };
}
