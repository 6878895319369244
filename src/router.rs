//! Request dispatch: single calls, batches and raw request bodies.
//!
//! ## Usage
//!
//! ```rust
//! use ash_rpc_router::*;
//! use serde_json::{Value, json};
//!
//! # tokio_test_runtime(async {
//! let router = Router::builder()
//!     .method("add", |params: Value, _ctx: ()| async move {
//!         let a = params["a"].as_i64().unwrap_or(0);
//!         let b = params["b"].as_i64().unwrap_or(0);
//!         Ok(json!(a + b))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let reply = router
//!     .handle(json!({"jsonrpc": "2.0", "method": "add", "params": {"a": 1, "b": 2}, "id": 1}), ())
//!     .await
//!     .unwrap();
//! assert_eq!(reply.into_value(), Some(json!({"jsonrpc": "2.0", "result": 3, "id": 1})));
//! # });
//! # fn tokio_test_runtime<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use crate::builders::RouterBuilder;
use crate::config::RouterSettings;
use crate::hooks::{Hook, execute_hook};
use crate::sanitization::Sanitizer;
use crate::traits::{Method, MethodResult, guarded, panic_message};
use crate::types::*;
use crate::validation::{validate_method, validate_version};
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

/// Observability callback invoked with every failed call.
pub type ErrorCallback = Arc<dyn Fn(&Error, &Call) + Send + Sync>;

/// A request body that is neither a call object nor a batch array.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BodyError {
    #[error("request body must be a JSON object or array, got {0}")]
    NotObjectOrArray(&'static str),
}

/// What the transport should send back for one request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// Reply to a single call; `None` for a notification that succeeded.
    Single(Option<Response>),
    /// Replies to the non-notification calls of a batch, in input order.
    Batch(Vec<Response>),
}

impl Reply {
    /// JSON to send, or `None` when there is no response entity
    pub fn into_value(self) -> Option<Value> {
        match self {
            Reply::Single(None) => None,
            Reply::Single(Some(response)) => serde_json::to_value(response).ok(),
            Reply::Batch(responses) => serde_json::to_value(responses).ok(),
        }
    }

    /// Check if there is nothing to send
    pub fn is_empty(&self) -> bool {
        matches!(self, Reply::Single(None))
    }
}

pub(crate) struct RouterInner<C> {
    pub(crate) methods: HashMap<String, Arc<dyn Method<C>>>,
    pub(crate) before: HashMap<String, Hook<C>>,
    pub(crate) after: HashMap<String, Hook<C>>,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) sanitizer: Option<Arc<dyn Sanitizer>>,
    pub(crate) settings: RouterSettings,
}

/// Immutable JSON-RPC router.
///
/// Built once through [`RouterBuilder`], then shared freely: cloning is cheap
/// and every clone dispatches against the same tables. `C` is the per-request
/// context handed untouched to every handler and hook.
pub struct Router<C = ()> {
    inner: Arc<RouterInner<C>>,
}

impl<C> Clone for Router<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> fmt::Debug for Router<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.inner.methods.keys().map(String::as_str).collect();
        methods.sort_unstable();
        f.debug_struct("Router")
            .field("methods", &methods)
            .field("before_hooks", &self.inner.before.len())
            .field("after_hooks", &self.inner.after.len())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl<C> Router<C> {
    pub(crate) fn from_inner(inner: RouterInner<C>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Check if a method is registered
    pub fn has_method(&self, method: &str) -> bool {
        self.inner.methods.contains_key(method)
    }

    /// Registered method names, sorted
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.methods.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn method_count(&self) -> usize {
        self.inner.methods.len()
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.inner.settings
    }
}

impl<C> Router<C>
where
    C: Clone + Send + Sync + 'static,
{
    /// Start configuring a router
    pub fn builder() -> RouterBuilder<C> {
        RouterBuilder::new()
    }

    /// Dispatch one decoded request body.
    ///
    /// Objects are handled as a single call, arrays as a batch. Any other
    /// JSON value is rejected without producing a JSON-RPC envelope.
    pub async fn handle(&self, body: Value, ctx: C) -> Result<Reply, BodyError> {
        match body {
            Value::Array(items) => {
                let calls = items.into_iter().map(Call::from_value).collect();
                Ok(Reply::Batch(self.handle_batch(calls, ctx).await))
            }
            object @ Value::Object(_) => Ok(Reply::Single(
                self.handle_call(Call::from_value(object), ctx).await,
            )),
            other => {
                let kind = json_type(&other);
                tracing::warn!(body_type = kind, "rejected request body");
                Err(BodyError::NotObjectOrArray(kind))
            }
        }
    }

    /// Dispatch a single call.
    ///
    /// Returns `None` for a notification that succeeds. Failures always
    /// produce an error response, with a `null` id when the call had none.
    pub async fn handle_call(&self, call: Call, ctx: C) -> Option<Response> {
        let span = tracing::debug_span!(
            "rpc_call",
            method = call.method_name().unwrap_or("<invalid>"),
            correlation_id = %uuid::Uuid::new_v4(),
        );

        async move {
            match self.dispatch(&call, &ctx).await {
                Ok(result) => {
                    tracing::trace!(notification = call.is_notification(), "call succeeded");
                    call.id
                        .clone()
                        .map(|id| Response::success(result, Some(id)))
                }
                Err(error) => {
                    let error = self.report(error, &call);
                    Some(Response::error(error, call.id.clone()))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Dispatch a batch of calls.
    ///
    /// Every item is started as its own task in input order. Calls with an id
    /// are awaited and their responses returned in input order; notifications
    /// are left running detached and never collected.
    pub async fn handle_batch(&self, calls: Vec<Call>, ctx: C) -> Vec<Response> {
        if let Some(max_size) = self.inner.settings.max_batch_size
            && calls.len() > max_size
        {
            tracing::warn!(
                batch_size = calls.len(),
                max_batch_size = max_size,
                "batch size limit exceeded"
            );
            return vec![Response::error(
                Error::new(
                    error_codes::INVALID_REQUEST,
                    format!("Batch size {} exceeds maximum {}", calls.len(), max_size),
                ),
                None,
            )];
        }

        tracing::debug!(batch_size = calls.len(), "processing batch");
        let mut pending = Vec::with_capacity(calls.len());
        for call in calls {
            let id = call.id.clone();
            let router = self.clone();
            let ctx = ctx.clone();
            let task = tokio::spawn(async move { router.handle_call(call, ctx).await });
            if let Some(id) = id {
                pending.push((id, task));
            }
        }

        let responses = pending.into_iter().map(|(id, task)| async move {
            match task.await {
                Ok(response) => response,
                Err(join_error) => {
                    tracing::error!(error = %join_error, id = ?id, "batch call aborted");
                    Some(Response::error(
                        Error::from_kind(ErrorKind::InternalError),
                        Some(id),
                    ))
                }
            }
        });
        join_all(responses).await.into_iter().flatten().collect()
    }

    async fn dispatch(&self, call: &Call, ctx: &C) -> MethodResult {
        validate_version(call.jsonrpc.as_ref(), JSONRPC_VERSION)?;
        let name = validate_method(call.method.as_ref(), &self.inner.methods).inspect_err(
            |error| {
                if error.is_method_not_found() {
                    tracing::warn!(method = ?call.method, "method not found");
                }
            },
        )?;
        let method = self
            .inner
            .methods
            .get(name)
            .ok_or_else(|| Error::from_kind(ErrorKind::MethodNotFound))?;

        let params = call
            .params
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));

        if let Some(hook) = self.inner.before.get(name) {
            execute_hook(hook, &params, None, ctx).await?;
        }

        tracing::debug!(method = %name, "calling method");
        let result = guarded(method.call(params.clone(), ctx.clone())).await?;

        if let Some(hook) = self.inner.after.get(name) {
            execute_hook(hook, &params, Some(&result), ctx).await?;
        }

        Ok(result)
    }

    /// Hand a failure to the error callback and produce the client-facing error.
    fn report(&self, error: Error, call: &Call) -> Error {
        tracing::debug!(
            code = error.code,
            message = %error.message,
            id = ?call.id,
            "call failed"
        );

        if let Some(on_error) = &self.inner.on_error {
            let on_error = Arc::clone(on_error);
            let error = error.clone();
            let call = call.clone();
            tokio::spawn(async move {
                let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| on_error(&error, &call)));
                if let Err(panic) = outcome {
                    tracing::error!(panic = %panic_message(panic.as_ref()), "error callback panicked");
                }
            });
        }

        match &self.inner.sanitizer {
            Some(sanitizer) => sanitizer.sanitize(&error),
            None => error,
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, HookPhase};
    use crate::sanitization::MaskInternalErrors;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn add_router() -> Router {
        Router::builder()
            .method("add", |params: Value, _ctx: ()| async move {
                let a = params["a"].as_i64().ok_or_else(|| Error::new(-32602, "a missing"))?;
                let b = params["b"].as_i64().ok_or_else(|| Error::new(-32602, "b missing"))?;
                Ok(json!(a + b))
            })
            .method("echo", |params: Value, _ctx: ()| async move { Ok(params) })
            .build()
            .unwrap()
    }

    fn call(method: &str, id: i64) -> Call {
        Call::new(method).with_id(id)
    }

    #[tokio::test]
    async fn test_single_call_success() {
        let router = add_router();
        let response = router
            .handle_call(call("add", 1).with_params(json!({"a": 1, "b": 2})), ())
            .await
            .unwrap();
        assert_eq!(response, Response::success(json!(3), Some(json!(1))));
    }

    #[tokio::test]
    async fn test_response_echoes_id() {
        let router = add_router();
        for id in [json!(0), json!("abc"), json!(-7), json!(1.5)] {
            let response = router
                .handle_call(Call::new("echo").with_id(id.clone()), ())
                .await
                .unwrap();
            assert_eq!(response.id(), Some(&id));
        }
    }

    #[tokio::test]
    async fn test_missing_params_default_to_empty_object() {
        let router = add_router();
        let response = router.handle_call(call("echo", 1), ()).await.unwrap();
        assert_eq!(response.result(), Some(&json!({})));
    }

    #[tokio::test]
    async fn test_notification_returns_none() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::builder()
            .method("bump", move |_: Value, _: ()| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Null)
                }
            })
            .build()
            .unwrap();

        assert!(router.handle_call(Call::new("bump"), ()).await.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_notification_gets_error_with_null_id() {
        let router = add_router();
        for (body, code) in [
            (json!({"jsonrpc": "2.0", "method": 5}), error_codes::INVALID_REQUEST),
            (json!({"jsonrpc": "1.0", "method": "echo"}), error_codes::INVALID_REQUEST),
            (json!({"jsonrpc": "2.0", "method": "nope"}), error_codes::METHOD_NOT_FOUND),
            (json!({"jsonrpc": "2.0", "method": "add", "id": null}), -32602),
        ] {
            let reply = router.handle(body, ()).await.unwrap();
            let value = reply.into_value().unwrap();
            assert_eq!(value["error"]["code"], json!(code));
            assert_eq!(value["id"], Value::Null);
            assert!(value.as_object().unwrap().contains_key("id"));
        }
    }

    #[tokio::test]
    async fn test_wrong_version_is_invalid_request() {
        let router = add_router();
        for version in [json!("1.0"), json!(2.0), json!(null), json!("2.0 ")] {
            let response = router
                .handle_call(call("echo", 1).with_version(version), ())
                .await
                .unwrap();
            assert_eq!(
                response.error_info().map(Error::code),
                Some(error_codes::INVALID_REQUEST)
            );
            assert_eq!(response.id(), Some(&json!(1)));
        }
    }

    #[tokio::test]
    async fn test_bad_method_is_invalid_request() {
        let router = add_router();
        let body = json!({"jsonrpc": "2.0", "method": 5, "id": 3});
        let response = router.handle_call(Call::from_value(body), ()).await.unwrap();
        assert_eq!(response.error_info().unwrap().code(), error_codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let router = add_router();
        let response = router.handle_call(call("sub", 9), ()).await.unwrap();
        let error = response.error_info().unwrap();
        assert_eq!(error.code(), error_codes::METHOD_NOT_FOUND);
        assert_eq!(error.message(), "Method not found - sub");
        assert_eq!(response.id(), Some(&json!(9)));
    }

    #[tokio::test]
    async fn test_application_error_passes_through() {
        let router = Router::builder()
            .method("secret", |_: Value, _: ()| async move {
                Err(Error::new(403, "forbidden").with_data(json!({"need": "admin"})))
            })
            .build()
            .unwrap();

        let response = router.handle_call(call("secret", 1), ()).await.unwrap();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "error": {"code": 403, "message": "forbidden", "data": {"need": "admin"}},
                "id": 1
            })
        );
    }

    #[tokio::test]
    async fn test_uncoded_error_maps_to_internal_error() {
        let router = Router::builder()
            .method("io", |_: Value, _: ()| async move {
                let failure = std::io::Error::other("disk on fire");
                Err(Error::from_std(&failure))
            })
            .build()
            .unwrap();

        let response = router.handle_call(call("io", 1), ()).await.unwrap();
        let error = response.error_info().unwrap();
        assert_eq!(error.code(), error_codes::INTERNAL_ERROR);
        assert_eq!(error.message(), "disk on fire");
    }

    #[tokio::test]
    async fn test_handler_panic_maps_to_internal_error() {
        let router = Router::builder()
            .method("crash", |params: Value, _: ()| async move {
                if params.is_object() {
                    panic!("handler bug");
                }
                Ok(Value::Null)
            })
            .build()
            .unwrap();

        let response = router.handle_call(call("crash", 4), ()).await.unwrap();
        assert_eq!(
            response.take_error(),
            Some(Error::new(error_codes::INTERNAL_ERROR, "Internal error"))
        );
    }

    #[tokio::test]
    async fn test_before_hook_failure_skips_handler() {
        let computed = Arc::new(AtomicUsize::new(0));
        let counter = computed.clone();
        let router = Router::builder()
            .method("add", move |params: Value, _: ()| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(params["a"].as_i64().unwrap_or(0) + params["b"].as_i64().unwrap_or(0)))
                }
            })
            .before(
                "add",
                Hook::single(|_: Value, _: Option<Value>, _: ()| async move {
                    Err(Error::new(400, "bad"))
                }),
            )
            .build()
            .unwrap();

        let reply = router
            .handle(
                json!({"id": 1, "method": "add", "params": {"a": 1, "b": 2}, "jsonrpc": "2.0"}),
                (),
            )
            .await
            .unwrap();
        assert_eq!(
            reply.into_value(),
            Some(json!({"jsonrpc": "2.0", "error": {"code": 400, "message": "bad"}, "id": 1}))
        );
        assert_eq!(computed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hook_ordering_and_arguments() {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let (before_tx, method_tx, after_tx) = (tx.clone(), tx.clone(), tx);

        let router = Router::builder()
            .method("double", move |params: Value, ctx: &'static str| {
                let tx = method_tx.clone();
                async move {
                    let _ = tx.send(format!("method:{ctx}"));
                    Ok(json!(params["n"].as_i64().unwrap_or(0) * 2))
                }
            })
            .before(
                "double",
                Hook::single(move |params: Value, result: Option<Value>, ctx: &'static str| {
                    let tx = before_tx.clone();
                    async move {
                        let _ = tx.send(format!("before:{}:{:?}:{ctx}", params["n"], result));
                        Ok(())
                    }
                }),
            )
            .after(
                "double",
                Hook::single(move |params: Value, result: Option<Value>, ctx: &'static str| {
                    let tx = after_tx.clone();
                    async move {
                        let result = result.unwrap_or_default();
                        let _ = tx.send(format!("after:{}:{result}:{ctx}", params["n"]));
                        Ok(())
                    }
                }),
            )
            .build()
            .unwrap();

        let response = router
            .handle_call(call("double", 1).with_params(json!({"n": 21})), "req-ctx")
            .await
            .unwrap();
        assert_eq!(response.result(), Some(&json!(42)));

        let mut seen = Vec::new();
        while let Ok(entry) = rx.try_recv() {
            seen.push(entry);
        }
        assert_eq!(
            seen,
            vec![
                "before:21:None:req-ctx".to_string(),
                "method:req-ctx".to_string(),
                "after:21:42:req-ctx".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_after_hook_failure_replaces_result() {
        let router = Router::builder()
            .method("ok", |_: Value, _: ()| async move { Ok(json!("done")) })
            .after(
                "ok",
                Hook::single(|_: Value, _: Option<Value>, _: ()| async move {
                    Err(Error::new(-32001, "audit failed"))
                }),
            )
            .build()
            .unwrap();

        let response = router.handle_call(call("ok", 2), ()).await.unwrap();
        assert!(response.result().is_none());
        assert_eq!(response.error_info().unwrap().code(), -32001);
    }

    #[tokio::test]
    async fn test_hook_group_failure_stops_call() {
        let router = Router::builder()
            .method("guarded", |_: Value, _: ()| async move { Ok(json!(true)) })
            .before(
                "guarded",
                Hook::group()
                    .with(|_: Value, _: Option<Value>, _: ()| async move { Ok(()) })
                    .with(|_: Value, _: Option<Value>, _: ()| async move {
                        Err(Error::new(401, "unauthenticated"))
                    }),
            )
            .build()
            .unwrap();

        let response = router.handle_call(call("guarded", 1), ()).await.unwrap();
        assert_eq!(response.error_info().unwrap().code(), 401);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let router = Router::builder()
            .method("slow", |_: Value, _: ()| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(json!("slow"))
            })
            .method("fast", |_: Value, _: ()| async move { Ok(json!("fast")) })
            .method("fireAndForget", |_: Value, _: ()| async move { Ok(Value::Null) })
            .build()
            .unwrap();

        let reply = router
            .handle(
                json!([
                    {"jsonrpc": "2.0", "id": 1, "method": "slow"},
                    {"jsonrpc": "2.0", "id": 2, "method": "fast"},
                    {"jsonrpc": "2.0", "id": null, "method": "fireAndForget"}
                ]),
                (),
            )
            .await
            .unwrap();

        let Reply::Batch(responses) = reply else {
            panic!("expected a batch reply");
        };
        let ids: Vec<&Value> = responses.iter().filter_map(Response::id).collect();
        assert_eq!(ids, vec![&json!(1), &json!(2)]);
        assert_eq!(responses[0].result(), Some(&json!("slow")));
    }

    #[tokio::test]
    async fn test_batch_items_run_concurrently() {
        let router = Router::builder()
            .method("nap", |_: Value, _: ()| async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(json!("rested"))
            })
            .build()
            .unwrap();

        let calls = (1..=5).map(|id| call("nap", id)).collect();
        let started = std::time::Instant::now();
        let responses = router.handle_batch(calls, ()).await;
        assert_eq!(responses.len(), 5);
        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let router = add_router();
        let reply = router
            .handle(
                json!([
                    {"jsonrpc": "2.0", "method": "add", "params": {"a": 1, "b": 1}, "id": "a"},
                    {"jsonrpc": "2.0", "method": "nope", "id": "b"},
                    {"jsonrpc": "1.0", "method": "add", "id": "c"},
                    {"jsonrpc": "2.0", "method": "add", "params": {"a": 2, "b": 2}, "id": "d"}
                ]),
                (),
            )
            .await
            .unwrap();

        assert_eq!(
            reply.into_value(),
            Some(json!([
                {"jsonrpc": "2.0", "result": 2, "id": "a"},
                {"jsonrpc": "2.0", "error": {"code": -32601, "message": "Method not found - nope"}, "id": "b"},
                {"jsonrpc": "2.0", "error": {"code": -32600, "message": "Invalid Request, wrong version - 1.0"}, "id": "c"},
                {"jsonrpc": "2.0", "result": 4, "id": "d"}
            ]))
        );
    }

    #[tokio::test]
    async fn test_batch_malformed_entries_are_per_item() {
        let router = add_router();
        let reply = router
            .handle(
                json!([1, {}, "text", {"jsonrpc": "2.0", "method": "echo", "id": 5}]),
                (),
            )
            .await
            .unwrap();

        // Entries without an id produce no response, valid siblings still do.
        assert_eq!(
            reply,
            Reply::Batch(vec![Response::success(json!({}), Some(json!(5)))])
        );
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let router = add_router();
        let reply = router.handle(json!([]), ()).await.unwrap();
        assert_eq!(reply, Reply::Batch(vec![]));
        assert_eq!(reply.into_value(), Some(json!([])));
    }

    #[tokio::test]
    async fn test_notification_only_batch_still_runs() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = Router::builder()
            .method("log", move |params: Value, _: ()| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(params);
                    Ok(Value::Null)
                }
            })
            .build()
            .unwrap();

        let reply = router
            .handle(
                json!([
                    {"jsonrpc": "2.0", "method": "log", "params": {"n": 1}},
                    {"jsonrpc": "2.0", "method": "log", "params": {"n": 2}, "id": null}
                ]),
                (),
            )
            .await
            .unwrap();
        assert_eq!(reply, Reply::Batch(vec![]));

        let mut seen = Vec::new();
        for _ in 0..2 {
            let params = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(params["n"].as_i64().unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_batch_items_start_in_input_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = Router::builder()
            .method("mark", move |params: Value, _: ()| {
                let _ = tx.send(params["n"].as_i64().unwrap_or(0));
                async move { Ok(Value::Null) }
            })
            .build()
            .unwrap();

        let reply = router
            .handle(
                json!([
                    {"jsonrpc": "2.0", "method": "mark", "params": {"n": 1}, "id": 1},
                    {"jsonrpc": "2.0", "method": "mark", "params": {"n": 2}},
                    {"jsonrpc": "2.0", "method": "mark", "params": {"n": 3}, "id": 3}
                ]),
                (),
            )
            .await
            .unwrap();
        let Reply::Batch(responses) = reply else {
            panic!("expected a batch reply");
        };
        assert_eq!(responses.len(), 2);

        let mut started = Vec::new();
        for _ in 0..3 {
            let n = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            started.push(n);
        }
        assert_eq!(started, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_batch_size_limit() {
        let router = Router::builder()
            .method("echo", |params: Value, _: ()| async move { Ok(params) })
            .max_batch_size(2)
            .build()
            .unwrap();

        let responses = router
            .handle_batch(vec![call("echo", 1), call("echo", 2), call("echo", 3)], ())
            .await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].id(), None);
        assert_eq!(
            responses[0].error_info().unwrap().message(),
            "Batch size 3 exceeds maximum 2"
        );

        let responses = router
            .handle_batch(vec![call("echo", 1), call("echo", 2)], ())
            .await;
        assert_eq!(responses.len(), 2);
    }

    #[tokio::test]
    async fn test_non_object_body_is_rejected() {
        let router = add_router();
        for (body, kind) in [
            (json!(1), "number"),
            (json!("x"), "string"),
            (Value::Null, "null"),
            (json!(true), "boolean"),
        ] {
            let err = router.handle(body, ()).await.unwrap_err();
            assert_eq!(err, BodyError::NotObjectOrArray(kind));
        }
    }

    #[tokio::test]
    async fn test_single_notification_body_has_no_reply() {
        let router = add_router();
        let reply = router
            .handle(json!({"jsonrpc": "2.0", "method": "echo"}), ())
            .await
            .unwrap();
        assert!(reply.is_empty());
        assert_eq!(reply.into_value(), None);
    }

    #[tokio::test]
    async fn test_error_callback_receives_error_and_call() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = Router::builder()
            .method("fail", |_: Value, _: ()| async move { Err(Error::new(418, "teapot")) })
            .on_error(move |error: &Error, call: &Call| {
                let _ = tx.send((error.clone(), call.clone()));
            })
            .build()
            .unwrap();

        let sent = call("fail", 7);
        let response = router.handle_call(sent.clone(), ()).await.unwrap();
        assert_eq!(response.error_info().unwrap().code(), 418);

        let (error, seen_call) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(error, Error::new(418, "teapot"));
        assert_eq!(seen_call, sent);
    }

    #[tokio::test]
    async fn test_error_callback_runs_for_failed_notifications() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = Router::builder()
            .method("echo", |params: Value, _: ()| async move { Ok(params) })
            .on_error(move |error: &Error, _: &Call| {
                let _ = tx.send(error.code());
            })
            .build()
            .unwrap();

        let response = router.handle_call(Call::new("ghost"), ()).await.unwrap();
        assert_eq!(response.id(), None);
        assert_eq!(
            response.error_info().map(Error::code),
            Some(error_codes::METHOD_NOT_FOUND)
        );
        let code = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(code, Some(error_codes::METHOD_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_panicking_error_callback_does_not_affect_response() {
        let router = Router::builder()
            .method("fail", |_: Value, _: ()| async move { Err(Error::new(500, "nope")) })
            .on_error(|_: &Error, _: &Call| panic!("callback bug"))
            .build()
            .unwrap();

        for id in 1..=3 {
            let response = router.handle_call(call("fail", id), ()).await.unwrap();
            assert_eq!(response.error_info().unwrap().code(), 500);
        }
    }

    #[tokio::test]
    async fn test_sanitizer_applies_after_callback() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = Router::builder()
            .method("leak", |_: Value, _: ()| async move {
                Err(Error::internal("password=hunter2"))
            })
            .on_error(move |error: &Error, _: &Call| {
                let _ = tx.send(error.message().to_string());
            })
            .sanitizer(MaskInternalErrors)
            .build()
            .unwrap();

        let response = router.handle_call(call("leak", 1), ()).await.unwrap();
        assert_eq!(response.error_info().unwrap().message(), "Internal error");

        let original = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(original.as_deref(), Some("password=hunter2"));
    }

    #[tokio::test]
    async fn test_router_is_shareable_across_tasks() {
        let router = add_router();
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let router = router.clone();
                tokio::spawn(async move {
                    router
                        .handle_call(call("add", n).with_params(json!({"a": n, "b": 1})), ())
                        .await
                })
            })
            .collect();

        for (n, handle) in handles.into_iter().enumerate() {
            let response = handle.await.unwrap().unwrap();
            assert_eq!(response.result(), Some(&json!(n as i64 + 1)));
        }
    }

    #[test]
    fn test_hook_without_method_fails_configuration() {
        let err = Router::builder()
            .method("bar", |_: Value, _: ()| async move { Ok(Value::Null) })
            .before(
                "foo",
                Hook::single(|_: Value, _: Option<Value>, _: ()| async move { Ok(()) }),
            )
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownHookTarget {
                phase: HookPhase::Before,
                method: "foo".to_string()
            }
        );
    }

    #[test]
    fn test_router_introspection() {
        let router = add_router();
        assert!(router.has_method("add"));
        assert!(!router.has_method("sub"));
        assert_eq!(router.method_names(), vec!["add".to_string(), "echo".to_string()]);
        assert_eq!(router.method_count(), 2);
        assert_eq!(router.settings(), &RouterSettings::default());
        assert!(format!("{:?}", router).contains("\"add\""));
    }
}
