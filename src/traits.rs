//! Handler traits for methods and hooks.
//!
//! Closures are the common case and are registered through
//! [`RouterBuilder::method`](crate::RouterBuilder::method) and
//! [`Hook::single`](crate::Hook::single). Types that carry their own state can
//! implement [`Method`] or [`HookHandler`] directly:
//!
//! ```rust
//! use ash_rpc_router::*;
//! use serde_json::{Value, json};
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl Method<()> for Echo {
//!     async fn call(&self, params: Value, _ctx: ()) -> MethodResult {
//!         Ok(json!({"echo": params}))
//!     }
//! }
//!
//! let router = Router::builder().register("echo", Echo).build().unwrap();
//! assert!(router.has_method("echo"));
//! ```

use crate::types::{Error, ErrorKind};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// What a method handler produces.
pub type MethodResult = Result<Value, Error>;

/// What a hook produces.
pub type HookResult = Result<(), Error>;

/// A JSON-RPC method implementation.
#[async_trait::async_trait]
pub trait Method<C>: Send + Sync {
    /// Execute the method with the call's params and the request context
    async fn call(&self, params: Value, ctx: C) -> MethodResult;
}

/// A before/after hook implementation.
///
/// `result` is `None` for before-hooks and the method's result for
/// after-hooks.
#[async_trait::async_trait]
pub trait HookHandler<C>: Send + Sync {
    async fn call(&self, params: Value, result: Option<Value>, ctx: C) -> HookResult;
}

/// Adapter turning an async closure into a [`Method`].
pub struct FnMethod<F>(pub F);

#[async_trait::async_trait]
impl<C, F, Fut> Method<C> for FnMethod<F>
where
    C: Send + 'static,
    F: Fn(Value, C) -> Fut + Send + Sync,
    Fut: Future<Output = MethodResult> + Send + 'static,
{
    async fn call(&self, params: Value, ctx: C) -> MethodResult {
        (self.0)(params, ctx).await
    }
}

/// Adapter turning an async closure into a [`HookHandler`].
pub struct FnHook<F>(pub F);

#[async_trait::async_trait]
impl<C, F, Fut> HookHandler<C> for FnHook<F>
where
    C: Send + 'static,
    F: Fn(Value, Option<Value>, C) -> Fut + Send + Sync,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    async fn call(&self, params: Value, result: Option<Value>, ctx: C) -> HookResult {
        (self.0)(params, result, ctx).await
    }
}

/// Run a handler future, turning a panic into an internal error.
pub(crate) async fn guarded<T, F>(future: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => {
            tracing::error!(panic = %panic_message(panic.as_ref()), "handler panicked");
            Err(Error::from_kind(ErrorKind::InternalError))
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
