//! Before/after hooks and their executor.
//!
//! A hook is either one handler or an ordered group of handlers. Group
//! members run concurrently as separate tasks; the group fails with the first
//! error to arrive and the remaining members are left running detached.

use crate::traits::{FnHook, HookHandler, HookResult, guarded};
use crate::types::{Error, ErrorKind};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Shared handle to a hook implementation.
pub type SharedHook<C> = Arc<dyn HookHandler<C>>;

/// A registered hook for one method and phase.
pub enum Hook<C> {
    Single(SharedHook<C>),
    Group(Vec<SharedHook<C>>),
}

impl<C: Clone + Send + Sync + 'static> Hook<C> {
    /// Hook backed by a single async closure
    pub fn single<F, Fut>(hook: F) -> Self
    where
        F: Fn(Value, Option<Value>, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Hook::Single(Arc::new(FnHook(hook)))
    }

    /// Hook backed by a [`HookHandler`] implementation
    pub fn from_handler<H>(handler: H) -> Self
    where
        H: HookHandler<C> + 'static,
    {
        Hook::Single(Arc::new(handler))
    }

    /// Empty group; add members with [`Hook::with`]
    pub fn group() -> Self {
        Hook::Group(Vec::new())
    }

    /// Append an async closure, turning a single hook into a group
    pub fn with<F, Fut>(self, hook: F) -> Self
    where
        F: Fn(Value, Option<Value>, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.push(Arc::new(FnHook(hook)))
    }

    /// Append a [`HookHandler`], turning a single hook into a group
    pub fn with_handler<H>(self, handler: H) -> Self
    where
        H: HookHandler<C> + 'static,
    {
        self.push(Arc::new(handler))
    }

    fn push(self, hook: SharedHook<C>) -> Self {
        match self {
            Hook::Single(first) => Hook::Group(vec![first, hook]),
            Hook::Group(mut members) => {
                members.push(hook);
                Hook::Group(members)
            }
        }
    }
}

impl<C> Hook<C> {
    /// Number of handlers in this hook
    pub fn len(&self) -> usize {
        match self {
            Hook::Single(_) => 1,
            Hook::Group(members) => members.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Hook::Group(_))
    }
}

impl<C> Clone for Hook<C> {
    fn clone(&self) -> Self {
        match self {
            Hook::Single(hook) => Hook::Single(Arc::clone(hook)),
            Hook::Group(members) => Hook::Group(members.clone()),
        }
    }
}

impl<C> fmt::Debug for Hook<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Single(_) => f.write_str("Hook::Single"),
            Hook::Group(members) => write!(f, "Hook::Group({})", members.len()),
        }
    }
}

/// Run a hook with the call's params, the method result (after-hooks only)
/// and the request context.
pub async fn execute_hook<C>(
    hook: &Hook<C>,
    params: &Value,
    result: Option<&Value>,
    ctx: &C,
) -> HookResult
where
    C: Clone + Send + Sync + 'static,
{
    match hook {
        Hook::Single(handler) => {
            guarded(handler.call(params.clone(), result.cloned(), ctx.clone())).await
        }
        Hook::Group(members) => {
            let mut pending: FuturesUnordered<_> = members
                .iter()
                .map(|member| {
                    let member = Arc::clone(member);
                    let params = params.clone();
                    let result = result.cloned();
                    let ctx = ctx.clone();
                    tokio::spawn(async move { member.call(params, result, ctx).await })
                })
                .collect();

            while let Some(joined) = pending.next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => {
                        tracing::debug!(
                            code = error.code,
                            remaining = pending.len(),
                            "hook group member failed"
                        );
                        return Err(error);
                    }
                    Err(join_error) => {
                        tracing::error!(error = %join_error, "hook group member aborted");
                        return Err(Error::from_kind(ErrorKind::InternalError));
                    }
                }
            }
            Ok(())
        }
    }
}
