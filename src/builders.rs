//! Builder for router configuration.

use crate::config::{ConfigError, HookPhase, RouterSettings, validate_tables};
use crate::hooks::Hook;
use crate::router::{ErrorCallback, Router, RouterInner};
use crate::sanitization::Sanitizer;
use crate::traits::{FnMethod, Method, MethodResult};
use crate::types::{Call, Error};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Collects methods, hooks and callbacks, then validates them into a [`Router`].
pub struct RouterBuilder<C> {
    methods: Vec<(String, Arc<dyn Method<C>>)>,
    before: Vec<(String, Hook<C>)>,
    after: Vec<(String, Hook<C>)>,
    on_error: Option<ErrorCallback>,
    sanitizer: Option<Arc<dyn Sanitizer>>,
    settings: RouterSettings,
}

impl<C> RouterBuilder<C>
where
    C: Clone + Send + Sync + 'static,
{
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            on_error: None,
            sanitizer: None,
            settings: RouterSettings::default(),
        }
    }

    /// Register an async closure as a method
    pub fn method<F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MethodResult> + Send + 'static,
    {
        self.register(name, FnMethod(handler))
    }

    /// Register a [`Method`] implementation
    pub fn register<M>(mut self, name: impl Into<String>, method: M) -> Self
    where
        M: Method<C> + 'static,
    {
        self.methods.push((name.into(), Arc::new(method)));
        self
    }

    /// Hook that runs before the named method
    pub fn before(mut self, method: impl Into<String>, hook: Hook<C>) -> Self {
        self.before.push((method.into(), hook));
        self
    }

    /// Hook that runs after the named method succeeds
    pub fn after(mut self, method: impl Into<String>, hook: Hook<C>) -> Self {
        self.after.push((method.into(), hook));
        self
    }

    /// Callback receiving every failure and the call that caused it.
    ///
    /// Runs detached from the response path; its outcome is ignored and a
    /// panic inside it is logged.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Error, &Call) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Rewrite errors before they are sent to clients
    pub fn sanitizer<S>(mut self, sanitizer: S) -> Self
    where
        S: Sanitizer + 'static,
    {
        self.sanitizer = Some(Arc::new(sanitizer));
        self
    }

    pub fn settings(mut self, settings: RouterSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Limit the number of calls accepted in one batch
    pub fn max_batch_size(mut self, max: usize) -> Self {
        self.settings.max_batch_size = Some(max);
        self
    }

    /// Validate the configuration and build the router
    pub fn build(self) -> Result<Router<C>, ConfigError> {
        let hooks = self
            .before
            .iter()
            .map(|(method, _)| (HookPhase::Before, method.as_str()))
            .chain(
                self.after
                    .iter()
                    .map(|(method, _)| (HookPhase::After, method.as_str())),
            );
        let validation = validate_tables(
            self.methods.iter().map(|(name, _)| name.as_str()),
            hooks,
            &self.settings,
        );
        if let Err(error) = validation {
            tracing::error!(error = %error, "invalid router configuration");
            return Err(error);
        }

        tracing::debug!(
            methods = self.methods.len(),
            before_hooks = self.before.len(),
            after_hooks = self.after.len(),
            max_batch_size = ?self.settings.max_batch_size,
            "router built"
        );

        Ok(Router::from_inner(RouterInner {
            methods: self.methods.into_iter().collect(),
            before: self.before.into_iter().collect(),
            after: self.after.into_iter().collect(),
            on_error: self.on_error,
            sanitizer: self.sanitizer,
            settings: self.settings,
        }))
    }
}

impl<C> Default for RouterBuilder<C>
where
    C: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
