// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{ScopeConfig, ScopeError, TaskScope};
use std::{ops::Deref, sync::Arc};

/// RAII owner of a [`TaskScope`]: when the last clone is dropped, the scope is
/// cancelled.
///
/// Use it wherever a scope's lifetime has to follow something else's (a connection, a
/// UI component, a [`BridgeStream`]) without that something having to remember to call
/// [`cancel()`].
///
/// ```no_run
/// # use r3bl_async_scope::{ScopeConfig, ScopeOwner, ok};
/// # async fn it() -> miette::Result<()> {
/// let owner = ScopeOwner::try_new(ScopeConfig::default())?;
/// let scope = owner.scope().clone();
/// scope.launch_fn(|ctx| async move { ctx.cancelled().await; ok!() });
///
/// drop(owner); // Cancels the scope.
/// assert!(scope.is_cancelled());
/// # ok!()
/// # }
/// ```
///
/// [`BridgeStream`]: crate::BridgeStream
/// [`cancel()`]: Self::cancel
#[derive(Debug, Clone)]
pub struct ScopeOwner {
    inner: Arc<OwnedScope>,
}

#[derive(Debug)]
struct OwnedScope {
    scope: TaskScope,
}

impl Drop for OwnedScope {
    fn drop(&mut self) { self.scope.cancel(); }
}

impl ScopeOwner {
    #[must_use]
    pub fn new(scope: TaskScope) -> Self {
        Self {
            inner: Arc::new(OwnedScope { scope }),
        }
    }

    /// Creates a new scope and takes ownership of it.
    ///
    /// # Errors
    ///
    /// See [`TaskScope::try_new()`].
    pub fn try_new(config: ScopeConfig) -> Result<Self, ScopeError> {
        TaskScope::try_new(config).map(Self::new)
    }

    #[must_use]
    pub fn scope(&self) -> &TaskScope { &self.inner.scope }

    /// Cancels the owned scope now, without waiting for the last drop.
    pub fn cancel(&self) { self.inner.scope.cancel(); }
}

impl Deref for ScopeOwner {
    type Target = TaskScope;

    fn deref(&self) -> &Self::Target { &self.inner.scope }
}

impl PartialEq for ScopeOwner {
    fn eq(&self, other: &Self) -> bool { self.inner.scope == other.inner.scope }
}

impl Eq for ScopeOwner {}
