// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{CancelToken, ScopeConfig, ScopeId, TaskPriority};
use std::{any::Any,
          collections::HashMap,
          fmt::{Debug, Formatter, Result as FmtResult},
          sync::Arc};

type LocalsMap = HashMap<&'static str, Arc<dyn Any + Send + Sync>>;

/// Immutable, typed key/value pairs attached to a scope and visible to every job it
/// runs. Cloning is an [`Arc`] bump.
///
/// Values are set while building the [`ScopeConfig`] and never change afterwards, so
/// jobs can read them without synchronization.
///
/// ```
/// use r3bl_async_scope::ScopeLocals;
///
/// let locals = ScopeLocals::default().with_value("request_id", "abc".to_string());
/// assert_eq!(locals.get::<String>("request_id").as_deref().map(String::as_str), Some("abc"));
/// assert!(locals.get::<u32>("request_id").is_none());
/// ```
#[derive(Clone, Default)]
pub struct ScopeLocals {
    map: Arc<LocalsMap>,
}

impl ScopeLocals {
    /// Returns a copy with `key` set to `value`. An existing value for `key` is
    /// replaced.
    #[must_use]
    pub fn with_value<T: Any + Send + Sync>(mut self, key: &'static str, value: T) -> Self {
        Arc::make_mut(&mut self.map).insert(key, Arc::new(value));
        self
    }

    /// Returns the value for `key`, if there is one and it is a `T`.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = Arc::clone(self.map.get(key)?);
        value.downcast::<T>().ok()
    }

    #[must_use]
    pub fn len(&self) -> usize { self.map.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.map.is_empty() }
}

impl Debug for ScopeLocals {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut keys: Vec<_> = self.map.keys().collect();
        keys.sort_unstable();
        f.debug_struct("ScopeLocals").field("keys", &keys).finish()
    }
}

/// What a job knows about the scope that runs it. Passed explicitly to every [`Job`]
/// when it starts; there is no ambient "current scope".
///
/// [`Job`]: crate::Job
#[derive(Debug, Clone)]
pub struct ScopeContext {
    scope_id: ScopeId,
    priority: TaskPriority,
    locals: ScopeLocals,
    cancel_token: CancelToken,
}

impl ScopeContext {
    #[must_use]
    pub fn new(
        scope_id: ScopeId,
        priority: TaskPriority,
        locals: ScopeLocals,
        cancel_token: CancelToken,
    ) -> Self {
        Self {
            scope_id,
            priority,
            locals,
            cancel_token,
        }
    }

    #[must_use]
    pub fn scope_id(&self) -> ScopeId { self.scope_id }

    #[must_use]
    pub fn priority(&self) -> TaskPriority { self.priority }

    #[must_use]
    pub fn locals(&self) -> &ScopeLocals { &self.locals }

    /// Shorthand for `self.locals().get(key)`.
    #[must_use]
    pub fn local<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.locals.get(key)
    }

    /// The scope's cancellation signal. Long running jobs should race their work
    /// against [`CancelToken::cancelled()`] or poll [`is_cancelled()`].
    ///
    /// [`is_cancelled()`]: Self::is_cancelled
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken { &self.cancel_token }

    #[must_use]
    pub fn is_cancelled(&self) -> bool { self.cancel_token.is_cancelled() }

    pub async fn cancelled(&self) { self.cancel_token.cancelled().await; }

    /// Shorthand for [`ScopeConfig::child_of()`].
    #[must_use]
    pub fn child_config(&self) -> ScopeConfig { ScopeConfig::child_of(self) }
}
