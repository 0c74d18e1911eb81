// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{CancelToken, DrainOnCancel, ScopeContext, ScopeLocals};
use std::time::Duration;
use tokio::runtime::Handle;

/// How long a cancelled scope waits for its running jobs to notice cancellation before
/// it aborts them.
pub const DEFAULT_CANCEL_GRACE_PERIOD: Duration = Duration::from_millis(250);

pub const DEFAULT_SCOPE_NAME: &str = "task_scope";

/// Scheduling hint for the jobs of a scope.
///
/// Tokio has no task priorities, so this is carried rather than enforced: every job
/// sees it in its [`ScopeContext::priority()`], and it is recorded on the scope's and
/// each job's tracing span. Jobs that hand work to a system that does have priorities
/// can forward it there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
    Background,
}

/// Whether a scope's cancellation is tied to its creator.
#[derive(Debug, Clone, Default)]
pub enum ScopeLineage {
    /// Independent. Only [`TaskScope::cancel()`] (or its [`ScopeOwner`] going away)
    /// cancels it.
    ///
    /// [`ScopeOwner`]: crate::ScopeOwner
    /// [`TaskScope::cancel()`]: crate::TaskScope::cancel
    #[default]
    Detached,

    /// Cancelled whenever the given token is. Build this with
    /// [`ScopeConfig::child_of()`] to nest a scope under another one.
    Structured(CancelToken),
}

/// Everything a [`TaskScope`] needs to know at construction time.
///
/// ```
/// use r3bl_async_scope::{DrainOnCancel, ScopeConfig, TaskPriority};
/// use std::time::Duration;
///
/// let config = ScopeConfig::default()
///     .with_name("uploads")
///     .with_priority(TaskPriority::Low)
///     .with_drain_on_cancel(DrainOnCancel::DiscardBuffered)
///     .with_cancel_grace_period(Duration::from_millis(50))
///     .with_local("user_id", 42_u64);
/// # assert_eq!(config.name, "uploads");
/// ```
///
/// [`TaskScope`]: crate::TaskScope
#[derive(Debug, Clone)]
pub struct ScopeConfig {
    pub name: String,
    pub priority: TaskPriority,
    pub lineage: ScopeLineage,
    pub drain_on_cancel: DrainOnCancel,
    pub cancel_grace_period: Duration,
    pub locals: ScopeLocals,
    /// Runtime to run the scope on. `None` means the runtime of the caller of
    /// [`TaskScope::try_new()`].
    ///
    /// [`TaskScope::try_new()`]: crate::TaskScope::try_new
    pub runtime_handle: Option<Handle>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SCOPE_NAME.to_string(),
            priority: TaskPriority::default(),
            lineage: ScopeLineage::default(),
            drain_on_cancel: DrainOnCancel::default(),
            cancel_grace_period: DEFAULT_CANCEL_GRACE_PERIOD,
            locals: ScopeLocals::default(),
            runtime_handle: None,
        }
    }
}

impl ScopeConfig {
    /// Config for a scope nested under the one `parent` belongs to. The child is
    /// cancelled with its parent and inherits its priority and locals.
    #[must_use]
    pub fn child_of(parent: &ScopeContext) -> Self {
        Self {
            priority: parent.priority(),
            lineage: ScopeLineage::Structured(parent.cancel_token().clone()),
            locals: parent.locals().clone(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_lineage(mut self, lineage: ScopeLineage) -> Self {
        self.lineage = lineage;
        self
    }

    #[must_use]
    pub fn with_drain_on_cancel(mut self, drain_on_cancel: DrainOnCancel) -> Self {
        self.drain_on_cancel = drain_on_cancel;
        self
    }

    #[must_use]
    pub fn with_cancel_grace_period(mut self, cancel_grace_period: Duration) -> Self {
        self.cancel_grace_period = cancel_grace_period;
        self
    }

    #[must_use]
    pub fn with_local<T: std::any::Any + Send + Sync>(
        mut self,
        key: &'static str,
        value: T,
    ) -> Self {
        self.locals = self.locals.with_value(key, value);
        self
    }

    #[must_use]
    pub fn with_runtime_handle(mut self, runtime_handle: Handle) -> Self {
        self.runtime_handle = Some(runtime_handle);
        self
    }
}
