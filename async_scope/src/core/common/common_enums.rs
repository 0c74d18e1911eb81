// Copyright (c) 2023-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Control flow signal for loops and tasks, eg: one step of the [`TaskScope`]
/// background task's job intake loop.
///
/// [`TaskScope`]: crate::TaskScope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    /// Continue to the next iteration.
    #[default]
    Continue,

    /// Stop processing and exit the loop/task.
    Stop,
}

/// What a [`TaskScope`] does with jobs that were accepted by [`TaskScope::launch()`]
/// but had not started yet when the scope was cancelled.
///
/// [`TaskScope`]: crate::TaskScope
/// [`TaskScope::launch()`]: crate::TaskScope::launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainOnCancel {
    /// Start them anyway, with an already cancelled [`ScopeContext`]. They get the
    /// cancellation grace period to observe it and wrap up, then they are aborted.
    ///
    /// [`ScopeContext`]: crate::ScopeContext
    #[default]
    RunBuffered,

    /// Drop them without ever starting them.
    DiscardBuffered,
}
