// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Errors from creating or using a [`TaskScope`].
///
/// [`TaskScope`]: crate::TaskScope
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ScopeError {
    #[error("No Tokio runtime is available to run the scope on")]
    #[diagnostic(
        code(r3bl_async_scope::task_scope::no_runtime),
        help(
            "Create the scope from inside a Tokio runtime, or pass one with \
             `ScopeConfig::with_runtime_handle()`"
        )
    )]
    NoRuntime,

    #[error("The scope is cancelled and no longer accepts jobs")]
    #[diagnostic(
        code(r3bl_async_scope::task_scope::cancelled),
        help("Create a new scope; a cancelled scope can't be restarted")
    )]
    Cancelled,
}
