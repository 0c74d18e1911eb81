// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod scope_config;
pub mod scope_context;
pub mod scope_error;
pub mod scope_owner;
mod scope_worker;
pub mod task_scope_impl;

// Re-export.
pub use scope_config::*;
pub use scope_context::*;
pub use scope_error::*;
pub use scope_owner::*;
pub use task_scope_impl::*;
