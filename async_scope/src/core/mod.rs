// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod common;
pub mod decl_macros;
pub mod demand;
pub mod job_queue;
pub mod log;
pub mod resumption_cell;
pub mod stream_bridge;
pub mod task_scope;
pub mod test_fixtures;

// Re-export.
pub use common::*;
pub use demand::*;
pub use job_queue::*;
pub use log::*;
pub use resumption_cell::*;
pub use stream_bridge::*;
pub use task_scope::*;
pub use test_fixtures::*;
