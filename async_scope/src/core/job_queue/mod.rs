// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod job;
pub mod suspending_queue;

// Re-export.
pub use job::*;
pub use suspending_queue::*;
