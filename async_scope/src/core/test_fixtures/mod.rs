// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod counting_subscription;
pub mod recording_publisher;
pub mod recording_sink;

// Re-export.
pub use counting_subscription::*;
pub use recording_publisher::*;
pub use recording_sink::*;
