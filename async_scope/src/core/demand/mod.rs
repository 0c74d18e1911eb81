// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod demand_channel;
pub mod demand_type;

// Re-export.
pub use demand_channel::*;
pub use demand_type::*;
