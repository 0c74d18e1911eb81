// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod bridge_error;
pub mod bridge_impl;
pub mod bridge_stream;
pub mod bridge_traits;
mod inbound;
pub mod stream_publisher;
mod subscription_core;
pub mod transform;

// Re-export.
pub use bridge_error::*;
pub use bridge_impl::*;
pub use bridge_stream::*;
pub use bridge_traits::*;
pub use stream_publisher::*;
pub use subscription_core::{DOWNSTREAM_CHECK_INTERVAL, SubscriptionState};
pub use transform::*;

// Tests.
#[cfg(test)]
mod bridge_tests;
