// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{AtomicU64Ext, Demand, SafeLock, Subscription};
use std::sync::atomic::AtomicU64;

/// A [`Subscription`] that only counts what it is asked to do.
#[derive(Debug, Default)]
pub struct CountingSubscription {
    request_calls: AtomicU64,
    cancel_calls: AtomicU64,
    requested: SafeLock<Demand>,
}

impl CountingSubscription {
    #[must_use]
    pub fn request_calls(&self) -> u64 { self.request_calls.get() }

    #[must_use]
    pub fn cancel_calls(&self) -> u64 { self.cancel_calls.get() }

    /// Sum of all requested demand.
    #[must_use]
    pub fn requested(&self) -> Demand { self.requested.snapshot() }
}

impl Subscription for CountingSubscription {
    fn request(&self, demand: Demand) {
        self.request_calls.increment();
        self.requested.with(|it| *it += demand);
    }

    fn cancel(&self) { self.cancel_calls.increment(); }
}
