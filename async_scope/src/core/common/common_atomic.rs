// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Monotonic identifiers for scopes and bridges. See [`ScopeId`] and [`BridgeId`].

use std::{fmt::{Display, Formatter, Result as FmtResult},
          sync::atomic::{AtomicU64, Ordering}};

/// Ergonomic helpers for [`AtomicU64`] that hide [`SeqCst`] boilerplate and the
/// [`fetch_add`] return-value quirk.
///
/// ## The `fetch_add` quirk
///
/// [`AtomicU64::fetch_add`] returns the **old** value. [`increment`] derives the new
/// value from that old value instead of issuing a second load, which would race with
/// other threads' increments and could return someone else's value.
///
/// [`SeqCst`]: Ordering::SeqCst
/// [`fetch_add`]: AtomicU64::fetch_add
/// [`increment`]: Self::increment
pub trait AtomicU64Ext {
    /// Atomically increments the counter and returns the **new** value.
    fn increment(&self) -> u64;

    /// Reads the current value.
    fn get(&self) -> u64;
}

impl AtomicU64Ext for AtomicU64 {
    fn increment(&self) -> u64 { self.fetch_add(1, Ordering::SeqCst).wrapping_add(1) }

    fn get(&self) -> u64 { self.load(Ordering::SeqCst) }
}

static SCOPE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
static BRIDGE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identity of a [`TaskScope`]. Two scope handles are equal iff they share this id.
///
/// Allocated once, when the scope's backing task is created. Never reused within a
/// process.
///
/// [`TaskScope`]: crate::TaskScope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u64);

impl ScopeId {
    #[must_use]
    pub fn next() -> Self { Self(SCOPE_ID_COUNTER.increment()) }
}

impl Display for ScopeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult { write!(f, "scope#{}", self.0) }
}

/// Identity of one [`Bridge`] subscription.
///
/// [`Bridge`]: crate::Bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BridgeId(pub u64);

impl BridgeId {
    #[must_use]
    pub fn next() -> Self { Self(BRIDGE_ID_COUNTER.increment()) }
}

impl Display for BridgeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult { write!(f, "bridge#{}", self.0) }
}
