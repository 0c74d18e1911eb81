// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Cooperative, hierarchical cancellation. See [`CancelToken`].

use super::SafeLock;
use std::{fmt::{Debug, Formatter, Result as FmtResult},
          pin::pin,
          sync::{Arc, Weak,
                 atomic::{AtomicBool, Ordering}}};
use tokio::sync::Notify;

/// A cloneable cancellation signal. All clones observe the same state.
///
/// Cancellation is cooperative: [`cancel()`] only flips a flag and wakes whoever is
/// parked in [`cancelled()`]. Code that wants to be interruptible has to check
/// [`is_cancelled()`] or race its work against [`cancelled()`].
///
/// # Hierarchy
///
/// [`child_token()`] creates a token that is cancelled whenever its parent is (but not
/// the other way around). This is how a structured [`TaskScope`] inherits its creator's
/// cancellation, and how a [`Bridge`] is cancelled when the scope it runs in is.
///
/// ```text
/// scope token ──┬── child scope token ── bridge token
///               └── bridge token
/// ```
///
/// # Monotonic
///
/// Once cancelled, a token is never un-cancelled. [`cancel()`] is idempotent and safe to
/// call from any context (it never suspends, and it is fine to call it from [`Drop`]).
///
/// [`Bridge`]: crate::Bridge
/// [`TaskScope`]: crate::TaskScope
/// [`cancel()`]: Self::cancel
/// [`cancelled()`]: Self::cancelled
/// [`child_token()`]: Self::child_token
/// [`is_cancelled()`]: Self::is_cancelled
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelTokenInner>,
}

#[derive(Default)]
struct CancelTokenInner {
    is_cancelled: AtomicBool,
    notify: Notify,
    children: SafeLock<Vec<Weak<CancelTokenInner>>>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Returns a new token that is cancelled when `self` is cancelled.
    ///
    /// If `self` is already cancelled, the child starts out cancelled.
    #[must_use]
    pub fn child_token(&self) -> Self {
        let child = Self::new();

        // Register first, then check the flag. `cancel_inner()` sets the flag before it
        // takes the children list, so one of the two sides always sees the other.
        self.inner.children.with(|children| {
            children.retain(|it| it.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        });
        if self.is_cancelled() {
            child.cancel();
        }

        child
    }

    /// Cancels this token and all of its descendants.
    pub fn cancel(&self) { cancel_inner(&self.inner); }

    #[must_use]
    pub fn is_cancelled(&self) -> bool { self.inner.is_cancelled.load(Ordering::SeqCst) }

    /// Resolves once this token is cancelled. Resolves immediately if it already is.
    ///
    /// This future is cancel safe: dropping it before completion has no side effects.
    pub async fn cancelled(&self) {
        loop {
            let mut notified = pin!(self.inner.notify.notified());
            // Register interest before checking the flag so a concurrent `cancel()`
            // can't slip in between the check and the wait.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

fn cancel_inner(inner: &Arc<CancelTokenInner>) {
    if inner.is_cancelled.swap(true, Ordering::SeqCst) {
        return;
    }
    inner.notify.notify_waiters();

    let children = inner.children.with(std::mem::take);
    for child in children.iter().filter_map(Weak::upgrade) {
        cancel_inner(&child);
    }
}

impl Debug for CancelToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CancelToken")
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancelToken::new();
        let token_clone = token.clone();

        let waiter = tokio::spawn(async move { token_clone.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        token.cancel();
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter was not woken")
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        timeout(Duration::from_millis(100), token.cancelled())
            .await
            .unwrap();
    }

    #[test]
    fn cancel_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn parent_cancels_children_but_not_the_reverse() {
        let parent = CancelToken::new();
        let child = parent.child_token();
        let grandchild = child.child_token();
        let sibling = parent.child_token();

        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(!sibling.is_cancelled());
        assert!(grandchild.is_cancelled());

        parent.cancel();
        assert!(sibling.is_cancelled());
    }

    #[test]
    fn child_of_cancelled_parent_starts_cancelled() {
        let parent = CancelToken::new();
        parent.cancel();
        assert!(parent.child_token().is_cancelled());
    }

    #[test]
    fn dropped_children_are_pruned() {
        let parent = CancelToken::new();
        for _ in 0..100 {
            drop(parent.child_token());
        }
        let _keep = parent.child_token();
        assert_eq!(parent.inner.children.with(|it| it.len()), 1);
    }
}
