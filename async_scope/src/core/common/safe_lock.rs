// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Single-slot mutual exclusion that is never a suspension point. See [`SafeLock`].

use std::sync::{Mutex, PoisonError};

/// Type alias to make it obvious which mutex is meant when both [`std::sync::Mutex`]
/// and [`tokio::sync::Mutex`] are in scope.
pub type StdMutex<T> = std::sync::Mutex<T>;

/// A mutual-exclusion primitive wrapping arbitrary state `T`, usable from both sync and
/// async code.
///
/// # Why a closure instead of a guard?
///
/// The only way in is [`with()`], which runs a **synchronous** closure while the lock is
/// held. There is no guard to hold on to, so the lock can't be carried across an
/// `.await` by accident, and a task can never park while holding it. This is what lets
/// [`ResumptionCell`], [`SuspendingQueue`] and [`SubscriptionState`] transitions be
/// called from any context, including from inside a cancellation handler or a
/// [`Drop`] impl.
///
/// | Property                    | [`SafeLock`] | [`tokio::sync::Mutex`] |
/// | :-------------------------- | :----------- | :--------------------- |
/// | Can be held across `.await` | No           | Yes                    |
/// | Usable in [`Drop`]          | Yes          | No (`lock()` is async) |
/// | Cost                        | futex        | semaphore + waker      |
///
/// # Poisoning
///
/// A panic inside [`with()`] poisons the underlying [`StdMutex`]. The state guarded here
/// is always left consistent between statements (each closure does a single
/// `mem::replace` style transition), so the poison flag is ignored and the inner value
/// is recovered instead of propagating the panic to every other holder.
///
/// [`ResumptionCell`]: crate::ResumptionCell
/// [`SubscriptionState`]: crate::SubscriptionState
/// [`SuspendingQueue`]: crate::SuspendingQueue
/// [`with()`]: Self::with
#[derive(Debug, Default)]
pub struct SafeLock<T> {
    inner: StdMutex<T>,
}

impl<T> SafeLock<T> {
    /// This is a `const fn` so it can be used in `static` declarations.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Runs `f` with exclusive access to the state and returns whatever `f` returns.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Consumes the lock, returning the state.
    pub fn into_inner(self) -> T {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> SafeLock<T> {
    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> T { self.with(|it| it.clone()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn with_returns_closure_result() {
        let lock = SafeLock::new(vec![1, 2]);
        let len = lock.with(|it| {
            it.push(3);
            it.len()
        });
        assert_eq!(len, 3);
        assert_eq!(lock.snapshot(), vec![1, 2, 3]);
    }

    #[test]
    fn recovers_after_panic_in_critical_section() {
        let lock = Arc::new(SafeLock::new(0_u32));

        let lock_clone = Arc::clone(&lock);
        let result = thread::spawn(move || {
            lock_clone.with(|it| {
                *it = 7;
                panic!("deliberate panic while holding the lock");
            });
        })
        .join();
        assert!(result.is_err());

        // The state written before the panic is still visible.
        assert_eq!(lock.with(|it| *it), 7);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        const MAX_THREAD_COUNT: usize = 8;
        const INCREMENTS_PER_THREAD: usize = 1_000;

        let lock = Arc::new(SafeLock::new(0_usize));
        let handles: Vec<_> = (0..MAX_THREAD_COUNT)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    for _ in 0..INCREMENTS_PER_THREAD {
                        lock.with(|it| *it += 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(
            Arc::try_unwrap(lock).unwrap().into_inner(),
            MAX_THREAD_COUNT * INCREMENTS_PER_THREAD
        );
    }
}
