// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! One-shot resumption of a single suspended caller. See [`ResumptionCell`].

use crate::{CancelToken, SafeLock};
use std::{fmt::{Debug, Formatter, Result as FmtResult},
          mem};
use tokio::sync::oneshot;

/// Panic message for the one fatal precondition in this crate: two consumers suspended
/// on a single-consumer primitive at the same time.
pub const CAPACITY_VIOLATION_MSG: &str = "capacity violation: a second consumer tried \
                                          to wait on a single-consumer primitive while \
                                          another consumer is still suspended";

/// A box holding at most one value and at most one suspended waiter.
///
/// This is the only place in the crate where a task parks waiting for another task to
/// hand it a value. [`SuspendingQueue`] (and so [`JobQueue`]) and the [`Bridge`]'s
/// producer attachment are built on it.
///
/// # States
///
/// ```text
///             provide(v)                consume()
///   Waiting ─────────────▶ Cached(v) ─────────────▶ Finished  (returns v)
///      │
///      │ consume()                      provide(v)
///      └──────────────▶ Suspended(tx) ─────────────▶ Finished  (waiter gets v)
///                           │
///                           │ cancel / finish() / consumer dropped
///                           └──────────────────────▶ Finished  (waiter gets None)
/// ```
///
/// | Operation    | `Waiting`          | `Cached`        | `Suspended`          | `Finished`       |
/// | :----------- | :----------------- | :-------------- | :------------------- | :--------------- |
/// | [`provide`]  | cache              | reject          | resume waiter        | reject           |
/// | [`consume`]  | suspend            | take value      | capacity violation   | `None` now       |
/// | [`finish`]   | finish             | finish, return  | resume with `None`   | no-op            |
///
/// # Rejected values
///
/// [`provide()`] hands a rejected value back as `Err(value)` rather than dropping it, so
/// the caller can release whatever it represents (eg: cancel a [`Subscription`] that
/// attached too late, or put a [`Job`] back in its queue).
///
/// # Cancellation
///
/// [`consume()`] races the wait against a [`CancelToken`]. If the token wins, the cell
/// moves to `Finished` and the caller gets `None`. If the consuming future is dropped
/// while suspended, the cell also moves to `Finished`, unless a value had already been
/// handed over, in which case that value is put back as `Cached` so its owner can
/// reclaim it with [`finish()`].
///
/// [`Bridge`]: crate::Bridge
/// [`JobQueue`]: crate::JobQueue
/// [`Job`]: crate::Job
/// [`Subscription`]: crate::Subscription
/// [`SuspendingQueue`]: crate::SuspendingQueue
/// [`consume()`]: Self::consume
/// [`consume`]: Self::consume
/// [`finish()`]: Self::finish
/// [`finish`]: Self::finish
/// [`provide()`]: Self::provide
/// [`provide`]: Self::provide
pub struct ResumptionCell<T> {
    state: SafeLock<CellState<T>>,
}

enum CellState<T> {
    Waiting,
    Cached(T),
    Suspended(oneshot::Sender<Option<T>>),
    Finished,
}

enum ConsumeStart<T> {
    Ready(Option<T>),
    Suspend(oneshot::Receiver<Option<T>>),
    AlreadySuspended,
}

enum ConsumeOutcome<T> {
    Resumed(Option<T>),
    Cancelled,
}

impl<T> ResumptionCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SafeLock::new(CellState::Waiting),
        }
    }

    /// Hands `value` to the suspended waiter, or caches it if nobody is waiting yet.
    ///
    /// # Errors
    ///
    /// Returns `Err(value)` if the cell already holds a value or is finished. The value
    /// is handed back so the caller can release it.
    pub fn provide(&self, value: T) -> Result<(), T> {
        let maybe_sender = self.state.with(|state| {
            match mem::replace(state, CellState::Finished) {
                CellState::Waiting => {
                    *state = CellState::Cached(value);
                    Ok(None)
                }
                CellState::Suspended(sender) => Ok(Some((sender, value))),
                it @ (CellState::Cached(_) | CellState::Finished) => {
                    *state = it;
                    Err(value)
                }
            }
        })?;

        // Resume the waiter outside the lock.
        match maybe_sender {
            None => Ok(()),
            Some((sender, value)) => match sender.send(Some(value)) {
                Ok(()) => Ok(()),
                // The waiter went away between suspending and now.
                Err(Some(value)) => Err(value),
                Err(None) => Ok(()),
            },
        }
    }

    /// Takes the cached value, or suspends until one is provided.
    ///
    /// Returns `None` if the cell is finished, or becomes finished while suspended, or if
    /// `cancel_token` is cancelled while suspended.
    ///
    /// # Panics
    ///
    /// Panics with [`CAPACITY_VIOLATION_MSG`] if another consumer is already suspended on
    /// this cell. This is a programming error, not a recoverable condition.
    pub async fn consume(&self, cancel_token: &CancelToken) -> Option<T> {
        let start = self.state.with(|state| {
            match mem::replace(state, CellState::Finished) {
                CellState::Cached(value) => ConsumeStart::Ready(Some(value)),
                CellState::Finished => ConsumeStart::Ready(None),
                CellState::Waiting => {
                    let (sender, receiver) = oneshot::channel();
                    *state = CellState::Suspended(sender);
                    ConsumeStart::Suspend(receiver)
                }
                it @ CellState::Suspended(_) => {
                    *state = it;
                    ConsumeStart::AlreadySuspended
                }
            }
        });

        let receiver = match start {
            ConsumeStart::Ready(it) => return it,
            ConsumeStart::AlreadySuspended => panic!("{CAPACITY_VIOLATION_MSG}"),
            ConsumeStart::Suspend(receiver) => receiver,
        };

        let mut guard = SuspendedConsumer {
            cell: self,
            receiver,
            is_done: false,
        };

        let outcome = tokio::select! {
            biased;
            result = &mut guard.receiver => ConsumeOutcome::Resumed(result.ok().flatten()),
            () = cancel_token.cancelled() => ConsumeOutcome::Cancelled,
        };
        guard.is_done = true;

        match outcome {
            ConsumeOutcome::Resumed(it) => it,
            ConsumeOutcome::Cancelled => {
                // Any cached value can't exist here (we were suspended), so the return
                // value of `finish()` is always `None`.
                drop(self.finish());
                // A provider may have won the race and already handed over a value.
                // After close(), one that is still mid-send fails and keeps its value.
                guard.receiver.close();
                guard.receiver.try_recv().ok().flatten()
            }
        }
    }

    /// Moves the cell to `Finished`. A suspended waiter is resumed with `None`. A cached
    /// value is returned so the caller can release it. Idempotent.
    pub fn finish(&self) -> Option<T> {
        match self.state.with(|state| mem::replace(state, CellState::Finished)) {
            CellState::Cached(value) => Some(value),
            CellState::Suspended(sender) => {
                drop(sender.send(None));
                None
            }
            CellState::Waiting | CellState::Finished => None,
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state
            .with(|state| matches!(state, CellState::Finished))
    }
}

impl<T> Default for ResumptionCell<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Debug for ResumptionCell<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let state = self.state.with(|state| match state {
            CellState::Waiting => "Waiting",
            CellState::Cached(_) => "Cached",
            CellState::Suspended(_) => "Suspended",
            CellState::Finished => "Finished",
        });
        f.debug_struct("ResumptionCell")
            .field("state", &state)
            .finish()
    }
}

/// Restores the cell to a consistent state if a suspended [`consume()`] future is
/// dropped before it completes.
///
/// [`consume()`]: ResumptionCell::consume
struct SuspendedConsumer<'a, T> {
    cell: &'a ResumptionCell<T>,
    receiver: oneshot::Receiver<Option<T>>,
    is_done: bool,
}

impl<T> Drop for SuspendedConsumer<'_, T> {
    fn drop(&mut self) {
        if self.is_done {
            return;
        }

        // After close(), a racing provide() fails and keeps its value.
        self.receiver.close();
        let maybe_value = self.receiver.try_recv().ok().flatten();

        self.cell.state.with(|state| match maybe_value {
            Some(value) => *state = CellState::Cached(value),
            None => *state = CellState::Finished,
        });
    }
}
