// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{CAPACITY_VIOLATION_MSG, CancelToken, ResumptionCell, SafeLock};
use std::{collections::VecDeque,
          fmt::{Debug, Formatter, Result as FmtResult},
          sync::Arc};

/// Unbounded, order preserving, multi-producer / single-consumer queue whose consumer
/// suspends when it is empty.
///
/// - [`submit()`] never suspends and can be called from any context.
/// - [`next()`] is the only suspension point. Exactly one call may be outstanding at a
///   time, a second concurrent call panics with [`CAPACITY_VIOLATION_MSG`].
/// - [`close()`] is idempotent. After it, [`submit()`] returns `false` and [`next()`]
///   returns `None` immediately. Items still pending can be taken with
///   [`drain_buffered()`].
///
/// The suspended consumer parks on a [`ResumptionCell`], so a submit that races with
/// the consumer's cancellation never loses the item: it either reaches the consumer or
/// goes back to the front of the queue.
///
/// [`JobQueue`] is this queue specialized to [`Job`].
///
/// [`Job`]: crate::Job
/// [`JobQueue`]: crate::JobQueue
/// [`close()`]: Self::close
/// [`drain_buffered()`]: Self::drain_buffered
/// [`next()`]: Self::next
/// [`submit()`]: Self::submit
pub struct SuspendingQueue<T> {
    state: SafeLock<QueueState<T>>,
}

struct QueueState<T> {
    pending: VecDeque<T>,
    waiting: Option<Arc<ResumptionCell<T>>>,
    is_closed: bool,
}

enum SubmitAction<T> {
    Rejected(T),
    Queued,
    HandOff(Arc<ResumptionCell<T>>, T),
}

enum NextStart<T> {
    Ready(Option<T>),
    Suspend(Arc<ResumptionCell<T>>),
    AlreadyWaiting,
}

impl<T> SuspendingQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SafeLock::new(QueueState {
                pending: VecDeque::new(),
                waiting: None,
                is_closed: false,
            }),
        }
    }

    /// Enqueues `item`, or hands it directly to the suspended consumer. Returns `false`
    /// (and drops `item`) if the queue is closed.
    pub fn submit(&self, item: T) -> bool {
        let action = self.state.with(|state| {
            if state.is_closed {
                SubmitAction::Rejected(item)
            } else if let Some(cell) = state.waiting.take() {
                SubmitAction::HandOff(cell, item)
            } else {
                state.pending.push_back(item);
                SubmitAction::Queued
            }
        });

        match action {
            SubmitAction::Queued => true,
            SubmitAction::Rejected(item) => {
                drop(item);
                false
            }
            SubmitAction::HandOff(cell, item) => match cell.provide(item) {
                Ok(()) => true,
                // The consumer stopped waiting in the meantime. Nothing can have been
                // queued behind us while `waiting` was set, so the front is correct.
                Err(item) => self.state.with(|state| {
                    if state.is_closed {
                        false
                    } else {
                        state.pending.push_front(item);
                        true
                    }
                }),
            },
        }
    }

    /// Returns the next item in submission order, suspending while the queue is empty.
    ///
    /// Returns `None` once the queue is closed. If `cancel_token` is cancelled while
    /// suspended, this returns `None` and closes the queue.
    ///
    /// # Panics
    ///
    /// Panics with [`CAPACITY_VIOLATION_MSG`] if another call to `next()` is already
    /// suspended on this queue.
    pub async fn next(&self, cancel_token: &CancelToken) -> Option<T> {
        let start = self.state.with(|state| {
            if state.is_closed {
                return NextStart::Ready(None);
            }
            if let Some(item) = state.pending.pop_front() {
                return NextStart::Ready(Some(item));
            }
            if state.waiting.as_ref().is_some_and(|it| !it.is_finished()) {
                return NextStart::AlreadyWaiting;
            }
            let cell = Arc::new(ResumptionCell::new());
            state.waiting = Some(Arc::clone(&cell));
            NextStart::Suspend(cell)
        });

        let cell = match start {
            NextStart::Ready(it) => return it,
            NextStart::AlreadyWaiting => panic!("{CAPACITY_VIOLATION_MSG}"),
            NextStart::Suspend(cell) => cell,
        };

        let _guard = ReclaimOnDrop { queue: self, cell: &cell };
        let maybe_item = cell.consume(cancel_token).await;
        if maybe_item.is_none() {
            self.close();
        }
        maybe_item
    }

    /// Takes everything currently pending, without suspending. Works on a closed queue
    /// too, which is how buffered items are flushed after shutdown.
    pub fn drain_buffered(&self) -> Vec<T> {
        self.state
            .with(|state| state.pending.drain(..).collect())
    }

    /// Closes the queue. Idempotent. A suspended consumer is resumed with `None`.
    /// Pending items stay put until [`drain_buffered()`] takes them.
    ///
    /// [`drain_buffered()`]: Self::drain_buffered
    pub fn close(&self) {
        let maybe_cell = self.state.with(|state| {
            state.is_closed = true;
            state.waiting.take()
        });
        if let Some(cell) = maybe_cell {
            self.reclaim(&cell);
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.state.with(|state| state.is_closed) }

    #[must_use]
    pub fn len(&self) -> usize { self.state.with(|state| state.pending.len()) }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Finishes `cell` and puts back any item that was handed to it but never consumed.
    fn reclaim(&self, cell: &Arc<ResumptionCell<T>>) {
        let maybe_item = cell.finish();
        self.state.with(|state| {
            if state
                .waiting
                .as_ref()
                .is_some_and(|it| Arc::ptr_eq(it, cell))
            {
                state.waiting = None;
            }
            if let Some(item) = maybe_item {
                state.pending.push_front(item);
            }
        });
    }
}

impl<T> Default for SuspendingQueue<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Debug for SuspendingQueue<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let (len, is_waiting, is_closed) = self.state.with(|state| {
            (state.pending.len(), state.waiting.is_some(), state.is_closed)
        });
        f.debug_struct("SuspendingQueue")
            .field("len", &len)
            .field("is_waiting", &is_waiting)
            .field("is_closed", &is_closed)
            .finish()
    }
}

/// Runs when [`SuspendingQueue::next()`] completes or its future is dropped.
struct ReclaimOnDrop<'a, T> {
    queue: &'a SuspendingQueue<T>,
    cell: &'a Arc<ResumptionCell<T>>,
}

impl<T> Drop for ReclaimOnDrop<'_, T> {
    fn drop(&mut self) { self.queue.reclaim(self.cell); }
}
