// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The producer-facing side of a [`Bridge`]. See [`Inbound`].
//!
//! [`Bridge`]: crate::Bridge

use crate::{CancelToken, Completion, Demand, ResumptionCell, Subscriber, Subscription,
            SuspendingQueue};
use std::sync::{Arc,
                atomic::{AtomicBool, Ordering}};

pub(crate) type AttachCell = ResumptionCell<Arc<dyn Subscription>>;

pub(crate) enum InboundEvent<T> {
    Item(T),
    Completion(Completion<miette::Report>),
}

/// What the producer sees as its [`Subscriber`]. It never calls into the bridge's loop
/// directly; it only parks things where the loop will pick them up:
///
/// - The [`Subscription`] goes into the attach cell. One that arrives after the bridge
///   ended (or a second one) is rejected by the cell and cancelled right here.
/// - Items and the completion go into an event queue, in arrival order.
/// - The first completion also trips a latch, so an idle loop (no outstanding demand)
///   notices the producer finished without having to request anything.
pub(crate) struct Inbound<T> {
    attach_cell: Arc<AttachCell>,
    events: SuspendingQueue<InboundEvent<T>>,
    is_completed: AtomicBool,
    completion_latch: CancelToken,
}

impl<T> Inbound<T> {
    pub fn new(attach_cell: Arc<AttachCell>) -> Self {
        Self {
            attach_cell,
            events: SuspendingQueue::new(),
            is_completed: AtomicBool::new(false),
            completion_latch: CancelToken::new(),
        }
    }

    /// Next item or completion, or `None` if `cancel_token` fires first.
    pub async fn next_event(&self, cancel_token: &CancelToken) -> Option<InboundEvent<T>> {
        self.events.next(cancel_token).await
    }

    /// Resolves once the producer has sent its completion.
    pub async fn completed(&self) { self.completion_latch.cancelled().await; }

    /// Takes the producer's completion out of the event queue. Items still queued ahead
    /// of it were never requested, so they are dropped.
    pub fn take_completion(&self) -> Option<Completion<miette::Report>> {
        self.events
            .drain_buffered()
            .into_iter()
            .find_map(|event| match event {
                InboundEvent::Completion(completion) => Some(completion),
                InboundEvent::Item(_) => None,
            })
    }
}

impl<T: Send> Subscriber<T> for Inbound<T> {
    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        if let Err(rejected) = self.attach_cell.provide(subscription) {
            tracing::debug!(message = "cancelling a subscription that attached too late");
            rejected.cancel();
        }
    }

    fn receive(&self, item: T) -> Demand {
        if !self.is_completed.load(Ordering::SeqCst) {
            self.events.submit(InboundEvent::Item(item));
        }
        Demand::NONE
    }

    fn receive_completion(&self, completion: Completion<miette::Report>) {
        if self.is_completed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.events.submit(InboundEvent::Completion(completion));
        self.completion_latch.cancel();
    }
}
