// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The capabilities the [`Bridge`] is written against. Any push-style producer with
//! "request N / cancel" semantics, and any downstream with "receive / complete"
//! semantics, can be plugged in by implementing these.
//!
//! | Trait           | Implemented by                        | Called by               |
//! | :-------------- | :------------------------------------ | :---------------------- |
//! | [`Publisher`]   | the producer                          | the bridge, once        |
//! | [`Subscription`]| the producer, per subscriber          | the bridge's loop       |
//! | [`Subscriber`]  | the bridge (its producer-facing side) | the producer            |
//! | [`Sink`]        | the downstream (eg: [`BridgeStream`]) | the bridge's loop       |
//!
//! [`Bridge`]: crate::Bridge
//! [`BridgeStream`]: crate::BridgeStream

use crate::Demand;
use std::sync::Arc;

/// How a subscription ended.
#[derive(Debug)]
pub enum Completion<E> {
    /// The producer has nothing more to send.
    Finished,
    /// The producer, or a step after it, failed.
    Failed(E),
    /// Someone stopped the subscription. This is a normal ending, not an error.
    Cancelled,
}

impl<E> Completion<E> {
    #[must_use]
    pub fn is_failed(&self) -> bool { matches!(self, Self::Failed(_)) }
}

/// A producer's handle for one subscriber.
///
/// The producer must never send more items than the total demand requested so far,
/// and must not send anything after [`cancel()`]. Both methods are called from async
/// tasks, so they must not block.
///
/// [`cancel()`]: Self::cancel
pub trait Subscription: Send + Sync {
    /// Permits the producer to send `demand` more items.
    fn request(&self, demand: Demand);

    /// Asks the producer to stop. Idempotent.
    fn cancel(&self);
}

/// A push-style producer that only emits what it has been asked for.
pub trait Publisher: Send + 'static {
    type Output: Send + 'static;

    /// Starts a subscription. The producer must call
    /// [`Subscriber::receive_subscription()`] exactly once (now or later), and then
    /// only send as many items as have been requested through that subscription.
    fn subscribe(self, subscriber: Arc<dyn Subscriber<Self::Output>>);
}

/// The producer-facing side of a consumer.
pub trait Subscriber<T>: Send + Sync {
    fn receive_subscription(&self, subscription: Arc<dyn Subscription>);

    /// Receives one item. The return value is extra demand the producer may add to
    /// what was already requested.
    fn receive(&self, item: T) -> Demand;

    fn receive_completion(&self, completion: Completion<miette::Report>);
}

/// The downstream the [`Bridge`] delivers to.
///
/// The bridge only holds a [`Weak`] reference. If the downstream is dropped, the
/// subscription ends with [`TerminalCause::DownstreamGone`] and the producer is
/// cancelled.
///
/// [`Bridge`]: crate::Bridge
/// [`TerminalCause::DownstreamGone`]: crate::TerminalCause::DownstreamGone
/// [`Weak`]: std::sync::Weak
pub trait Sink<T>: Send + Sync {
    /// Receives one (transformed) item. The return value is surplus demand, which the
    /// bridge honors before it reads the next demand token.
    fn receive(&self, item: T) -> Demand;

    /// Called at most once, after the last item.
    fn receive_completion(&self, completion: Completion<crate::BridgeError>);
}
