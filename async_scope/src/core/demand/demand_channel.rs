// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Demand Token Buffer. See [`demand_channel()`].

use crate::{CancelToken, Demand, SafeLock};
use futures_core::Stream;
use std::{pin::Pin,
          sync::Arc,
          task::{Context, Poll}};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Creates an unbounded buffer of [`Demand`] tokens.
///
/// - [`DemandSender`] is cheap to clone and never suspends. Any number of clones can
///   [`append()`] from any context.
/// - [`DemandReceiver`] is the single consumer. It is not [`Clone`], so "one consumer at
///   a time" is enforced by ownership rather than by a runtime check. Pull from it with
///   [`DemandReceiver::next()`] or through its [`Stream`] impl.
///
/// Tokens are delivered in the order they were appended. Each token is delivered as
/// is; the receiver never coalesces them, so a consumer loop sees exactly the sequence
/// `append(2), append(3)` as `2` then `3`.
///
/// [`append()`]: DemandSender::append
#[must_use]
pub fn demand_channel() -> (DemandSender, DemandReceiver) {
    let (tx, rx) = unbounded_channel();
    let sender = DemandSender {
        slot: Arc::new(SafeLock::new(Some(tx))),
    };
    let receiver = DemandReceiver { rx };
    (sender, receiver)
}

/// Producer side of [`demand_channel()`].
#[derive(Debug, Clone)]
pub struct DemandSender {
    /// `None` once closed. Shared by every clone so that one [`close()`] closes them all.
    ///
    /// [`close()`]: Self::close
    slot: Arc<SafeLock<Option<UnboundedSender<Demand>>>>,
}

impl DemandSender {
    /// Adds `demand` to the buffer. Returns `false` if the buffer is closed (or the
    /// receiver is gone). Zero demand is accepted and not forwarded.
    pub fn append(&self, demand: Demand) -> bool {
        self.slot.with(|slot| match slot {
            None => false,
            Some(tx) if demand.is_none() => !tx.is_closed(),
            Some(tx) => tx.send(demand).is_ok(),
        })
    }

    /// Ends iteration on the receiving side once it has drained what was already
    /// appended. Idempotent.
    pub fn close(&self) { drop(self.slot.with(Option::take)); }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.slot
            .with(|slot| slot.as_ref().is_none_or(UnboundedSender::is_closed))
    }
}

/// Consumer side of [`demand_channel()`].
#[derive(Debug)]
pub struct DemandReceiver {
    rx: UnboundedReceiver<Demand>,
}

impl DemandReceiver {
    /// Waits for the next demand token.
    ///
    /// Returns `None` when the buffer is closed and drained, or right away when
    /// `cancel_token` is cancelled. Cancel safe.
    pub async fn next(&mut self, cancel_token: &CancelToken) -> Option<Demand> {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => None,
            maybe_demand = self.rx.recv() => maybe_demand,
        }
    }
}

impl Stream for DemandReceiver {
    type Item = Demand;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Demand>> {
        self.rx.poll_recv(cx)
    }
}
