// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{bridge_error::Termination, inbound::AttachCell};
use crate::{BridgeError, BridgeId, CancelToken, Completion, Demand, DemandSender,
            SafeLock, Sink, Subscription, TerminalCause};
use std::{fmt::{Debug, Formatter, Result as FmtResult},
          mem,
          sync::{Arc, Weak},
          time::Duration};
use tokio::time::MissedTickBehavior;

/// How often a waiting bridge checks whether its downstream was dropped.
pub const DOWNSTREAM_CHECK_INTERVAL: Duration = Duration::from_millis(25);

/// Where one bridge subscription is in its life.
///
/// ```text
/// AwaitingProducer ──(producer attaches)──────────────────────▶ Active
/// AwaitingProducer ──(cancelled before attach)────────────────▶ Terminal
/// Active ──(finished | failed | cancelled | downstream gone)──▶ Terminal
/// ```
///
/// Once `Terminal`, no demand is forwarded to the producer and no item is delivered
/// downstream.
#[derive(Clone)]
pub enum SubscriptionState {
    AwaitingProducer,
    Active(Arc<dyn Subscription>),
    Terminal(TerminalCause),
}

impl Debug for SubscriptionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::AwaitingProducer => f.write_str("AwaitingProducer"),
            Self::Active(_) => f.write_str("Active"),
            Self::Terminal(cause) => f.debug_tuple("Terminal").field(cause).finish(),
        }
    }
}

/// State shared between a bridge's loop and its [`BridgeHandle`]s.
///
/// [`terminate()`] is the single transition into `Terminal`: whoever calls it first
/// decides the [`TerminalCause`]. It releases the producer right away, but the
/// completion is only parked here. The loop delivers it in [`flush_completion()`] on
/// its way out, so the downstream never sees a completion before (or an item after)
/// the loop's last delivery, and user code is never called with a lock held.
///
/// [`BridgeHandle`]: crate::BridgeHandle
/// [`flush_completion()`]: Self::flush_completion
/// [`terminate()`]: Self::terminate
pub(crate) struct SubscriptionCore<Out> {
    pub id: BridgeId,
    pub cancel_token: CancelToken,
    pub attach_cell: Arc<AttachCell>,
    pub demand_sender: DemandSender,
    downstream: Weak<dyn Sink<Out>>,
    state: SafeLock<SubscriptionState>,
    pending_completion: SafeLock<Option<Completion<BridgeError>>>,
}

impl<Out> SubscriptionCore<Out> {
    pub fn new(
        cancel_token: CancelToken,
        attach_cell: Arc<AttachCell>,
        demand_sender: DemandSender,
        downstream: Weak<dyn Sink<Out>>,
    ) -> Self {
        Self {
            id: BridgeId::next(),
            cancel_token,
            attach_cell,
            demand_sender,
            downstream,
            state: SafeLock::new(SubscriptionState::AwaitingProducer),
            pending_completion: SafeLock::new(None),
        }
    }

    /// `AwaitingProducer -> Active`. Returns `false` if the subscription already ended,
    /// in which case the caller must cancel `subscription` itself.
    pub fn activate(&self, subscription: Arc<dyn Subscription>) -> bool {
        self.state.with(|state| match state {
            SubscriptionState::AwaitingProducer => {
                *state = SubscriptionState::Active(subscription);
                true
            }
            SubscriptionState::Active(_) | SubscriptionState::Terminal(_) => false,
        })
    }

    /// The one transition into `Terminal`. Returns `false` if it already happened.
    pub fn terminate(&self, termination: Termination) -> bool {
        let cause = termination.cause();
        let maybe_previous = self.state.with(|state| match state {
            SubscriptionState::Terminal(_) => None,
            _ => Some(mem::replace(state, SubscriptionState::Terminal(cause))),
        });
        let Some(previous) = maybe_previous else {
            return false;
        };

        tracing::debug!(message = "bridge terminal", bridge_id = %self.id, cause = %cause);

        self.cancel_token.cancel();
        self.demand_sender.close();

        // A producer that attached but was never picked up by the loop.
        if let Some(unused) = self.attach_cell.finish() {
            unused.cancel();
        }
        if let SubscriptionState::Active(subscription) = previous {
            if termination.cancels_producer() {
                subscription.cancel();
            }
        }

        let maybe_completion = termination.into_completion();
        self.pending_completion.with(|it| *it = maybe_completion);
        true
    }

    /// Delivers the parked completion, if any, exactly once.
    pub fn flush_completion(&self) {
        let Some(completion) = self.pending_completion.with(Option::take) else {
            return;
        };
        if let Some(downstream) = self.downstream.upgrade() {
            downstream.receive_completion(completion);
        }
    }

    /// Delivers one item, unless the subscription has ended or the downstream is gone.
    /// Returns the downstream's surplus demand.
    pub fn deliver(&self, item: Out) -> Result<Demand, Termination> {
        if self.cancel_token.is_cancelled() {
            return Err(Termination::Cancelled);
        }
        let downstream = self.downstream.upgrade().ok_or(Termination::DownstreamGone)?;
        Ok(downstream.receive(item))
    }

    pub fn is_downstream_alive(&self) -> bool { self.downstream.strong_count() > 0 }

    /// Resolves once the downstream has been dropped. It is only held weakly and has no
    /// drop hook, so this checks every [`DOWNSTREAM_CHECK_INTERVAL`]. Cancel safe.
    pub async fn downstream_dropped(&self) {
        let mut interval = tokio::time::interval(DOWNSTREAM_CHECK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        while self.is_downstream_alive() {
            interval.tick().await;
        }
    }

    pub fn state(&self) -> SubscriptionState { self.state.snapshot() }

    pub fn terminal_cause(&self) -> Option<TerminalCause> {
        self.state.with(|state| match state {
            SubscriptionState::Terminal(cause) => Some(*cause),
            SubscriptionState::AwaitingProducer | SubscriptionState::Active(_) => None,
        })
    }
}
