// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{bridge_error::Termination,
            inbound::{AttachCell, Inbound, InboundEvent},
            subscription_core::SubscriptionCore};
use crate::{BridgeError, BridgeId, CancelToken, Demand, DemandReceiver, Job, Publisher,
            ScopeError, Sink, Subscriber, Subscription, SubscriptionState, TaskScope,
            TerminalCause, Transform, demand_channel, ok};
use std::{fmt::{Debug, Formatter, Result as FmtResult},
          sync::{Arc, Weak}};
use tracing::Instrument;

/// The reactive-to-async bridge: moves items from a demand-driven push [`Publisher`] to
/// a [`Sink`], at exactly the rate the sink asks for.
///
/// # Protocol
///
/// ```text
///           request(n)                    demand token n
/// caller ─────────────▶ BridgeHandle ───────────────────▶ demand buffer
///                                                              │
///   ┌──────────────────────────────────────────────────────────┘
///   ▼  bridge loop (one job in the given TaskScope)
///   while n > 0:
///       n -= 1
///       subscription.request(1) ─────────▶ producer
///       await next item         ◀───────── producer
///       item = transform(item).await        (may suspend or fail)
///       n += sink.receive(item)  ─────────▶ downstream (surplus demand)
/// ```
///
/// 1. **Attach.** The loop subscribes to the publisher and waits for its
///    [`Subscription`] in a [`ResumptionCell`]. Demand requested before that is kept in
///    the demand buffer and replayed once the producer is attached.
/// 2. **Pull.** For every demand token, one single-item request per item, strictly one
///    at a time, in the producer's order. Surplus returned by the sink is honored
///    before the next token is read, so outstanding demand never goes negative and is
///    never dropped.
/// 3. **End.** Exactly one of the [`TerminalCause`]s wins a single state transition.
///    The winner releases the producer (cancelling it unless it ended on its own), and
///    the sink gets at most one [`Sink::receive_completion()`]. No item is delivered
///    after that. A dropped sink counts as [`TerminalCause::DownstreamGone`]: the
///    producer is cancelled and nobody is notified. This is noticed within
///    [`DOWNSTREAM_CHECK_INTERVAL`] even while no demand is outstanding.
///
/// The bridge's cancellation is a child of the scope's, so cancelling the scope ends
/// the bridge too.
///
/// [`DOWNSTREAM_CHECK_INTERVAL`]: crate::DOWNSTREAM_CHECK_INTERVAL
/// [`ResumptionCell`]: crate::ResumptionCell
#[derive(Debug)]
pub struct Bridge;

impl Bridge {
    /// Starts a bridge from `publisher` to `downstream` as a job in `scope`. Nothing is
    /// requested from the producer until demand comes in through the returned
    /// [`BridgeHandle`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Scope`] if `scope` is already cancelled. The publisher is
    /// dropped without being subscribed to.
    pub fn spawn<P, D, Out>(
        publisher: P,
        downstream: &Arc<D>,
        transform: Transform<P::Output, Out>,
        scope: &TaskScope,
    ) -> Result<BridgeHandle, BridgeError>
    where
        P: Publisher,
        D: Sink<Out> + 'static,
        Out: Send + 'static,
    {
        if scope.is_cancelled() {
            return Err(ScopeError::Cancelled.into());
        }

        let downstream: Weak<D> = Arc::downgrade(downstream);
        let downstream: Weak<dyn Sink<Out>> = downstream;
        let attach_cell = Arc::new(AttachCell::new());
        let (demand_sender, demand_rx) = demand_channel();

        let core = Arc::new(SubscriptionCore::new(
            scope.context().cancel_token().child_token(),
            Arc::clone(&attach_cell),
            demand_sender,
            downstream,
        ));

        let bridge_loop = BridgeLoop {
            core: Arc::clone(&core),
            inbound: Arc::new(Inbound::new(attach_cell)),
            maybe_publisher: Some(publisher),
            demand_rx,
            transform,
        };
        let span =
            tracing::debug_span!("bridge", bridge_id = %core.id, scope_id = %scope.id());

        scope.try_launch(Job::new(move |_| {
            async move {
                bridge_loop.run().await;
                ok!()
            }
            .instrument(span)
        }))?;

        Ok(BridgeHandle { control: core })
    }
}

/// Owns everything the loop touches. Dropping it (normally, or because the job was
/// discarded or aborted) ends the subscription and flushes the completion.
struct BridgeLoop<P: Publisher, Out> {
    core: Arc<SubscriptionCore<Out>>,
    inbound: Arc<Inbound<P::Output>>,
    maybe_publisher: Option<P>,
    demand_rx: DemandReceiver,
    transform: Transform<P::Output, Out>,
}

impl<P: Publisher, Out> Drop for BridgeLoop<P, Out> {
    fn drop(&mut self) {
        self.core.terminate(Termination::Cancelled);
        self.core.flush_completion();
    }
}

impl<P: Publisher, Out: Send + 'static> BridgeLoop<P, Out> {
    async fn run(mut self) {
        let termination = self.run_until_terminal().await;
        self.core.terminate(termination);
    }

    async fn run_until_terminal(&mut self) -> Termination {
        let cancel_token = self.core.cancel_token.clone();

        let subscription = match self.attach(&cancel_token).await {
            Ok(it) => it,
            Err(termination) => return termination,
        };

        loop {
            // Idle: wait for demand, for the producer to end on its own, or for the
            // downstream to go away.
            let demand = tokio::select! {
                biased;
                maybe_demand = self.demand_rx.next(&cancel_token) => match maybe_demand {
                    Some(it) => it,
                    None => return Termination::Cancelled,
                },
                () = self.inbound.completed() => return self.producer_completion(),
                () = self.core.downstream_dropped() => return Termination::DownstreamGone,
            };

            tracing::trace!(message = "demand token", demand = %demand);
            if let Err(termination) = self.fulfill(demand, &subscription, &cancel_token).await
            {
                return termination;
            }
        }
    }

    /// Subscribes and waits for the producer's [`Subscription`].
    async fn attach(
        &mut self,
        cancel_token: &CancelToken,
    ) -> Result<Arc<dyn Subscription>, Termination> {
        // The scope may have been cancelled while this job was still queued.
        if cancel_token.is_cancelled() {
            return Err(Termination::Cancelled);
        }
        if let Some(publisher) = self.maybe_publisher.take() {
            let subscriber: Arc<dyn Subscriber<P::Output>> = self.inbound.clone();
            publisher.subscribe(subscriber);
        }

        let attach_cell = Arc::clone(&self.core.attach_cell);
        let maybe_subscription = tokio::select! {
            biased;
            it = attach_cell.consume(cancel_token) => it,
            () = self.inbound.completed() => return Err(self.producer_completion()),
            () = self.core.downstream_dropped() => return Err(Termination::DownstreamGone),
        };

        let subscription = maybe_subscription.ok_or(Termination::Cancelled)?;
        if !self.core.activate(Arc::clone(&subscription)) {
            subscription.cancel();
            return Err(Termination::Cancelled);
        }
        tracing::debug!(message = "producer attached");
        Ok(subscription)
    }

    /// Pulls and delivers the items for one demand token, plus any surplus the
    /// downstream hands back.
    async fn fulfill(
        &mut self,
        demand: Demand,
        subscription: &Arc<dyn Subscription>,
        cancel_token: &CancelToken,
    ) -> Result<(), Termination> {
        let mut outstanding = demand;
        while outstanding.decrement() {
            if !self.core.is_downstream_alive() {
                return Err(Termination::DownstreamGone);
            }
            if cancel_token.is_cancelled() {
                return Err(Termination::Cancelled);
            }

            subscription.request(Demand::max(1));

            let maybe_event = tokio::select! {
                biased;
                it = self.inbound.next_event(cancel_token) => it,
                () = self.core.downstream_dropped() => return Err(Termination::DownstreamGone),
            };
            let item = match maybe_event {
                None => return Err(Termination::Cancelled),
                Some(InboundEvent::Completion(completion)) => {
                    return Err(Termination::from_producer(completion));
                }
                Some(InboundEvent::Item(item)) => item,
            };

            // Not raced against cancellation. If cancelled meanwhile, the result is
            // discarded by `deliver()`.
            let transformed = self
                .transform
                .apply(item)
                .await
                .map_err(Termination::TransformFailed)?;

            let surplus = self.core.deliver(transformed)?;
            if !surplus.is_none() {
                tracing::trace!(message = "surplus demand", surplus = %surplus);
            }
            outstanding += surplus;
        }
        ok!()
    }

    fn producer_completion(&self) -> Termination {
        self.inbound
            .take_completion()
            .map_or(Termination::Cancelled, Termination::from_producer)
    }
}

/// Type-erased control over one running [`Bridge`]. Cheap to clone.
#[derive(Clone)]
pub struct BridgeHandle {
    control: Arc<dyn BridgeControl>,
}

trait BridgeControl: Send + Sync {
    fn id(&self) -> BridgeId;
    fn request(&self, demand: Demand) -> bool;
    fn terminate_with(&self, termination: Termination);
    fn state(&self) -> SubscriptionState;
    fn terminal_cause(&self) -> Option<TerminalCause>;
}

impl<Out: Send + 'static> BridgeControl for SubscriptionCore<Out> {
    fn id(&self) -> BridgeId { self.id }

    fn request(&self, demand: Demand) -> bool {
        self.terminal_cause().is_none() && self.demand_sender.append(demand)
    }

    fn terminate_with(&self, termination: Termination) { self.terminate(termination); }

    fn state(&self) -> SubscriptionState { SubscriptionCore::state(self) }

    fn terminal_cause(&self) -> Option<TerminalCause> {
        SubscriptionCore::terminal_cause(self)
    }
}

impl BridgeHandle {
    #[must_use]
    pub fn id(&self) -> BridgeId { self.control.id() }

    /// Adds demand. Returns `false` if the bridge has ended.
    pub fn request(&self, demand: Demand) -> bool { self.control.request(demand) }

    /// Ends the subscription with [`TerminalCause::Cancelled`], cancelling the
    /// producer. The downstream gets [`Completion::Cancelled`] unless the bridge had
    /// already ended. Idempotent.
    ///
    /// [`Completion::Cancelled`]: crate::Completion::Cancelled
    pub fn cancel(&self) { self.control.terminate_with(Termination::Cancelled); }

    /// Ends the subscription with [`TerminalCause::DownstreamGone`]: the producer is
    /// cancelled and the downstream is not told.
    pub fn detach(&self) { self.control.terminate_with(Termination::DownstreamGone); }

    #[must_use]
    pub fn state(&self) -> SubscriptionState { self.control.state() }

    #[must_use]
    pub fn is_terminal(&self) -> bool { self.terminal_cause().is_some() }

    #[must_use]
    pub fn terminal_cause(&self) -> Option<TerminalCause> { self.control.terminal_cause() }
}

impl Debug for BridgeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BridgeHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
