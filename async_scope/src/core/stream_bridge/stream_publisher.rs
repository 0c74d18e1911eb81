// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{CancelToken, Completion, Demand, DemandReceiver, DemandSender, Job, Publisher,
            Subscriber, Subscription, TaskScope, demand_channel, ok};
use futures_core::Stream;
use futures_util::StreamExt;
use std::{fmt::{Debug, Formatter, Result as FmtResult},
          sync::{Arc,
                 atomic::{AtomicBool, Ordering}}};

/// Any async [`Stream`] as a demand-driven [`Publisher`].
///
/// The stream is polled by a job in `scope`, and only as many times as the subscriber
/// has requested (plus whatever surplus [`Subscriber::receive()`] hands back). The end
/// of the stream is reported as [`Completion::Finished`]. Cancelling the subscription
/// stops the job without a completion. If the scope is cancelled first, the subscriber
/// gets [`Completion::Cancelled`].
pub struct StreamPublisher<S> {
    stream: S,
    scope: TaskScope,
}

impl<S> StreamPublisher<S> {
    pub fn new(stream: S, scope: &TaskScope) -> Self {
        Self {
            stream,
            scope: scope.clone(),
        }
    }
}

impl<S> Debug for StreamPublisher<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StreamPublisher")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl<S> Publisher for StreamPublisher<S>
where
    S: Stream + Send + Unpin + 'static,
    S::Item: Send + 'static,
{
    type Output = S::Item;

    fn subscribe(self, subscriber: Arc<dyn Subscriber<S::Item>>) {
        let (demand_sender, demand_rx) = demand_channel();
        let subscription = Arc::new(StreamSubscription {
            demand_sender,
            cancel_token: self.scope.context().cancel_token().child_token(),
            is_cancelled_by_subscriber: AtomicBool::new(false),
        });
        subscriber.receive_subscription(subscription.clone());

        let drive = StreamDrive {
            stream: self.stream,
            subscriber,
            subscription,
            demand_rx,
            is_completed: false,
        };
        // If the scope refuses the job, dropping it tells the subscriber.
        let was_launched = self.scope.launch(Job::new(move |_| async move {
            drive.run().await;
            ok!()
        }));
        if !was_launched {
            tracing::debug!(
                message = "stream publisher not started, scope is cancelled",
                scope_id = %self.scope.id()
            );
        }
    }
}

struct StreamSubscription {
    demand_sender: DemandSender,
    cancel_token: CancelToken,
    is_cancelled_by_subscriber: AtomicBool,
}

impl Subscription for StreamSubscription {
    fn request(&self, demand: Demand) { self.demand_sender.append(demand); }

    fn cancel(&self) {
        self.is_cancelled_by_subscriber.store(true, Ordering::SeqCst);
        self.cancel_token.cancel();
        self.demand_sender.close();
    }
}

struct StreamDrive<S: Stream> {
    stream: S,
    subscriber: Arc<dyn Subscriber<S::Item>>,
    subscription: Arc<StreamSubscription>,
    demand_rx: DemandReceiver,
    is_completed: bool,
}

impl<S: Stream + Unpin> StreamDrive<S> {
    async fn run(mut self) {
        let cancel_token = self.subscription.cancel_token.clone();

        while let Some(demand) = self.demand_rx.next(&cancel_token).await {
            let mut outstanding = demand;
            while outstanding.decrement() {
                let maybe_item = tokio::select! {
                    biased;
                    () = cancel_token.cancelled() => return,
                    it = self.stream.next() => it,
                };
                let Some(item) = maybe_item else {
                    self.is_completed = true;
                    self.subscriber.receive_completion(Completion::Finished);
                    return;
                };
                outstanding += self.subscriber.receive(item);
            }
        }
    }
}

impl<S: Stream> Drop for StreamDrive<S> {
    fn drop(&mut self) {
        let is_cancelled_by_subscriber = self
            .subscription
            .is_cancelled_by_subscriber
            .load(Ordering::SeqCst);
        if !self.is_completed && !is_cancelled_by_subscriber {
            self.subscriber.receive_completion(Completion::Cancelled);
        }
    }
}
