// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! End to end tests for [`Bridge`], [`BridgeStream`] and [`StreamPublisher`].
//!
//! - **Group A**: demand accounting (one request per item, surplus, replay).
//! - **Group B**: terminal causes (the first one wins, delivered at most once).
//! - **Group C**: [`BridgeStream`] and [`StreamPublisher`].

use crate::{AtomicU64Ext, Bridge, BridgeError, BridgeStream, Completion, Demand,
            Publisher, PublisherTerminal, RecordedCompletion, RecordingPublisher,
            RecordingSink, SafeLock, ScopeConfig, ScopeError, StreamPublisher, Subscriber,
            Subscription, SubscriptionState, TaskScope, TerminalCause, Transform,
            assert_eq2};
use futures_util::{StreamExt, stream};
use std::{collections::VecDeque,
          sync::{Arc, atomic::AtomicU64},
          time::Duration};
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(2);
const SETTLE: Duration = Duration::from_millis(50);

fn new_scope(name: &'static str) -> TaskScope {
    TaskScope::try_new(ScopeConfig::default().with_name(name)).unwrap()
}

async fn eventually(predicate: impl Fn() -> bool) {
    timeout(WAIT, async {
        while !predicate() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

// Group A.

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demand_of_two_then_three_pulls_exactly_five_single_items() {
    let scope = new_scope("two_then_three");
    let publisher = RecordingPublisher::new(vec![1, 2, 3, 4, 5]);
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::default());
    let handle = Bridge::spawn(publisher, &sink, Transform::identity(), &scope).unwrap();

    assert!(handle.request(Demand::max(2)));
    timeout(WAIT, sink.wait_for_item_count(2)).await.unwrap();
    assert_eq2!(sink.items(), vec![1, 2]);
    assert_eq2!(stats.request_calls(), 2);

    assert!(handle.request(Demand::max(3)));
    timeout(WAIT, sink.wait_for_completion()).await.unwrap();

    assert_eq2!(sink.items(), vec![1, 2, 3, 4, 5]);
    assert_eq2!(stats.request_calls(), 5);
    assert!(stats.requests().iter().all(|it| *it == Demand::max(1)));
    assert_eq2!(sink.completions(), vec![RecordedCompletion::Finished]);
    assert_eq2!(stats.cancel_calls(), 0);
    assert_eq2!(handle.terminal_cause(), Some(TerminalCause::Finished));
    assert!(!handle.request(Demand::max(1)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn surplus_from_downstream_is_honored_and_nothing_more() {
    let scope = new_scope("surplus");
    let publisher = RecordingPublisher::new((1..=10).collect())
        .with_terminal(PublisherTerminal::Never);
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::with_surplus([Demand::max(2)]));
    let handle = Bridge::spawn(publisher, &sink, Transform::identity(), &scope).unwrap();

    assert!(handle.request(Demand::max(1)));
    timeout(WAIT, sink.wait_for_item_count(3)).await.unwrap();
    sleep(SETTLE).await;

    // 1 requested + 2 surplus, never more.
    assert_eq2!(sink.items(), vec![1, 2, 3]);
    assert_eq2!(stats.request_calls(), 3);
    assert_eq2!(stats.emitted(), 3);
    assert!(sink.completions().is_empty());

    handle.cancel();
    timeout(WAIT, sink.wait_for_completion()).await.unwrap();
    assert_eq2!(sink.completions(), vec![RecordedCompletion::Cancelled]);
    assert_eq2!(stats.cancel_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demand_before_attach_is_replayed() {
    let scope = new_scope("replay");
    let publisher =
        RecordingPublisher::new(vec!['a', 'b', 'c']).with_attach_delay(SETTLE);
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::default());
    let handle = Bridge::spawn(publisher, &sink, Transform::identity(), &scope).unwrap();

    assert!(matches!(handle.state(), SubscriptionState::AwaitingProducer));
    assert!(handle.request(Demand::max(1)));
    assert!(handle.request(Demand::max(2)));

    timeout(WAIT, sink.wait_for_completion()).await.unwrap();
    assert_eq2!(sink.items(), vec!['a', 'b', 'c']);
    assert_eq2!(stats.request_calls(), 3);
    assert_eq2!(sink.completions(), vec![RecordedCompletion::Finished]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transform_sees_items_in_producer_order() {
    let scope = new_scope("transform_order");
    let publisher = RecordingPublisher::new(vec![3_u64, 1, 2]);
    let sink = Arc::new(RecordingSink::default());
    let transform = Transform::new(|it: u64| async move {
        // Later items finish sooner, which must not reorder them.
        sleep(Duration::from_millis(10 * it)).await;
        Ok(it.to_string())
    });
    let handle = Bridge::spawn(publisher, &sink, transform, &scope).unwrap();

    assert!(handle.request(Demand::Unlimited));
    timeout(WAIT, sink.wait_for_completion()).await.unwrap();
    assert_eq2!(sink.items(), vec!["3", "1", "2"]);
}

// Group B.

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transform_failure_is_delivered_once_and_cancels_producer() {
    let scope = new_scope("transform_failure");
    let publisher = RecordingPublisher::new(vec![1, 2, 3])
        .with_terminal(PublisherTerminal::Never);
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::default());
    let transform = Transform::new(|it: i32| async move {
        if it == 2 {
            Err(miette::miette!("boom on {it}"))
        } else {
            Ok(it)
        }
    });
    let handle = Bridge::spawn(publisher, &sink, transform, &scope).unwrap();

    assert!(handle.request(Demand::max(3)));
    timeout(WAIT, sink.wait_for_completion()).await.unwrap();
    sleep(SETTLE).await;

    assert_eq2!(sink.items(), vec![1]);
    let completions = sink.completions();
    assert_eq2!(completions.len(), 1);
    assert!(
        matches!(&completions[0], RecordedCompletion::Failed(msg) if msg.contains("boom on 2"))
    );
    assert_eq2!(stats.cancel_calls(), 1);
    assert_eq2!(handle.terminal_cause(), Some(TerminalCause::Failed));
    assert!(!handle.request(Demand::max(1)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn producer_failure_is_delivered_without_cancelling_producer() {
    let scope = new_scope("producer_failure");
    let publisher = RecordingPublisher::new(vec![1])
        .with_terminal(PublisherTerminal::Fail("disk on fire".to_owned()));
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::default());
    let handle = Bridge::spawn(publisher, &sink, Transform::identity(), &scope).unwrap();

    assert!(handle.request(Demand::max(5)));
    timeout(WAIT, sink.wait_for_completion()).await.unwrap();

    assert_eq2!(sink.items(), vec![1]);
    assert!(matches!(
        &sink.completions()[..],
        [RecordedCompletion::Failed(msg)] if msg.contains("disk on fire")
    ));
    assert_eq2!(stats.cancel_calls(), 0);
    assert_eq2!(handle.terminal_cause(), Some(TerminalCause::Failed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn idle_bridge_notices_producer_completion() {
    let scope = new_scope("empty_producer");
    let publisher = RecordingPublisher::<u8>::new(vec![]);
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::default());
    let handle = Bridge::spawn(publisher, &sink, Transform::identity(), &scope).unwrap();

    // No demand at all.
    timeout(WAIT, sink.wait_for_completion()).await.unwrap();
    assert_eq2!(sink.completions(), vec![RecordedCompletion::Finished]);
    assert_eq2!(stats.request_calls(), 0);
    assert!(handle.is_terminal());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancels_deliver_a_single_completion() {
    let scope = new_scope("concurrent_cancel");
    let publisher = RecordingPublisher::new((0..1_000).collect())
        .with_terminal(PublisherTerminal::Never);
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::<u32>::default());
    let handle = Bridge::spawn(publisher, &sink, Transform::identity(), &scope).unwrap();

    assert!(handle.request(Demand::Unlimited));
    timeout(WAIT, sink.wait_for_item_count(10)).await.unwrap();

    let mut cancellers = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let handle = handle.clone();
        cancellers.spawn(async move { handle.cancel() });
    }
    while cancellers.join_next().await.is_some() {}

    timeout(WAIT, sink.wait_for_completion()).await.unwrap();
    sleep(SETTLE).await;

    let delivered = sink.item_count();
    assert_eq2!(sink.completions(), vec![RecordedCompletion::Cancelled]);
    assert_eq2!(stats.cancel_calls(), 1);
    sleep(SETTLE).await;
    assert_eq2!(sink.item_count(), delivered);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subscription_that_attaches_after_cancel_is_cancelled() {
    let scope = new_scope("late_attach");
    let publisher = RecordingPublisher::new(vec![1, 2, 3])
        .with_terminal(PublisherTerminal::Never)
        .with_attach_delay(Duration::from_millis(200));
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::default());
    let handle = Bridge::spawn(publisher, &sink, Transform::identity(), &scope).unwrap();

    // Let the loop subscribe, then cancel while it still waits for the producer.
    sleep(SETTLE).await;
    assert!(matches!(handle.state(), SubscriptionState::AwaitingProducer));
    handle.cancel();
    timeout(WAIT, sink.wait_for_completion()).await.unwrap();
    assert_eq2!(sink.completions(), vec![RecordedCompletion::Cancelled]);

    eventually(|| stats.cancel_calls() == 1).await;
    assert_eq2!(stats.request_calls(), 0);
    assert!(sink.items().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_downstream_cancels_producer() {
    let scope = new_scope("downstream_gone");
    let publisher = RecordingPublisher::new(vec![1, 2, 3])
        .with_terminal(PublisherTerminal::Never);
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::default());
    let handle = Bridge::spawn(publisher, &sink, Transform::identity(), &scope).unwrap();

    assert!(handle.request(Demand::max(1)));
    timeout(WAIT, sink.wait_for_item_count(1)).await.unwrap();
    drop(sink);

    // Noticed on the next pull at the latest.
    handle.request(Demand::max(1));
    eventually(|| stats.cancel_calls() == 1).await;
    assert_eq2!(handle.terminal_cause(), Some(TerminalCause::DownstreamGone));
    assert_eq2!(stats.emitted(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn idle_bridge_notices_dropped_downstream() {
    let scope = new_scope("downstream_gone_idle");
    let publisher = RecordingPublisher::new(vec![1, 2, 3])
        .with_terminal(PublisherTerminal::Never);
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::default());
    let handle = Bridge::spawn(publisher, &sink, Transform::identity(), &scope).unwrap();

    assert!(handle.request(Demand::max(1)));
    timeout(WAIT, sink.wait_for_item_count(1)).await.unwrap();
    drop(sink);

    // No further demand.
    eventually(|| stats.cancel_calls() == 1).await;
    assert_eq2!(handle.terminal_cause(), Some(TerminalCause::DownstreamGone));
    assert!(!handle.request(Demand::max(1)));
    assert_eq2!(stats.request_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn downstream_dropped_before_attach_cancels_late_producer() {
    let scope = new_scope("downstream_gone_before_attach");
    let publisher = RecordingPublisher::new(vec![1, 2, 3])
        .with_terminal(PublisherTerminal::Never)
        .with_attach_delay(Duration::from_millis(200));
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::<i32>::default());
    let handle = Bridge::spawn(publisher, &sink, Transform::identity(), &scope).unwrap();

    sleep(SETTLE).await;
    drop(sink);

    eventually(|| handle.terminal_cause() == Some(TerminalCause::DownstreamGone)).await;
    eventually(|| stats.cancel_calls() == 1).await;
    assert_eq2!(stats.request_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelling_the_scope_ends_the_bridge() {
    let scope = new_scope("scope_cancel");
    let publisher = RecordingPublisher::new(vec![1, 2, 3])
        .with_terminal(PublisherTerminal::Never);
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::<i32>::default());
    let handle = Bridge::spawn(publisher, &sink, Transform::identity(), &scope).unwrap();
    eventually(|| matches!(handle.state(), SubscriptionState::Active(_))).await;

    scope.cancel();
    timeout(WAIT, sink.wait_for_completion()).await.unwrap();
    assert_eq2!(sink.completions(), vec![RecordedCompletion::Cancelled]);
    assert_eq2!(stats.cancel_calls(), 1);
    timeout(WAIT, scope.await_shutdown()).await.unwrap();
}

#[tokio::test]
async fn spawn_on_cancelled_scope_fails() {
    let scope = new_scope("already_cancelled");
    scope.cancel();

    let publisher = RecordingPublisher::new(vec![1]);
    let stats = publisher.stats();
    let sink = Arc::new(RecordingSink::<i32>::default());
    let result = Bridge::spawn(publisher, &sink, Transform::identity(), &scope);

    assert!(matches!(
        result,
        Err(BridgeError::Scope(ScopeError::Cancelled))
    ));
    assert_eq2!(stats.request_calls(), 0);
    assert!(sink.completions().is_empty());
}

// Group C.

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bridge_stream_over_stream_publisher() {
    let scope = new_scope("end_to_end");
    let publisher = StreamPublisher::new(stream::iter(1..=3), &scope);
    let mut numbers =
        BridgeStream::try_new_in(publisher, Transform::map(|it: i32| it * 10), &scope)
            .unwrap();

    assert_eq2!(numbers.try_next().await.unwrap(), Some(10));
    assert_eq2!(numbers.try_next().await.unwrap(), Some(20));
    assert_eq2!(numbers.try_next().await.unwrap(), Some(30));
    assert_eq2!(numbers.try_next().await.unwrap(), None);
    assert_eq2!(numbers.next().await, None);
    assert!(numbers.is_done());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bridge_stream_reports_failure_once() {
    let publisher = RecordingPublisher::new(vec!["1", "two", "3"]);
    let mut numbers = BridgeStream::try_new(
        publisher,
        Transform::new(|it: &'static str| async move {
            it.parse::<u8>()
                .map_err(|err| miette::miette!("can't parse {it}: {err}"))
        }),
    )
    .unwrap();

    assert_eq2!(numbers.try_next().await.unwrap(), Some(1));
    let err = numbers.try_next().await.unwrap_err();
    assert!(matches!(err, BridgeError::TransformFailure(_)));
    assert!(err.to_string().contains("can't parse two"));
    assert_eq2!(numbers.try_next().await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bridge_stream_next_swallows_failure() {
    let publisher = RecordingPublisher::<u8>::new(vec![7])
        .with_terminal(PublisherTerminal::Fail("gone".to_owned()));
    let mut numbers = BridgeStream::try_new(publisher, Transform::identity()).unwrap();

    assert_eq2!(numbers.next().await, Some(7));
    assert_eq2!(numbers.next().await, None);
    assert_eq2!(numbers.next().await, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bridge_stream_issues_one_request_per_next() {
    let publisher = RecordingPublisher::new((1..=10).collect::<Vec<u32>>())
        .with_terminal(PublisherTerminal::Never);
    let stats = publisher.stats();
    let mut numbers = BridgeStream::try_new(publisher, Transform::identity()).unwrap();

    assert_eq2!(numbers.next().await, Some(1));
    assert_eq2!(numbers.next().await, Some(2));
    sleep(SETTLE).await;
    assert_eq2!(stats.request_calls(), 2);
    assert_eq2!(stats.emitted(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_bridge_stream_cancels_producer() {
    let publisher = RecordingPublisher::new(vec![1, 2, 3])
        .with_terminal(PublisherTerminal::Never);
    let stats = publisher.stats();
    let mut numbers = BridgeStream::try_new(publisher, Transform::identity()).unwrap();

    assert_eq2!(numbers.next().await, Some(1));
    drop(numbers);

    eventually(|| stats.cancel_calls() == 1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bridge_stream_cancel_ends_stream() {
    let publisher = RecordingPublisher::new(vec![1, 2, 3])
        .with_terminal(PublisherTerminal::Never);
    let stats = publisher.stats();
    let mut numbers = BridgeStream::try_new(publisher, Transform::identity()).unwrap();

    assert_eq2!(numbers.next().await, Some(1));
    numbers.cancel();
    numbers.cancel();
    assert_eq2!(numbers.next().await, None);
    assert_eq2!(stats.cancel_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bridge_stream_reports_bridge_state() {
    let publisher = RecordingPublisher::new(vec![1, 2, 3])
        .with_terminal(PublisherTerminal::Never);
    let mut numbers = BridgeStream::try_new(publisher, Transform::identity()).unwrap();

    assert_eq2!(numbers.next().await, Some(1));
    assert!(matches!(numbers.state(), SubscriptionState::Active(_)));
    assert_eq2!(numbers.terminal_cause(), None);

    numbers.cancel();
    assert_eq2!(numbers.terminal_cause(), Some(TerminalCause::Cancelled));
    assert_eq2!(timeout(WAIT, numbers.next()).await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pending_next_ends_when_scope_is_cancelled() {
    let scope = new_scope("pending_next");
    let publisher = RecordingPublisher::<u8>::new(vec![])
        .with_terminal(PublisherTerminal::Never);
    let mut numbers = BridgeStream::try_new_in(publisher, Transform::identity(), &scope)
        .unwrap();

    let canceller = {
        let scope = scope.clone();
        tokio::spawn(async move {
            sleep(SETTLE).await;
            scope.cancel();
        })
    };

    assert_eq2!(timeout(WAIT, numbers.next()).await.unwrap(), None);
    assert!(numbers.is_done());
    assert_eq2!(numbers.terminal_cause(), Some(TerminalCause::Cancelled));
    canceller.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bridge_stream_is_a_stream() {
    let scope = new_scope("as_stream");
    let publisher = StreamPublisher::new(stream::iter(vec!["a", "b"]), &scope);
    let numbers = BridgeStream::try_new_in(publisher, Transform::identity(), &scope).unwrap();

    let results: Vec<Result<&str, BridgeError>> = numbers.collect().await;
    let letters: Vec<&str> = results.into_iter().map(Result::unwrap).collect();
    assert_eq2!(letters, vec!["a", "b"]);
}

/// A [`Subscriber`] driven by hand, to exercise [`StreamPublisher`] on its own.
#[derive(Default)]
struct ManualSubscriber {
    maybe_subscription: SafeLock<Option<Arc<dyn Subscription>>>,
    items: SafeLock<Vec<u32>>,
    surplus: SafeLock<VecDeque<Demand>>,
    completions: SafeLock<Vec<RecordedCompletion>>,
}

impl ManualSubscriber {
    fn request(&self, demand: Demand) {
        let maybe_subscription = self.maybe_subscription.with(|it| it.clone());
        if let Some(subscription) = maybe_subscription {
            subscription.request(demand);
        }
    }

    fn cancel(&self) {
        let maybe_subscription = self.maybe_subscription.with(|it| it.clone());
        if let Some(subscription) = maybe_subscription {
            subscription.cancel();
        }
    }

    fn items(&self) -> Vec<u32> { self.items.snapshot() }

    fn completions(&self) -> Vec<RecordedCompletion> { self.completions.snapshot() }
}

impl Subscriber<u32> for ManualSubscriber {
    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        self.maybe_subscription.with(|it| *it = Some(subscription));
    }

    fn receive(&self, item: u32) -> Demand {
        self.items.with(|it| it.push(item));
        self.surplus
            .with(|it| it.pop_front())
            .unwrap_or(Demand::NONE)
    }

    fn receive_completion(&self, completion: Completion<miette::Report>) {
        let recorded = match completion {
            Completion::Finished => RecordedCompletion::Finished,
            Completion::Failed(report) => RecordedCompletion::Failed(report.to_string()),
            Completion::Cancelled => RecordedCompletion::Cancelled,
        };
        self.completions.with(|it| it.push(recorded));
    }
}

fn counted_stream(
    range: std::ops::RangeInclusive<u32>,
    pulled: &Arc<AtomicU64>,
) -> impl futures_core::Stream<Item = u32> + Unpin + Send + 'static {
    let pulled = Arc::clone(pulled);
    stream::iter(range).inspect(move |_| {
        pulled.increment();
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stream_publisher_pulls_exactly_requested_plus_surplus() {
    let scope = new_scope("stream_publisher_surplus");
    let pulled = Arc::new(AtomicU64::new(0));
    let subscriber = Arc::new(ManualSubscriber::default());
    subscriber.surplus.with(|it| it.push_back(Demand::max(2)));

    let subscriber_dyn: Arc<dyn Subscriber<u32>> = subscriber.clone();
    StreamPublisher::new(counted_stream(1..=100, &pulled), &scope)
        .subscribe(subscriber_dyn);

    subscriber.request(Demand::max(2));
    eventually(|| subscriber.items().len() == 4).await;
    sleep(SETTLE).await;

    // 2 requested, plus 2 surplus returned by the first item.
    assert_eq2!(subscriber.items(), vec![1, 2, 3, 4]);
    assert_eq2!(pulled.get(), 4);

    // Cancelling stops silently.
    subscriber.cancel();
    subscriber.request(Demand::max(5));
    sleep(SETTLE).await;
    assert_eq2!(pulled.get(), 4);
    assert!(subscriber.completions().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stream_publisher_reports_end_and_scope_cancel() {
    let scope = new_scope("stream_publisher_end");
    let pulled = Arc::new(AtomicU64::new(0));

    let finished = Arc::new(ManualSubscriber::default());
    let finished_dyn: Arc<dyn Subscriber<u32>> = finished.clone();
    StreamPublisher::new(counted_stream(1..=2, &pulled), &scope).subscribe(finished_dyn);
    finished.request(Demand::Unlimited);
    eventually(|| !finished.completions().is_empty()).await;
    assert_eq2!(finished.items(), vec![1, 2]);
    assert_eq2!(finished.completions(), vec![RecordedCompletion::Finished]);

    let idle = Arc::new(ManualSubscriber::default());
    let idle_dyn: Arc<dyn Subscriber<u32>> = idle.clone();
    StreamPublisher::new(counted_stream(1..=2, &pulled), &scope).subscribe(idle_dyn);
    scope.cancel();
    eventually(|| !idle.completions().is_empty()).await;
    assert_eq2!(idle.completions(), vec![RecordedCompletion::Cancelled]);
    assert!(idle.items().is_empty());
}
