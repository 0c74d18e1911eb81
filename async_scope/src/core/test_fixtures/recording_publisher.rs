// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{AtomicU64Ext, Completion, Demand, Publisher, SafeLock, Subscriber,
            Subscription};
use std::{collections::VecDeque,
          sync::{Arc, atomic::AtomicU64},
          time::Duration};

/// How a [`RecordingPublisher`] ends once its items run out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublisherTerminal {
    Finish,
    Fail(String),
    /// Never completes. Only a cancel ends it.
    Never,
}

/// What a [`RecordingPublisher`]'s subscription was asked to do. Shared, so it can be
/// inspected after the publisher has been moved into a bridge.
#[derive(Debug, Default)]
pub struct PublisherStats {
    request_calls: AtomicU64,
    cancel_calls: AtomicU64,
    emitted: AtomicU64,
    requests: SafeLock<Vec<Demand>>,
}

impl PublisherStats {
    #[must_use]
    pub fn request_calls(&self) -> u64 { self.request_calls.get() }

    #[must_use]
    pub fn cancel_calls(&self) -> u64 { self.cancel_calls.get() }

    #[must_use]
    pub fn emitted(&self) -> u64 { self.emitted.get() }

    /// Every demand passed to `request()`, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<Demand> { self.requests.snapshot() }
}

/// A well-behaved push producer over a fixed list of items. It emits synchronously from
/// inside `request()`, never more than requested, and completes as soon as the items
/// run out (right on subscribe if there are none).
#[derive(Debug)]
pub struct RecordingPublisher<T> {
    items: Vec<T>,
    terminal: PublisherTerminal,
    maybe_attach_delay: Option<Duration>,
    stats: Arc<PublisherStats>,
}

impl<T> RecordingPublisher<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            terminal: PublisherTerminal::Finish,
            maybe_attach_delay: None,
            stats: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_terminal(mut self, terminal: PublisherTerminal) -> Self {
        self.terminal = terminal;
        self
    }

    /// Hands the subscription over from a spawned task after `delay`, instead of
    /// synchronously inside `subscribe()`.
    #[must_use]
    pub fn with_attach_delay(mut self, delay: Duration) -> Self {
        self.maybe_attach_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn stats(&self) -> Arc<PublisherStats> { Arc::clone(&self.stats) }
}

impl<T: Send + 'static> Publisher for RecordingPublisher<T> {
    type Output = T;

    fn subscribe(self, subscriber: Arc<dyn Subscriber<T>>) {
        let subscription = Arc::new(RecordingSubscription {
            state: SafeLock::new(EmitState {
                items: self.items.into(),
                outstanding: Demand::NONE,
                is_terminated: false,
            }),
            terminal: self.terminal,
            subscriber,
            stats: self.stats,
        });

        match self.maybe_attach_delay {
            None => subscription.attach(),
            Some(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    subscription.attach();
                });
            }
        }
    }
}

struct EmitState<T> {
    items: VecDeque<T>,
    outstanding: Demand,
    is_terminated: bool,
}

enum EmitStep<T> {
    Idle,
    Item(T),
    Complete,
}

struct RecordingSubscription<T> {
    state: SafeLock<EmitState<T>>,
    terminal: PublisherTerminal,
    subscriber: Arc<dyn Subscriber<T>>,
    stats: Arc<PublisherStats>,
}

impl<T: Send + 'static> RecordingSubscription<T> {
    fn attach(self: Arc<Self>) {
        self.subscriber.receive_subscription(self.clone());
        self.emit();
    }

    /// Emits until demand or items run out. The lock is never held while calling the
    /// subscriber.
    fn emit(&self) {
        loop {
            let step = self.state.with(|state| {
                if state.is_terminated {
                    return EmitStep::Idle;
                }
                if state.items.is_empty() {
                    if self.terminal == PublisherTerminal::Never {
                        return EmitStep::Idle;
                    }
                    state.is_terminated = true;
                    return EmitStep::Complete;
                }
                if !state.outstanding.decrement() {
                    return EmitStep::Idle;
                }
                state.items.pop_front().map_or(EmitStep::Idle, EmitStep::Item)
            });

            match step {
                EmitStep::Idle => return,
                EmitStep::Item(item) => {
                    self.stats.emitted.increment();
                    let surplus = self.subscriber.receive(item);
                    self.state.with(|state| state.outstanding += surplus);
                }
                EmitStep::Complete => {
                    let completion = match &self.terminal {
                        PublisherTerminal::Fail(msg) => {
                            Completion::Failed(miette::miette!("{msg}"))
                        }
                        PublisherTerminal::Finish | PublisherTerminal::Never => {
                            Completion::Finished
                        }
                    };
                    self.subscriber.receive_completion(completion);
                    return;
                }
            }
        }
    }
}

impl<T: Send + 'static> Subscription for RecordingSubscription<T> {
    fn request(&self, demand: Demand) {
        self.stats.request_calls.increment();
        self.stats.requests.with(|it| it.push(demand));
        self.state.with(|state| state.outstanding += demand);
        self.emit();
    }

    fn cancel(&self) {
        self.stats.cancel_calls.increment();
        self.state.with(|state| state.is_terminated = true);
    }
}
