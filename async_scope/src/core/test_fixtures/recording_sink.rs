// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{BridgeError, Completion, Demand, SafeLock, Sink};
use std::{collections::VecDeque,
          fmt::{Debug, Formatter, Result as FmtResult}};
use tokio::sync::Notify;

/// A [`Completion`] as seen by a [`RecordingSink`], comparable in assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCompletion {
    Finished,
    /// The error's display text.
    Failed(String),
    Cancelled,
}

impl From<Completion<BridgeError>> for RecordedCompletion {
    fn from(completion: Completion<BridgeError>) -> Self {
        match completion {
            Completion::Finished => Self::Finished,
            Completion::Failed(err) => Self::Failed(err.to_string()),
            Completion::Cancelled => Self::Cancelled,
        }
    }
}

/// A [`Sink`] that records everything delivered to it and lets tests wait for it.
pub struct RecordingSink<T> {
    items: SafeLock<Vec<T>>,
    completions: SafeLock<Vec<RecordedCompletion>>,
    surplus: SafeLock<VecDeque<Demand>>,
    notify: Notify,
}

impl<T> Default for RecordingSink<T> {
    fn default() -> Self {
        Self {
            items: SafeLock::new(vec![]),
            completions: SafeLock::new(vec![]),
            surplus: SafeLock::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }
}

impl<T> RecordingSink<T> {
    /// Each received item returns the next of these as surplus demand, then
    /// [`Demand::NONE`] once they run out.
    #[must_use]
    pub fn with_surplus(surplus: impl IntoIterator<Item = Demand>) -> Self {
        let it = Self::default();
        it.surplus.with(|queue| queue.extend(surplus));
        it
    }

    #[must_use]
    pub fn item_count(&self) -> usize { self.items.with(|it| it.len()) }

    #[must_use]
    pub fn completions(&self) -> Vec<RecordedCompletion> { self.completions.snapshot() }

    pub async fn wait_for_item_count(&self, count: usize) {
        self.wait_until(|| self.item_count() >= count).await;
    }

    pub async fn wait_for_completion(&self) {
        self.wait_until(|| self.completions.with(|it| !it.is_empty()))
            .await;
    }

    async fn wait_until(&self, predicate: impl Fn() -> bool) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking, so a notify in between is not missed.
            notified.as_mut().enable();
            if predicate() {
                return;
            }
            notified.await;
        }
    }
}

impl<T: Clone> RecordingSink<T> {
    #[must_use]
    pub fn items(&self) -> Vec<T> { self.items.snapshot() }
}

impl<T: Send> Sink<T> for RecordingSink<T> {
    fn receive(&self, item: T) -> Demand {
        self.items.with(|it| it.push(item));
        let surplus = self
            .surplus
            .with(|it| it.pop_front())
            .unwrap_or(Demand::NONE);
        self.notify.notify_waiters();
        surplus
    }

    fn receive_completion(&self, completion: Completion<BridgeError>) {
        self.completions.with(|it| it.push(completion.into()));
        self.notify.notify_waiters();
    }
}

impl<T> Debug for RecordingSink<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RecordingSink")
            .field("item_count", &self.item_count())
            .field("completions", &self.completions())
            .finish_non_exhaustive()
    }
}
