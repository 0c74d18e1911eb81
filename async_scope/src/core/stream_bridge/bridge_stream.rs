// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{Bridge, BridgeError, BridgeHandle, BridgeId, Completion, Demand, Publisher,
            ScopeConfig, ScopeOwner, Sink, SubscriptionState, TaskScope, TerminalCause,
            Transform};
use futures_core::Stream;
use std::{future::poll_fn,
          pin::Pin,
          sync::Arc,
          task::{Context, Poll}};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Name of the scope a [`BridgeStream`] creates when it is not given one.
pub const BRIDGE_STREAM_SCOPE_NAME: &str = "bridge_stream";

enum StreamEvent<T> {
    Item(T),
    Completion(Completion<BridgeError>),
}

/// Forwards whatever the bridge delivers into the [`BridgeStream`]'s channel. It never
/// returns surplus demand: every item is paid for by one pending `next`.
struct StreamSink<T> {
    tx: UnboundedSender<StreamEvent<T>>,
}

impl<T: Send> Sink<T> for StreamSink<T> {
    fn receive(&self, item: T) -> Demand {
        self.tx.send(StreamEvent::Item(item)).ok();
        Demand::NONE
    }

    fn receive_completion(&self, completion: Completion<BridgeError>) {
        self.tx.send(StreamEvent::Completion(completion)).ok();
    }
}

/// A push-style [`Publisher`] seen as a pull-style async iterator.
///
/// Each pending `next` issues exactly one demand token for one item, so the producer
/// is never asked for more than the consumer has actually awaited. After the stream
/// ends (producer finished, failed, or cancelled) every further `next` returns `None`.
///
/// Dropping the stream drops the sink the bridge delivers to and cancels the producer.
/// If the stream owns its scope (see [`try_new()`]) that scope is cancelled too.
///
/// ```no_run
/// use futures_util::stream;
/// use r3bl_async_scope::{BridgeStream, ScopeConfig, ScopeOwner, StreamPublisher,
///                        Transform};
///
/// # async fn example() -> miette::Result<()> {
/// let owner = ScopeOwner::try_new(ScopeConfig::default())?;
/// let publisher = StreamPublisher::new(stream::iter(["1", "2", "x"]), owner.scope());
/// let mut numbers = BridgeStream::try_new_in(
///     publisher,
///     Transform::new(|it: &str| {
///         let it = it.to_owned();
///         async move { it.parse::<u8>().map_err(|err| miette::miette!("{it}: {err}")) }
///     }),
///     owner.scope(),
/// )?;
///
/// assert_eq!(numbers.try_next().await?, Some(1));
/// assert_eq!(numbers.try_next().await?, Some(2));
/// assert!(numbers.try_next().await.is_err());
/// assert_eq!(numbers.try_next().await?, None);
/// # Ok(())
/// # }
/// ```
///
/// [`try_new()`]: Self::try_new
pub struct BridgeStream<T> {
    handle: BridgeHandle,
    rx: UnboundedReceiver<StreamEvent<T>>,
    /// The bridge only holds a weak reference to this.
    _sink: Arc<StreamSink<T>>,
    is_demand_pending: bool,
    is_done: bool,
    maybe_owner: Option<ScopeOwner>,
}

impl<T: Send + 'static> BridgeStream<T> {
    /// Bridges `publisher` in a new detached scope that this stream owns.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Scope`] when called outside a Tokio runtime.
    pub fn try_new<P>(
        publisher: P,
        transform: Transform<P::Output, T>,
    ) -> Result<Self, BridgeError>
    where
        P: Publisher,
    {
        let owner = ScopeOwner::try_new(
            ScopeConfig::default().with_name(BRIDGE_STREAM_SCOPE_NAME),
        )?;
        let mut it = Self::try_new_in(publisher, transform, owner.scope())?;
        it.maybe_owner = Some(owner);
        Ok(it)
    }

    /// Bridges `publisher` in an existing `scope`. Cancelling that scope ends this
    /// stream.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Scope`] if `scope` is already cancelled.
    pub fn try_new_in<P>(
        publisher: P,
        transform: Transform<P::Output, T>,
        scope: &TaskScope,
    ) -> Result<Self, BridgeError>
    where
        P: Publisher,
    {
        let (tx, rx) = unbounded_channel();
        let sink = Arc::new(StreamSink { tx });
        let handle = Bridge::spawn(publisher, &sink, transform, scope)?;
        Ok(Self {
            handle,
            rx,
            _sink: sink,
            is_demand_pending: false,
            is_done: false,
            maybe_owner: None,
        })
    }

    /// The next item, or `None` once the stream has ended.
    ///
    /// # Errors
    ///
    /// The producer's or the transform's failure, exactly once. The stream has ended
    /// after that.
    pub async fn try_next(&mut self) -> Result<Option<T>, BridgeError> {
        poll_fn(|cx| Pin::new(&mut *self).poll_next(cx))
            .await
            .transpose()
    }

    /// Like [`try_next()`], except that a failure is logged and treated as the end of
    /// the stream.
    ///
    /// [`try_next()`]: Self::try_next
    pub async fn next(&mut self) -> Option<T> {
        match self.try_next().await {
            Ok(maybe_item) => maybe_item,
            Err(err) => {
                tracing::warn!(
                    message = "bridge stream ended with an error",
                    bridge_id = %self.handle.id(),
                    error = ?err
                );
                None
            }
        }
    }
}

impl<T> BridgeStream<T> {
    /// Stops the stream and cancels the producer. Idempotent.
    pub fn cancel(&mut self) {
        self.is_done = true;
        self.handle.cancel();
    }

    #[must_use]
    pub fn id(&self) -> BridgeId { self.handle.id() }

    /// The underlying bridge's state. Only dropping the stream detaches the bridge.
    #[must_use]
    pub fn state(&self) -> SubscriptionState { self.handle.state() }

    #[must_use]
    pub fn terminal_cause(&self) -> Option<TerminalCause> { self.handle.terminal_cause() }

    #[must_use]
    pub fn is_done(&self) -> bool { self.is_done }
}

impl<T> Stream for BridgeStream<T> {
    type Item = Result<T, BridgeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.is_done {
            return Poll::Ready(None);
        }

        // A failed request means the bridge has ended, and its completion is on the way.
        if !this.is_demand_pending {
            this.is_demand_pending = this.handle.request(Demand::max(1));
        }

        match this.rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(StreamEvent::Item(item))) => {
                this.is_demand_pending = false;
                Poll::Ready(Some(Ok(item)))
            }
            Poll::Ready(Some(StreamEvent::Completion(completion))) => {
                this.is_done = true;
                match completion {
                    Completion::Failed(err) => Poll::Ready(Some(Err(err))),
                    Completion::Finished | Completion::Cancelled => Poll::Ready(None),
                }
            }
            Poll::Ready(None) => {
                this.is_done = true;
                Poll::Ready(None)
            }
        }
    }
}

impl<T> Drop for BridgeStream<T> {
    fn drop(&mut self) { self.handle.detach(); }
}

impl<T> std::fmt::Debug for BridgeStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeStream")
            .field("handle", &self.handle)
            .field("is_demand_pending", &self.is_demand_pending)
            .field("is_done", &self.is_done)
            .field("owns_scope", &self.maybe_owner.is_some())
            .finish()
    }
}
