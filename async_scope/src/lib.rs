// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words reimplementation

//! # r3bl_async_scope
//!
//! Structured concurrency scopes for [`tokio`], plus a demand-synchronized bridge between
//! push-style producers (that only emit after being asked for `N` more items) and
//! pull-style async streams.
//!
//! # Table of contents
//!
//! <!-- TOC -->
//! - [The two problems this crate solves](#the-two-problems-this-crate-solves)
//! - [Building blocks](#building-blocks)
//! - [Scope quick start](#scope-quick-start)
//! - [Bridge quick start](#bridge-quick-start)
//! - [Logging](#logging)
//! <!-- /TOC -->
//!
//! # The two problems this crate solves
//!
//! 1. **"Run this, but stop it when I go away."** Unrelated code submits deferred jobs
//!    into a long-lived [`TaskScope`]. The scope owns their lifetime: cancelling the
//!    scope (directly, via a parent scope, or by dropping the last [`ScopeOwner`])
//!    cancels every job it started, and nothing stays enqueued forever.
//! 2. **Flow control across two concurrency models.** A [`Publisher`] that emits only
//!    when a downstream calls [`Subscription::request()`] is adapted into a
//!    [`BridgeStream`] that you `.await` item by item. The other direction is covered by
//!    [`StreamPublisher`], which turns any [`Stream`] into a demand-driven
//!    [`Publisher`].
//!
//! # Building blocks
//!
//! Leaf first. Each row only depends on the rows above it.
//!
//! | Type                 | Role                                                                 |
//! | :------------------- | :------------------------------------------------------------------- |
//! | [`SafeLock`]         | Short, non-suspending critical section around arbitrary state        |
//! | [`CancelToken`]      | Cooperative, hierarchical cancellation signal                        |
//! | [`ResumptionCell`]   | Holds at most one suspended waiter, resumed exactly once             |
//! | [`SuspendingQueue`]  | FIFO, multi-producer, single-consumer queue ([`JobQueue`] is one)    |
//! | [`TaskScope`]        | Background task that drains a [`JobQueue`] and spawns each [`Job`]   |
//! | [`ScopeOwner`]       | Cancels its [`TaskScope`] when the last clone is dropped             |
//! | [`Demand`]           | "How many more items may you send me", saturating at unlimited       |
//! | [`demand_channel()`] | Unbounded buffer of [`Demand`] tokens that drives a pull loop        |
//! | [`Bridge`]           | Pulls exactly as many items from a [`Publisher`] as were demanded    |
//!
//! # Scope quick start
//!
//! ```no_run
//! use r3bl_async_scope::{ScopeConfig, TaskScope};
//!
//! # async fn example() -> miette::Result<()> {
//! let scope = TaskScope::try_new(ScopeConfig::default().with_name("downloads"))?;
//!
//! let was_launched = scope.launch_fn(|ctx| async move {
//!     tokio::select! {
//!         () = ctx.cancelled() => {}
//!         () = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
//!     }
//!     Ok(())
//! });
//! assert!(was_launched);
//!
//! scope.cancel();
//! scope.await_shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Bridge quick start
//!
//! ```no_run
//! use futures_util::stream;
//! use r3bl_async_scope::{BridgeStream, ScopeConfig, ScopeOwner, StreamPublisher,
//!                        Transform};
//!
//! # async fn example() -> miette::Result<()> {
//! let owner = ScopeOwner::try_new(ScopeConfig::default())?;
//! let publisher = StreamPublisher::new(stream::iter(1..=3), owner.scope());
//! let mut numbers = BridgeStream::try_new(publisher, Transform::map(|it: i32| it * 10))?;
//!
//! while let Some(it) = numbers.try_next().await? {
//!     println!("{it}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! All lifecycle transitions are reported with [`tracing`]. Use [`TracingConfig`] to
//! install a subscriber that writes to stdout, stderr, a log file, or both.
//!
//! [`Stream`]: futures_core::Stream

// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap() (workspace `Cargo.toml` config allows it).
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules.
pub mod core;

// Re-export.
pub use core::*;
