// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{Completion, ScopeError};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Failures a [`Bridge`] surfaces to its downstream, at most once per subscription.
///
/// Cancellation is not in here. A cancelled bridge ends with [`Completion::Cancelled`]
/// and yields "no more items" rather than an error.
///
/// [`Bridge`]: crate::Bridge
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum BridgeError {
    #[error("The producer failed: {0}")]
    #[diagnostic(
        code(r3bl_async_scope::stream_bridge::producer_failure),
        help("The message above is the producer's own error")
    )]
    ProducerFailure(miette::Report),

    #[error("The transform failed: {0}")]
    #[diagnostic(
        code(r3bl_async_scope::stream_bridge::transform_failure),
        help("The producer has been cancelled. No further items will be delivered")
    )]
    TransformFailure(miette::Report),

    #[error("The bridge could not be started: {0}")]
    #[diagnostic(code(r3bl_async_scope::stream_bridge::scope))]
    Scope(#[from] ScopeError),
}

/// Which of the mutually exclusive endings a subscription reached. The first one to
/// happen wins; the others are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalCause {
    /// The producer completed normally.
    Finished,
    /// The producer or the transform failed.
    Failed,
    /// The bridge, its scope, or the producer itself was cancelled.
    Cancelled,
    /// The downstream was dropped.
    DownstreamGone,
}

impl Display for TerminalCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let it = match self {
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::DownstreamGone => "downstream gone",
        };
        f.write_str(it)
    }
}

/// Internal record of why a subscription ended, carrying whatever is needed to tell
/// the producer and the downstream.
#[derive(Debug)]
pub(crate) enum Termination {
    ProducerFinished,
    ProducerFailed(miette::Report),
    ProducerCancelled,
    TransformFailed(miette::Report),
    Cancelled,
    DownstreamGone,
}

impl Termination {
    pub fn from_producer(completion: Completion<miette::Report>) -> Self {
        match completion {
            Completion::Finished => Self::ProducerFinished,
            Completion::Failed(report) => Self::ProducerFailed(report),
            Completion::Cancelled => Self::ProducerCancelled,
        }
    }

    pub fn cause(&self) -> TerminalCause {
        match self {
            Self::ProducerFinished => TerminalCause::Finished,
            Self::ProducerFailed(_) | Self::TransformFailed(_) => TerminalCause::Failed,
            Self::ProducerCancelled | Self::Cancelled => TerminalCause::Cancelled,
            Self::DownstreamGone => TerminalCause::DownstreamGone,
        }
    }

    /// A producer that ended on its own must not be cancelled on top of that.
    pub fn cancels_producer(&self) -> bool {
        matches!(
            self,
            Self::TransformFailed(_) | Self::Cancelled | Self::DownstreamGone
        )
    }

    /// What the downstream is told. `None` when there is nobody left to tell.
    pub fn into_completion(self) -> Option<Completion<BridgeError>> {
        match self {
            Self::ProducerFinished => Some(Completion::Finished),
            Self::ProducerFailed(report) => {
                Some(Completion::Failed(BridgeError::ProducerFailure(report)))
            }
            Self::TransformFailed(report) => {
                Some(Completion::Failed(BridgeError::TransformFailure(report)))
            }
            Self::ProducerCancelled | Self::Cancelled => Some(Completion::Cancelled),
            Self::DownstreamGone => None,
        }
    }
}
