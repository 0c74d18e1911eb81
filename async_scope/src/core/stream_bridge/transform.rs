// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use futures_util::{FutureExt, future::BoxFuture};
use std::fmt::{Debug, Formatter, Result as FmtResult};

type TransformFn<In, Out> =
    Box<dyn FnMut(In) -> BoxFuture<'static, miette::Result<Out>> + Send>;

/// The optional user step a [`Bridge`] applies to each item between the producer and
/// the downstream. It may suspend and it may fail.
///
/// A failure ends the subscription with [`BridgeError::TransformFailure`] and cancels
/// the producer. The transform is never interrupted: if the bridge is cancelled while
/// it runs, it runs to completion and its result is discarded.
///
/// ```
/// use r3bl_async_scope::Transform;
///
/// let _identity = Transform::<u8, u8>::identity();
/// let _sync = Transform::map(|it: u8| u16::from(it) * 2);
/// let _fallible = Transform::new(|it: String| async move {
///     it.parse::<u32>().map_err(|err| miette::miette!("not a number: {err}"))
/// });
/// ```
///
/// [`Bridge`]: crate::Bridge
/// [`BridgeError::TransformFailure`]: crate::BridgeError::TransformFailure
pub struct Transform<In, Out> {
    f: TransformFn<In, Out>,
}

impl<In: 'static, Out: Send + 'static> Transform<In, Out> {
    /// Async, fallible transform.
    pub fn new<F, Fut>(mut f: F) -> Self
    where
        F: FnMut(In) -> Fut + Send + 'static,
        Fut: Future<Output = miette::Result<Out>> + Send + 'static,
    {
        Self {
            f: Box::new(move |it| f(it).boxed()),
        }
    }

    /// Sync, infallible transform.
    pub fn map<F>(mut f: F) -> Self
    where
        F: FnMut(In) -> Out + Send + 'static,
    {
        Self {
            f: Box::new(move |it| {
                let out = f(it);
                async move { Ok(out) }.boxed()
            }),
        }
    }

    pub async fn apply(&mut self, item: In) -> miette::Result<Out> { (self.f)(item).await }
}

impl<T: Send + 'static> Transform<T, T> {
    #[must_use]
    pub fn identity() -> Self { Self::map(|it| it) }
}

impl<In, Out> Debug for Transform<In, Out> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult { f.write_str("Transform") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_eq2;

    #[tokio::test]
    async fn map_and_identity() {
        let mut identity = Transform::identity();
        assert_eq2!(identity.apply(7_u8).await.unwrap(), 7);

        let mut counter = 0;
        let mut numbered = Transform::map(move |it: &'static str| {
            counter += 1;
            format!("{counter}:{it}")
        });
        assert_eq2!(numbered.apply("a").await.unwrap(), "1:a");
        assert_eq2!(numbered.apply("b").await.unwrap(), "2:b");
    }

    #[tokio::test]
    async fn async_transform_can_fail() {
        let mut parse = Transform::new(|it: &'static str| async move {
            tokio::task::yield_now().await;
            it.parse::<u8>()
                .map_err(|err| miette::miette!("bad input {it}: {err}"))
        });

        assert_eq2!(parse.apply("42").await.unwrap(), 42);
        assert!(parse.apply("x").await.is_err());
    }
}
