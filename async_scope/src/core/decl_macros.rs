// Copyright (c) 2022-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Wrap the given expression in [`Ok`]. With no arguments this is `Ok(())`, which reads
/// better at the end of async job bodies that return [`miette::Result<()>`].
///
/// ```
/// use r3bl_async_scope::ok;
///
/// fn it() -> miette::Result<()> { ok!() }
/// fn answer() -> miette::Result<u8> { ok!(42) }
/// # assert!(it().is_ok());
/// # assert_eq!(answer().unwrap(), 42);
/// ```
#[macro_export]
macro_rules! ok {
    // No args.
    () => {
        Ok(())
    };
    // With arg.
    ($value:expr) => {
        Ok($value)
    };
}

/// Equality assertion with a colored diff on failure. Only meant for tests; expands to
/// [`pretty_assertions::assert_eq!`] which is a dev dependency of this crate.
#[macro_export]
macro_rules! assert_eq2 {
    ($($params:tt)*) => {
        pretty_assertions::assert_eq!($($params)*)
    };
}
