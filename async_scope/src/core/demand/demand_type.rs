// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{fmt::{Display, Formatter, Result as FmtResult},
          ops::{Add, AddAssign, Sub}};

/// How many more items a consumer permits a producer to send.
///
/// Demand never goes negative and never overflows:
///
/// | Expression               | Result                                   |
/// | :----------------------- | :--------------------------------------- |
/// | `Max(a) + Max(b)`        | `Max(a + b)`, or `Unlimited` on overflow |
/// | `_ + Unlimited`          | `Unlimited`                              |
/// | `Max(a) - Max(b)`        | `Max(a - b)`, or `Max(0)` if `b > a`     |
/// | `Unlimited - _`          | `Unlimited`                              |
/// | `Max(a) - Unlimited`     | `Max(0)`                                 |
///
/// The derived ordering puts every `Max(_)` below [`Demand::Unlimited`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Demand {
    Max(u64),
    Unlimited,
}

impl Demand {
    pub const NONE: Self = Self::Max(0);

    #[must_use]
    pub const fn max(n: u64) -> Self { Self::Max(n) }

    #[must_use]
    pub const fn is_none(&self) -> bool { matches!(self, Self::Max(0)) }

    #[must_use]
    pub const fn is_unlimited(&self) -> bool { matches!(self, Self::Unlimited) }

    /// Takes one unit of demand. Returns `false` (and leaves `self` alone) if there was
    /// none to take.
    pub const fn decrement(&mut self) -> bool {
        match self {
            Self::Max(0) => false,
            Self::Max(n) => {
                *n -= 1;
                true
            }
            Self::Unlimited => true,
        }
    }
}

impl Default for Demand {
    fn default() -> Self { Self::NONE }
}

impl From<u64> for Demand {
    fn from(n: u64) -> Self { Self::Max(n) }
}

impl Add for Demand {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Self::Max(lhs), Self::Max(rhs)) => {
                lhs.checked_add(rhs).map_or(Self::Unlimited, Self::Max)
            }
            _ => Self::Unlimited,
        }
    }
}

impl AddAssign for Demand {
    fn add_assign(&mut self, rhs: Self) { *self = *self + rhs; }
}

impl Sub for Demand {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Self::Unlimited, _) => Self::Unlimited,
            (Self::Max(_), Self::Unlimited) => Self::NONE,
            (Self::Max(lhs), Self::Max(rhs)) => Self::Max(lhs.saturating_sub(rhs)),
        }
    }
}

impl Display for Demand {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Max(n) => write!(f, "{n}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}
