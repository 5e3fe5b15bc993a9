//! 扩展自然数域 `ℕ ∪ {ω}`：库所中的 token 数。
//!
//! `ω` 表示被证明可无界增长的分量，满足：
//! * `ω = ω`，且 `ω` 不等于任何有限值；
//! * 对任意有限 `n`，`ω > n`、`ω ≥ n`；
//! * `ω + n = ω`，`ω - n = ω`，`ω` 永远不会被减回有限值；
//! * 有限值相加超出 `u64` 表示范围时记为 `ω`，需要区分的调用方使用
//!   [`Tokens::checked_add`]。
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::net::structure::Weight;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tokens {
    Finite(u64),
    Omega,
}

impl Tokens {
    pub const ZERO: Tokens = Tokens::Finite(0);

    pub fn is_omega(self) -> bool {
        matches!(self, Tokens::Omega)
    }

    pub fn finite(self) -> Option<u64> {
        match self {
            Tokens::Finite(n) => Some(n),
            Tokens::Omega => None,
        }
    }

    /// `None` when a finite count would exceed `u64::MAX`.
    pub fn checked_add(self, rhs: Weight) -> Option<Tokens> {
        match self {
            Tokens::Finite(n) => n.checked_add(rhs).map(Tokens::Finite),
            Tokens::Omega => Some(Tokens::Omega),
        }
    }

    /// `self ≥ weight`，ω 总是满足。
    pub fn satisfies(self, weight: Weight) -> bool {
        match self {
            Tokens::Finite(n) => n >= weight,
            Tokens::Omega => true,
        }
    }
}

impl Default for Tokens {
    fn default() -> Self {
        Tokens::ZERO
    }
}

impl From<u64> for Tokens {
    fn from(value: u64) -> Self {
        Tokens::Finite(value)
    }
}

impl PartialOrd for Tokens {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tokens {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Tokens::Finite(a), Tokens::Finite(b)) => a.cmp(b),
            (Tokens::Finite(_), Tokens::Omega) => Ordering::Less,
            (Tokens::Omega, Tokens::Finite(_)) => Ordering::Greater,
            (Tokens::Omega, Tokens::Omega) => Ordering::Equal,
        }
    }
}

impl PartialEq<u64> for Tokens {
    fn eq(&self, other: &u64) -> bool {
        matches!(self, Tokens::Finite(n) if n == other)
    }
}

impl Add<Weight> for Tokens {
    type Output = Tokens;

    fn add(self, rhs: Weight) -> Tokens {
        self.checked_add(rhs).unwrap_or(Tokens::Omega)
    }
}

impl Sub<Weight> for Tokens {
    type Output = Tokens;

    /// Finite subtraction is only reached after an enablement check, so the
    /// count never drops below zero.
    fn sub(self, rhs: Weight) -> Tokens {
        match self {
            Tokens::Finite(n) => {
                debug_assert!(n >= rhs, "token count {n} cannot give up {rhs} tokens");
                Tokens::Finite(n.saturating_sub(rhs))
            }
            Tokens::Omega => Tokens::Omega,
        }
    }
}

impl AddAssign<Weight> for Tokens {
    fn add_assign(&mut self, rhs: Weight) {
        *self = *self + rhs;
    }
}

impl SubAssign<Weight> for Tokens {
    fn sub_assign(&mut self, rhs: Weight) {
        *self = *self - rhs;
    }
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tokens::Finite(n) => write!(f, "{n}"),
            Tokens::Omega => f.write_str("ω"),
        }
    }
}
