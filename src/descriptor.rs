//! The `(base, num)` unit descriptor and the casting-mode enum it is
//! checked against.

use std::fmt;

use crate::error::{Error, Result};
use crate::units::BaseUnit;

/// A resolution descriptor: `num` ticks of `base` per unit step.
///
/// `num == 1` is the common case (`[s]`, `[D]`, ...); `num > 1` scales the
/// tick, e.g. `[10us]` for a tick that advances by ten microseconds.
/// `Descriptor` is `Copy` — it is a pair of small scalars, passed by value
/// throughout the codec and algebra layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor {
    /// Base temporal unit.
    pub base: BaseUnit,
    /// Multiplier, always `>= 1`.
    pub num: i64,
}

impl Descriptor {
    /// Construct a descriptor, rejecting a non-positive multiplier.
    pub fn new(base: BaseUnit, num: i64) -> Result<Descriptor> {
        if num < 1 {
            return Err(Error::InvalidDescriptor(format!(
                "multiplier must be >= 1, got {num}"
            )));
        }
        Ok(Descriptor { base, num })
    }

    /// The `generic` descriptor used for NaT-only values and integer input
    /// without an explicit unit.
    pub fn generic() -> Descriptor {
        Descriptor {
            base: BaseUnit::Generic,
            num: 1,
        }
    }

    /// `true` when this descriptor has no explicit resolution yet.
    pub fn is_generic(self) -> bool {
        self.base == BaseUnit::Generic
    }

    /// `true` when `num == 1`, the common unscaled case.
    pub fn is_unscaled(self) -> bool {
        self.num == 1
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.base == BaseUnit::Generic {
            return write!(f, "[generic]");
        }
        if self.num == 1 {
            write!(f, "[{}]", self.base.symbol())
        } else {
            write!(f, "[{}{}]", self.num, self.base.symbol())
        }
    }
}

/// Whether a descriptor is being used to measure a point in time or a span
/// of time. The two share the tick/
/// descriptor representation and differ only in which unit-algebra
/// crossings of the Year/Month barrier are legal: instants may use the
/// average-Gregorian constants to cross it (§4.D rule 5); durations may
/// never cross it under strict casting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A point in time, anchored at the Unix epoch.
    Instant,
    /// A span of time with no fixed anchor.
    Duration,
}

/// How strict a conversion between two descriptors must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastingMode {
    /// Source and destination descriptors must be identical.
    No,
    /// Source and destination must have the same base and multiplier;
    /// equivalent to `No` for this library (no byte-order/endianness axis).
    Equiv,
    /// Destination must be able to represent every source value exactly:
    /// same base family (linear-to-linear or nonlinear-to-nonlinear) and
    /// coarser-or-equal source base, or an exact multiplier alignment.
    Safe,
    /// Like `Safe`, but also allows crossing the Year/Month <-> linear-chain
    /// barrier when the caller accepts calendar-dependent rounding.
    SameKind,
    /// Any conversion is attempted; precision loss is silent.
    Unsafe,
}

impl fmt::Display for CastingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CastingMode::No => "no",
            CastingMode::Equiv => "equiv",
            CastingMode::Safe => "safe",
            CastingMode::SameKind => "same_kind",
            CastingMode::Unsafe => "unsafe",
        };
        write!(f, "{s}")
    }
}
