//! Unit algebra: conversion factors as reduced rationals, divisibility,
//! descriptor GCD, and castability under a [`CastingMode`].
//!
//! The source's single Boolean flag threaded through every comparison is
//! replaced by the [`Kind`] the caller already carries: the linear
//! sub-monoid `Week..Attosecond` and
//! the nonlinear monoid `{Year, Month}` are two separate multiplicative
//! worlds, and crossing between them is legal only for instants, using the
//! average-Gregorian constants, never for durations under strict casting.

use num_integer::Integer;

use crate::descriptor::{CastingMode, Descriptor, Kind};
use crate::error::{Error, Result};
use crate::units::BaseUnit;

/// Average Gregorian days per year, as a reduced fraction: a year averages
/// `146097/400` days over a full 400-year cycle (`365 + 97/400`), the same
/// constant the calendar engine's 400-year decomposition is built from.
const AVG_DAYS_PER_YEAR: (u128, u128) = (146_097, 400);

fn reduce_u128(num: u128, den: u128) -> (u128, u128) {
    let g = num.gcd(&den).max(1);
    (num / g, den / g)
}

/// `1 base -> (num, den) days`, for the nonlinear bases only.
fn nonlinear_to_day_ratio(base: BaseUnit) -> (u128, u128) {
    match base {
        BaseUnit::Year => AVG_DAYS_PER_YEAR,
        BaseUnit::Month => reduce_u128(AVG_DAYS_PER_YEAR.0, AVG_DAYS_PER_YEAR.1 * 12),
        _ => unreachable!("only called for Year/Month"),
    }
}

/// `1 linear_base -> (num, den) days`, for bases in the linear chain.
fn linear_to_day_ratio(base: BaseUnit) -> Result<(u128, u128)> {
    if base == BaseUnit::Day {
        return Ok((1, 1));
    }
    if base == BaseUnit::Week {
        return Ok((7, 1));
    }
    let factor = BaseUnit::Day.linear_factor_to(base).ok_or(Error::Overflow)?;
    Ok((1, factor as u128))
}

/// Exact ratio `1 src_base == (num, den) dst_base` for same-family pairs
/// (both linear-chain, or both nonlinear). `None` when the pair straddles
/// the barrier -- the caller handles that case via
/// [`average_gregorian_ratio`].
fn same_family_ratio(src: BaseUnit, dst: BaseUnit) -> Option<Result<(u128, u128)>> {
    if src == dst {
        return Some(Ok((1, 1)));
    }
    if src.is_nonlinear() && dst.is_nonlinear() {
        return Some(match (src, dst) {
            (BaseUnit::Year, BaseUnit::Month) => Ok((12, 1)),
            (BaseUnit::Month, BaseUnit::Year) => Ok((1, 12)),
            _ => unreachable!(),
        });
    }
    if src.is_nonlinear() || dst.is_nonlinear() {
        return None;
    }
    Some(if src <= dst {
        src.linear_factor_to(dst)
            .map(|f| (f as u128, 1))
            .ok_or(Error::Overflow)
    } else {
        dst.linear_factor_to(src)
            .map(|f| (1, f as u128))
            .ok_or(Error::Overflow)
    })
}

/// Average-Gregorian ratio `1 src_base == (num, den) dst_base` for a pair
/// that straddles the Year/Month <-> linear-chain barrier. Only legal for
/// [`Kind::Instant`]; the caller is responsible
/// for rejecting [`Kind::Duration`] before calling this.
fn average_gregorian_ratio(src: BaseUnit, dst: BaseUnit) -> Result<(u128, u128)> {
    if src.is_nonlinear() {
        let (n, d) = nonlinear_to_day_ratio(src); // 1 src == n/d days
        let (fn_, fd) = linear_to_day_ratio(dst)?; // 1 dst == fn_/fd days, i.e. 1 day == fd/fn_ dst
        // 1 src == (n/d) days == (n/d) * (fd/fn_) dst
        Ok(reduce_u128(n * fd, d * fn_))
    } else {
        let (n, d) = average_gregorian_ratio(dst, src)?;
        Ok((d, n))
    }
}

/// Exact conversion factor between two descriptors under `kind`, as a
/// reduced `(numerator, denominator)` pair: one `src` tick equals
/// `numerator / denominator` `dst` ticks.
pub fn conversion_factor(src: Descriptor, dst: Descriptor, kind: Kind) -> Result<(i64, i64)> {
    if src.base == BaseUnit::Generic {
        return Ok((1, 1));
    }
    if dst.base == BaseUnit::Generic {
        return Err(Error::GenericUnitMisuse(
            "cannot convert a specific unit to generic".into(),
        ));
    }

    let crosses_barrier = src.base.is_nonlinear() != dst.base.is_nonlinear();
    let (n, d) = if crosses_barrier {
        if kind == Kind::Duration {
            return Err(Error::CastingForbidden {
                src: src.to_string(),
                dst: dst.to_string(),
                mode: "nonlinear barrier (duration)".into(),
            });
        }
        average_gregorian_ratio(src.base, dst.base)?
    } else {
        same_family_ratio(src.base, dst.base).expect("same-family pair")?
    };

    let num: i128 = (src.num as i128) * n as i128;
    let den: i128 = (dst.num as i128) * d as i128;
    let g = num.unsigned_abs().gcd(&den.unsigned_abs()).max(1) as i128;
    let (num, den) = (num / g, den / g);

    let num = i64::try_from(num).map_err(|_| Error::Overflow)?;
    let den = i64::try_from(den).map_err(|_| Error::Overflow)?;
    Ok((num, den))
}

/// `true` iff converting `src` to `dst` loses no information: every `src`
/// tick maps to an integer number of `dst` ticks.
pub fn is_exact(src: Descriptor, dst: Descriptor, kind: Kind) -> bool {
    matches!(conversion_factor(src, dst, kind), Ok((_, 1)))
}

/// Ticks of `base` spanned by one tick of `d`, used internally to align
/// two descriptors to a common base before comparing magnitudes. Requires
/// `base` to be finer-or-equal to `d.base` within the same family.
fn ticks_in_base(d: Descriptor, base: BaseUnit, kind: Kind) -> Result<i128> {
    let unit = Descriptor::new(d.base, 1)?;
    let target = Descriptor::new(base, 1)?;
    let (n, den) = conversion_factor(unit, target, kind)?;
    if den != 1 {
        return Err(Error::Overflow);
    }
    Ok((d.num as i128) * (n as i128))
}

/// Divisibility: does the absolute span of one `a` tick evenly divide (or
/// get evenly divided by) one `b` tick, once both are aligned to a common
/// base? Spec.md §4.D: "`strict_with_nonlinear_units` ... when set
/// (duration path), mixing Year/Month with any other unit fails; when
/// clear (instant path), such mixes are reported as 'could divide'
/// optimistically."
pub fn is_divisible(a: Descriptor, b: Descriptor, kind: Kind) -> Result<bool> {
    if a.base == BaseUnit::Generic || b.base == BaseUnit::Generic {
        return Ok(true);
    }
    let crosses_barrier = a.base.is_nonlinear() != b.base.is_nonlinear();
    if crosses_barrier {
        return Ok(kind == Kind::Instant);
    }
    let finer = if a.base > b.base { a.base } else { b.base };
    let ta = ticks_in_base(a, finer, kind)?;
    let tb = ticks_in_base(b, finer, kind)?;
    let (hi, lo) = if ta >= tb { (ta, tb) } else { (tb, ta) };
    Ok(lo != 0 && hi % lo == 0)
}

/// GCD of two descriptors: the finest common base reachable
/// by either, with a multiplier equal to the Euclidean GCD of both
/// descriptors' tick counts expressed in that base.
///
/// `Generic` is absorbed by whichever side is concrete (and `gcd(Generic,
/// Generic) == Generic`), matching the glossary's "Generic ... absorbed by
/// any concrete unit on promotion" rather than erroring the way
/// [`conversion_factor`] does for a concrete destination.
///
/// Crossing the Year/Month barrier under [`Kind::Duration`] is an error;
/// under [`Kind::Instant`] the nonlinear side is approximated via the
/// average-Gregorian ratio, truncated to an integer tick count before
/// taking the GCD (e.g. `gcd((Year,1), (Day,1))` under instants is
/// `(Day,1)`).
pub fn gcd_descriptor(a: Descriptor, b: Descriptor, kind: Kind) -> Result<Descriptor> {
    if a.base == BaseUnit::Generic && b.base == BaseUnit::Generic {
        return Ok(Descriptor::generic());
    }
    if a.base == BaseUnit::Generic {
        return Ok(b);
    }
    if b.base == BaseUnit::Generic {
        return Ok(a);
    }
    if a.base == b.base {
        let g = (a.num as u64).gcd(&(b.num as u64)).max(1);
        return Descriptor::new(a.base, g as i64);
    }

    let crosses_barrier = a.base.is_nonlinear() != b.base.is_nonlinear();
    if crosses_barrier && kind == Kind::Duration {
        return Err(Error::CastingForbidden {
            src: a.to_string(),
            dst: b.to_string(),
            mode: "nonlinear barrier (duration gcd)".into(),
        });
    }

    let finer = if a.base > b.base { a.base } else { b.base };
    let approx_ticks_in_finer = |d: Descriptor| -> Result<u64> {
        if d.base == finer {
            return Ok(d.num as u64);
        }
        let unit = Descriptor::new(d.base, 1)?;
        let target = Descriptor::new(finer, 1)?;
        let (n, den) = conversion_factor(unit, target, kind)?;
        let approx = (d.num as i128) * (n as i128) / (den as i128);
        u64::try_from(approx.max(1)).map_err(|_| Error::Overflow)
    };

    let ta = approx_ticks_in_finer(a)?;
    let tb = approx_ticks_in_finer(b)?;
    let g = ta.gcd(&tb).max(1);
    Descriptor::new(finer, i64::try_from(g).map_err(|_| Error::Overflow)?)
}

/// Castability check for the five casting modes.
pub fn is_castable(src: Descriptor, dst: Descriptor, kind: Kind, mode: CastingMode) -> bool {
    match mode {
        CastingMode::Unsafe => true,
        CastingMode::No | CastingMode::Equiv => src == dst,
        CastingMode::SameKind => same_kind_castable(src, dst, kind),
        CastingMode::Safe => {
            same_kind_castable(src, dst, kind)
                && src.base <= dst.base
                && is_exact(src, dst, kind)
        }
    }
}

fn same_kind_castable(src: Descriptor, dst: Descriptor, kind: Kind) -> bool {
    let one_side_generic = (src.base == BaseUnit::Generic) != (dst.base == BaseUnit::Generic);
    if one_side_generic {
        return src.base == BaseUnit::Generic; // Generic -> anything: ok; anything -> Generic: forbidden
    }
    if kind == Kind::Duration {
        return src.base.is_nonlinear() == dst.base.is_nonlinear();
    }
    true
}
