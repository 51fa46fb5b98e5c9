//! Range generator: `(start, stop, step)` -> an arithmetic progression of
//! ticks at a common unit.

use crate::algebra;
use crate::descriptor::{CastingMode, Descriptor, Kind};
use crate::error::{Error, Result};
use crate::ticks::Tick;

/// One operand of [`arange`]: either ticks already in a concrete unit, or
/// the bare count `0..start` shorthand used for a
/// missing `stop`.
#[derive(Debug, Clone, Copy)]
pub struct RangeValue {
    pub descriptor: Descriptor,
    pub tick: Tick,
}

impl RangeValue {
    pub fn new(descriptor: Descriptor, tick: Tick) -> RangeValue {
        RangeValue { descriptor, tick }
    }
}

/// Length of the generated sequence, by the piecewise formula below.
fn sequence_length(start: i64, stop: i64, step: i64) -> Result<i64> {
    if step == 0 {
        return Err(Error::StepZero);
    }
    let span = (stop as i128) - (start as i128);
    let len = if step > 0 && stop > start {
        (span + (step as i128) - 1) / (step as i128)
    } else if step < 0 && stop < start {
        (span + (step as i128) + 1) / (step as i128)
    } else {
        0
    };
    i64::try_from(len).map_err(|_| Error::Overflow)
}

/// Generate the arithmetic progression `start, start+step, ...` of the
/// length the formula above computes, all expressed as ticks of the
/// common unit `start`/`stop`/`step` were aligned to.
///
/// `start`, `stop` (defaulting to `0` when absent, with `start` becoming
/// the old `stop`) and `step` (defaulting
/// to `1` tick of the resolved common unit) are reconciled to one
/// descriptor via [`algebra::gcd_descriptor`] under [`CastingMode::SameKind`].
/// In instant+duration mode (`start` is an instant, `stop` a duration,
/// `instant_plus_duration: true`), `stop` is first reinterpreted as
/// `start + stop` before the common-unit alignment below.
pub fn arange(
    start: RangeValue,
    stop: Option<RangeValue>,
    step: Option<RangeValue>,
    kind: Kind,
    instant_plus_duration: bool,
) -> Result<(Descriptor, Vec<Tick>)> {
    if start.tick.is_nat() {
        return Err(Error::ConversionFailure("arange: start is NaT".into()));
    }

    let (start, stop) = match stop {
        Some(stop) => (start, stop),
        None => (RangeValue::new(start.descriptor, Tick::Value(0)), start),
    };
    if stop.tick.is_nat() {
        return Err(Error::ConversionFailure("arange: stop is NaT".into()));
    }

    let stop = if instant_plus_duration {
        let (num, den) = algebra::conversion_factor(stop.descriptor, start.descriptor, Kind::Instant)?;
        let stop_raw = match stop.tick {
            Tick::Value(t) => t,
            Tick::NaT => unreachable!("checked above"),
        };
        let start_raw = match start.tick {
            Tick::Value(t) => t,
            Tick::NaT => unreachable!("checked above"),
        };
        let scaled = (stop_raw as i128) * (num as i128);
        let in_start_unit = i64::try_from(scaled.div_euclid(den as i128)).map_err(|_| Error::Overflow)?;
        let summed = start_raw.checked_add(in_start_unit).ok_or(Error::Overflow)?;
        RangeValue::new(start.descriptor, Tick::Value(summed))
    } else {
        stop
    };

    let step = step.unwrap_or(RangeValue::new(start.descriptor, Tick::Value(1)));
    if step.tick.is_nat() {
        return Err(Error::ConversionFailure("arange: step is NaT".into()));
    }

    let common = algebra::gcd_descriptor(start.descriptor, stop.descriptor, kind)?;
    let common = algebra::gcd_descriptor(common, step.descriptor, kind)?;

    let to_common = |v: RangeValue| -> Result<i64> {
        if !algebra::is_castable(v.descriptor, common, kind, CastingMode::SameKind) {
            return Err(Error::CastingForbidden {
                src: v.descriptor.to_string(),
                dst: common.to_string(),
                mode: CastingMode::SameKind.to_string(),
            });
        }
        let (num, den) = algebra::conversion_factor(v.descriptor, common, kind)?;
        let raw = match v.tick {
            Tick::Value(t) => t,
            Tick::NaT => unreachable!("checked above"),
        };
        let scaled = (raw as i128) * (num as i128);
        i64::try_from(scaled.div_euclid(den as i128)).map_err(|_| Error::Overflow)
    };

    let start_t = to_common(start)?;
    let stop_t = to_common(stop)?;
    let step_t = to_common(step)?;

    let length = sequence_length(start_t, stop_t, step_t)?;
    let mut out = Vec::with_capacity(length.max(0) as usize);
    let mut current = start_t;
    for _ in 0..length {
        out.push(Tick::Value(current));
        current = current
            .checked_add(step_t)
            .ok_or(Error::Overflow)?;
    }
    Ok((common, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::BaseUnit;

    fn day(tick: i64) -> RangeValue {
        RangeValue::new(Descriptor::new(BaseUnit::Day, 1).unwrap(), Tick::Value(tick))
    }

    #[test]
    fn e6_four_days_from_jan1_to_jan5() {
        let (descriptor, values) =
            arange(day(0), Some(day(4)), Some(day(1)), Kind::Instant, false).unwrap();
        assert_eq!(descriptor.base, BaseUnit::Day);
        let raw: Vec<i64> = values
            .into_iter()
            .map(|t| match t {
                Tick::Value(v) => v,
                Tick::NaT => unreachable!(),
            })
            .collect();
        assert_eq!(raw, vec![0, 1, 2, 3]);
    }

    #[test]
    fn missing_stop_defaults_range_to_zero_through_start() {
        let (_, values) = arange(day(3), None, None, Kind::Instant, false).unwrap();
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn zero_step_is_an_error() {
        let result = arange(
            day(0),
            Some(day(5)),
            Some(RangeValue::new(day(0).descriptor, Tick::Value(0))),
            Kind::Instant,
            false,
        );
        assert!(matches!(result, Err(Error::StepZero)));
    }

    #[test]
    fn negative_step_counts_down() {
        let (_, values) = arange(
            day(5),
            Some(day(0)),
            Some(RangeValue::new(Descriptor::new(BaseUnit::Day, 1).unwrap(), Tick::Value(-1))),
            Kind::Instant,
            false,
        )
        .unwrap();
        let raw: Vec<i64> = values
            .into_iter()
            .map(|t| match t {
                Tick::Value(v) => v,
                Tick::NaT => unreachable!(),
            })
            .collect();
        assert_eq!(raw, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn nat_start_is_rejected() {
        let nat = RangeValue::new(Descriptor::new(BaseUnit::Day, 1).unwrap(), Tick::NaT);
        assert!(arange(nat, Some(day(1)), None, Kind::Instant, false).is_err());
    }
}
