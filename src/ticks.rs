//! Tick codec: exact bidirectional maps between a broken-down struct and a
//! tick, one per base unit.

use crate::calendar::{self, DateTimeFields};
use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::units::BaseUnit;

/// Not-a-Time sentinel on the wire: `i64::MIN`.
pub const NAT_RAW: i64 = i64::MIN;

/// A tick value that keeps NaT out of the arithmetic value space.
///
/// The arithmetic engine must never synthesise `i64::MIN` from a valid
/// computation; using
/// this tagged representation internally and only collapsing to the raw
/// sentinel at [`Tick::to_raw`]/[`Tick::from_raw`] makes that a type-level
/// guarantee rather than a discipline every call site has to maintain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tick {
    /// Not-a-Time.
    NaT,
    /// A concrete tick count. Never `i64::MIN`.
    Value(i64),
}

impl Tick {
    /// Decode the wire representation (`i64::MIN` = NaT).
    pub fn from_raw(raw: i64) -> Tick {
        if raw == NAT_RAW {
            Tick::NaT
        } else {
            Tick::Value(raw)
        }
    }

    /// Encode to the wire representation.
    pub fn to_raw(self) -> i64 {
        match self {
            Tick::NaT => NAT_RAW,
            Tick::Value(v) => v,
        }
    }

    /// `true` for [`Tick::NaT`].
    pub fn is_nat(self) -> bool {
        matches!(self, Tick::NaT)
    }
}

/// Floor division toward negative infinity, on `i128` so intermediate
/// sub-attosecond accumulation never overflows before the final narrowing
/// to `i64`.
fn floor_div128(a: i128, b: i128) -> i128 {
    let q = a / b;
    let r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

const ATTOS_PER_DAY: i128 = 86_400 * ATTOS_PER_SECOND;
const ATTOS_PER_SECOND: i128 = 1_000_000_000_000_000_000;

/// Attoseconds represented by one tick of `base`, for `base` in
/// `Hour..=Attosecond`.
fn attos_per_unit(base: BaseUnit) -> i128 {
    match base {
        BaseUnit::Hour => 3600 * ATTOS_PER_SECOND,
        BaseUnit::Minute => 60 * ATTOS_PER_SECOND,
        BaseUnit::Second => ATTOS_PER_SECOND,
        BaseUnit::Millisecond => 1_000_000_000_000_000,
        BaseUnit::Microsecond => 1_000_000_000_000,
        BaseUnit::Nanosecond => 1_000_000_000,
        BaseUnit::Picosecond => 1_000_000,
        BaseUnit::Femtosecond => 1_000,
        BaseUnit::Attosecond => 1,
        _ => unreachable!("only called for sub-day bases"),
    }
}

/// Total attoseconds elapsed since the Unix epoch for a normalised,
/// non-NaT struct. Accumulated in `i128`: `86_400 * 1e18` per day leaves
/// ample headroom (`i128::MAX` is about `1.7e38`) for the proleptic date
/// range this library supports.
fn attos_since_epoch(fields: &DateTimeFields) -> i128 {
    let days = calendar::ymd_to_days(fields.year, fields.month, fields.day) as i128;
    let intra_day = (fields.hour as i128 * 3600 + fields.min as i128 * 60 + fields.sec as i128)
        * ATTOS_PER_SECOND
        + fields.us as i128 * 1_000_000_000_000
        + fields.ps as i128 * 1_000_000
        + fields.atto as i128;
    days * ATTOS_PER_DAY + intra_day
}

/// Inverse of [`attos_since_epoch`]: decompose a total attosecond count
/// back into a normalised struct.
fn fields_from_attos(total: i128) -> DateTimeFields {
    let days = floor_div128(total, ATTOS_PER_DAY);
    let remainder = total - days * ATTOS_PER_DAY; // [0, ATTOS_PER_DAY)

    let atto = (remainder % 1_000) as i32; // atto-within-picosecond
    let in_picos = remainder / 1_000; // [0, 86_400 * 1e15)
    let ps = (in_picos % 1_000_000) as i32; // ps-within-microsecond
    let in_micros = in_picos / 1_000_000; // [0, 86_400 * 1e6)
    let us = (in_micros % 1_000_000) as i32; // us-within-second
    let sec_total = in_micros / 1_000_000; // [0, 86_400)
    let hour = (sec_total / 3600) as i32;
    let min = ((sec_total / 60) % 60) as i32;
    let sec = (sec_total % 60) as i32;

    let (y, m, d) = calendar::days_to_ymd(days as i64);
    DateTimeFields {
        year: y,
        month: m,
        day: d,
        hour,
        min,
        sec,
        us,
        ps,
        atto,
    }
}

/// Encode a broken-down struct to a tick at the given descriptor.
///
/// `base == Generic` with a non-NaT struct is a [`Error::GenericUnitMisuse`];
/// `base == Error` is always a corruption error. NaT input always yields
/// `Tick::NaT`.
pub fn encode(fields: &DateTimeFields, descriptor: Descriptor) -> Result<Tick> {
    if fields.is_nat() {
        return Ok(Tick::NaT);
    }
    if descriptor.base == BaseUnit::Error {
        return Err(Error::GenericUnitMisuse(
            "descriptor unit was never resolved".into(),
        ));
    }
    if descriptor.base == BaseUnit::Generic {
        return Err(Error::GenericUnitMisuse(
            "cannot create a non-NaT generic-unit value".into(),
        ));
    }
    fields.validate()?;

    let unit_tick: i64 = match descriptor.base {
        BaseUnit::Year => fields.year - 1970,
        BaseUnit::Month => 12 * (fields.year - 1970) + (fields.month as i64 - 1),
        BaseUnit::Week => {
            let days = calendar::ymd_to_days(fields.year, fields.month, fields.day);
            floor_div(days, 7)
        }
        BaseUnit::Day => calendar::ymd_to_days(fields.year, fields.month, fields.day),
        _ => {
            let total_attos = attos_since_epoch(fields);
            let per_unit = attos_per_unit(descriptor.base);
            i64::try_from(floor_div128(total_attos, per_unit)).map_err(|_| Error::Overflow)?
        }
    };

    apply_multiplier_encode(unit_tick, descriptor.num)
}

/// Decode a tick at the given descriptor back to a broken-down struct.
pub fn decode(tick: Tick, descriptor: Descriptor) -> Result<DateTimeFields> {
    let raw = match tick {
        Tick::NaT => return Ok(DateTimeFields::NAT),
        Tick::Value(v) => v,
    };
    if descriptor.base == BaseUnit::Error {
        return Err(Error::GenericUnitMisuse(
            "descriptor unit was never resolved".into(),
        ));
    }
    if descriptor.base == BaseUnit::Generic {
        return Err(Error::GenericUnitMisuse(
            "cannot create a non-NaT generic-unit value".into(),
        ));
    }

    let unit_tick = apply_multiplier_decode(raw, descriptor.num)?;

    Ok(match descriptor.base {
        BaseUnit::Year => {
            let year = unit_tick.checked_add(1970).ok_or(Error::Overflow)?;
            DateTimeFields::at_midnight(year, 1, 1)
        }
        BaseUnit::Month => {
            let months_since_epoch = unit_tick;
            let year = 1970 + floor_div(months_since_epoch, 12);
            let month = (months_since_epoch - floor_div(months_since_epoch, 12) * 12) as i32 + 1;
            DateTimeFields::at_midnight(year, month, 1)
        }
        BaseUnit::Week => {
            let days = unit_tick.checked_mul(7).ok_or(Error::Overflow)?;
            let (y, m, d) = calendar::days_to_ymd(days);
            DateTimeFields::at_midnight(y, m, d)
        }
        BaseUnit::Day => {
            let (y, m, d) = calendar::days_to_ymd(unit_tick);
            DateTimeFields::at_midnight(y, m, d)
        }
        _ => {
            let per_unit = attos_per_unit(descriptor.base);
            let total_attos = (unit_tick as i128)
                .checked_mul(per_unit)
                .ok_or(Error::Overflow)?;
            fields_from_attos(total_attos)
        }
    })
}

/// A descriptor's multiplier `num > 1` truncates the tick toward negative
/// infinity on encode.
fn apply_multiplier_encode(tick: i64, num: i64) -> Result<Tick> {
    let divided = if num == 1 { tick } else { floor_div(tick, num) };
    if divided == NAT_RAW {
        return Err(Error::Overflow);
    }
    Ok(Tick::Value(divided))
}

/// Inverse of [`apply_multiplier_encode`]: multiplies on decode.
fn apply_multiplier_decode(tick: i64, num: i64) -> Result<i64> {
    tick.checked_mul(num).ok_or(Error::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Descriptor;

    fn day1() -> Descriptor {
        Descriptor::new(BaseUnit::Day, 1).unwrap()
    }
    fn sec1() -> Descriptor {
        Descriptor::new(BaseUnit::Second, 1).unwrap()
    }

    #[test]
    fn e1_epoch_scenarios() {
        let epoch = DateTimeFields::at_midnight(1970, 1, 1);
        assert_eq!(encode(&epoch, day1()).unwrap(), Tick::Value(0));
        assert_eq!(encode(&epoch, sec1()).unwrap(), Tick::Value(0));

        let before = DateTimeFields::at_midnight(1969, 12, 31);
        assert_eq!(encode(&before, day1()).unwrap(), Tick::Value(-1));
    }

    #[test]
    fn tick_round_trip_day_and_second() {
        for &(y, m, d) in &[(1970, 1, 1), (2000, 2, 29), (1, 1, 1), (-44, 6, 15)] {
            let fields = DateTimeFields::at_midnight(y, m, d);
            let tick = encode(&fields, day1()).unwrap();
            assert_eq!(decode(tick, day1()).unwrap(), fields);
        }
        let mut fields = DateTimeFields::at_midnight(2020, 7, 4);
        fields.hour = 13;
        fields.min = 45;
        fields.sec = 9;
        let tick = encode(&fields, sec1()).unwrap();
        assert_eq!(decode(tick, sec1()).unwrap(), fields);
    }

    #[test]
    fn tick_round_trip_microsecond_with_subsecond_fields() {
        let us = Descriptor::new(BaseUnit::Microsecond, 1).unwrap();
        let mut fields = DateTimeFields::at_midnight(2022, 11, 3);
        fields.hour = 8;
        fields.min = 15;
        fields.sec = 30;
        fields.us = 123_456;
        let tick = encode(&fields, us).unwrap();
        assert_eq!(decode(tick, us).unwrap(), fields);
    }

    #[test]
    fn hour_cast_from_day() {
        let day = Descriptor::new(BaseUnit::Day, 1).unwrap();
        let hour = Descriptor::new(BaseUnit::Hour, 1).unwrap();
        let fields = decode(Tick::Value(1), day).unwrap();
        let hour_tick = encode(&fields, hour).unwrap();
        assert_eq!(hour_tick, Tick::Value(24));
    }

    #[test]
    fn nat_propagates_through_encode_and_decode() {
        assert_eq!(encode(&DateTimeFields::NAT, day1()).unwrap(), Tick::NaT);
        assert!(decode(Tick::NaT, day1()).unwrap().is_nat());
    }

    #[test]
    fn generic_base_rejects_concrete_struct() {
        let generic = Descriptor::new(BaseUnit::Generic, 1).unwrap();
        let fields = DateTimeFields::at_midnight(2020, 1, 1);
        assert!(matches!(
            encode(&fields, generic),
            Err(Error::GenericUnitMisuse(_))
        ));
    }

    #[test]
    fn week_floor_divides_toward_negative_infinity() {
        let week = Descriptor::new(BaseUnit::Week, 1).unwrap();
        let fields = DateTimeFields::at_midnight(1969, 12, 25); // day -7
        assert_eq!(encode(&fields, week).unwrap(), Tick::Value(-1));
        let fields = DateTimeFields::at_midnight(1969, 12, 30); // day -2
        assert_eq!(encode(&fields, week).unwrap(), Tick::Value(-1));
    }

    #[test]
    fn attosecond_near_epoch_round_trips_within_the_narrow_window() {
        // ~9.2s is the window before an attosecond tick needs more than
        // an i64 to represent.
        let atto = Descriptor::new(BaseUnit::Attosecond, 1).unwrap();
        let mut fields = DateTimeFields::at_midnight(1970, 1, 1);
        fields.sec = 9;
        let tick = encode(&fields, atto).unwrap();
        assert_eq!(decode(tick, atto).unwrap(), fields);
    }

    #[test]
    fn attosecond_far_from_epoch_overflows_instead_of_wrapping() {
        let atto = Descriptor::new(BaseUnit::Attosecond, 1).unwrap();
        let fields = DateTimeFields::at_midnight(1970, 1, 2);
        assert!(matches!(encode(&fields, atto), Err(Error::Overflow)));
    }
}
