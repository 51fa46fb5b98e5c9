//! Coercion layer: turn an arbitrary external value into a concrete
//! `(Descriptor, Tick)` pair.

use std::sync::Once;

use nom::branch::alt;
use nom::character::complete::{char, digit1, i64 as nom_i64, one_of, u32 as nom_u32};
use nom::combinator::{all_consuming, map, opt, value};
use nom::sequence::{preceded, tuple};
use nom::IResult;

use crate::algebra;
use crate::calendar::{self, DateTimeFields};
use crate::descriptor::{CastingMode, Descriptor, Kind};
use crate::error::{Error, Result};
use crate::ticks::{self, Tick};
use crate::units::BaseUnit;

static TZINFO_DEPRECATION_WARNING: Once = Once::new();

/// Parses text into a broken-down moment plus the resolution the text
/// itself implies.
///
/// A trait (rather than a free function) so a host embedding this crate
/// can swap in a fuller ISO-8601/RFC-3339 implementation without touching
/// the coercion dispatch logic.
pub trait Iso8601Parser {
    /// Parse `text`, returning the broken-down moment and the unit its
    /// precision implies (`Day` for a date-only literal, `Microsecond`
    /// once a time-of-day is present). The literal `"NaT"`
    /// (case-insensitive) decodes to [`DateTimeFields::NAT`] at
    /// [`BaseUnit::Generic`].
    fn parse(&self, text: &str) -> Result<(DateTimeFields, BaseUnit)>;
}

/// Default [`Iso8601Parser`]: `YYYY-MM-DD[(T| )HH:MM:SS[.ffffff]][Z|±HH:MM]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicIso8601Parser;

fn parse_date(input: &str) -> IResult<&str, (i64, u32, u32)> {
    map(
        tuple((nom_i64, char('-'), nom_u32, char('-'), nom_u32)),
        |(y, _, m, _, d)| (y, m, d),
    )(input)
}

fn parse_fraction(input: &str) -> IResult<&str, u32> {
    map(preceded(char('.'), digit1), |frac: &str| {
        let mut digits = frac.to_string();
        digits.truncate(6);
        while digits.len() < 6 {
            digits.push('0');
        }
        digits.parse().unwrap_or(0)
    })(input)
}

fn parse_time(input: &str) -> IResult<&str, (u32, u32, u32, u32)> {
    let (input, (h, _, mi, _, s)) =
        tuple((nom_u32, char(':'), nom_u32, char(':'), nom_u32))(input)?;
    let (input, us) = opt(parse_fraction)(input)?;
    Ok((input, (h, mi, s, us.unwrap_or(0))))
}

fn parse_offset_minutes(input: &str) -> IResult<&str, i32> {
    alt((
        value(0, char('Z')),
        map(
            tuple((one_of("+-"), nom_u32, char(':'), nom_u32)),
            |(sign, h, _, m)| {
                let total = (h * 60 + m) as i32;
                if sign == '-' {
                    -total
                } else {
                    total
                }
            },
        ),
    ))(input)
}

fn parse_body(input: &str) -> IResult<&str, (DateTimeFields, Option<i32>, BaseUnit)> {
    let (input, (year, month, day)) = parse_date(input)?;
    let (input, time_sep) = opt(one_of(" T"))(input)?;
    if time_sep.is_none() {
        return Ok((
            input,
            (
                DateTimeFields::at_midnight(year, month as i32, day as i32),
                None,
                BaseUnit::Day,
            ),
        ));
    }
    let (input, (h, mi, s, us)) = parse_time(input)?;
    let (input, offset_min) = opt(parse_offset_minutes)(input)?;
    let mut fields = DateTimeFields::at_midnight(year, month as i32, day as i32);
    fields.hour = h as i32;
    fields.min = mi as i32;
    fields.sec = s as i32;
    fields.us = us as i32;
    Ok((input, (fields, offset_min, BaseUnit::Microsecond)))
}

impl Iso8601Parser for BasicIso8601Parser {
    fn parse(&self, text: &str) -> Result<(DateTimeFields, BaseUnit)> {
        if text.trim().eq_ignore_ascii_case("nat") {
            return Ok((DateTimeFields::NAT, BaseUnit::Generic));
        }
        let (fields, offset_min, unit) = all_consuming(parse_body)(text)
            .map(|(_, parsed)| parsed)
            .map_err(|_| Error::ConversionFailure(format!("not a valid ISO-8601 moment: {text}")))?;
        fields.validate()?;
        let mut fields = fields;
        if let Some(offset) = offset_min {
            if offset != 0 {
                calendar::add_minutes(&mut fields, -(offset as i64));
            }
        }
        Ok((fields, unit))
    }
}

/// Bridges a host "datetime-like" object: integer
/// `year/month/day` plus optional time-of-day fields and a UTC offset.
/// Shaped as accessor methods with default `None` bodies so a host
/// embedding this crate only needs to implement the fields its own date
/// type actually carries.
pub trait BrokenDownDate {
    /// Calendar year.
    fn year(&self) -> i64;
    /// Month, `1..=12`.
    fn month(&self) -> i32;
    /// Day of month.
    fn day(&self) -> i32;
    /// Hour, if the host type carries time-of-day fields.
    fn hour(&self) -> Option<i32> {
        None
    }
    /// Minute, if present.
    fn minute(&self) -> Option<i32> {
        None
    }
    /// Second, if present.
    fn second(&self) -> Option<i32> {
        None
    }
    /// Microsecond, if present.
    fn microsecond(&self) -> Option<i32> {
        None
    }
    /// UTC offset in minutes, if the host object carries `tzinfo`.
    /// Non-`None` triggers a one-shot deprecation warning on first use.
    fn utc_offset_minutes(&self) -> Option<i32> {
        None
    }
}

/// Bridges a host "timedelta-like" object: integer
/// `days/seconds/microseconds`, assembled as
/// `days*86_400_000_000 + seconds*1_000_000 + microseconds`.
pub trait BrokenDownDuration {
    /// Whole days.
    fn days(&self) -> i64;
    /// Seconds within the day, `0..86_400`.
    fn seconds(&self) -> i64;
    /// Microseconds within the second, `0..1_000_000`.
    fn microseconds(&self) -> i64;
}

/// The shapes of external value the coercion layer accepts.
pub enum CoerceInput<'a> {
    /// A textual moment or duration, delegated to an [`Iso8601Parser`].
    Text(&'a str),
    /// A bare integer; requires a concrete, non-generic target descriptor.
    Integer(i64),
    /// An existing scalar at a known descriptor.
    Scalar(Descriptor, Tick),
    /// A host date/datetime-like object.
    Date(&'a dyn BrokenDownDate),
    /// A host timedelta-like object.
    Duration(&'a dyn BrokenDownDuration),
    /// An explicit NaT / `None`.
    Nat,
}

/// Coerce `input` to `target` (possibly [`BaseUnit::Error`], meaning
/// "infer"), under `kind` and `mode`.
///
/// Under [`CastingMode::Unsafe`], a [`Error::ConversionFailure`] that would
/// otherwise propagate is swallowed into a silent NaT at
/// [`BaseUnit::Generic`] (§7's propagation policy: "the `Unsafe` casting
/// mode upgrades any `ConversionFailure` into silent NaT").
pub fn coerce(
    input: CoerceInput<'_>,
    target: Descriptor,
    kind: Kind,
    mode: CastingMode,
    parser: &dyn Iso8601Parser,
) -> Result<(Descriptor, Tick)> {
    match coerce_inner(input, target, kind, mode, parser) {
        Err(Error::ConversionFailure(_)) if mode == CastingMode::Unsafe => {
            Ok((Descriptor::generic(), Tick::NaT))
        }
        other => other,
    }
}

fn coerce_inner(
    input: CoerceInput<'_>,
    target: Descriptor,
    kind: Kind,
    mode: CastingMode,
    parser: &dyn Iso8601Parser,
) -> Result<(Descriptor, Tick)> {
    match input {
        CoerceInput::Text(text) => {
            let (fields, suggested) = parser.parse(text)?;
            if fields.is_nat() {
                return Ok((Descriptor::generic(), Tick::NaT));
            }
            let descriptor = if target.base == BaseUnit::Error {
                Descriptor::new(suggested, 1)?
            } else {
                target
            };
            let tick = ticks::encode(&fields, descriptor)?;
            Ok((descriptor, tick))
        }
        CoerceInput::Integer(value) => {
            if target.base == BaseUnit::Error || target.base == BaseUnit::Generic {
                return Err(Error::GenericUnitMisuse(
                    "integer requires a specified unit".into(),
                ));
            }
            Ok((target, Tick::Value(value)))
        }
        CoerceInput::Scalar(src, tick) => {
            if target.base == BaseUnit::Error {
                return Ok((src, tick));
            }
            if tick.is_nat() {
                return Ok((target, Tick::NaT));
            }
            if !algebra::is_castable(src, target, kind, mode) {
                return Err(Error::CastingForbidden {
                    src: src.to_string(),
                    dst: target.to_string(),
                    mode: mode.to_string(),
                });
            }
            let fields = ticks::decode(tick, src)?;
            let new_tick = ticks::encode(&fields, target)?;
            Ok((target, new_tick))
        }
        CoerceInput::Date(date) => {
            let has_time = date.hour().is_some()
                || date.minute().is_some()
                || date.second().is_some()
                || date.microsecond().is_some();
            let suggested = if has_time {
                BaseUnit::Microsecond
            } else {
                BaseUnit::Day
            };
            let mut fields = DateTimeFields::at_midnight(date.year(), date.month(), date.day());
            fields.hour = date.hour().unwrap_or(0);
            fields.min = date.minute().unwrap_or(0);
            fields.sec = date.second().unwrap_or(0);
            fields.us = date.microsecond().unwrap_or(0);
            fields.validate()?;
            if let Some(offset) = date.utc_offset_minutes() {
                TZINFO_DEPRECATION_WARNING.call_once(|| {
                    log::warn!(
                        "passing a tzinfo-bearing datetime is deprecated; offsets are normalised to UTC"
                    );
                });
                if offset != 0 {
                    calendar::add_minutes(&mut fields, -(offset as i64));
                }
            }
            let descriptor = if target.base == BaseUnit::Error {
                Descriptor::new(suggested, 1)?
            } else {
                target
            };
            let tick = ticks::encode(&fields, descriptor)?;
            Ok((descriptor, tick))
        }
        CoerceInput::Duration(duration) => {
            let micros = duration
                .days()
                .checked_mul(86_400_000_000)
                .and_then(|d| d.checked_add(duration.seconds().checked_mul(1_000_000)?))
                .and_then(|d| d.checked_add(duration.microseconds()))
                .ok_or(Error::Overflow)?;
            let implied = if duration.microseconds() != 0 {
                BaseUnit::Microsecond
            } else if duration.seconds() != 0 {
                BaseUnit::Second
            } else {
                BaseUnit::Day
            };
            let descriptor = if target.base == BaseUnit::Error {
                Descriptor::new(implied, 1)?
            } else {
                target
            };
            let micro_descriptor = Descriptor::new(BaseUnit::Microsecond, 1)?;
            if descriptor == micro_descriptor {
                return Ok((descriptor, Tick::Value(micros)));
            }
            if !algebra::is_castable(micro_descriptor, descriptor, kind, mode) {
                return Err(Error::CastingForbidden {
                    src: micro_descriptor.to_string(),
                    dst: descriptor.to_string(),
                    mode: mode.to_string(),
                });
            }
            // 1 microsecond tick == num/den ticks of `descriptor`; floor
            // toward negative infinity the same way apply_multiplier_encode
            // does, since `descriptor` may be coarser than a microsecond.
            let (num, den) = algebra::conversion_factor(micro_descriptor, descriptor, kind)?;
            let scaled = (micros as i128) * (num as i128);
            let q = scaled.div_euclid(den as i128);
            let converted = i64::try_from(q).map_err(|_| Error::Overflow)?;
            Ok((descriptor, Tick::Value(converted)))
        }
        CoerceInput::Nat => {
            if matches!(mode, CastingMode::SameKind | CastingMode::Unsafe) {
                Ok((Descriptor::generic(), Tick::NaT))
            } else {
                Err(Error::ConversionFailure("could not convert None".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_date_only_as_day_resolution() {
        let (fields, unit) = BasicIso8601Parser.parse("2020-01-05").unwrap();
        assert_eq!(unit, BaseUnit::Day);
        assert_eq!((fields.year, fields.month, fields.day), (2020, 1, 5));
    }

    #[test]
    fn parses_datetime_with_fraction_and_offset() {
        let (fields, unit) = BasicIso8601Parser
            .parse("2020-01-05T10:30:00.5+02:00")
            .unwrap();
        assert_eq!(unit, BaseUnit::Microsecond);
        // 10:30 at +02:00 normalises to 08:30 UTC.
        assert_eq!((fields.hour, fields.min, fields.us), (8, 30, 500_000));
    }

    #[test]
    fn parses_nat_case_insensitively() {
        let (fields, unit) = BasicIso8601Parser.parse("nat").unwrap();
        assert!(fields.is_nat());
        assert_eq!(unit, BaseUnit::Generic);
        assert!(BasicIso8601Parser.parse("NaT").unwrap().0.is_nat());
    }

    #[test]
    fn rejects_garbage_text() {
        assert!(BasicIso8601Parser.parse("not-a-date").is_err());
    }

    #[test]
    fn unsafe_casting_upgrades_conversion_failure_to_silent_nat() {
        let result = coerce(
            CoerceInput::Text("not-a-date"),
            Descriptor::new(BaseUnit::Error, 1).unwrap(),
            Kind::Instant,
            CastingMode::Unsafe,
            &BasicIso8601Parser,
        )
        .unwrap();
        assert_eq!(result, (Descriptor::generic(), Tick::NaT));

        // Under any other mode the failure still propagates as an error.
        let still_fails = coerce(
            CoerceInput::Text("not-a-date"),
            Descriptor::new(BaseUnit::Error, 1).unwrap(),
            Kind::Instant,
            CastingMode::Safe,
            &BasicIso8601Parser,
        );
        assert!(matches!(still_fails, Err(Error::ConversionFailure(_))));
    }

    #[test]
    fn integer_without_unit_is_rejected() {
        let result = coerce(
            CoerceInput::Integer(5),
            Descriptor::generic(),
            Kind::Instant,
            CastingMode::Safe,
            &BasicIso8601Parser,
        );
        assert!(matches!(result, Err(Error::GenericUnitMisuse(_))));
    }

    #[test]
    fn text_coercion_infers_day_unit() {
        let (descriptor, tick) = coerce(
            CoerceInput::Text("1970-01-02"),
            Descriptor::new(BaseUnit::Error, 1).unwrap(),
            Kind::Instant,
            CastingMode::Safe,
            &BasicIso8601Parser,
        )
        .unwrap();
        assert_eq!(descriptor.base, BaseUnit::Day);
        assert_eq!(tick, Tick::Value(1));
    }

    struct FixedDuration {
        days: i64,
        seconds: i64,
        microseconds: i64,
    }
    impl BrokenDownDuration for FixedDuration {
        fn days(&self) -> i64 {
            self.days
        }
        fn seconds(&self) -> i64 {
            self.seconds
        }
        fn microseconds(&self) -> i64 {
            self.microseconds
        }
    }

    #[test]
    fn duration_object_assembles_microseconds() {
        let duration = FixedDuration {
            days: 1,
            seconds: 30,
            microseconds: 500,
        };
        let target = Descriptor::new(BaseUnit::Microsecond, 1).unwrap();
        let (_, tick) = coerce(
            CoerceInput::Duration(&duration),
            target,
            Kind::Duration,
            CastingMode::Safe,
            &BasicIso8601Parser,
        )
        .unwrap();
        assert_eq!(tick, Tick::Value(86_400_000_000 + 30_000_000 + 500));
    }

    #[test]
    fn nat_scalar_with_infer_target_keeps_source_descriptor_not_error_base() {
        let src = Descriptor::new(BaseUnit::Second, 1).unwrap();
        let (descriptor, tick) = coerce(
            CoerceInput::Scalar(src, Tick::NaT),
            Descriptor::new(BaseUnit::Error, 1).unwrap(),
            Kind::Instant,
            CastingMode::Safe,
            &BasicIso8601Parser,
        )
        .unwrap();
        assert_eq!(descriptor, src);
        assert_eq!(tick, Tick::NaT);
    }
}
