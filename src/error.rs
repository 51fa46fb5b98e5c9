//! Error taxonomy for the temporal value core.

use std::fmt;

/// All failure kinds the core can raise.
///
/// Variants correspond 1:1 to the kinds in the error handling design: each
/// describes a condition, not a call site, so the same variant can surface
/// from several different entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Textual unit symbol not in the descriptor grammar.
    InvalidUnit(String),
    /// Malformed `[...]` literal or tuple outside size 2-4.
    InvalidDescriptor(String),
    /// Non-NaT value demanded at `Generic` base, integer input without a
    /// specified unit, or a conversion from a specific unit to `Generic`.
    GenericUnitMisuse(String),
    /// Castability check failed under the requested casting mode.
    CastingForbidden {
        /// Human-readable source descriptor.
        src: String,
        /// Human-readable destination descriptor.
        dst: String,
        /// Casting mode that was requested.
        mode: String,
    },
    /// Conversion factor or GCD alignment exceeded the safety margin.
    Overflow,
    /// Month outside `[1,12]` or day outside `[1, days_in_month]`.
    InvalidDate {
        /// Offending year.
        year: i64,
        /// Offending month.
        month: i32,
        /// Offending day.
        day: i32,
    },
    /// Hour/minute/second/microsecond outside their valid ranges.
    InvalidTime {
        /// Offending hour.
        hour: i32,
        /// Offending minute.
        min: i32,
        /// Offending second.
        sec: i32,
    },
    /// Range generator was given a zero step.
    StepZero,
    /// Coercion layer exhausted all applicable strategies.
    ConversionFailure(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUnit(s) => write!(f, "'{s}' is not a recognised unit"),
            Self::InvalidDescriptor(s) => write!(f, "invalid unit descriptor: {s}"),
            Self::GenericUnitMisuse(s) => write!(f, "{s}"),
            Self::CastingForbidden { src, dst, mode } => write!(
                f,
                "cannot cast from {src} to {dst} under casting rule '{mode}'"
            ),
            Self::Overflow => write!(f, "conversion factor or multiplier overflowed"),
            Self::InvalidDate { year, month, day } => {
                write!(f, "invalid date {year:04}-{month:02}-{day:02}")
            }
            Self::InvalidTime { hour, min, sec } => {
                write!(f, "invalid time {hour:02}:{min:02}:{sec:02}")
            }
            Self::StepZero => write!(f, "step cannot be zero"),
            Self::ConversionFailure(s) => write!(f, "could not convert: {s}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
