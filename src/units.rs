//! Unit enumeration and the per-unit conversion tables.

use std::fmt;

/// Base temporal unit.
///
/// Ordered coarse to fine; `PartialOrd`/`Ord` follow declaration order so
/// that "source base is coarser-or-equal to destination base" (the Safe
/// casting rule, §4.D) is just `src <= dst`. The gap at the position of the
/// retired "business day" unit is preserved on purpose: it keeps every
/// later discriminant stable across persisted data (§9, "Unit enumeration
/// with a hole").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i8)]
pub enum BaseUnit {
    /// Calendar year.
    Year = 0,
    /// Calendar month.
    Month = 1,
    /// 7-day week.
    Week = 2,
    /// Retired business-day unit. Never constructible, never parsed, never
    /// printed; kept only so later discriminants don't shift.
    #[doc(hidden)]
    BusinessDayReserved = 3,
    /// Calendar day.
    Day = 4,
    /// Hour.
    Hour = 5,
    /// Minute.
    Minute = 6,
    /// Second.
    Second = 7,
    /// Millisecond.
    Millisecond = 8,
    /// Microsecond.
    Microsecond = 9,
    /// Nanosecond.
    Nanosecond = 10,
    /// Picosecond.
    Picosecond = 11,
    /// Femtosecond.
    Femtosecond = 12,
    /// Attosecond.
    Attosecond = 13,
    /// Resolution not yet chosen; absorbed by any concrete unit on promotion.
    Generic = 14,
    /// Sentinel meaning "unit not yet determined"; never valid outside a
    /// single in-flight routine.
    Error = 15,
}

impl BaseUnit {
    /// All bases reachable from the parser/formatter, coarse to fine.
    pub const PARSEABLE: [BaseUnit; 13] = [
        BaseUnit::Year,
        BaseUnit::Month,
        BaseUnit::Week,
        BaseUnit::Day,
        BaseUnit::Hour,
        BaseUnit::Minute,
        BaseUnit::Second,
        BaseUnit::Millisecond,
        BaseUnit::Microsecond,
        BaseUnit::Nanosecond,
        BaseUnit::Picosecond,
        BaseUnit::Femtosecond,
        BaseUnit::Attosecond,
    ];

    /// The linear sub-chain, Week down to Attosecond, used for exact
    /// integer conversions (§9, "a linear sub-monoid").
    pub const LINEAR_CHAIN: [BaseUnit; 11] = [
        BaseUnit::Week,
        BaseUnit::Day,
        BaseUnit::Hour,
        BaseUnit::Minute,
        BaseUnit::Second,
        BaseUnit::Millisecond,
        BaseUnit::Microsecond,
        BaseUnit::Nanosecond,
        BaseUnit::Picosecond,
        BaseUnit::Femtosecond,
        BaseUnit::Attosecond,
    ];

    /// `true` for `Year`/`Month`, the nonlinear pair that has no exact
    /// factor to the linear chain.
    pub fn is_nonlinear(self) -> bool {
        matches!(self, BaseUnit::Year | BaseUnit::Month)
    }

    /// Human-readable symbol, as used by the descriptor parser/formatter.
    pub fn symbol(self) -> &'static str {
        match self {
            BaseUnit::Year => "Y",
            BaseUnit::Month => "M",
            BaseUnit::Week => "W",
            BaseUnit::BusinessDayReserved => "",
            BaseUnit::Day => "D",
            BaseUnit::Hour => "h",
            BaseUnit::Minute => "m",
            BaseUnit::Second => "s",
            BaseUnit::Millisecond => "ms",
            BaseUnit::Microsecond => "us",
            BaseUnit::Nanosecond => "ns",
            BaseUnit::Picosecond => "ps",
            BaseUnit::Femtosecond => "fs",
            BaseUnit::Attosecond => "as",
            BaseUnit::Generic => "generic",
            BaseUnit::Error => "",
        }
    }

    /// Parse a unit symbol, the inverse of [`symbol`](Self::symbol).
    pub fn from_symbol(s: &str) -> Option<BaseUnit> {
        Some(match s {
            "Y" => BaseUnit::Year,
            "M" => BaseUnit::Month,
            "W" => BaseUnit::Week,
            "D" => BaseUnit::Day,
            "h" => BaseUnit::Hour,
            "m" => BaseUnit::Minute,
            "s" => BaseUnit::Second,
            "ms" => BaseUnit::Millisecond,
            "us" => BaseUnit::Microsecond,
            "ns" => BaseUnit::Nanosecond,
            "ps" => BaseUnit::Picosecond,
            "fs" => BaseUnit::Femtosecond,
            "as" => BaseUnit::Attosecond,
            "generic" | "" => BaseUnit::Generic,
            _ => return None,
        })
    }

    /// Multiplicative step from this unit down to the next-finer unit in
    /// the linear chain, i.e. `factor_chain(self -> next)`. `None` past the
    /// finest unit or outside the linear chain.
    pub fn step_to_finer(self) -> Option<i64> {
        Some(match self {
            BaseUnit::Week => 7,
            BaseUnit::Day => 24,
            BaseUnit::Hour => 60,
            BaseUnit::Minute => 60,
            BaseUnit::Second => 1000,
            BaseUnit::Millisecond => 1000,
            BaseUnit::Microsecond => 1000,
            BaseUnit::Nanosecond => 1000,
            BaseUnit::Picosecond => 1000,
            BaseUnit::Femtosecond => 1000,
            _ => return None,
        })
    }

    /// Index of `self` within [`LINEAR_CHAIN`](Self::LINEAR_CHAIN), if it
    /// belongs there.
    fn linear_index(self) -> Option<usize> {
        Self::LINEAR_CHAIN.iter().position(|&b| b == self)
    }

    /// The next-finer unit in [`LINEAR_CHAIN`](Self::LINEAR_CHAIN), if any.
    /// Used by the descriptor parser's `/den` rewrite.
    pub fn next_finer(self) -> Option<BaseUnit> {
        let idx = self.linear_index()?;
        Self::LINEAR_CHAIN.get(idx + 1).copied()
    }

    /// Exact product of `step_to_finer` from `self` down to `other`
    /// (inclusive of `self`, exclusive of `other`). Both units must lie in
    /// the linear chain and `self` must be coarser-or-equal to `other`.
    /// Returns `None` on overflow or when the pair does not form a valid
    /// coarse-to-fine span of the linear chain.
    pub fn linear_factor_to(self, other: BaseUnit) -> Option<u64> {
        let from = self.linear_index()?;
        let to = other.linear_index()?;
        if from > to {
            return None;
        }
        let mut acc: u64 = 1;
        for &b in &Self::LINEAR_CHAIN[from..to] {
            acc = acc.checked_mul(b.step_to_finer()? as u64)?;
        }
        Some(acc)
    }
}

impl fmt::Display for BaseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Days in each month, non-leap and leap years, 0-indexed by month.
pub const DAYS_IN_MONTH: [[i32; 12]; 2] = [
    [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
    [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
];

/// Cumulative days before each month (index 0 = 0, index 12 = days in year).
pub const fn cumulative_days(leap: bool) -> [i32; 13] {
    let table = if leap {
        DAYS_IN_MONTH[1]
    } else {
        DAYS_IN_MONTH[0]
    };
    let mut out = [0i32; 13];
    let mut i = 1;
    while i < 13 {
        out[i] = out[i - 1] + table[i - 1];
        i += 1;
    }
    out
}

/// Number of days in `month` (1-12) of `year`.
pub fn days_in_month(year: i64, month: i32) -> i32 {
    DAYS_IN_MONTH[super::calendar::is_leap_year(year) as usize][(month - 1) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip() {
        for &b in BaseUnit::PARSEABLE.iter() {
            assert_eq!(BaseUnit::from_symbol(b.symbol()), Some(b));
        }
        assert_eq!(BaseUnit::from_symbol("generic"), Some(BaseUnit::Generic));
        assert_eq!(BaseUnit::from_symbol(""), Some(BaseUnit::Generic));
    }

    #[test]
    fn reserved_gap_is_not_parseable() {
        assert!(!BaseUnit::PARSEABLE.contains(&BaseUnit::BusinessDayReserved));
        assert_eq!(BaseUnit::from_symbol("businessday"), None);
    }

    #[test]
    fn day_to_second_factor_is_86400() {
        assert_eq!(BaseUnit::Day.linear_factor_to(BaseUnit::Second), Some(86_400));
    }

    #[test]
    fn week_to_attosecond_overflows_u64() {
        // 7 * 86_400 * 1000^6 vastly exceeds u64::MAX; this must be detected,
        // not silently wrapped (see algebra::conversion_factor's Overflow path).
        assert_eq!(BaseUnit::Week.linear_factor_to(BaseUnit::Attosecond), None);
    }

    #[test]
    fn day_to_nanosecond_fits_u64() {
        assert_eq!(
            BaseUnit::Day.linear_factor_to(BaseUnit::Nanosecond),
            Some(86_400_000_000_000)
        );
    }

    #[test]
    fn cumulative_days_matches_month_table() {
        let cum = cumulative_days(false);
        assert_eq!(cum[0], 0);
        assert_eq!(cum[12], 365);
        let cum_leap = cumulative_days(true);
        assert_eq!(cum_leap[12], 366);
    }
}
