//! Descriptor grammar: `[<num><base>]`, `[<base>]`, `[generic]`, `[]`, the
//! `name[...]` type-string form, and the tuple form.

use std::sync::Once;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, digit1};
use nom::combinator::{all_consuming, eof, map_res, opt, value};
use nom::sequence::{delimited, tuple};
use nom::IResult;

use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::units::BaseUnit;

static LEGACY_TUPLE_WARNING: Once = Once::new();

fn parse_num(input: &str) -> IResult<&str, i64> {
    map_res(digit1, str::parse::<i64>)(input)
}

fn parse_symbol(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphabetic())(input)
}

fn parse_unit_with_multiplier(input: &str) -> IResult<&str, (BaseUnit, i64)> {
    map_res(tuple((opt(parse_num), parse_symbol)), |(num, sym)| {
        let base = BaseUnit::from_symbol(sym).ok_or_else(|| Error::InvalidUnit(sym.to_string()))?;
        Ok::<_, Error>((base, num.unwrap_or(1)))
    })(input)
}

fn parse_divisor(input: &str) -> IResult<&str, i64> {
    nom::sequence::preceded(char('/'), parse_num)(input)
}

/// Rewrite `base/den`: walk the linear chain from `base`
/// toward finer units, accumulating the step factor, until `den` divides
/// the accumulated factor exactly; the resulting base and `num * (factor /
/// den)` is the canonical descriptor. `"[1W/7]"` -> `(Day, 1)` this way:
/// the first step (Week -> Day) already contributes a factor of 7.
fn rewrite_divisor(base: BaseUnit, num: i64, den: i64) -> std::result::Result<Descriptor, Error> {
    let mut current = base;
    let mut accumulated: i64 = 1;
    loop {
        let next = current
            .next_finer()
            .ok_or_else(|| Error::InvalidDescriptor("divisor is not a multiple of a lower unit".into()))?;
        accumulated = accumulated
            .checked_mul(current.step_to_finer().expect("next_finer implies step_to_finer"))
            .ok_or(Error::Overflow)?;
        current = next;
        if accumulated % den == 0 {
            let q = accumulated / den;
            return Descriptor::new(current, num.checked_mul(q).ok_or(Error::Overflow)?);
        }
    }
}

fn parse_bracket_body(input: &str) -> IResult<&str, Descriptor> {
    alt((
        value(Descriptor::generic(), tag("generic")),
        value(Descriptor::generic(), eof),
        map_res(
            tuple((parse_unit_with_multiplier, opt(parse_divisor))),
            |((base, num), den)| match den {
                None => Descriptor::new(base, num),
                Some(den) => rewrite_divisor(base, num, den),
            },
        ),
    ))(input)
}

/// Parse a bare descriptor literal: `[s]`, `[10us]`, `[generic]`, `[]`.
pub fn parse_descriptor(input: &str) -> Result<Descriptor> {
    let mut parser = all_consuming(delimited(char('['), parse_bracket_body, char(']')));
    parser(input)
        .map(|(_, d)| d)
        .map_err(|_| Error::InvalidDescriptor(input.to_string()))
}

/// Parse a numpy-style type string, `"<typename>[<descriptor body>]"`
/// (e.g. `"datetime64[ns]"`), returning the type name and the descriptor.
pub fn parse_type_string(input: &str) -> Result<(&str, Descriptor)> {
    let open = input
        .find('[')
        .ok_or_else(|| Error::InvalidDescriptor(input.to_string()))?;
    let (name, bracketed) = input.split_at(open);
    let descriptor = parse_descriptor(bracketed)?;
    Ok((name, descriptor))
}

/// Format a type string, the inverse of [`parse_type_string`].
pub fn format_type_string(name: &str, descriptor: Descriptor) -> String {
    format!("{name}{descriptor}")
}

/// Parse the tuple form of a descriptor: 2 to 4 string parts, `(unit,
/// num)`, `(unit, num, den, events)`. `den`/`events` beyond the base
/// multiplier are validated (must parse as integers) but are not yet
/// represented in [`Descriptor`]; they are accepted for forward
/// compatibility with the legacy 4-tuple encoding and otherwise ignored.
pub fn from_tuple(parts: &[&str]) -> Result<Descriptor> {
    if parts.len() < 2 || parts.len() > 4 {
        return Err(Error::InvalidDescriptor(format!(
            "tuple descriptor must have 2-4 parts, got {}",
            parts.len()
        )));
    }
    let base = BaseUnit::from_symbol(parts[0])
        .ok_or_else(|| Error::InvalidUnit(parts[0].to_string()))?;
    let num: i64 = parts[1]
        .parse()
        .map_err(|_| Error::InvalidDescriptor(format!("not a multiplier: {}", parts[1])))?;
    for extra in &parts[2..] {
        extra
            .parse::<i64>()
            .map_err(|_| Error::InvalidDescriptor(format!("not an integer: {extra}")))?;
    }
    if parts.len() > 2 {
        LEGACY_TUPLE_WARNING.call_once(|| {
            log::warn!(
                "3- and 4-tuple unit descriptors are deprecated; the legacy event slot is ignored"
            );
        });
    }
    Descriptor::new(base, num)
}
