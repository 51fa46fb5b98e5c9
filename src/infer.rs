//! Recursive unit inference over a nested input.

use crate::algebra;
use crate::coerce::{BrokenDownDate, BrokenDownDuration, Iso8601Parser};
use crate::descriptor::{Descriptor, Kind};
use crate::error::{Error, Result};
use crate::units::BaseUnit;

/// Recursion depth guard. 32 comfortably covers any nested
/// array literal a caller would construct by hand; deeper input is almost
/// certainly a cyclic or pathological structure.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// A single inferable leaf: a string, a scalar already at a known
/// descriptor, or a host date/datetime/timedelta-like object.
pub enum LeafValue<'a> {
    /// A string to be decoded via the ISO-8601 collaborator.
    Text(&'a str),
    /// An existing scalar already at a known descriptor.
    Scalar(Descriptor),
    /// A host date/datetime-like object.
    Date(&'a dyn BrokenDownDate),
    /// A host timedelta-like object.
    Duration(&'a dyn BrokenDownDuration),
}

/// A nested input tree: either one leaf, or a sequence of sub-trees
/// (arrays, nested arrays, ...).
pub enum LeafOrNode<'a> {
    /// A single value.
    Leaf(LeafValue<'a>),
    /// An array/sequence of sub-trees.
    Node(Vec<LeafOrNode<'a>>),
}

fn leaf_descriptor(leaf: &LeafValue<'_>, parser: &dyn Iso8601Parser) -> Result<Descriptor> {
    match leaf {
        LeafValue::Text(text) => {
            let (fields, unit) = parser.parse(text)?;
            if fields.is_nat() {
                return Ok(Descriptor::generic());
            }
            Descriptor::new(unit, 1)
        }
        LeafValue::Scalar(descriptor) => Ok(*descriptor),
        LeafValue::Date(date) => {
            let has_time = date.hour().is_some()
                || date.minute().is_some()
                || date.second().is_some()
                || date.microsecond().is_some();
            let base = if has_time {
                BaseUnit::Microsecond
            } else {
                BaseUnit::Day
            };
            Descriptor::new(base, 1)
        }
        LeafValue::Duration(_) => Descriptor::new(BaseUnit::Microsecond, 1),
    }
}

/// Infer the finest common descriptor across every leaf of `input`,
/// folding leaf candidates with the descriptor GCD.
///
/// A leaf that fails with `InvalidDate`/`InvalidTime` is skipped rather
/// than aborting the whole walk, so a mixed array with a few malformed
/// entries still infers a unit from the rest. Every other error aborts
/// immediately.
pub fn infer_descriptor(
    input: &LeafOrNode<'_>,
    kind: Kind,
    parser: &dyn Iso8601Parser,
) -> Result<Descriptor> {
    infer_at_depth(input, kind, parser, 0)
}

fn infer_at_depth(
    input: &LeafOrNode<'_>,
    kind: Kind,
    parser: &dyn Iso8601Parser,
    depth: usize,
) -> Result<Descriptor> {
    match input {
        LeafOrNode::Leaf(leaf) => leaf_descriptor(leaf, parser),
        LeafOrNode::Node(children) => {
            if depth >= DEFAULT_MAX_DEPTH {
                return Err(Error::ConversionFailure(
                    "unit inference recursion depth exceeded".into(),
                ));
            }
            let mut acc: Option<Descriptor> = None;
            for child in children {
                let candidate = match infer_at_depth(child, kind, parser, depth + 1) {
                    Ok(d) => d,
                    Err(Error::InvalidDate { .. }) | Err(Error::InvalidTime { .. }) => continue,
                    Err(e) => return Err(e),
                };
                acc = Some(match acc {
                    None => candidate,
                    Some(prev) => algebra::gcd_descriptor(prev, candidate, kind)?,
                });
            }
            acc.ok_or_else(|| Error::ConversionFailure("no inferable leaves in input".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::BasicIso8601Parser;

    #[test]
    fn infers_day_from_date_only_strings() {
        let tree = LeafOrNode::Node(vec![
            LeafOrNode::Leaf(LeafValue::Text("2020-01-01")),
            LeafOrNode::Leaf(LeafValue::Text("2020-06-15")),
        ]);
        let descriptor = infer_descriptor(&tree, Kind::Instant, &BasicIso8601Parser).unwrap();
        assert_eq!(descriptor, Descriptor::new(BaseUnit::Day, 1).unwrap());
    }

    #[test]
    fn mixed_resolutions_fold_to_their_gcd() {
        let tree = LeafOrNode::Node(vec![
            LeafOrNode::Leaf(LeafValue::Scalar(Descriptor::new(BaseUnit::Second, 30).unwrap())),
            LeafOrNode::Leaf(LeafValue::Scalar(Descriptor::new(BaseUnit::Minute, 2).unwrap())),
        ]);
        let descriptor = infer_descriptor(&tree, Kind::Instant, &BasicIso8601Parser).unwrap();
        assert_eq!(descriptor, Descriptor::new(BaseUnit::Second, 30).unwrap());
    }

    #[test]
    fn malformed_leaf_is_skipped_not_fatal() {
        let tree = LeafOrNode::Node(vec![
            LeafOrNode::Leaf(LeafValue::Text("2020-01-01")),
            LeafOrNode::Leaf(LeafValue::Text("2020-13-40")), // invalid month/day
        ]);
        let descriptor = infer_descriptor(&tree, Kind::Instant, &BasicIso8601Parser).unwrap();
        assert_eq!(descriptor, Descriptor::new(BaseUnit::Day, 1).unwrap());
    }

    #[test]
    fn nested_arrays_recurse() {
        let tree = LeafOrNode::Node(vec![LeafOrNode::Node(vec![LeafOrNode::Leaf(LeafValue::Text(
            "2020-01-01T00:00:00",
        ))])]);
        let descriptor = infer_descriptor(&tree, Kind::Instant, &BasicIso8601Parser).unwrap();
        assert_eq!(descriptor, Descriptor::new(BaseUnit::Microsecond, 1).unwrap());
    }

    #[test]
    fn empty_node_is_an_error() {
        let tree: LeafOrNode<'_> = LeafOrNode::Node(vec![]);
        assert!(infer_descriptor(&tree, Kind::Instant, &BasicIso8601Parser).is_err());
    }

    #[test]
    fn nat_leaf_is_absorbed_not_fatal() {
        let tree = LeafOrNode::Node(vec![
            LeafOrNode::Leaf(LeafValue::Text("2020-01-01")),
            LeafOrNode::Leaf(LeafValue::Text("NaT")),
        ]);
        let descriptor = infer_descriptor(&tree, Kind::Instant, &BasicIso8601Parser).unwrap();
        assert_eq!(descriptor, Descriptor::new(BaseUnit::Day, 1).unwrap());
    }
}
