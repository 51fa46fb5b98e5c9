//! Typed temporal values: a `(tick: i64, descriptor: (base, num))` pair
//! representing either a point in time or a span of time, with the unit
//! algebra, calendar engine, textual grammar, coercion layer and range
//! generator needed to move between ticks, broken-down structs and
//! external representations.
//!
//! The core is pure and single-threaded (no I/O, no shared mutable state
//! beyond the read-only tables in [`units`]) -- every operation takes its
//! inputs by value and returns its outputs by value.

pub mod algebra;
pub mod calendar;
pub mod coerce;
pub mod descriptor;
pub mod error;
pub mod infer;
pub mod parser;
pub mod range;
pub mod ticks;
pub mod units;

pub use calendar::DateTimeFields;
pub use descriptor::{CastingMode, Descriptor, Kind};
pub use error::{Error, Result};
pub use ticks::Tick;
pub use units::BaseUnit;
