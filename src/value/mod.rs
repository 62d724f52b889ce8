//! Row value model for tabula
//!
//! Every column value flowing through the core is a [`Value`]: a closed
//! tagged enum instead of an untyped document. Rows are ordered maps from
//! column key to value.
//!
//! # Ordering
//!
//! Values are totally ordered so they can key indexes and sort results
//! deterministically:
//!
//! Null < Bool < numbers (Int and Float compared numerically) < String
//! < Blob < Array < Map
//!
//! NaN compares equal to NaN and above every other number.

mod cast;
mod value;

pub use cast::CastTarget;
pub use value::{get_path, Row, Value};
