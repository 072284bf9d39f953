//! Data model for the buffered storage core
//!
//! The unit of mutation is a [`Write`]: an immutable intent to map (or
//! unmap) a [`Value`] to a key within a record. Fields are derived, never
//! stored: the set of values mapped to a key is always recomputed from the
//! writes that touched it.
//!
//! # Invariants
//!
//! - A `Write` is immutable after construction
//! - Two writes are equivalent iff key, value and record match, regardless
//!   of polarity
//! - A probe write is never admitted into a buffer
//! - `Value` has total equality, a stable hash and a total order, so
//!   existence checks and set membership are deterministic

mod operator;
mod value;
mod write;

pub use operator::{Matcher, Operator};
pub use value::Value;
pub use write::{Polarity, Write};
