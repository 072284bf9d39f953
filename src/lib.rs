//! tidedb - a buffered two-tier storage core
//!
//! Writes land in a transient buffer and are transported in batch to a
//! permanent store; every read reconciles both tiers so callers always see
//! one consistent answer, including as of a historical timestamp.

pub mod journal;
pub mod model;
pub mod store;
pub mod time;
