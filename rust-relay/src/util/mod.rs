//! Utility modules.

pub mod clock;
pub mod date;

pub use clock::{Clock, FixedClock, SystemClock};
