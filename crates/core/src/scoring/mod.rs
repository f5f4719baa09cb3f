//! Score aggregation.
//!
//! Turns a stored [`Title`](crate::catalog::Title) into the view returned to
//! clients: per-episode vote statistics, a title-level weighted average, the
//! requesting user's own scores and follow state.

mod aggregate;
mod types;

pub use aggregate::*;
pub use types::*;
