//! Trend analytics over daily snapshots.
//!
//! - `breakdown` - total/new/closed for one date pair
//! - `rollup` - sparse per-date series across the three categories
//! - `release` - release window resolution

pub mod breakdown;
pub mod release;
pub mod rollup;

pub use breakdown::{BreakdownEngine, CategoryFilters};
pub use release::ReleaseDateResolver;
pub use rollup::RollupAssembler;
