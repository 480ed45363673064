//! Output routing between plain text, JSON and quiet modes.

pub mod context;

pub use context::{OutputContext, OutputMode};
