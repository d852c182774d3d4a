//! Analysis modules.
//!
//! This module turns annotated commits into the report model.

pub mod aggregator;

pub use aggregator::{aggregate, AggregateOptions};
