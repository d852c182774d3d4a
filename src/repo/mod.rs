//! Version-control access.

pub mod history;

pub use history::{collect_commits, CollectOptions, RevisionRange, TicketPattern};
