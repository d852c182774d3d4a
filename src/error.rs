//! Errors raised by the changelog core.

use thiserror::Error;

/// Failures intrinsic to aggregating and matching commit data.
///
/// Network, authentication and git failures are reported by the
/// collectors through `anyhow` and are never folded into this type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChangelogError {
    /// A required field is empty or absent on an input record.
    #[error("commit #{commit}: missing {field}")]
    MissingCommitField { field: &'static str, commit: usize },

    /// A required field is empty or absent on a linked ticket.
    #[error("commit #{commit}, ticket #{ticket} ({key}): missing {field}")]
    MissingTicketField {
        field: &'static str,
        commit: usize,
        ticket: usize,
        key: String,
    },

    /// The configured ticket-ID pattern does not compile.
    #[error("invalid ticket pattern '{pattern}': {reason}")]
    InvalidTicketPattern { pattern: String, reason: String },
}
