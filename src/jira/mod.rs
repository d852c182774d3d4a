//! Issue-tracker access.
//!
//! This module fetches ticket details from Jira and merges them, with
//! chat handles and revert markers, onto collected commits.

pub mod annotate;
pub mod client;

pub use annotate::{annotate, linked_keys, ChatDirectory};
pub use client::{ClientConfig, JiraClient};
