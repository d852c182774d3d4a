//! Changelog rendering.

pub mod generator;

pub use generator::{render, render_json, JiraContext, RenderOptions};
