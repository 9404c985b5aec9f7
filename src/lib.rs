//! Feed-to-briefing pipeline.
//!
//! Reads a news feed, visits every entry through an isolated page context,
//! keeps the entries whose page carries a representative image, probes a
//! weather snippet, and renders the result as a static page.
//!
//! The binary in `main.rs` wires these modules together; see
//! [`collector`] for the core per-entry flow.

pub mod browser;
pub mod cli;
pub mod collector;
pub mod config;
pub mod extract;
pub mod feed;
pub mod models;
pub mod outputs;
pub mod utils;
pub mod weather;
