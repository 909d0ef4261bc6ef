//! # marginalia-cli
//!
//! Command-line host for marginalia. HTML files stand in for the page and a
//! directory of JSON files stands in for the browser's key-value storage.

pub mod cli;
pub mod commands;
pub mod logging;

pub use cli::{Cli, Commands};
pub use commands::run;
