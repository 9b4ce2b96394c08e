//! CLI module for the `cribctl` tool.
//!
//! This module provides the command-line interface for inspecting and
//! applying synthesized manifest directories.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
