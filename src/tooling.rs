//! Tooling & Integration Layer
//!
//! Operator-facing CLI for running exports and inspecting configuration.

pub mod cli;

pub use cli::{Cli, CliContext, CommandOutput, Commands, ConfigCommands};
