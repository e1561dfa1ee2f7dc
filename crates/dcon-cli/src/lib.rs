//! CLI argument models and command-text helpers for the dcon binary.
//!
//! Exposes the clap-backed [`Cli`] plus the line parsing shared by the
//! interactive loop, command files, and the automation bridge.

pub mod cli_args;
pub mod cli_types;
pub mod command_file;
pub mod command_text;

pub use cli_args::Cli;
pub use cli_types::*;
pub use command_file::*;
pub use command_text::*;
