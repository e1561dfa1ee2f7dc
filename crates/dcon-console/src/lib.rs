//! Interactive console, command dispatcher and process bootstrap for `dcon`.
//!
//! [`Console`] owns the session state and the automation bridge; the runtime
//! loop, command files and the bridge's poll task all execute lines through
//! the same dispatcher.

mod bootstrap;
mod commands;
mod console;
mod output;
mod render;
mod runtime_loop;

pub use bootstrap::{
    automation_config_from_cli, build_console, build_platform_client, init_tracing, run_cli,
};
pub use console::{CommandAction, Console};
pub use output::{ConsoleOutput, AUTOMATION_OUTPUT_PREFIX};
pub use runtime_loop::{execute_command_file, run_interactive};
