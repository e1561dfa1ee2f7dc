use std::path::PathBuf;

use clap::{ArgAction, Parser};
use dcon_platform::DEFAULT_DISCORD_API_BASE;

use crate::CliCommandFileErrorMode;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "dcon",
    about = "Interactive console for a chat-platform account with a file-based automation bridge",
    version
)]
/// Public struct `Cli` used across dcon components.
pub struct Cli {
    #[arg(
        long,
        env = "DCON_TOKEN",
        hide_env_values = true,
        help = "Account token used for every platform request"
    )]
    pub token: Option<String>,

    #[arg(
        long,
        env = "DCON_BOT",
        default_value_t = true,
        action = ArgAction::Set,
        help = "Send the token with the bot authorization prefix"
    )]
    pub bot: bool,

    #[arg(
        long = "api-base",
        env = "DCON_API_BASE",
        default_value = DEFAULT_DISCORD_API_BASE,
        help = "Base URL of the platform REST API"
    )]
    pub api_base: String,

    #[arg(
        long = "request-timeout-ms",
        env = "DCON_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Timeout applied to each platform request"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "bookmarks-path",
        env = "DCON_BOOKMARKS_PATH",
        default_value = ".dcon/bookmarks.json",
        help = "Bookmark file (versioned JSON, written atomically)"
    )]
    pub bookmarks_path: PathBuf,

    #[arg(
        long = "history-path",
        env = "DCON_HISTORY_PATH",
        default_value = ".dcon/repl_history.txt",
        help = "Line-editor history file for interactive sessions"
    )]
    pub history_path: PathBuf,

    #[arg(
        long,
        env = "DCON_AUTOMATION",
        default_value_t = false,
        help = "Start the automation bridge on launch and print its file path"
    )]
    pub automation: bool,

    #[arg(
        long = "automation-dir",
        env = "DCON_AUTOMATION_DIR",
        help = "Directory for the automation file (defaults to the system temp dir)"
    )]
    pub automation_dir: Option<PathBuf>,

    #[arg(
        long = "automation-poll-interval-ms",
        env = "DCON_AUTOMATION_POLL_INTERVAL_MS",
        default_value_t = 2_000,
        value_parser = parse_positive_u64,
        help = "How often the automation bridge re-reads its file"
    )]
    pub automation_poll_interval_ms: u64,

    #[arg(
        long = "command-file",
        env = "DCON_COMMAND_FILE",
        help = "Execute console commands from a UTF-8 file and exit"
    )]
    pub command_file: Option<PathBuf>,

    #[arg(
        long = "command-file-error-mode",
        env = "DCON_COMMAND_FILE_ERROR_MODE",
        value_enum,
        default_value = "fail-fast",
        requires = "command_file",
        help = "Behavior when command-file execution hits a failing command"
    )]
    pub command_file_error_mode: CliCommandFileErrorMode,
}
