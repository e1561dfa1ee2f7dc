use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dcon_bridge::AutomationBridgeConfig;
use dcon_cli::Cli;
use dcon_platform::{DiscordConfig, DiscordHttpClient, PlatformClient, PlatformError};
use dcon_session::{BookmarkStore, JsonFileBookmarkPersistence};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::console::Console;
use crate::output::ConsoleOutput;
use crate::runtime_loop::{execute_command_file, run_interactive};

pub fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

pub fn automation_config_from_cli(cli: &Cli) -> AutomationBridgeConfig {
    let defaults = AutomationBridgeConfig::default();
    AutomationBridgeConfig {
        dir: cli.automation_dir.clone().unwrap_or(defaults.dir),
        poll_interval: Duration::from_millis(cli.automation_poll_interval_ms),
    }
}

pub fn build_platform_client(cli: &Cli) -> Result<Arc<dyn PlatformClient>> {
    let token = cli
        .token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(PlatformError::MissingToken)
        .context("pass --token or set DCON_TOKEN")?;
    let client = DiscordHttpClient::new(DiscordConfig {
        api_base: cli.api_base.clone(),
        token: token.to_string(),
        bot: cli.bot,
        request_timeout_ms: cli.request_timeout_ms,
    })?;
    Ok(Arc::new(client))
}

pub fn build_console(
    cli: &Cli,
    client: Arc<dyn PlatformClient>,
    output: ConsoleOutput,
) -> Result<Arc<Console>> {
    let bookmarks = BookmarkStore::load(Box::new(JsonFileBookmarkPersistence::new(
        &cli.bookmarks_path,
    )))?;
    Ok(Console::new(
        client,
        bookmarks,
        automation_config_from_cli(cli),
        output,
    ))
}

pub async fn run_cli(cli: Cli) -> Result<()> {
    let client = build_platform_client(&cli)?;
    let console = build_console(&cli, client, ConsoleOutput::stdout())?;

    if cli.automation {
        let path = console.start_automation()?;
        console
            .output()
            .line(&format!("automation file: {}", path.display()));
    }

    let result = match &cli.command_file {
        Some(path) => execute_command_file(&console, path, cli.command_file_error_mode)
            .await
            .map(|_| ()),
        None => run_interactive(Arc::clone(&console), &cli.history_path).await,
    };

    console.bridge().shutdown().await;
    result
}
