use std::path::PathBuf;
use std::sync::{Arc, Weak};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dcon_bridge::{AutomationBridge, AutomationBridgeConfig, AutomationHost, CommandOrigin};
use dcon_cli::parse_command;
use dcon_platform::PlatformClient;
use dcon_session::{BookmarkStore, EntityCache, NavigationContext};

use crate::commands::dispatch_command;
use crate::output::ConsoleOutput;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of one dispatched command line.
pub enum CommandAction {
    /// Keep reading; carries the command's return value when it has one.
    Continue(Option<String>),
    Exit,
}

/// Session state plus the dispatcher shared by every command source.
///
/// Interactive input, command files and the automation bridge all funnel
/// through [`Console::execute_line`].
pub struct Console {
    self_ref: Weak<Console>,
    pub(crate) cache: EntityCache,
    pub(crate) navigation: NavigationContext,
    pub(crate) bookmarks: BookmarkStore,
    pub(crate) bridge: AutomationBridge,
    pub(crate) output: ConsoleOutput,
}

impl Console {
    pub fn new(
        client: Arc<dyn PlatformClient>,
        bookmarks: BookmarkStore,
        automation: AutomationBridgeConfig,
        output: ConsoleOutput,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            cache: EntityCache::new(client),
            navigation: NavigationContext::default(),
            bookmarks,
            bridge: AutomationBridge::new(automation),
            output,
        })
    }

    pub fn client(&self) -> &Arc<dyn PlatformClient> {
        self.cache.client()
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn navigation(&self) -> &NavigationContext {
        &self.navigation
    }

    pub fn bookmarks(&self) -> &BookmarkStore {
        &self.bookmarks
    }

    pub fn bridge(&self) -> &AutomationBridge {
        &self.bridge
    }

    pub fn output(&self) -> &ConsoleOutput {
        &self.output
    }

    /// Starts the automation bridge with this console as its host.
    pub fn start_automation(&self) -> Result<PathBuf> {
        let host: Arc<dyn AutomationHost> = self
            .self_ref
            .upgrade()
            .ok_or_else(|| anyhow!("console is shutting down"))?;
        self.bridge.start(host)
    }

    pub fn prompt_text(&self) -> String {
        let location = self.navigation.current();
        match (&location.community, &location.channel) {
            (_, None) => "dcon> ".to_string(),
            (Some(community), Some(channel)) => {
                format!("dcon {}#{}> ", community.name, channel.name)
            }
            (None, Some(channel)) => format!("dcon @{}> ", channel.id),
        }
    }

    /// Parses and runs one command line. Blank input is a no-op.
    pub async fn execute_line(&self, line: &str) -> Result<CommandAction> {
        let Some(parsed) = parse_command(line) else {
            return Ok(CommandAction::Continue(None));
        };
        tracing::debug!(command = parsed.name, origin = ?self.output.origin(), "dispatch");
        dispatch_command(self, parsed).await
    }

    /// Runs `line` and reports any error on the console output instead of
    /// returning it.
    pub async fn run_line(&self, line: &str) -> CommandAction {
        match self.execute_line(line).await {
            Ok(action) => action,
            Err(error) => {
                self.output.error(&error);
                CommandAction::Continue(None)
            }
        }
    }
}

#[async_trait]
impl AutomationHost for Console {
    async fn execute(&self, command_line: &str) -> Option<String> {
        match self.run_line(command_line).await {
            CommandAction::Continue(value) => value,
            CommandAction::Exit => {
                self.output
                    .line("exit is ignored for automated commands");
                None
            }
        }
    }

    fn set_origin(&self, origin: CommandOrigin) {
        self.output.set_origin(origin);
    }

    fn announce(&self, command_line: &str) {
        self.output.line(command_line);
    }

    fn print_prompt(&self) {
        self.output.prompt(&self.prompt_text());
    }
}
