use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use dcon_core::{
    current_unix_timestamp_i64, current_unix_timestamp_ms, lock_or_recover, write_text_atomic,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{AutomationMessage, PollDecision};

pub const DEFAULT_AUTOMATION_POLL_INTERVAL: Duration = Duration::from_secs(2);
const AUTOMATION_FILE_PREFIX: &str = "dcon-automation";
const AUTOMATION_FILE_SEED: &str = "{}";

static AUTOMATION_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Who issued the command currently producing output.
pub enum CommandOrigin {
    Interactive,
    Automated,
}

#[async_trait]
/// Command execution capability shared with the interactive loop.
pub trait AutomationHost: Send + Sync {
    async fn execute(&self, command_line: &str) -> Option<String>;

    fn set_origin(&self, origin: CommandOrigin) {
        let _ = origin;
    }

    /// Echoes an automated command before it runs.
    fn announce(&self, command_line: &str) {
        let _ = command_line;
    }

    fn print_prompt(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `AutomationBridgeConfig` used across dcon components.
pub struct AutomationBridgeConfig {
    pub dir: PathBuf,
    pub poll_interval: Duration,
}

impl Default for AutomationBridgeConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir(),
            poll_interval: DEFAULT_AUTOMATION_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Default)]
struct BridgeState {
    file_path: Option<PathBuf>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// Idle/running state machine around one automation file and its poll task.
///
/// `last_seen_sent_at` also serializes file access: `send` holds it across
/// its write and the poll task holds it from read through dedup, so a tick
/// never judges a record against a token registered after it was read.
#[derive(Debug)]
pub struct AutomationBridge {
    config: AutomationBridgeConfig,
    state: Mutex<BridgeState>,
    last_seen_sent_at: Arc<Mutex<i64>>,
}

impl AutomationBridge {
    pub fn new(config: AutomationBridgeConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BridgeState::default()),
            last_seen_sent_at: Arc::new(Mutex::new(0)),
        }
    }

    pub fn config(&self) -> &AutomationBridgeConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().file_path.is_some()
    }

    pub fn file_path(&self) -> Option<PathBuf> {
        self.lock_state().file_path.clone()
    }

    /// True while the poll task is alive. A running bridge whose task ended on
    /// a read failure reports `false` here until it is stopped and restarted.
    pub fn is_polling(&self) -> bool {
        self.lock_state()
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn last_seen_sent_at(&self) -> i64 {
        *lock_or_recover(&self.last_seen_sent_at)
    }

    /// Creates the automation file and spawns its poll task on the current
    /// Tokio runtime. Returns the existing path when already running.
    pub fn start(&self, host: Arc<dyn AutomationHost>) -> Result<PathBuf> {
        let mut state = self.lock_state();
        if let Some(path) = &state.file_path {
            return Ok(path.clone());
        }
        if self.config.poll_interval.is_zero() {
            bail!("automation poll interval must be greater than zero");
        }

        let runtime = tokio::runtime::Handle::try_current()
            .context("automation bridge requires an active Tokio runtime")?;
        let path = create_automation_file(&self.config.dir)?;
        *lock_or_recover(&self.last_seen_sent_at) = 0;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let poll = AutomationPollContext {
            path: path.clone(),
            interval: self.config.poll_interval,
            host,
            last_seen_sent_at: Arc::clone(&self.last_seen_sent_at),
        };
        let task = runtime.spawn(async move {
            run_automation_poll_loop(poll, shutdown_rx).await;
        });

        tracing::info!(path = %path.display(), "automation bridge started");
        state.file_path = Some(path.clone());
        state.shutdown_tx = Some(shutdown_tx);
        state.task = Some(task);
        Ok(path)
    }

    /// Signals the poll task and returns immediately; the task deletes the
    /// automation file on its way out.
    pub fn stop(&self) {
        let _ = self.stop_inner();
    }

    /// Like [`stop`](Self::stop) but waits for the poll task (and the file
    /// deletion) to finish.
    pub async fn shutdown(&self) {
        if let Some(task) = self.stop_inner() {
            let _ = task.await;
        }
    }

    /// Publishes `command` through the automation file for external observers.
    ///
    /// The token is registered before the write and both happen under the
    /// token lock, so this process's own poller always sees the record as a
    /// duplicate. A failed write puts the previous token back. A no-op while
    /// idle.
    pub fn send(&self, command: &str) -> Result<()> {
        let state = self.lock_state();
        let Some(path) = state.file_path.as_deref() else {
            return Ok(());
        };

        let message = AutomationMessage::new(command, current_unix_timestamp_i64());
        let mut encoded =
            serde_json::to_string(&message).context("failed to encode automation record")?;
        encoded.push('\n');

        let mut last_seen = lock_or_recover(&self.last_seen_sent_at);
        let previous = std::mem::replace(&mut *last_seen, message.sent_at);
        if let Err(error) = write_text_atomic(path, &encoded) {
            *last_seen = previous;
            return Err(error)
                .with_context(|| format!("failed to write automation file {}", path.display()));
        }
        Ok(())
    }

    fn stop_inner(&self) -> Option<JoinHandle<()>> {
        let mut state = self.lock_state();
        let path = state.file_path.take()?;
        if let Some(shutdown_tx) = state.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        tracing::info!(path = %path.display(), "automation bridge stopping");
        state.task.take()
    }

    fn lock_state(&self) -> MutexGuard<'_, BridgeState> {
        lock_or_recover(&self.state)
    }
}

impl Drop for AutomationBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

struct AutomationPollContext {
    path: PathBuf,
    interval: Duration,
    host: Arc<dyn AutomationHost>,
    last_seen_sent_at: Arc<Mutex<i64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollControl {
    Continue,
    Stop,
}

#[derive(Debug)]
enum PollRead {
    ReadFailed(std::io::Error),
    Malformed(serde_json::Error),
    Decided { sent_at: i64, decision: PollDecision },
}

fn create_automation_file(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create automation directory {}", dir.display()))?;
    let unique = AUTOMATION_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = dir.join(format!(
        "{AUTOMATION_FILE_PREFIX}-{}-{}-{unique}.json",
        std::process::id(),
        current_unix_timestamp_ms()
    ));
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .with_context(|| format!("failed to create automation file {}", path.display()))?;
    file.write_all(AUTOMATION_FILE_SEED.as_bytes())
        .with_context(|| format!("failed to initialize automation file {}", path.display()))?;
    Ok(path)
}

async fn run_automation_poll_loop(
    poll: AutomationPollContext,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let first_tick = tokio::time::Instant::now() + poll.interval;
    let mut ticker = tokio::time::interval_at(first_tick, poll.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if poll_automation_file(&poll).await == PollControl::Stop {
                    break;
                }
            }
            _ = &mut shutdown_rx => break,
        }
    }

    if let Err(error) = remove_automation_file(&poll.path).await {
        tracing::warn!(
            path = %poll.path.display(),
            error = %error,
            "failed to delete automation file"
        );
    }
}

/// Deletes the automation file. A file that is already gone, as after a read
/// failure, counts as deleted.
async fn remove_automation_file(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn read_automation_record(path: &Path, last_seen_sent_at: &Mutex<i64>) -> PollRead {
    let mut last_seen = lock_or_recover(last_seen_sent_at);
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => return PollRead::ReadFailed(error),
    };
    match serde_json::from_str::<AutomationMessage>(&raw) {
        Ok(message) => PollRead::Decided {
            sent_at: message.sent_at,
            decision: PollDecision::decide(&message, &mut last_seen),
        },
        Err(error) => PollRead::Malformed(error),
    }
}

async fn poll_automation_file(poll: &AutomationPollContext) -> PollControl {
    let path = poll.path.clone();
    let last_seen_sent_at = Arc::clone(&poll.last_seen_sent_at);
    let read = tokio::task::spawn_blocking(move || {
        read_automation_record(&path, &last_seen_sent_at)
    })
    .await;

    let (sent_at, command) = match read {
        Ok(PollRead::Decided {
            sent_at,
            decision: PollDecision::Execute(command),
        }) => (sent_at, command),
        Ok(PollRead::Decided { .. }) => return PollControl::Continue,
        Ok(PollRead::Malformed(error)) => {
            tracing::warn!(
                path = %poll.path.display(),
                error = %error,
                "failed to decode automation record"
            );
            return PollControl::Continue;
        }
        Ok(PollRead::ReadFailed(error)) => {
            tracing::error!(
                path = %poll.path.display(),
                error = %error,
                "failed to read automation file; automation stopped"
            );
            return PollControl::Stop;
        }
        Err(error) => {
            tracing::error!(
                path = %poll.path.display(),
                error = %error,
                "automation read task failed; automation stopped"
            );
            return PollControl::Stop;
        }
    };

    tracing::debug!(sent_at, command = %command, "automation command");
    poll.host.set_origin(CommandOrigin::Automated);
    poll.host.announce(&command);
    let returned = poll.host.execute(&command).await;
    poll.host.set_origin(CommandOrigin::Interactive);
    poll.host.print_prompt();
    if let Some(value) = returned {
        tracing::debug!(value = %value, "automation command returned");
    }
    PollControl::Continue
}
