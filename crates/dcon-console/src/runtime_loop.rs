use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use dcon_cli::{parse_command_file, CliCommandFileErrorMode, CommandFileReport};
use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Config as ReadlineConfig, Context as ReadlineContext, Editor, Helper,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::command_names;
use crate::console::{CommandAction, Console};

#[derive(Debug)]
struct ConsoleCommandCompleter {
    commands: Vec<String>,
}

impl ConsoleCommandCompleter {
    fn new(commands: &[&str]) -> Self {
        Self {
            commands: commands
                .iter()
                .map(|command| (*command).to_string())
                .collect(),
        }
    }

    fn complete_token(&self, token: &str) -> Vec<String> {
        let token = token.to_ascii_lowercase();
        self.commands
            .iter()
            .filter(|candidate| candidate.starts_with(&token))
            .cloned()
            .collect()
    }
}

impl Helper for ConsoleCommandCompleter {}
impl Validator for ConsoleCommandCompleter {}
impl Highlighter for ConsoleCommandCompleter {}

impl Hinter for ConsoleCommandCompleter {
    type Hint = String;
}

impl Completer for ConsoleCommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let safe_pos = pos.min(line.len());
        let prefix = &line[..safe_pos];
        // only the command word completes
        if prefix.trim_start().contains(char::is_whitespace) {
            return Ok((safe_pos, Vec::new()));
        }
        let start = prefix.len() - prefix.trim_start().len();
        let matches = self
            .complete_token(&prefix[start..])
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate,
            })
            .collect::<Vec<_>>();
        Ok((start, matches))
    }
}

/// Reads commands until `exit` or end of input. Uses the line editor on a
/// terminal and plain buffered stdin otherwise.
pub async fn run_interactive(console: Arc<Console>, history_path: &Path) -> Result<()> {
    if std::io::stdin().is_terminal() && std::io::stdout().is_terminal() {
        run_interactive_tty(&console, history_path).await
    } else {
        run_interactive_stdin(&console).await
    }
}

async fn run_interactive_stdin(console: &Console) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        console.output.prompt(&console.prompt_text());
        let Some(line) = lines
            .next_line()
            .await
            .context("failed to read interactive input")?
        else {
            break;
        };

        if console.run_line(&line).await == CommandAction::Exit {
            break;
        }
    }

    Ok(())
}

async fn run_interactive_tty(console: &Console, history_path: &Path) -> Result<()> {
    let mut editor = build_console_editor()?;
    load_console_history(&mut editor, history_path);

    loop {
        let prompt = console.prompt_text();
        let readline = tokio::task::block_in_place(|| editor.readline(&prompt));
        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(error) => return Err(anyhow!("failed to read interactive input: {error}")),
        };

        if line.trim().is_empty() {
            continue;
        }
        if matches!(editor.add_history_entry(line.as_str()), Ok(true)) {
            save_console_history(&mut editor, history_path);
        }

        if console.run_line(&line).await == CommandAction::Exit {
            break;
        }
    }

    save_console_history(&mut editor, history_path);
    Ok(())
}

fn build_console_editor() -> Result<Editor<ConsoleCommandCompleter, DefaultHistory>> {
    let config = ReadlineConfig::builder().auto_add_history(false).build();
    let mut editor = Editor::<ConsoleCommandCompleter, DefaultHistory>::with_config(config)
        .context("failed to initialize interactive editor")?;
    editor.set_helper(Some(ConsoleCommandCompleter::new(&command_names())));
    Ok(editor)
}

fn load_console_history(
    editor: &mut Editor<ConsoleCommandCompleter, DefaultHistory>,
    path: &Path,
) {
    if let Err(error) = editor.load_history(path) {
        if !matches!(
            error,
            ReadlineError::Io(ref io_error) if io_error.kind() == std::io::ErrorKind::NotFound
        ) {
            tracing::warn!(path = %path.display(), error = %error, "failed to load console history");
        }
    }
}

fn save_console_history(
    editor: &mut Editor<ConsoleCommandCompleter, DefaultHistory>,
    path: &Path,
) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(error) = std::fs::create_dir_all(parent) {
                tracing::warn!(
                    path = %parent.display(),
                    error = %error,
                    "failed to create console history directory"
                );
                return;
            }
        }
    }

    if let Err(error) = editor.save_history(path) {
        tracing::warn!(path = %path.display(), error = %error, "failed to save console history");
    }
}

/// Runs every command in `path` through the console dispatcher.
///
/// Return values are printed as `command file value:` lines. In fail-fast
/// mode the first failing command halts the run and the whole call errors.
pub async fn execute_command_file(
    console: &Console,
    path: &Path,
    mode: CliCommandFileErrorMode,
) -> Result<CommandFileReport> {
    let entries = parse_command_file(path)?;
    let mut report = CommandFileReport {
        total: entries.len(),
        ..CommandFileReport::default()
    };

    for entry in entries {
        report.executed += 1;
        match console.execute_line(&entry.command).await {
            Ok(CommandAction::Continue(value)) => {
                report.succeeded += 1;
                if let Some(value) = value {
                    console.output.line(&format!(
                        "command file value: line={} command={} value={value}",
                        entry.line_number, entry.command
                    ));
                }
            }
            Ok(CommandAction::Exit) => {
                report.succeeded += 1;
                report.halted_early = true;
                console.output.line(&format!(
                    "command file notice: path={} line={} command={} action=exit",
                    path.display(),
                    entry.line_number,
                    entry.command
                ));
                break;
            }
            Err(error) => {
                report.failed += 1;
                console.output.line(&format!(
                    "command file error: path={} line={} command={} error={error:#}",
                    path.display(),
                    entry.line_number,
                    entry.command
                ));
                if mode == CliCommandFileErrorMode::FailFast {
                    report.halted_early = true;
                    break;
                }
            }
        }
    }

    console.output.line(&format!(
        "command file summary: path={} mode={} total={} executed={} succeeded={} failed={} halted_early={}",
        path.display(),
        mode.as_str(),
        report.total,
        report.executed,
        report.succeeded,
        report.failed,
        report.halted_early
    ));

    if mode == CliCommandFileErrorMode::FailFast && report.failed > 0 {
        bail!(
            "command file execution failed: path={} failed={} mode={}",
            path.display(),
            report.failed,
            mode.as_str()
        );
    }

    Ok(report)
}
